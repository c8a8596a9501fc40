//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - In-memory registry for the AccountStore port
//! - System and fixed clocks for the Clock port
//! - Demo accounts for first runs and tests

pub mod clock;
pub mod demo;
pub mod memory;
