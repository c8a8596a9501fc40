//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The session
//! service depends only on these traits, not on concrete implementations.

mod account_store;
mod clock;

pub use account_store::AccountStore;
pub use clock::Clock;
