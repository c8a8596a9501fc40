//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions.

pub mod activity;
mod session;
pub mod timer;

pub use activity::{ActivityEntry, ActivityEvent, ActivityLog};
pub use session::{AccountSummary, SessionEvent, SessionService};
pub use timer::{Countdown, CountdownState, TickOutcome};
