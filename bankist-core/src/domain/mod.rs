//! Core domain entities
//!
//! Pure data structures and derivations - no I/O, no timers.

mod account;
pub mod display;
pub mod result;

pub use account::{Account, Movement, SortOrder};
pub use display::{AccountView, DisplayBundle, Money, MovementKind, MovementView, RelativeDay};
pub use result::{Error, OperationResult, Result, TransferRejection};
