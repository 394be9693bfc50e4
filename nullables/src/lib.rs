//! Nullable infrastructure for deterministic testing.
//!
//! The governance engine never reads a clock and never owns its token; both
//! are supplied by the caller. This crate provides controllable stand-ins:
//! - [`NullClock`]: time that only moves when told to
//! - [`RefusingLedger`]: a token ledger that can be switched to refuse every
//!   transfer, for exercising custody failures and rollback
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;

pub use clock::NullClock;
pub use ledger::{RefusalSwitch, RefusingLedger};
