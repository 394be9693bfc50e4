//! Fundamental types for the DAO governance engine.
//!
//! This crate defines the primitives shared across every other crate in the workspace:
//! addresses, token amounts, timestamps, governance parameters, and vote enums.

pub mod address;
pub mod amount;
pub mod error;
pub mod params;
pub mod time;
pub mod vote;

pub use address::Address;
pub use amount::{TokenAmount, Wei, DEFAULT_DECIMALS};
pub use error::TypesError;
pub use params::GovernanceParams;
pub use time::Timestamp;
pub use vote::{Choice, ProposalId, VotingMode};
