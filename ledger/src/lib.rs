//! Fungible token ledger used by the DAO.
//!
//! The governance engine treats the token as an external collaborator and only
//! talks to it through the [`TokenLedger`] trait. [`MemoryLedger`] is the
//! in-process implementation: ERC-20 style balances and allowances, a single
//! minter, and a pause switch that makes every transfer fail.

pub mod error;
pub mod ledger;
pub mod memory;

pub use error::LedgerError;
pub use ledger::TokenLedger;
pub use memory::MemoryLedger;
