use dao_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    #[error("token transfers are paused")]
    Paused,

    #[error("{0} is not allowed to mint")]
    NotMinter(Address),

    #[error("zero address")]
    ZeroAddress,

    #[error("arithmetic overflow in token supply")]
    Overflow,

    #[error("transfer refused: {0}")]
    Refused(String),
}
