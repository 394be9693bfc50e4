//! Errors raised while constructing or validating shared types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid parameter {field}: {reason}")]
    InvalidParam {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid voting choice: {0}")]
    InvalidChoice(String),
}
