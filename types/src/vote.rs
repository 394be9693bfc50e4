//! Vote choices, voting modes, and proposal identifiers.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monotonically assigned proposal identifier. The first proposal is `1`.
pub type ProposalId = u64;

/// Which tally a vote counts toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    For,
    Against,
}

impl Choice {
    pub fn is_for(&self) -> bool {
        matches!(self, Self::For)
    }
}

impl From<bool> for Choice {
    fn from(support: bool) -> Self {
        if support {
            Self::For
        } else {
            Self::Against
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::For => "for",
            Self::Against => "against",
        })
    }
}

impl FromStr for Choice {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "for" | "yes" | "true" => Ok(Self::For),
            "against" | "no" | "false" => Ok(Self::Against),
            other => Err(TypesError::InvalidChoice(other.to_string())),
        }
    }
}

/// How a stake converts into voting power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VotingMode {
    /// `vp = stake / tokens_per_vp`
    #[default]
    Linear,
    /// `vp = isqrt(stake / tokens_per_vp)`
    Quadratic,
}

impl VotingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Linear => Self::Quadratic,
            Self::Quadratic => Self::Linear,
        }
    }
}

impl fmt::Display for VotingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::Quadratic => "quadratic",
        })
    }
}
