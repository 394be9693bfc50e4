//! Proposals, their lifecycle, and the per-voter vote records.

use dao_types::{Address, Choice, ProposalId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a proposal. `Accepted` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Open for votes and delegations until the deadline.
    Active,
    /// Finalized with `votes_for > votes_against`.
    Accepted,
    /// Finalized with `votes_for <= votes_against` (ties reject).
    Rejected,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown proposal status: {other}")),
        }
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
    /// `created_at + voting_period` at creation time.
    pub deadline: Timestamp,
    /// Voting power in favour.
    pub votes_for: u128,
    /// Voting power against.
    pub votes_against: u128,
    pub status: ProposalStatus,
    /// Addresses with a direct vote on this proposal. Order is not meaningful.
    pub voters: Vec<Address>,
}

impl Proposal {
    pub(crate) fn new(
        id: ProposalId,
        creator: Address,
        title: String,
        description: String,
        created_at: Timestamp,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            creator,
            title,
            description,
            created_at,
            deadline,
            votes_for: 0,
            votes_against: 0,
            status: ProposalStatus::Active,
            voters: Vec::new(),
        }
    }

    /// Whether votes, delegations, and revocations are accepted at `now`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.status == ProposalStatus::Active && now < self.deadline
    }

    pub fn total_votes(&self) -> u128 {
        self.votes_for.saturating_add(self.votes_against)
    }

    /// Outcome if the proposal were finalized now.
    pub fn outcome(&self) -> ProposalStatus {
        if self.votes_for > self.votes_against {
            ProposalStatus::Accepted
        } else {
            ProposalStatus::Rejected
        }
    }

    /// Remove a voter by swapping with the last entry and truncating.
    pub(crate) fn remove_voter(&mut self, voter: &Address) -> bool {
        match self.voters.iter().position(|v| v == voter) {
            Some(index) => {
                self.voters.swap_remove(index);
                true
            }
            None => false,
        }
    }
}

/// The record of a direct vote, kept so the tally can be rolled back exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Tokens staked with the vote, in base units.
    pub stake: TokenAmount,
    /// Voting power added to the tally when the vote was cast.
    pub voting_power: u128,
    pub choice: Choice,
    /// Set when the stake was released after finalization. The tally and the
    /// voter set stay frozen, so the record stays as well.
    pub withdrawn: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal::new(
            1,
            Address::from_low_u64(1),
            "title".into(),
            "description".into(),
            Timestamp::new(100),
            Timestamp::new(200),
        )
    }

    #[test]
    fn test_new_proposal_is_active_with_empty_tally() {
        let p = proposal();
        assert_eq!(p.status, ProposalStatus::Active);
        assert_eq!(p.total_votes(), 0);
        assert!(p.voters.is_empty());
    }

    #[test]
    fn test_open_until_deadline_exclusive() {
        let p = proposal();
        assert!(p.is_open(Timestamp::new(199)));
        assert!(!p.is_open(Timestamp::new(200)));
    }

    #[test]
    fn test_ties_reject() {
        let mut p = proposal();
        p.votes_for = 10;
        p.votes_against = 10;
        assert_eq!(p.outcome(), ProposalStatus::Rejected);
        p.votes_for = 11;
        assert_eq!(p.outcome(), ProposalStatus::Accepted);
    }

    #[test]
    fn test_remove_voter_swaps_with_last() {
        let mut p = proposal();
        let (a, b, c) = (
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Address::from_low_u64(3),
        );
        p.voters = vec![a, b, c];
        assert!(p.remove_voter(&a));
        assert_eq!(p.voters, vec![c, b]);
        assert!(!p.remove_voter(&a));
    }

    #[test]
    fn test_status_parses() {
        assert_eq!("Accepted".parse::<ProposalStatus>().unwrap(), ProposalStatus::Accepted);
        assert!("pending".parse::<ProposalStatus>().is_err());
    }
}
