//! Governance parameters: the controller-tunable values of the DAO.
//!
//! Every field is strictly positive and `voting_period >= lock_time`, so a stake
//! placed on the last second of a vote is always unlockable by the time the vote
//! can be finalized plus one lock period at most.

use crate::amount::{TokenAmount, Wei};
use crate::error::TypesError;
use serde::{Deserialize, Serialize};

/// The parameter set of a DAO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Wei per whole token sold by the gateway.
    pub price: Wei,

    /// Minimum stake (base units) for a direct or delegated vote.
    pub min_vote_stake: TokenAmount,

    /// Minimum stake (base units) to create a proposal.
    pub min_proposal_stake: TokenAmount,

    /// Seconds a proposal stays open for voting.
    pub voting_period: u64,

    /// Base units that equal one unit of voting power.
    pub tokens_per_vp: TokenAmount,

    /// Seconds a fresh stake stays locked.
    pub lock_time: u64,
}

impl GovernanceParams {
    /// One day of voting, one hour of lock, 1:1 voting power.
    pub fn dev_defaults() -> Self {
        Self {
            price: 1,
            min_vote_stake: 10,
            min_proposal_stake: 20,
            voting_period: 24 * 3600,
            tokens_per_vp: 1,
            lock_time: 3600,
        }
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<(), TypesError> {
        fn positive(field: &'static str, value: u128) -> Result<(), TypesError> {
            if value == 0 {
                return Err(TypesError::InvalidParam {
                    field,
                    reason: "must be greater than zero",
                });
            }
            Ok(())
        }

        positive("price", self.price)?;
        positive("min_vote_stake", self.min_vote_stake)?;
        positive("min_proposal_stake", self.min_proposal_stake)?;
        positive("voting_period", u128::from(self.voting_period))?;
        positive("tokens_per_vp", self.tokens_per_vp)?;
        positive("lock_time", u128::from(self.lock_time))?;
        if self.voting_period < self.lock_time {
            return Err(TypesError::InvalidParam {
                field: "voting_period",
                reason: "cannot be less than lock_time",
            });
        }
        Ok(())
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::dev_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GovernanceParams::default().validate().unwrap();
    }

    #[test]
    fn test_zero_fields_are_rejected() {
        let cases: [(&str, fn(&mut GovernanceParams)); 6] = [
            ("price", |p| p.price = 0),
            ("min_vote_stake", |p| p.min_vote_stake = 0),
            ("min_proposal_stake", |p| p.min_proposal_stake = 0),
            ("voting_period", |p| p.voting_period = 0),
            ("tokens_per_vp", |p| p.tokens_per_vp = 0),
            ("lock_time", |p| p.lock_time = 0),
        ];
        for (name, mutate) in cases {
            let mut params = GovernanceParams::default();
            mutate(&mut params);
            match params.validate() {
                Err(TypesError::InvalidParam { field, .. }) => assert_eq!(field, name),
                other => panic!("expected {name} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_voting_period_shorter_than_lock_is_rejected() {
        let mut params = GovernanceParams::default();
        params.voting_period = params.lock_time - 1;
        assert!(matches!(
            params.validate(),
            Err(TypesError::InvalidParam { field: "voting_period", .. })
        ));
    }

    #[test]
    fn test_voting_period_equal_to_lock_is_accepted() {
        let mut params = GovernanceParams::default();
        params.voting_period = params.lock_time;
        params.validate().unwrap();
    }
}
