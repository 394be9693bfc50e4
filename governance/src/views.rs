//! Read-only aggregation for indexers and front ends.

use crate::proposal::{Proposal, ProposalStatus};
use crate::state::DaoState;
use dao_ledger::TokenLedger;
use dao_types::{Address, Choice, ProposalId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterView {
    pub voter: Address,
    pub choice: Choice,
    pub voting_power: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
    pub votes_for: u128,
    pub votes_against: u128,
    pub status: ProposalStatus,
    pub voters: Vec<VoterView>,
}

/// Stakes held for one address on one proposal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingView {
    pub proposal_id: ProposalId,
    pub vote_stake: TokenAmount,
    pub proposal_stake: TokenAmount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationInfo {
    pub delegate: Address,
    pub amount: TokenAmount,
    pub active: bool,
}

impl Default for DelegationInfo {
    fn default() -> Self {
        Self {
            delegate: Address::ZERO,
            amount: 0,
            active: false,
        }
    }
}

impl<L: TokenLedger> DaoState<L> {
    fn proposal_view(&self, p: &Proposal) -> ProposalView {
        let voters = p
            .voters
            .iter()
            .filter_map(|voter| {
                self.core().vote_record(p.id, voter).map(|r| VoterView {
                    voter: *voter,
                    choice: r.choice,
                    voting_power: r.voting_power,
                })
            })
            .collect();
        ProposalView {
            id: p.id,
            creator: p.creator,
            title: p.title.clone(),
            description: p.description.clone(),
            created_at: p.created_at,
            deadline: p.deadline,
            votes_for: p.votes_for,
            votes_against: p.votes_against,
            status: p.status,
            voters,
        }
    }

    /// Every proposal in id order, with its voters.
    pub fn get_all_proposals(&self) -> Vec<ProposalView> {
        self.core()
            .proposals()
            .map(|p| self.proposal_view(p))
            .collect()
    }

    pub fn get_proposals_by_status(&self, status: ProposalStatus) -> Vec<ProposalView> {
        self.core()
            .proposals()
            .filter(|p| p.status == status)
            .map(|p| self.proposal_view(p))
            .collect()
    }

    pub fn get_user_token_balance(&self, holder: &Address) -> TokenAmount {
        self.ledger().balance_of(holder)
    }

    /// One row per proposal, in id order, zero where nothing is staked.
    pub fn get_user_staking(&self, holder: &Address) -> Vec<StakingView> {
        self.core()
            .proposals()
            .map(|p| StakingView {
                proposal_id: p.id,
                vote_stake: self.vault().vote_stake_of(holder, p.id),
                proposal_stake: self.vault().proposal_stake_of(holder, p.id),
            })
            .collect()
    }

    /// Zeroed when there is no delegation or no registered delegation ledger.
    pub fn get_delegation_info(&self, id: ProposalId, delegator: &Address) -> DelegationInfo {
        self.registered_delegation()
            .and_then(|ledger| ledger.delegation(id, delegator))
            .map(|d| DelegationInfo {
                delegate: d.delegate,
                amount: d.amount,
                active: d.active,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::Dao;
    use crate::genesis::GenesisConfig;
    use dao_ledger::MemoryLedger;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn funded_dao(holders: &[u64]) -> Dao<MemoryLedger> {
        let mut config = GenesisConfig::new(addr(1), Some(addr(2)));
        config.token_decimals = 0;
        config.initial_supply = 100_000;
        let dao = Dao::new(config.build().unwrap());
        let vault = dao.snapshot().vault().address();
        for h in holders {
            dao.buy_tokens(addr(*h), 1_000).unwrap();
            dao.with_token(|t| t.approve(&addr(*h), &vault, 1_000)).unwrap();
        }
        dao
    }

    #[test]
    fn test_all_proposals_list_voters() {
        let dao = funded_dao(&[10, 11, 12]);
        let p1 = dao.create_proposal(addr(10), "one", "first", 20, ts(0)).unwrap();
        let p2 = dao.create_proposal(addr(10), "two", "second", 20, ts(0)).unwrap();
        dao.vote(addr(11), p1, Choice::For, 15, ts(1)).unwrap();
        dao.vote(addr(12), p1, Choice::Against, 12, ts(1)).unwrap();

        let views = dao.snapshot().get_all_proposals();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, p1);
        assert_eq!(views[1].id, p2);
        assert_eq!(views[0].title, "one");
        assert_eq!(
            views[0].voters,
            vec![
                VoterView {
                    voter: addr(11),
                    choice: Choice::For,
                    voting_power: 15
                },
                VoterView {
                    voter: addr(12),
                    choice: Choice::Against,
                    voting_power: 12
                },
            ]
        );
        assert!(views[1].voters.is_empty());
    }

    #[test]
    fn test_filter_by_status() {
        let dao = funded_dao(&[10, 11]);
        let p1 = dao.create_proposal(addr(10), "a", "", 20, ts(0)).unwrap();
        dao.create_proposal(addr(10), "b", "", 20, ts(50_000)).unwrap();
        dao.vote(addr(11), p1, Choice::For, 10, ts(1)).unwrap();
        dao.finalize(p1, ts(86_400)).unwrap();

        let state = dao.snapshot();
        let accepted = state.get_proposals_by_status(ProposalStatus::Accepted);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, p1);
        assert_eq!(state.get_proposals_by_status(ProposalStatus::Active).len(), 1);
        assert!(state.get_proposals_by_status(ProposalStatus::Rejected).is_empty());
    }

    #[test]
    fn test_user_staking_has_row_per_proposal() {
        let dao = funded_dao(&[10, 11]);
        let p1 = dao.create_proposal(addr(10), "a", "", 25, ts(0)).unwrap();
        let p2 = dao.create_proposal(addr(11), "b", "", 20, ts(0)).unwrap();
        dao.vote(addr(10), p2, Choice::For, 30, ts(1)).unwrap();

        let state = dao.snapshot();
        assert_eq!(
            state.get_user_staking(&addr(10)),
            vec![
                StakingView {
                    proposal_id: p1,
                    vote_stake: 0,
                    proposal_stake: 25
                },
                StakingView {
                    proposal_id: p2,
                    vote_stake: 30,
                    proposal_stake: 0
                },
            ]
        );
        assert_eq!(state.get_user_token_balance(&addr(10)), 1_000 - 55);
    }

    #[test]
    fn test_delegation_info_defaults() {
        let dao = funded_dao(&[10, 11]);
        let id = dao.create_proposal(addr(10), "a", "", 20, ts(0)).unwrap();
        assert_eq!(
            dao.snapshot().get_delegation_info(id, &addr(11)),
            DelegationInfo::default()
        );
        dao.delegate_vote(addr(11), id, addr(10), 10, ts(1)).unwrap();
        assert_eq!(
            dao.snapshot().get_delegation_info(id, &addr(11)),
            DelegationInfo {
                delegate: addr(10),
                amount: 10,
                active: true
            }
        );
    }
}
