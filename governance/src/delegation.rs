//! The Delegation Ledger: single-use, per-proposal vote delegations.
//!
//! A delegation authorises one delegate to cast one vote of a fixed size on
//! one proposal, funded by the delegator. No tokens move when a delegation is
//! created or revoked; they move only when the delegate votes.

use crate::engine::CoreHandle;
use crate::error::GovernanceError;
use crate::event::DaoEvent;
use crate::proposal::ProposalStatus;
use dao_ledger::TokenLedger;
use dao_types::{Address, ProposalId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lets the Core ask whether a voter has handed their vote away.
pub trait DelegationQuery {
    fn has_active_delegation(&self, id: ProposalId, delegator: &Address) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegate: Address,
    pub amount: TokenAmount,
    /// Cleared exactly once, when the delegate votes or the delegator revokes.
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationLedger {
    address: Address,
    core: Address,
    delegations: BTreeMap<(ProposalId, Address), Delegation>,
}

impl DelegationLedger {
    pub fn new(address: Address, core: Address) -> Result<Self, GovernanceError> {
        if address.is_zero() || core.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        Ok(Self {
            address,
            core,
            delegations: BTreeMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn core(&self) -> Address {
        self.core
    }

    pub fn delegation(&self, id: ProposalId, delegator: &Address) -> Option<&Delegation> {
        self.delegations.get(&(id, *delegator))
    }

    /// `(delegate, amount, active)`, or `(ZERO, 0, false)` when none exists.
    pub fn delegation_info(&self, id: ProposalId, delegator: &Address) -> (Address, TokenAmount, bool) {
        self.delegation(id, delegator)
            .map_or((Address::ZERO, 0, false), |d| (d.delegate, d.amount, d.active))
    }

    /// Every delegation on `id`, in delegator order.
    pub fn delegations_on(&self, id: ProposalId) -> impl Iterator<Item = (&Address, &Delegation)> {
        self.delegations
            .range((id, Address::ZERO)..)
            .take_while(move |((pid, _), _)| *pid == id)
            .map(|((_, delegator), d)| (delegator, d))
    }

    /// Authorise `delegate` to cast one vote of `amount` for `delegator`.
    #[allow(clippy::too_many_arguments)]
    pub fn delegate_vote(
        &mut self,
        delegator: Address,
        id: ProposalId,
        delegate: Address,
        amount: TokenAmount,
        now: Timestamp,
        core: &dyn CoreHandle,
        ledger: &dyn TokenLedger,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        core.ensure_operational()?;
        if delegate.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        if delegate == delegator {
            return Err(GovernanceError::SelfDelegation);
        }
        let need = core.min_vote_stake();
        if amount < need {
            return Err(GovernanceError::InsufficientDelegationAmount { have: amount, need });
        }
        let proposal = core
            .proposal(id)
            .ok_or(GovernanceError::InvalidProposal(id))?;
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::ProposalNotActive(id));
        }
        if now >= proposal.deadline {
            return Err(GovernanceError::VotingEnded);
        }
        if core.has_voted(id, &delegator) {
            return Err(GovernanceError::AlreadyVoted(delegator));
        }
        if self.delegations.contains_key(&(id, delegator)) {
            return Err(GovernanceError::AlreadyDelegated(delegator));
        }
        let have = ledger.balance_of(&delegator);
        if have < amount {
            return Err(GovernanceError::InsufficientBalance { have, need: amount });
        }

        self.delegations.insert(
            (id, delegator),
            Delegation {
                delegate,
                amount,
                active: true,
            },
        );
        tracing::debug!(id, from = %delegator, to = %delegate, amount, "vote delegated");
        events.push(DaoEvent::VoteDelegated {
            id,
            from: delegator,
            to: delegate,
            amount,
        });
        Ok(())
    }

    /// Check that `caller` may spend `delegator`'s delegation on `id` and
    /// return the delegated amount. The delegation stays active until
    /// [`consume`](Self::consume) is called after the vote lands.
    pub fn prepare_delegated_vote(
        &self,
        caller: &Address,
        id: ProposalId,
        delegator: &Address,
        core: &dyn CoreHandle,
    ) -> Result<TokenAmount, GovernanceError> {
        core.ensure_operational()?;
        let delegation = self
            .delegation(id, delegator)
            .ok_or(GovernanceError::NoDelegation(*delegator))?;
        if !delegation.active {
            return Err(GovernanceError::DelegationNotActive);
        }
        if delegation.delegate != *caller {
            return Err(GovernanceError::NotDelegate(*caller));
        }
        match core.proposal(id) {
            Some(p) if p.status == ProposalStatus::Active => {}
            _ => return Err(GovernanceError::ProposalNotActive(id)),
        }
        if core.has_voted(id, caller) {
            return Err(GovernanceError::DelegateAlreadyVoted);
        }
        Ok(delegation.amount)
    }

    /// Mark a delegation spent once its vote has been recorded.
    pub(crate) fn consume(&mut self, id: ProposalId, delegator: &Address) -> Result<(), GovernanceError> {
        let delegation = self
            .delegations
            .get_mut(&(id, *delegator))
            .ok_or(GovernanceError::NoDelegation(*delegator))?;
        if !delegation.active {
            return Err(GovernanceError::DelegationNotActive);
        }
        delegation.active = false;
        Ok(())
    }

    pub fn revoke_delegation(
        &mut self,
        delegator: &Address,
        id: ProposalId,
        now: Timestamp,
        core: &dyn CoreHandle,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        core.ensure_operational()?;
        let delegation = self
            .delegations
            .get_mut(&(id, *delegator))
            .ok_or(GovernanceError::NoDelegation(*delegator))?;
        if !delegation.active {
            return Err(GovernanceError::DelegationNotActive);
        }
        if core.has_voted(id, &delegation.delegate) {
            return Err(GovernanceError::DelegateAlreadyVoted);
        }
        match core.proposal(id) {
            Some(p) if p.status != ProposalStatus::Active => {
                return Err(GovernanceError::ProposalNotActive(id))
            }
            Some(p) if now >= p.deadline => return Err(GovernanceError::VotingEnded),
            Some(_) => {}
            None => return Err(GovernanceError::InvalidProposal(id)),
        }

        delegation.active = false;
        let delegate = delegation.delegate;
        tracing::debug!(id, from = %delegator, to = %delegate, "delegation revoked");
        events.push(DaoEvent::VoteDelegationRevoked {
            id,
            from: *delegator,
            to: delegate,
        });
        Ok(())
    }
}

impl DelegationQuery for DelegationLedger {
    fn has_active_delegation(&self, id: ProposalId, delegator: &Address) -> bool {
        self.delegation(id, delegator).is_some_and(|d| d.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GovernanceCore;
    use dao_ledger::MemoryLedger;
    use dao_types::{Choice, GovernanceParams};

    fn wallet(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    const ALICE: u64 = 20;
    const BOB: u64 = 21;
    const CAROL: u64 = 22;

    fn setup() -> (GovernanceCore, DelegationLedger, MemoryLedger) {
        let mut core =
            GovernanceCore::new(wallet(1), wallet(2), wallet(900), GovernanceParams::dev_defaults())
                .unwrap();
        core.register(Some(wallet(901)), wallet(3), wallet(4), wallet(5));
        core.create_proposal(wallet(10), "t".into(), "d".into(), 20, ts(0), &mut Vec::new())
            .unwrap();
        let mut tokens = MemoryLedger::new(wallet(99), 0);
        for who in [ALICE, BOB, CAROL] {
            tokens.mint(&wallet(99), &wallet(who), 100).unwrap();
        }
        (core, DelegationLedger::new(wallet(4), wallet(1)).unwrap(), tokens)
    }

    fn delegate(
        ledger: &mut DelegationLedger,
        core: &GovernanceCore,
        tokens: &MemoryLedger,
        from: u64,
        to: u64,
        amount: TokenAmount,
    ) -> Result<(), GovernanceError> {
        ledger.delegate_vote(wallet(from), 1, wallet(to), amount, ts(10), core, tokens, &mut Vec::new())
    }

    fn vote_directly(core: &mut GovernanceCore, who: u64) {
        let vp = core.prepare_vote(&wallet(who), 1, 10, ts(10), None).unwrap();
        core.record_vote(wallet(who), 1, Choice::For, 10, vp, &mut Vec::new())
            .unwrap();
    }

    // ── Creation ─────────────────────────────────────────────────────────

    #[test]
    fn test_delegate_records_active_delegation() {
        let (core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        assert_eq!(ledger.delegation_info(1, &wallet(ALICE)), (wallet(BOB), 10, true));
        assert!(ledger.has_active_delegation(1, &wallet(ALICE)));
        // No tokens move.
        assert_eq!(tokens.balance_of(&wallet(ALICE)), 100);
    }

    #[test]
    fn test_delegate_validation_order() {
        let (core, mut ledger, tokens) = setup();
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, 0, 10).unwrap_err(),
            GovernanceError::InvalidAddress
        );
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, ALICE, 10).unwrap_err(),
            GovernanceError::SelfDelegation
        );
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, BOB, 9).unwrap_err(),
            GovernanceError::InsufficientDelegationAmount { have: 9, need: 10 }
        );
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, BOB, 101).unwrap_err(),
            GovernanceError::InsufficientBalance { have: 100, need: 101 }
        );
        let err = ledger
            .delegate_vote(wallet(ALICE), 7, wallet(BOB), 10, ts(10), &core, &tokens, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err, GovernanceError::InvalidProposal(7));
    }

    #[test]
    fn test_delegate_only_once_per_proposal() {
        let (core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, CAROL, 10).unwrap_err(),
            GovernanceError::AlreadyDelegated(wallet(ALICE))
        );
    }

    #[test]
    fn test_delegate_after_direct_vote_fails() {
        let (mut core, mut ledger, tokens) = setup();
        vote_directly(&mut core, ALICE);
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap_err(),
            GovernanceError::AlreadyVoted(wallet(ALICE))
        );
    }

    #[test]
    fn test_delegate_after_deadline_fails() {
        let (core, mut ledger, tokens) = setup();
        let err = ledger
            .delegate_vote(wallet(ALICE), 1, wallet(BOB), 10, ts(86_400), &core, &tokens, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err, GovernanceError::VotingEnded);
    }

    // ── Voting with a delegation ─────────────────────────────────────────

    #[test]
    fn test_prepare_checks_delegate_identity() {
        let (core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        assert_eq!(
            ledger
                .prepare_delegated_vote(&wallet(CAROL), 1, &wallet(ALICE), &core)
                .unwrap_err(),
            GovernanceError::NotDelegate(wallet(CAROL))
        );
        assert_eq!(
            ledger
                .prepare_delegated_vote(&wallet(BOB), 1, &wallet(CAROL), &core)
                .unwrap_err(),
            GovernanceError::NoDelegation(wallet(CAROL))
        );
        assert_eq!(
            ledger
                .prepare_delegated_vote(&wallet(BOB), 1, &wallet(ALICE), &core)
                .unwrap(),
            10
        );
    }

    #[test]
    fn test_consumed_delegation_cannot_be_reused() {
        let (core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        ledger.consume(1, &wallet(ALICE)).unwrap();
        assert_eq!(
            ledger
                .prepare_delegated_vote(&wallet(BOB), 1, &wallet(ALICE), &core)
                .unwrap_err(),
            GovernanceError::DelegationNotActive
        );
        assert!(!ledger.has_active_delegation(1, &wallet(ALICE)));
    }

    #[test]
    fn test_delegate_with_own_vote_cannot_vote_again() {
        let (mut core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        vote_directly(&mut core, BOB);
        assert_eq!(
            ledger
                .prepare_delegated_vote(&wallet(BOB), 1, &wallet(ALICE), &core)
                .unwrap_err(),
            GovernanceError::DelegateAlreadyVoted
        );
    }

    // ── Revocation ───────────────────────────────────────────────────────

    #[test]
    fn test_revoke_deactivates_once() {
        let (core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        let mut events = Vec::new();
        ledger
            .revoke_delegation(&wallet(ALICE), 1, ts(20), &core, &mut events)
            .unwrap();
        assert_eq!(ledger.delegation_info(1, &wallet(ALICE)), (wallet(BOB), 10, false));
        assert_eq!(
            events,
            vec![DaoEvent::VoteDelegationRevoked {
                id: 1,
                from: wallet(ALICE),
                to: wallet(BOB)
            }]
        );
        assert_eq!(
            ledger
                .revoke_delegation(&wallet(ALICE), 1, ts(20), &core, &mut Vec::new())
                .unwrap_err(),
            GovernanceError::DelegationNotActive
        );
        // Revoked is still "delegated" for the once-per-proposal rule.
        assert_eq!(
            delegate(&mut ledger, &core, &tokens, ALICE, CAROL, 10).unwrap_err(),
            GovernanceError::AlreadyDelegated(wallet(ALICE))
        );
    }

    #[test]
    fn test_revoke_without_delegation_fails() {
        let (core, mut ledger, _) = setup();
        assert_eq!(
            ledger
                .revoke_delegation(&wallet(ALICE), 1, ts(20), &core, &mut Vec::new())
                .unwrap_err(),
            GovernanceError::NoDelegation(wallet(ALICE))
        );
    }

    #[test]
    fn test_revoke_after_delegate_voted_fails() {
        let (mut core, mut ledger, tokens) = setup();
        delegate(&mut ledger, &core, &tokens, ALICE, BOB, 10).unwrap();
        vote_directly(&mut core, BOB);
        assert_eq!(
            ledger
                .revoke_delegation(&wallet(ALICE), 1, ts(20), &core, &mut Vec::new())
                .unwrap_err(),
            GovernanceError::DelegateAlreadyVoted
        );
        assert!(ledger.has_active_delegation(1, &wallet(ALICE)));
    }

    #[test]
    fn test_info_defaults_when_absent() {
        let (_, ledger, _) = setup();
        assert_eq!(ledger.delegation_info(1, &wallet(ALICE)), (Address::ZERO, 0, false));
        assert_eq!(ledger.delegations_on(1).count(), 0);
    }
}
