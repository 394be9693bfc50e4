//! The transactional DAO handle.
//!
//! A single writer at a time: each mutation clones the committed state,
//! applies the operation to the clone, and publishes it only when the
//! operation succeeds. Readers take an `Arc` of the last committed state
//! and never see a half-applied operation.

use crate::error::GovernanceError;
use crate::event::{DaoEvent, EventBus, Listener};
use crate::proposal::ProposalStatus;
use crate::state::DaoState;
use dao_ledger::{LedgerError, TokenLedger};
use dao_types::{Address, Choice, GovernanceParams, ProposalId, Timestamp, TokenAmount, VotingMode, Wei};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub struct Dao<L> {
    committed: RwLock<Arc<DaoState<L>>>,
    writer: Mutex<()>,
    bus: EventBus,
}

impl<L: TokenLedger + Clone> Dao<L> {
    pub fn new(state: DaoState<L>) -> Self {
        Self {
            committed: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            bus: EventBus::new(),
        }
    }

    /// Register a listener for events of committed operations.
    pub fn subscribe(&mut self, listener: Listener) {
        self.bus.subscribe(listener);
    }

    /// The last committed state.
    pub fn snapshot(&self) -> Arc<DaoState<L>> {
        // Published states are immutable, so a poisoned lock still guards a
        // consistent value.
        let guard = self
            .committed
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Unwrap the committed state.
    pub fn into_state(self) -> DaoState<L> {
        let committed = self
            .committed
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::try_unwrap(committed).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Run `op` against a private copy and publish it on success.
    fn transact<T>(
        &self,
        op: impl FnOnce(&mut DaoState<L>, &mut Vec<DaoEvent>) -> Result<T, GovernanceError>,
    ) -> Result<T, GovernanceError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut draft = (*self.snapshot()).clone();
        let mut events = Vec::new();

        let out = op(&mut draft, &mut events)?;

        *self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(draft);
        for event in &events {
            self.bus.emit(event);
        }
        Ok(out)
    }

    /// Apply a direct token operation (approve, transfer, pause...) to the
    /// ledger the DAO runs on. Not subject to the governance panic gate.
    pub fn with_token<T>(
        &self,
        op: impl FnOnce(&mut L) -> Result<T, LedgerError>,
    ) -> Result<T, GovernanceError> {
        self.transact(|state, _| Ok(op(state.ledger_mut())?))
    }

    // ── Token Gateway ────────────────────────────────────────────────────

    pub fn buy_tokens(&self, buyer: Address, wei: Wei) -> Result<TokenAmount, GovernanceError> {
        self.transact(|s, ev| s.buy_tokens(buyer, wei, ev))
    }

    pub fn mint(&self, caller: Address, amount: TokenAmount) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.mint(caller, amount, ev))
    }

    // ── Governance Core ──────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        creator: Address,
        title: impl Into<String>,
        description: impl Into<String>,
        stake: TokenAmount,
        now: Timestamp,
    ) -> Result<ProposalId, GovernanceError> {
        let (title, description) = (title.into(), description.into());
        self.transact(|s, ev| s.create_proposal(creator, title, description, stake, now, ev))
    }

    /// Returns the voting power added to the tally.
    pub fn vote(
        &self,
        voter: Address,
        id: ProposalId,
        choice: Choice,
        stake: TokenAmount,
        now: Timestamp,
    ) -> Result<u128, GovernanceError> {
        self.transact(|s, ev| s.vote(voter, id, choice, stake, now, ev))
    }

    /// Returns the stake handed back to `voter`.
    pub fn unstake_vote(
        &self,
        voter: Address,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<TokenAmount, GovernanceError> {
        self.transact(|s, ev| s.unstake_vote(voter, id, now, ev))
    }

    pub fn unstake_proposal(
        &self,
        creator: Address,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<TokenAmount, GovernanceError> {
        self.transact(|s, ev| s.unstake_proposal(creator, id, now, ev))
    }

    pub fn finalize(&self, id: ProposalId, now: Timestamp) -> Result<ProposalStatus, GovernanceError> {
        self.transact(|s, ev| s.finalize(id, now, ev))
    }

    // ── Delegation Ledger ────────────────────────────────────────────────

    pub fn delegate_vote(
        &self,
        delegator: Address,
        id: ProposalId,
        delegate: Address,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.delegate_vote(delegator, id, delegate, amount, now, ev))
    }

    pub fn vote_with_delegation(
        &self,
        delegate: Address,
        id: ProposalId,
        delegator: Address,
        choice: Choice,
        now: Timestamp,
    ) -> Result<u128, GovernanceError> {
        self.transact(|s, ev| s.vote_with_delegation(delegate, id, delegator, choice, now, ev))
    }

    pub fn revoke_delegation(
        &self,
        delegator: Address,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.revoke_delegation(delegator, id, now, ev))
    }

    // ── Controller ───────────────────────────────────────────────────────

    pub fn update_params(
        &self,
        caller: Address,
        params: GovernanceParams,
    ) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.update_params(caller, params, ev))
    }

    pub fn change_owner(&self, caller: Address, new_controller: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.change_owner(caller, new_controller, ev))
    }

    pub fn set_panic_wallet(&self, caller: Address, wallet: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.set_panic_wallet(caller, wallet, ev))
    }

    pub fn set_staking_address(&self, caller: Address, staking: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.set_staking_address(caller, staking, ev))
    }

    pub fn set_delegation_contract(
        &self,
        caller: Address,
        delegation: Address,
    ) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.set_delegation_contract(caller, delegation, ev))
    }

    pub fn set_token_contract(&self, caller: Address, gateway: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.set_token_contract(caller, gateway, ev))
    }

    pub fn toggle_voting_mode(&self, caller: Address) -> Result<VotingMode, GovernanceError> {
        self.transact(|s, ev| s.toggle_voting_mode(caller, ev))
    }

    // ── Panic controller ─────────────────────────────────────────────────

    pub fn panic(&self, caller: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.panic(caller, ev))
    }

    pub fn tranquility(&self, caller: Address) -> Result<(), GovernanceError> {
        self.transact(|s, ev| s.tranquility(caller, ev))
    }
}

impl<L> std::fmt::Debug for Dao<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao").field("bus", &self.bus).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisConfig;
    use dao_ledger::MemoryLedger;
    use std::sync::Mutex as StdMutex;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn dao() -> Dao<MemoryLedger> {
        let mut config = GenesisConfig::new(addr(1), Some(addr(2)));
        config.token_decimals = 0;
        config.initial_supply = 10_000;
        let dao = Dao::new(config.build().unwrap());
        let vault = dao.snapshot().vault().address();
        dao.buy_tokens(addr(10), 500).unwrap();
        dao.with_token(|t| t.approve(&addr(10), &vault, 500)).unwrap();
        dao
    }

    #[test]
    fn test_failed_operation_leaves_state_untouched() {
        let dao = dao();
        let id = dao.create_proposal(addr(10), "t", "d", 20, ts(0)).unwrap();
        let before = dao.snapshot();

        dao.with_token(|t| {
            t.set_paused(true);
            Ok(())
        })
        .unwrap();
        let paused = dao.snapshot();
        let err = dao.vote(addr(10), id, Choice::For, 10, ts(5)).unwrap_err();
        assert_eq!(err, GovernanceError::TransferFailed(LedgerError::Paused));

        let after = dao.snapshot();
        assert!(Arc::ptr_eq(&paused, &after));
        assert!(!after.core().has_voted(id, &addr(10)));
        assert_eq!(after.core().proposal(id), before.core().proposal(id));
    }

    #[test]
    fn test_events_only_after_commit() {
        let mut dao = dao();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dao.subscribe(Box::new(move |e: &DaoEvent| sink.lock().unwrap().push(e.clone())));

        assert!(dao.create_proposal(addr(10), "t", "d", 5, ts(0)).is_err());
        assert!(seen.lock().unwrap().is_empty());

        let id = dao.create_proposal(addr(10), "t", "d", 20, ts(0)).unwrap();
        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events[0],
            DaoEvent::ProposalCreated {
                id,
                creator: addr(10)
            }
        );
        assert!(matches!(events[1], DaoEvent::ProposalStaked { amount: 20, .. }));
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let dao = dao();
        let old = dao.snapshot();
        dao.create_proposal(addr(10), "t", "d", 20, ts(0)).unwrap();
        assert_eq!(old.core().proposal_count(), 0);
        assert_eq!(dao.snapshot().core().proposal_count(), 1);
    }

    #[test]
    fn test_concurrent_writers_serialize() {
        let dao = Arc::new(dao());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dao = Arc::clone(&dao);
                std::thread::spawn(move || dao.buy_tokens(addr(100 + i), 10).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let state = dao.snapshot();
        assert_eq!(state.gateway().wei_balance(), 500 + 80);
        assert_eq!(state.gateway().available(state.ledger()), 10_000 - 580);
    }
}
