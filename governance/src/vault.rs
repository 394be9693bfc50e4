//! The Stake Vault: token custody for vote and proposal stakes.
//!
//! Only the Governance Core instructs the vault. Every call carries the
//! caller's address and is refused unless it is the configured core.

use crate::engine::CoreHandle;
use crate::error::GovernanceError;
use crate::event::DaoEvent;
use dao_ledger::TokenLedger;
use dao_types::{Address, ProposalId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a stake was placed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StakeKind {
    /// Staked alongside a direct or delegated vote.
    Vote,
    /// Staked by a creator on their own proposal.
    Proposal,
}

/// Custodied amount and lock for one (holder, proposal, kind).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub amount: TokenAmount,
    pub unlock_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
struct StakeKey {
    holder: Address,
    id: ProposalId,
    kind: StakeKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeVault {
    address: Address,
    core: Address,
    entries: BTreeMap<StakeKey, StakeEntry>,
}

impl StakeVault {
    pub fn new(address: Address, core: Address) -> Result<Self, GovernanceError> {
        if address.is_zero() || core.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        Ok(Self {
            address,
            core,
            entries: BTreeMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The only address allowed to move stakes.
    pub fn core(&self) -> Address {
        self.core
    }

    pub fn entry(&self, holder: &Address, id: ProposalId, kind: StakeKind) -> Option<&StakeEntry> {
        self.entries.get(&StakeKey {
            holder: *holder,
            id,
            kind,
        })
    }

    pub fn vote_stake_of(&self, holder: &Address, id: ProposalId) -> TokenAmount {
        self.entry(holder, id, StakeKind::Vote)
            .map_or(0, |e| e.amount)
    }

    pub fn vote_unlock_time_of(&self, holder: &Address, id: ProposalId) -> Timestamp {
        self.entry(holder, id, StakeKind::Vote)
            .map_or(Timestamp::EPOCH, |e| e.unlock_at)
    }

    pub fn proposal_stake_of(&self, holder: &Address, id: ProposalId) -> TokenAmount {
        self.entry(holder, id, StakeKind::Proposal)
            .map_or(0, |e| e.amount)
    }

    pub fn proposal_unlock_time_of(&self, holder: &Address, id: ProposalId) -> Timestamp {
        self.entry(holder, id, StakeKind::Proposal)
            .map_or(Timestamp::EPOCH, |e| e.unlock_at)
    }

    /// Total held in custody across every entry.
    pub fn custody_balance(&self) -> TokenAmount {
        self.entries
            .values()
            .fold(0, |total: TokenAmount, e| total.saturating_add(e.amount))
    }

    /// Every non-empty stake held for `holder`, in (proposal, kind) order.
    pub fn stakes_of<'a>(
        &'a self,
        holder: &'a Address,
    ) -> impl Iterator<Item = (ProposalId, StakeKind, &'a StakeEntry)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.holder == *holder)
            .map(|(key, entry)| (key.id, key.kind, entry))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stake_vote(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        holder: &Address,
        id: ProposalId,
        amount: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<StakeEntry, GovernanceError> {
        let entry = self.stake(caller, core, ledger, StakeKind::Vote, holder, id, amount, now)?;
        events.push(DaoEvent::VoteStaked {
            holder: *holder,
            id,
            amount,
            unlock_at: entry.unlock_at,
        });
        Ok(entry)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stake_proposal(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        holder: &Address,
        id: ProposalId,
        amount: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<StakeEntry, GovernanceError> {
        let entry = self.stake(caller, core, ledger, StakeKind::Proposal, holder, id, amount, now)?;
        events.push(DaoEvent::ProposalStaked {
            holder: *holder,
            id,
            amount,
            unlock_at: entry.unlock_at,
        });
        Ok(entry)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn unstake_vote(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        holder: &Address,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        let amount = self.unstake(caller, core, ledger, StakeKind::Vote, holder, id, now)?;
        events.push(DaoEvent::VoteUnstaked {
            holder: *holder,
            id,
            amount,
        });
        Ok(amount)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn unstake_proposal(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        holder: &Address,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        let amount = self.unstake(caller, core, ledger, StakeKind::Proposal, holder, id, now)?;
        events.push(DaoEvent::ProposalUnstaked {
            holder: *holder,
            id,
            amount,
        });
        Ok(amount)
    }

    fn ensure_core(&self, caller: &Address) -> Result<(), GovernanceError> {
        if *caller != self.core {
            tracing::warn!(caller = %caller, "stake vault call from non-core address");
            return Err(GovernanceError::NotCore(*caller));
        }
        Ok(())
    }

    fn ensure_creator(
        core: &dyn CoreHandle,
        holder: &Address,
        id: ProposalId,
    ) -> Result<(), GovernanceError> {
        match core.proposal_creator(id) {
            None => Err(GovernanceError::InvalidProposal(id)),
            Some(creator) if creator == *holder => Ok(()),
            Some(_) => Err(GovernanceError::NotCreator),
        }
    }

    /// Pull `amount` from `holder` into custody.
    ///
    /// The lock becomes `max(existing, now + lock_time)`, so adding to a stake
    /// never shortens it.
    #[allow(clippy::too_many_arguments)]
    fn stake(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        kind: StakeKind,
        holder: &Address,
        id: ProposalId,
        amount: TokenAmount,
        now: Timestamp,
    ) -> Result<StakeEntry, GovernanceError> {
        self.ensure_core(caller)?;
        if !core.is_valid_proposal(id) {
            return Err(GovernanceError::InvalidProposal(id));
        }
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }
        if kind == StakeKind::Proposal {
            Self::ensure_creator(core, holder, id)?;
        }

        let key = StakeKey {
            holder: *holder,
            id,
            kind,
        };
        let current = self.entries.get(&key).copied().unwrap_or_default();
        let fresh_lock = now
            .checked_add_secs(core.lock_time())
            .ok_or(GovernanceError::Overflow)?;
        let updated = StakeEntry {
            amount: current
                .amount
                .checked_add(amount)
                .ok_or(GovernanceError::Overflow)?,
            unlock_at: current.unlock_at.max(fresh_lock),
        };

        ledger.transfer_from(&self.address, holder, &self.address, amount)?;
        self.entries.insert(key, updated);

        tracing::debug!(
            holder = %holder,
            id,
            ?kind,
            amount,
            unlock_at = %updated.unlock_at,
            "stake taken into custody"
        );
        Ok(updated)
    }

    /// Return the whole entry to `holder` once its lock has passed.
    #[allow(clippy::too_many_arguments)]
    fn unstake(
        &mut self,
        caller: &Address,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        kind: StakeKind,
        holder: &Address,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<TokenAmount, GovernanceError> {
        self.ensure_core(caller)?;
        if kind == StakeKind::Proposal {
            Self::ensure_creator(core, holder, id)?;
        }

        let key = StakeKey {
            holder: *holder,
            id,
            kind,
        };
        let entry = match self.entries.get(&key) {
            Some(entry) if entry.amount > 0 => *entry,
            _ => return Err(GovernanceError::NoStake),
        };
        if now < entry.unlock_at {
            return Err(GovernanceError::Locked {
                unlock_at: entry.unlock_at,
            });
        }

        ledger.transfer(&self.address, holder, entry.amount)?;
        self.entries.remove(&key);

        tracing::debug!(holder = %holder, id, ?kind, amount = entry.amount, "stake released");
        Ok(entry.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GovernanceCore;
    use dao_ledger::{LedgerError, MemoryLedger};
    use dao_types::GovernanceParams;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    const CORE: u64 = 1;
    const VAULT: u64 = 3;
    const CREATOR: u64 = 10;
    const HOLDER: u64 = 20;

    struct Fixture {
        core: GovernanceCore,
        vault: StakeVault,
        ledger: MemoryLedger,
    }

    fn fixture() -> Fixture {
        let mut core =
            GovernanceCore::new(addr(CORE), addr(2), addr(900), GovernanceParams::dev_defaults())
                .unwrap();
        core.register(Some(addr(901)), addr(VAULT), addr(4), addr(5));
        core.create_proposal(addr(CREATOR), "t".into(), "d".into(), 20, ts(0), &mut Vec::new())
            .unwrap();

        let mut ledger = MemoryLedger::new(addr(99), 0);
        for holder in [CREATOR, HOLDER] {
            ledger.mint(&addr(99), &addr(holder), 1_000).unwrap();
            ledger.approve(&addr(holder), &addr(VAULT), 1_000).unwrap();
        }
        Fixture {
            core,
            vault: StakeVault::new(addr(VAULT), addr(CORE)).unwrap(),
            ledger,
        }
    }

    impl Fixture {
        fn stake_vote(&mut self, amount: TokenAmount, now: u64) -> Result<StakeEntry, GovernanceError> {
            self.vault.stake_vote(
                &addr(CORE),
                &self.core,
                &mut self.ledger,
                &addr(HOLDER),
                1,
                amount,
                ts(now),
                &mut Vec::new(),
            )
        }

        fn unstake_vote(&mut self, now: u64) -> Result<TokenAmount, GovernanceError> {
            self.vault.unstake_vote(
                &addr(CORE),
                &self.core,
                &mut self.ledger,
                &addr(HOLDER),
                1,
                ts(now),
                &mut Vec::new(),
            )
        }
    }

    // ── Staking ──────────────────────────────────────────────────────────

    #[test]
    fn test_stake_moves_tokens_into_custody() {
        let mut f = fixture();
        let entry = f.stake_vote(50, 100).unwrap();
        assert_eq!(entry.amount, 50);
        assert_eq!(entry.unlock_at, ts(100 + 3_600));
        assert_eq!(f.ledger.balance_of(&addr(HOLDER)), 950);
        assert_eq!(f.ledger.balance_of(&addr(VAULT)), 50);
        assert_eq!(f.vault.vote_stake_of(&addr(HOLDER), 1), 50);
        assert_eq!(f.vault.custody_balance(), 50);
    }

    #[test]
    fn test_stake_only_from_core() {
        let mut f = fixture();
        let err = f
            .vault
            .stake_vote(
                &addr(HOLDER),
                &f.core,
                &mut f.ledger,
                &addr(HOLDER),
                1,
                50,
                ts(0),
                &mut Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err, GovernanceError::NotCore(addr(HOLDER)));
        assert_eq!(f.ledger.balance_of(&addr(VAULT)), 0);
    }

    #[test]
    fn test_stake_rejects_zero_and_unknown_proposal() {
        let mut f = fixture();
        assert_eq!(f.stake_vote(0, 0).unwrap_err(), GovernanceError::InvalidAmount);
        let err = f
            .vault
            .stake_vote(
                &addr(CORE),
                &f.core,
                &mut f.ledger,
                &addr(HOLDER),
                42,
                10,
                ts(0),
                &mut Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err, GovernanceError::InvalidProposal(42));
    }

    #[test]
    fn test_restake_keeps_longer_lock() {
        let mut f = fixture();
        f.stake_vote(10, 5_000).unwrap();
        // An earlier clock cannot pull the lock back.
        let entry = f.stake_vote(10, 1_000).unwrap();
        assert_eq!(entry.amount, 20);
        assert_eq!(entry.unlock_at, ts(5_000 + 3_600));

        let entry = f.stake_vote(5, 6_000).unwrap();
        assert_eq!(entry.unlock_at, ts(6_000 + 3_600));
    }

    #[test]
    fn test_refused_transfer_leaves_no_entry() {
        let mut f = fixture();
        f.ledger.set_paused(true);
        let err = f.stake_vote(10, 0).unwrap_err();
        assert_eq!(err, GovernanceError::TransferFailed(LedgerError::Paused));
        assert!(f.vault.entry(&addr(HOLDER), 1, StakeKind::Vote).is_none());
    }

    #[test]
    fn test_proposal_stake_only_by_creator() {
        let mut f = fixture();
        let err = f
            .vault
            .stake_proposal(
                &addr(CORE),
                &f.core,
                &mut f.ledger,
                &addr(HOLDER),
                1,
                20,
                ts(0),
                &mut Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err, GovernanceError::NotCreator);

        f.vault
            .stake_proposal(
                &addr(CORE),
                &f.core,
                &mut f.ledger,
                &addr(CREATOR),
                1,
                20,
                ts(0),
                &mut Vec::new(),
            )
            .unwrap();
        assert_eq!(f.vault.proposal_stake_of(&addr(CREATOR), 1), 20);
        assert_eq!(f.vault.proposal_unlock_time_of(&addr(CREATOR), 1), ts(3_600));
    }

    // ── Unstaking ────────────────────────────────────────────────────────

    #[test]
    fn test_unstake_respects_lock() {
        let mut f = fixture();
        f.stake_vote(40, 0).unwrap();
        assert_eq!(
            f.unstake_vote(3_599).unwrap_err(),
            GovernanceError::Locked {
                unlock_at: ts(3_600)
            }
        );
        assert_eq!(f.unstake_vote(3_600).unwrap(), 40);
        assert_eq!(f.ledger.balance_of(&addr(HOLDER)), 1_000);
        assert_eq!(f.vault.custody_balance(), 0);
        assert_eq!(f.vault.vote_unlock_time_of(&addr(HOLDER), 1), Timestamp::EPOCH);
    }

    #[test]
    fn test_unstake_without_stake_fails() {
        let mut f = fixture();
        assert_eq!(f.unstake_vote(0).unwrap_err(), GovernanceError::NoStake);
    }

    #[test]
    fn test_unstake_proposal_by_other_fails() {
        let mut f = fixture();
        let err = f
            .vault
            .unstake_proposal(
                &addr(CORE),
                &f.core,
                &mut f.ledger,
                &addr(HOLDER),
                1,
                ts(10_000),
                &mut Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err, GovernanceError::NotCreator);
    }
}
