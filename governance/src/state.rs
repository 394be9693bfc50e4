//! The composed DAO state and the cross-component operations.
//!
//! Each operation routes through the components the way the deployed system
//! would: the Core validates and records, the vault moves custody, the
//! delegation ledger tracks authorisations. An operation that fails midway
//! may leave this value partially updated; [`Dao`](crate::Dao) applies every
//! operation to a private copy and publishes it only on success.

use crate::delegation::{DelegationLedger, DelegationQuery};
use crate::engine::GovernanceCore;
use crate::error::GovernanceError;
use crate::event::DaoEvent;
use crate::gateway::TokenGateway;
use crate::proposal::ProposalStatus;
use crate::vault::StakeVault;
use dao_ledger::TokenLedger;
use dao_types::{Address, Choice, GovernanceParams, ProposalId, Timestamp, TokenAmount, VotingMode, Wei};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoState<L> {
    core: GovernanceCore,
    vault: StakeVault,
    delegation: DelegationLedger,
    gateway: TokenGateway,
    ledger: L,
}

impl<L: TokenLedger> DaoState<L> {
    /// Assemble already-constructed components. Nothing is registered with
    /// the core beyond what `core` already carries.
    pub fn from_parts(
        core: GovernanceCore,
        vault: StakeVault,
        delegation: DelegationLedger,
        gateway: TokenGateway,
        ledger: L,
    ) -> Self {
        Self {
            core,
            vault,
            delegation,
            gateway,
            ledger,
        }
    }

    pub fn core(&self) -> &GovernanceCore {
        &self.core
    }

    pub fn vault(&self) -> &StakeVault {
        &self.vault
    }

    pub fn delegation(&self) -> &DelegationLedger {
        &self.delegation
    }

    pub fn gateway(&self) -> &TokenGateway {
        &self.gateway
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    // ── Wiring checks ────────────────────────────────────────────────────

    fn ensure_staking(&self) -> Result<(), GovernanceError> {
        if self.core.staking_address() != Some(self.vault.address())
            || self.vault.core() != self.core.address()
        {
            return Err(GovernanceError::ComponentNotRegistered("staking vault"));
        }
        Ok(())
    }

    fn ensure_delegation(&self) -> Result<(), GovernanceError> {
        if self.core.delegation_address() != Some(self.delegation.address())
            || self.delegation.core() != self.core.address()
        {
            return Err(GovernanceError::ComponentNotRegistered("delegation ledger"));
        }
        Ok(())
    }

    fn ensure_gateway(&self) -> Result<(), GovernanceError> {
        if self.core.token_gateway_address() != Some(self.gateway.address())
            || self.gateway.core() != self.core.address()
        {
            return Err(GovernanceError::ComponentNotRegistered("token gateway"));
        }
        Ok(())
    }

    /// The delegation ledger, if the core currently recognises it.
    pub fn registered_delegation(&self) -> Option<&DelegationLedger> {
        self.ensure_delegation().ok().map(|_| &self.delegation)
    }

    // ── Gateway ──────────────────────────────────────────────────────────

    pub(crate) fn buy_tokens(
        &mut self,
        buyer: Address,
        wei: Wei,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_gateway()?;
        self.gateway
            .buy_tokens(&buyer, wei, &self.core, &mut self.ledger, events)
    }

    pub(crate) fn mint(
        &mut self,
        caller: Address,
        amount: TokenAmount,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_gateway()?;
        self.gateway
            .mint(&caller, amount, &self.core, &mut self.ledger, events)
    }

    // ── Proposals and votes ──────────────────────────────────────────────

    pub(crate) fn create_proposal(
        &mut self,
        creator: Address,
        title: String,
        description: String,
        stake: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<ProposalId, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_staking()?;
        let id = self
            .core
            .create_proposal(creator, title, description, stake, now, events)?;
        let core_address = self.core.address();
        self.vault.stake_proposal(
            &core_address,
            &self.core,
            &mut self.ledger,
            &creator,
            id,
            stake,
            now,
            events,
        )?;
        Ok(id)
    }

    pub(crate) fn vote(
        &mut self,
        voter: Address,
        id: ProposalId,
        choice: Choice,
        stake: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<u128, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_staking()?;
        let delegations = self
            .registered_delegation()
            .map(|d| d as &dyn DelegationQuery);
        let vp = self.core.prepare_vote(&voter, id, stake, now, delegations)?;
        self.cast(voter, id, choice, stake, vp, now, events)?;
        Ok(vp)
    }

    /// Stake then record; shared by direct and delegated votes.
    #[allow(clippy::too_many_arguments)]
    fn cast(
        &mut self,
        voter: Address,
        id: ProposalId,
        choice: Choice,
        stake: TokenAmount,
        vp: u128,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        let core_address = self.core.address();
        self.vault.stake_vote(
            &core_address,
            &self.core,
            &mut self.ledger,
            &voter,
            id,
            stake,
            now,
            events,
        )?;
        self.core.record_vote(voter, id, choice, stake, vp, events)
    }

    pub(crate) fn unstake_vote(
        &mut self,
        voter: Address,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_staking()?;
        self.core.release_vote(&voter, id)?;
        let core_address = self.core.address();
        self.vault.unstake_vote(
            &core_address,
            &self.core,
            &mut self.ledger,
            &voter,
            id,
            now,
            events,
        )
    }

    pub(crate) fn unstake_proposal(
        &mut self,
        creator: Address,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_staking()?;
        if !self.core.is_valid_proposal(id) {
            return Err(GovernanceError::InvalidProposal(id));
        }
        let core_address = self.core.address();
        self.vault.unstake_proposal(
            &core_address,
            &self.core,
            &mut self.ledger,
            &creator,
            id,
            now,
            events,
        )
    }

    pub(crate) fn finalize(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<ProposalStatus, GovernanceError> {
        self.core.finalize(id, now, events)
    }

    // ── Delegation ───────────────────────────────────────────────────────

    pub(crate) fn delegate_vote(
        &mut self,
        delegator: Address,
        id: ProposalId,
        delegate: Address,
        amount: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_delegation()?;
        self.delegation.delegate_vote(
            delegator,
            id,
            delegate,
            amount,
            now,
            &self.core,
            &self.ledger,
            events,
        )
    }

    /// Cast `delegator`'s delegated vote. The vote, its stake, and the later
    /// unstake all belong to the delegator.
    pub(crate) fn vote_with_delegation(
        &mut self,
        delegate: Address,
        id: ProposalId,
        delegator: Address,
        choice: Choice,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<u128, GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_delegation()?;
        self.ensure_staking()?;
        let amount = self
            .delegation
            .prepare_delegated_vote(&delegate, id, &delegator, &self.core)?;
        let vp = self.core.prepare_vote_on_behalf(
            &self.delegation.address(),
            &delegator,
            id,
            amount,
            now,
        )?;
        self.cast(delegator, id, choice, amount, vp, now, events)?;
        self.delegation.consume(id, &delegator)?;
        tracing::debug!(id, delegate = %delegate, delegator = %delegator, "delegation spent");
        Ok(vp)
    }

    pub(crate) fn revoke_delegation(
        &mut self,
        delegator: Address,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.ensure_operational()?;
        self.ensure_delegation()?;
        self.delegation
            .revoke_delegation(&delegator, id, now, &self.core, events)
    }

    // ── Controller and panic surface ─────────────────────────────────────

    pub(crate) fn update_params(
        &mut self,
        caller: Address,
        params: GovernanceParams,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.update_params(&caller, params, events)
    }

    pub(crate) fn change_owner(
        &mut self,
        caller: Address,
        new_controller: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.change_owner(&caller, new_controller, events)
    }

    pub(crate) fn set_panic_wallet(
        &mut self,
        caller: Address,
        wallet: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.set_panic_wallet(&caller, wallet, events)
    }

    pub(crate) fn set_staking_address(
        &mut self,
        caller: Address,
        staking: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.set_staking_address(&caller, staking, events)
    }

    pub(crate) fn set_delegation_contract(
        &mut self,
        caller: Address,
        delegation: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.set_delegation_contract(&caller, delegation, events)
    }

    pub(crate) fn set_token_contract(
        &mut self,
        caller: Address,
        gateway: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.set_token_contract(&caller, gateway, events)
    }

    pub(crate) fn toggle_voting_mode(
        &mut self,
        caller: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<VotingMode, GovernanceError> {
        self.core.toggle_voting_mode(&caller, events)
    }

    pub(crate) fn panic(
        &mut self,
        caller: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.panic(&caller, events)
    }

    pub(crate) fn tranquility(
        &mut self,
        caller: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.core.tranquility(&caller, events)
    }
}
