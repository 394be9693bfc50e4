//! The Governance Core: proposal table, tallies, parameters, and the
//! controller/panic surface.

use crate::delegation::DelegationQuery;
use crate::error::GovernanceError;
use crate::event::DaoEvent;
use crate::proposal::{Proposal, ProposalStatus, VoteRecord};
use crate::voting::voting_power;
use dao_types::{
    Address, Choice, GovernanceParams, ProposalId, Timestamp, TokenAmount, Wei, VotingMode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of the Core handed to the other components.
///
/// The vault, the delegation ledger, and the gateway never hold the Core;
/// they receive this handle for the duration of one call.
pub trait CoreHandle {
    fn core_address(&self) -> Address;

    /// Fails unless a panic controller is set and panic mode is off.
    fn ensure_operational(&self) -> Result<(), GovernanceError>;

    fn controller(&self) -> Address;

    fn params(&self) -> &GovernanceParams;

    fn proposal(&self, id: ProposalId) -> Option<&Proposal>;

    /// Whether `voter` holds a direct vote record on `id`.
    fn has_voted(&self, id: ProposalId, voter: &Address) -> bool;

    fn is_valid_proposal(&self, id: ProposalId) -> bool {
        self.proposal(id).is_some()
    }

    fn proposal_creator(&self, id: ProposalId) -> Option<Address> {
        self.proposal(id).map(|p| p.creator)
    }

    fn lock_time(&self) -> u64 {
        self.params().lock_time
    }

    fn min_vote_stake(&self) -> TokenAmount {
        self.params().min_vote_stake
    }

    fn price(&self) -> Wei {
        self.params().price
    }
}

/// Owns proposals, vote records, parameters, and the panic state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceCore {
    address: Address,
    token: Address,
    controller: Address,
    panic_controller: Option<Address>,
    panicked: bool,
    params: GovernanceParams,
    voting_mode: VotingMode,
    staking: Option<Address>,
    delegation: Option<Address>,
    token_gateway: Option<Address>,
    proposals: BTreeMap<ProposalId, Proposal>,
    vote_records: BTreeMap<ProposalId, BTreeMap<Address, VoteRecord>>,
    next_proposal_id: ProposalId,
}

impl GovernanceCore {
    /// A core with no components registered and no panic controller.
    pub fn new(
        address: Address,
        token: Address,
        controller: Address,
        params: GovernanceParams,
    ) -> Result<Self, GovernanceError> {
        if address.is_zero() || token.is_zero() || controller.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        params.validate()?;
        Ok(Self {
            address,
            token,
            controller,
            panic_controller: None,
            panicked: false,
            params,
            voting_mode: VotingMode::default(),
            staking: None,
            delegation: None,
            token_gateway: None,
            proposals: BTreeMap::new(),
            vote_records: BTreeMap::new(),
            next_proposal_id: 1,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    /// The token contract the DAO was deployed against.
    pub fn token(&self) -> Address {
        self.token
    }

    pub fn controller(&self) -> Address {
        self.controller
    }

    pub fn panic_controller(&self) -> Option<Address> {
        self.panic_controller
    }

    pub fn is_panicked(&self) -> bool {
        self.panicked
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn lock_time(&self) -> u64 {
        self.params.lock_time
    }

    pub fn voting_mode(&self) -> VotingMode {
        self.voting_mode
    }

    pub fn staking_address(&self) -> Option<Address> {
        self.staking
    }

    pub fn delegation_address(&self) -> Option<Address> {
        self.delegation
    }

    pub fn token_gateway_address(&self) -> Option<Address> {
        self.token_gateway
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Every proposal in id order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn next_proposal_id(&self) -> ProposalId {
        self.next_proposal_id
    }

    pub fn is_valid_proposal(&self, id: ProposalId) -> bool {
        self.proposals.contains_key(&id)
    }

    pub fn proposal_creator(&self, id: ProposalId) -> Option<Address> {
        self.proposals.get(&id).map(|p| p.creator)
    }

    pub fn vote_record(&self, id: ProposalId, voter: &Address) -> Option<&VoteRecord> {
        self.vote_records.get(&id).and_then(|records| records.get(voter))
    }

    pub fn has_voted(&self, id: ProposalId, voter: &Address) -> bool {
        self.vote_record(id, voter).is_some()
    }

    // ── Gates ────────────────────────────────────────────────────────────

    pub fn ensure_operational(&self) -> Result<(), GovernanceError> {
        if self.panic_controller.is_none() {
            return Err(GovernanceError::PanicWalletNotSet);
        }
        self.ensure_not_panicked()
    }

    fn ensure_not_panicked(&self) -> Result<(), GovernanceError> {
        if self.panicked {
            return Err(GovernanceError::PanicActive);
        }
        Ok(())
    }

    fn ensure_controller(&self, caller: &Address) -> Result<(), GovernanceError> {
        if *caller != self.controller {
            tracing::warn!(caller = %caller, "rejected controller call");
            return Err(GovernanceError::NotController(*caller));
        }
        Ok(())
    }

    fn ensure_panic_controller(&self, caller: &Address) -> Result<(), GovernanceError> {
        match self.panic_controller {
            None => Err(GovernanceError::PanicWalletNotSet),
            Some(pc) if pc == *caller => Ok(()),
            Some(_) => {
                tracing::warn!(caller = %caller, "rejected panic controller call");
                Err(GovernanceError::NotPanicController(*caller))
            }
        }
    }

    fn open_proposal(&self, id: ProposalId, now: Timestamp) -> Result<&Proposal, GovernanceError> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::InvalidProposal(id))?;
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::ProposalNotActive(id));
        }
        if now >= proposal.deadline {
            return Err(GovernanceError::VotingEnded);
        }
        Ok(proposal)
    }

    // ── Proposals ────────────────────────────────────────────────────────

    /// Record a new proposal. The caller stakes `stake` on it afterwards.
    pub(crate) fn create_proposal(
        &mut self,
        creator: Address,
        title: String,
        description: String,
        stake: TokenAmount,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<ProposalId, GovernanceError> {
        self.ensure_operational()?;
        if stake < self.params.min_proposal_stake {
            return Err(GovernanceError::InsufficientProposalStake {
                have: stake,
                need: self.params.min_proposal_stake,
            });
        }
        let deadline = now
            .checked_add_secs(self.params.voting_period)
            .ok_or(GovernanceError::Overflow)?;
        let id = self.next_proposal_id;
        let next = id.checked_add(1).ok_or(GovernanceError::Overflow)?;

        self.proposals.insert(
            id,
            Proposal::new(id, creator, title, description, now, deadline),
        );
        self.next_proposal_id = next;

        tracing::info!(id, creator = %creator, %deadline, "proposal created");
        events.push(DaoEvent::ProposalCreated { id, creator });
        Ok(id)
    }

    /// Close voting on a proposal whose deadline has passed.
    pub(crate) fn finalize(
        &mut self,
        id: ProposalId,
        now: Timestamp,
        events: &mut Vec<DaoEvent>,
    ) -> Result<ProposalStatus, GovernanceError> {
        self.ensure_operational()?;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::InvalidProposal(id))?;
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::ProposalNotActive(id));
        }
        if now < proposal.deadline {
            return Err(GovernanceError::VotingNotEnded);
        }
        let status = proposal.outcome();
        proposal.status = status;

        tracing::info!(
            id,
            %status,
            votes_for = proposal.votes_for,
            votes_against = proposal.votes_against,
            "proposal finalized"
        );
        events.push(DaoEvent::ProposalFinalized { id, status });
        Ok(status)
    }

    // ── Voting ───────────────────────────────────────────────────────────

    /// Validate a direct vote and return the voting power it would add.
    ///
    /// With a delegation ledger registered, a voter holding an active
    /// delegation on the proposal is refused.
    pub(crate) fn prepare_vote(
        &self,
        voter: &Address,
        id: ProposalId,
        stake: TokenAmount,
        now: Timestamp,
        delegations: Option<&dyn DelegationQuery>,
    ) -> Result<u128, GovernanceError> {
        let vp = self.check_vote(voter, id, stake, now)?;
        if let Some(ledger) = delegations {
            if ledger.has_active_delegation(id, voter) {
                return Err(GovernanceError::AlreadyDelegated(*voter));
            }
        }
        Ok(vp)
    }

    /// Validate a vote cast by the delegation ledger for `voter`.
    pub(crate) fn prepare_vote_on_behalf(
        &self,
        caller: &Address,
        voter: &Address,
        id: ProposalId,
        stake: TokenAmount,
        now: Timestamp,
    ) -> Result<u128, GovernanceError> {
        self.ensure_operational()?;
        if self.delegation != Some(*caller) {
            return Err(GovernanceError::NotDelegationLedger(*caller));
        }
        self.check_vote(voter, id, stake, now)
    }

    fn check_vote(
        &self,
        voter: &Address,
        id: ProposalId,
        stake: TokenAmount,
        now: Timestamp,
    ) -> Result<u128, GovernanceError> {
        self.ensure_operational()?;
        let proposal = self.open_proposal(id, now)?;
        if stake < self.params.min_vote_stake {
            return Err(GovernanceError::InsufficientVoteStake {
                have: stake,
                need: self.params.min_vote_stake,
            });
        }
        if self.has_voted(id, voter) {
            return Err(GovernanceError::AlreadyVoted(*voter));
        }
        let vp = voting_power(stake, self.params.tokens_per_vp, self.voting_mode);
        proposal
            .votes_for
            .max(proposal.votes_against)
            .checked_add(vp)
            .ok_or(GovernanceError::Overflow)?;
        Ok(vp)
    }

    /// Record a vote whose stake is already in the vault.
    pub(crate) fn record_vote(
        &mut self,
        voter: Address,
        id: ProposalId,
        choice: Choice,
        stake: TokenAmount,
        vp: u128,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::InvalidProposal(id))?;
        let tally = match choice {
            Choice::For => &mut proposal.votes_for,
            Choice::Against => &mut proposal.votes_against,
        };
        *tally = tally.checked_add(vp).ok_or(GovernanceError::Overflow)?;
        proposal.voters.push(voter);
        self.vote_records.entry(id).or_default().insert(
            voter,
            VoteRecord {
                stake,
                voting_power: vp,
                choice,
                withdrawn: false,
            },
        );

        tracing::debug!(id, voter = %voter, %choice, vp, stake, "vote recorded");
        events.push(DaoEvent::Voted {
            id,
            voter,
            choice,
            voting_power: vp,
        });
        Ok(())
    }

    /// Roll a vote out of the tally ahead of releasing its stake.
    ///
    /// On an active proposal the recorded power leaves the tally (saturating
    /// at zero), the voter leaves the voter set, and the record is cleared so
    /// the address may vote again. On a finalized proposal the outcome is
    /// frozen and the record is only marked withdrawn: a terminal proposal's
    /// tallies never change, so the power is not rolled back there.
    pub(crate) fn release_vote(
        &mut self,
        voter: &Address,
        id: ProposalId,
    ) -> Result<TokenAmount, GovernanceError> {
        self.ensure_operational()?;
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::InvalidProposal(id))?;
        let Some(records) = self.vote_records.get_mut(&id) else {
            return Err(GovernanceError::DidNotVote(*voter));
        };
        let record = match records.get_mut(voter) {
            Some(record) if !record.withdrawn => record,
            _ => return Err(GovernanceError::DidNotVote(*voter)),
        };
        let stake = record.stake;

        if proposal.status.is_terminal() {
            record.withdrawn = true;
            tracing::debug!(id, voter = %voter, "vote withdrawn after finalization");
            return Ok(stake);
        }

        let tally = match record.choice {
            Choice::For => &mut proposal.votes_for,
            Choice::Against => &mut proposal.votes_against,
        };
        *tally = tally.saturating_sub(record.voting_power);
        proposal.remove_voter(voter);
        records.remove(voter);

        tracing::debug!(id, voter = %voter, "vote removed from tally");
        Ok(stake)
    }

    // ── Controller surface ───────────────────────────────────────────────

    pub(crate) fn update_params(
        &mut self,
        caller: &Address,
        params: GovernanceParams,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        params.validate()?;
        self.params = params.clone();
        tracing::info!(?params, "governance parameters updated");
        events.push(DaoEvent::ParamsUpdated(params));
        Ok(())
    }

    pub(crate) fn change_owner(
        &mut self,
        caller: &Address,
        new_controller: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        if new_controller.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        let previous = std::mem::replace(&mut self.controller, new_controller);
        tracing::info!(%previous, new = %new_controller, "controller changed");
        events.push(DaoEvent::OwnerChanged {
            previous,
            new: new_controller,
        });
        Ok(())
    }

    /// The one controller call allowed before a panic controller exists.
    pub(crate) fn set_panic_wallet(
        &mut self,
        caller: &Address,
        wallet: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_not_panicked()?;
        self.ensure_controller(caller)?;
        if wallet.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        self.panic_controller = Some(wallet);
        tracing::info!(wallet = %wallet, "panic controller set");
        events.push(DaoEvent::PanicWalletSet(wallet));
        Ok(())
    }

    pub(crate) fn set_staking_address(
        &mut self,
        caller: &Address,
        staking: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        if staking.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        self.staking = Some(staking);
        events.push(DaoEvent::StakingChanged(staking));
        Ok(())
    }

    pub(crate) fn set_delegation_contract(
        &mut self,
        caller: &Address,
        delegation: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        if delegation.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        self.delegation = Some(delegation);
        events.push(DaoEvent::DelegationContractChanged(delegation));
        Ok(())
    }

    pub(crate) fn set_token_contract(
        &mut self,
        caller: &Address,
        gateway: Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        if gateway.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        self.token_gateway = Some(gateway);
        events.push(DaoEvent::TokenContractChanged(gateway));
        Ok(())
    }

    pub(crate) fn toggle_voting_mode(
        &mut self,
        caller: &Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<VotingMode, GovernanceError> {
        self.ensure_operational()?;
        self.ensure_controller(caller)?;
        self.voting_mode = self.voting_mode.toggled();
        tracing::info!(mode = %self.voting_mode, "voting mode toggled");
        events.push(DaoEvent::VotingModeToggled(self.voting_mode));
        Ok(self.voting_mode)
    }

    // ── Panic surface ────────────────────────────────────────────────────

    pub(crate) fn panic(
        &mut self,
        caller: &Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        if self.panic_controller.is_none() {
            return Err(GovernanceError::PanicWalletNotSet);
        }
        self.ensure_not_panicked()?;
        self.ensure_panic_controller(caller)?;
        self.panicked = true;
        tracing::warn!(caller = %caller, "panic mode engaged");
        events.push(DaoEvent::PanicTriggered);
        Ok(())
    }

    /// Leave panic mode. Calling it outside panic mode changes nothing.
    pub(crate) fn tranquility(
        &mut self,
        caller: &Address,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        self.ensure_panic_controller(caller)?;
        if !self.panicked {
            return Ok(());
        }
        self.panicked = false;
        tracing::info!(caller = %caller, "panic mode released");
        events.push(DaoEvent::TranquilityRestored);
        Ok(())
    }

    /// Wire components at genesis, bypassing the controller surface.
    pub(crate) fn register(
        &mut self,
        panic_controller: Option<Address>,
        staking: Address,
        delegation: Address,
        token_gateway: Address,
    ) {
        self.panic_controller = panic_controller;
        self.staking = Some(staking);
        self.delegation = Some(delegation);
        self.token_gateway = Some(token_gateway);
    }
}

impl CoreHandle for GovernanceCore {
    fn core_address(&self) -> Address {
        self.address
    }

    fn ensure_operational(&self) -> Result<(), GovernanceError> {
        GovernanceCore::ensure_operational(self)
    }

    fn controller(&self) -> Address {
        self.controller
    }

    fn params(&self) -> &GovernanceParams {
        &self.params
    }

    fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    fn has_voted(&self, id: ProposalId, voter: &Address) -> bool {
        GovernanceCore::has_voted(self, id, voter)
    }
}
