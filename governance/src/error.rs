use dao_ledger::LedgerError;
use dao_types::{Address, ProposalId, Timestamp, TypesError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    // ── Authorization ────────────────────────────────────────────────────
    #[error("caller {0} is not the controller")]
    NotController(Address),

    #[error("caller {0} is not the panic controller")]
    NotPanicController(Address),

    #[error("only the proposal creator can stake or unstake on it")]
    NotCreator,

    #[error("caller {0} is not the delegate")]
    NotDelegate(Address),

    #[error("stake vault: caller {0} is not the governance core")]
    NotCore(Address),

    #[error("caller {0} is not the registered delegation ledger")]
    NotDelegationLedger(Address),

    // ── State gates ──────────────────────────────────────────────────────
    #[error("panic mode active")]
    PanicActive,

    #[error("panic wallet not set")]
    PanicWalletNotSet,

    #[error("proposal {0} is not active")]
    ProposalNotActive(ProposalId),

    #[error("voting period ended")]
    VotingEnded,

    #[error("voting period not ended")]
    VotingNotEnded,

    #[error("stake locked until {unlock_at}")]
    Locked { unlock_at: Timestamp },

    // ── Preconditions ────────────────────────────────────────────────────
    #[error("insufficient proposal stake: need {need}, have {have}")]
    InsufficientProposalStake { have: u128, need: u128 },

    #[error("insufficient voting stake: need {need}, have {have}")]
    InsufficientVoteStake { have: u128, need: u128 },

    #[error("insufficient delegation amount: need {need}, have {have}")]
    InsufficientDelegationAmount { have: u128, need: u128 },

    #[error("insufficient token balance: need {need}, have {have}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("invalid proposal {0}")]
    InvalidProposal(ProposalId),

    #[error("invalid address")]
    InvalidAddress,

    #[error("{0} already voted on this proposal")]
    AlreadyVoted(Address),

    #[error("{0} already delegated on this proposal")]
    AlreadyDelegated(Address),

    #[error("delegate already voted")]
    DelegateAlreadyVoted,

    #[error("delegation not active")]
    DelegationNotActive,

    #[error("no delegation from {0} on this proposal")]
    NoDelegation(Address),

    #[error("cannot delegate to yourself")]
    SelfDelegation,

    #[error("no stake to release")]
    NoStake,

    #[error("{0} did not vote on this proposal")]
    DidNotVote(Address),

    #[error("{0} is not registered with the governance core")]
    ComponentNotRegistered(&'static str),

    // ── Token gateway ────────────────────────────────────────────────────
    #[error("no funds sent")]
    NoFunds,

    #[error("too little paid to buy a single base unit")]
    TooLittle,

    #[error("not enough tokens in the gateway: need {need}, have {have}")]
    Exhausted { have: u128, need: u128 },

    // ── Arithmetic ───────────────────────────────────────────────────────
    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] TypesError),

    #[error("arithmetic overflow")]
    Overflow,

    // ── Custody ──────────────────────────────────────────────────────────
    #[error("token transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    // ── Persistence ──────────────────────────────────────────────────────
    #[error("snapshot error: {0}")]
    Snapshot(String),
}
