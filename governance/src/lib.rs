//! Token-weighted DAO governance.
//!
//! Four cooperating components share one state:
//! - **Token Gateway**: sells the governance token for wei and mints new supply.
//! - **Stake Vault**: custodies vote and proposal stakes behind time locks.
//! - **Governance Core**: proposals, tallies, parameters, and the panic switch.
//! - **Delegation Ledger**: single-use, per-proposal vote delegations.
//!
//! Components refer to each other by [`Address`](dao_types::Address) and are
//! handed a [`CoreHandle`] or [`DelegationQuery`] for the span of one call.
//! The [`Dao`] handle serializes writers and commits each operation atomically.

pub mod dao;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod genesis;
pub mod proposal;
pub mod snapshot;
pub mod state;
pub mod vault;
pub mod views;
pub mod voting;

pub use dao::Dao;
pub use delegation::{Delegation, DelegationLedger, DelegationQuery};
pub use engine::{CoreHandle, GovernanceCore};
pub use error::GovernanceError;
pub use event::{DaoEvent, EventBus, Listener};
pub use gateway::TokenGateway;
pub use genesis::{Components, GenesisConfig};
pub use proposal::{Proposal, ProposalStatus, VoteRecord};
pub use snapshot::{DaoSnapshot, SNAPSHOT_VERSION};
pub use state::DaoState;
pub use vault::{StakeEntry, StakeKind, StakeVault};
pub use views::{DelegationInfo, ProposalView, StakingView, VoterView};
pub use voting::{isqrt, voting_power};
