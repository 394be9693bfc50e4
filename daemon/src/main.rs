//! DAO daemon: applies one governance command to the persisted snapshot.

mod config;
mod store;

use anyhow::Context;
use clap::Parser;
use config::DaemonConfig;
use dao_governance::{Dao, DaoEvent, GovernanceError, ProposalStatus, StakingView};
use dao_ledger::{MemoryLedger, TokenLedger};
use dao_types::{
    Address, Choice, GovernanceParams, ProposalId, Timestamp, TokenAmount, VotingMode, Wei,
};
use dao_utils::{format_remaining, LogFormat};
use serde::Serialize;
use std::path::PathBuf;
use store::{Snapshot, SnapshotStore};

#[derive(Parser)]
#[command(name = "dao-daemon", about = "Token-weighted DAO governance daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; flags
    /// and env vars override them.
    #[arg(long, env = "DAO_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the DAO snapshot.
    #[arg(long, env = "DAO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DAO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DAO_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Current time in Unix seconds (defaults to the system clock).
    #[arg(long, env = "DAO_NOW")]
    now: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create the genesis state from config and save it.
    Init {
        /// Overwrite an existing snapshot.
        #[arg(long)]
        force: bool,
    },
    /// Print parameters, flags, and counters.
    Status,
    /// List proposals with their voters.
    Proposals {
        #[arg(long)]
        status: Option<ProposalStatus>,
    },
    /// Token balance and per-proposal stakes of an address.
    Staking {
        #[arg(long)]
        address: Address,
    },
    /// Delegation granted by an address on a proposal.
    Delegation {
        #[arg(long)]
        id: ProposalId,
        #[arg(long)]
        address: Address,
    },
    /// Buy tokens from the gateway.
    Buy {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        wei: Wei,
    },
    /// Allow the stake vault to pull tokens.
    Approve {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        amount: TokenAmount,
    },
    Propose {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        stake: TokenAmount,
    },
    Vote {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
        #[arg(long)]
        choice: Choice,
        #[arg(long)]
        stake: TokenAmount,
    },
    Delegate {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: TokenAmount,
    },
    /// Cast a vote on behalf of a delegator.
    VoteDelegated {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
        #[arg(long)]
        delegator: Address,
        #[arg(long)]
        choice: Choice,
    },
    Revoke {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
    },
    Finalize {
        #[arg(long)]
        id: ProposalId,
    },
    UnstakeVote {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
    },
    UnstakeProposal {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        id: ProposalId,
    },
    Panic {
        #[arg(long)]
        from: Address,
    },
    Tranquility {
        #[arg(long)]
        from: Address,
    },
    ToggleMode {
        #[arg(long)]
        from: Address,
    },
    Mint {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        amount: TokenAmount,
    },
    SetPanicWallet {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        wallet: Address,
    },
    /// Point the core at a different stake vault.
    SetStakingAddress {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        vault: Address,
    },
    /// Point the core at a different delegation ledger.
    SetDelegationContract {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        delegation: Address,
    },
    /// Point the core at a different token gateway.
    SetTokenContract {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        gateway: Address,
    },
    ChangeOwner {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
    },
    /// Replace the governance parameters; omitted values keep their current setting.
    UpdateParams {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        price: Option<Wei>,
        #[arg(long)]
        min_vote_stake: Option<TokenAmount>,
        #[arg(long)]
        min_proposal_stake: Option<TokenAmount>,
        #[arg(long)]
        voting_period: Option<u64>,
        #[arg(long)]
        tokens_per_vp: Option<TokenAmount>,
        #[arg(long)]
        lock_time: Option<u64>,
    },
}

/// Result of a mutating command, printed as a JSON object.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum Outcome {
    Done { ok: bool },
    Purchased { tokens: TokenAmount },
    Approved { spender: Address, allowance: TokenAmount },
    Created { id: ProposalId },
    Voted { voting_power: u128 },
    Finalized { status: ProposalStatus },
    Returned { returned: TokenAmount },
    ModeToggled { voting_mode: VotingMode },
    ParamsUpdated { params: GovernanceParams },
}

const DONE: Outcome = Outcome::Done { ok: true };

#[derive(Debug, Serialize)]
struct OpenProposal {
    id: ProposalId,
    title: String,
    closes: String,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    taken_at: Timestamp,
    controller: Address,
    panic_controller: Option<Address>,
    panicked: bool,
    voting_mode: VotingMode,
    params: GovernanceParams,
    proposal_count: u64,
    next_proposal_id: ProposalId,
    open_proposals: Vec<OpenProposal>,
    token_supply: TokenAmount,
    gateway_available: TokenAmount,
    gateway_wei: Wei,
    vault_custody: TokenAmount,
}

#[derive(Debug, Serialize)]
struct StakingReport {
    address: Address,
    balance: TokenAmount,
    stakes: Vec<StakingView>,
}

fn render<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    dao_utils::init_logging(config.log_format, &config.log_level);

    let now = cli.now.map(Timestamp::new).unwrap_or_else(Timestamp::now);
    let store = SnapshotStore::new(config.snapshot_path());

    let output = match cli.command {
        Command::Init { force } => render(&init(&config, &store, force, now)?)?,
        Command::Status => render(&status(&store.load()?, now))?,
        Command::Proposals { status } => {
            let state = store.load()?.state;
            let views = match status {
                Some(status) => state.get_proposals_by_status(status),
                None => state.get_all_proposals(),
            };
            render(&views)?
        }
        Command::Staking { address } => {
            let state = store.load()?.state;
            render(&StakingReport {
                address,
                balance: state.get_user_token_balance(&address),
                stakes: state.get_user_staking(&address),
            })?
        }
        Command::Delegation { id, address } => {
            render(&store.load()?.state.get_delegation_info(id, &address))?
        }
        command => render(&transact(&store, command, now)?)?,
    };

    println!("{output}");
    Ok(())
}

fn init(
    config: &DaemonConfig,
    store: &SnapshotStore,
    force: bool,
    now: Timestamp,
) -> anyhow::Result<StatusReport> {
    if store.exists() && !force {
        anyhow::bail!(
            "snapshot {} already exists (pass --force to overwrite)",
            store.path().display()
        );
    }
    let state = config.genesis().build().context("building genesis state")?;
    let snapshot = Snapshot::new(state, now);
    store.save(&snapshot)?;
    tracing::info!(path = %store.path().display(), "genesis snapshot written");
    Ok(status(&snapshot, now))
}

fn status(snapshot: &Snapshot, now: Timestamp) -> StatusReport {
    let state = &snapshot.state;
    let core = state.core();
    StatusReport {
        taken_at: snapshot.taken_at,
        controller: core.controller(),
        panic_controller: core.panic_controller(),
        panicked: core.is_panicked(),
        voting_mode: core.voting_mode(),
        params: core.params().clone(),
        proposal_count: core.proposal_count(),
        next_proposal_id: core.next_proposal_id(),
        open_proposals: core
            .proposals()
            .filter(|p| p.is_open(now))
            .map(|p| OpenProposal {
                id: p.id,
                title: p.title.clone(),
                closes: format_remaining(now, p.deadline),
            })
            .collect(),
        token_supply: state.ledger().total_supply(),
        gateway_available: state.gateway().available(state.ledger()),
        gateway_wei: state.gateway().wei_balance(),
        vault_custody: state.vault().custody_balance(),
    }
}

/// Apply one mutating command and save the result. The snapshot on disk is
/// only replaced when the command succeeds.
fn transact(store: &SnapshotStore, command: Command, now: Timestamp) -> anyhow::Result<Outcome> {
    let mut dao = Dao::new(store.load()?.state);
    dao.subscribe(Box::new(|event: &DaoEvent| match serde_json::to_string(event) {
        Ok(json) => tracing::info!(event = %json, "dao event"),
        Err(err) => tracing::warn!(%err, "unserializable dao event"),
    }));

    let outcome = apply(&dao, command, now).map_err(|err| {
        tracing::warn!(%err, "command rejected");
        err
    })?;

    store.save(&Snapshot::new(dao.into_state(), now))?;
    Ok(outcome)
}

fn apply(dao: &Dao<MemoryLedger>, command: Command, now: Timestamp) -> Result<Outcome, GovernanceError> {
    let outcome = match command {
        Command::Buy { from, wei } => Outcome::Purchased {
            tokens: dao.buy_tokens(from, wei)?,
        },
        Command::Approve { from, amount } => {
            let vault = dao.snapshot().vault().address();
            dao.with_token(|t| t.approve(&from, &vault, amount))?;
            Outcome::Approved {
                spender: vault,
                allowance: amount,
            }
        }
        Command::Propose {
            from,
            title,
            description,
            stake,
        } => Outcome::Created {
            id: dao.create_proposal(from, title, description, stake, now)?,
        },
        Command::Vote {
            from,
            id,
            choice,
            stake,
        } => Outcome::Voted {
            voting_power: dao.vote(from, id, choice, stake, now)?,
        },
        Command::Delegate {
            from,
            id,
            to,
            amount,
        } => {
            dao.delegate_vote(from, id, to, amount, now)?;
            DONE
        }
        Command::VoteDelegated {
            from,
            id,
            delegator,
            choice,
        } => Outcome::Voted {
            voting_power: dao.vote_with_delegation(from, id, delegator, choice, now)?,
        },
        Command::Revoke { from, id } => {
            dao.revoke_delegation(from, id, now)?;
            DONE
        }
        Command::Finalize { id } => Outcome::Finalized {
            status: dao.finalize(id, now)?,
        },
        Command::UnstakeVote { from, id } => Outcome::Returned {
            returned: dao.unstake_vote(from, id, now)?,
        },
        Command::UnstakeProposal { from, id } => Outcome::Returned {
            returned: dao.unstake_proposal(from, id, now)?,
        },
        Command::Panic { from } => {
            dao.panic(from)?;
            DONE
        }
        Command::Tranquility { from } => {
            dao.tranquility(from)?;
            DONE
        }
        Command::ToggleMode { from } => Outcome::ModeToggled {
            voting_mode: dao.toggle_voting_mode(from)?,
        },
        Command::Mint { from, amount } => {
            dao.mint(from, amount)?;
            DONE
        }
        Command::SetPanicWallet { from, wallet } => {
            dao.set_panic_wallet(from, wallet)?;
            DONE
        }
        Command::SetStakingAddress { from, vault } => {
            dao.set_staking_address(from, vault)?;
            DONE
        }
        Command::SetDelegationContract { from, delegation } => {
            dao.set_delegation_contract(from, delegation)?;
            DONE
        }
        Command::SetTokenContract { from, gateway } => {
            dao.set_token_contract(from, gateway)?;
            DONE
        }
        Command::ChangeOwner { from, to } => {
            dao.change_owner(from, to)?;
            DONE
        }
        Command::UpdateParams {
            from,
            price,
            min_vote_stake,
            min_proposal_stake,
            voting_period,
            tokens_per_vp,
            lock_time,
        } => {
            let current = dao.snapshot().core().params().clone();
            let params = GovernanceParams {
                price: price.unwrap_or(current.price),
                min_vote_stake: min_vote_stake.unwrap_or(current.min_vote_stake),
                min_proposal_stake: min_proposal_stake.unwrap_or(current.min_proposal_stake),
                voting_period: voting_period.unwrap_or(current.voting_period),
                tokens_per_vp: tokens_per_vp.unwrap_or(current.tokens_per_vp),
                lock_time: lock_time.unwrap_or(current.lock_time),
            };
            dao.update_params(from, params.clone())?;
            Outcome::ParamsUpdated { params }
        }
        // Read-only commands never reach here.
        Command::Init { .. }
        | Command::Status
        | Command::Proposals { .. }
        | Command::Staking { .. }
        | Command::Delegation { .. } => DONE,
    };
    Ok(outcome)
}
