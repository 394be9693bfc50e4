//! Daemon configuration with TOML file support.

use anyhow::Context;
use dao_governance::{Components, GenesisConfig};
use dao_types::{Address, GovernanceParams, TokenAmount, Wei};
use dao_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the DAO daemon.
///
/// The genesis fields (`controller` through `components`) are only read by
/// `init`; every other command works from the saved snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Directory holding `dao.snapshot`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Base units minted into the gateway at genesis.
    #[serde(default, with = "amount")]
    pub initial_supply: TokenAmount,

    #[serde(default = "default_controller")]
    pub controller: Address,

    /// Mutators stay disabled until this is set (here or via `set-panic-wallet`).
    #[serde(default)]
    pub panic_controller: Option<Address>,

    #[serde(default)]
    pub params: ParamsConfig,

    #[serde(default)]
    pub components: Components,
}

/// The `[params]` table. Missing keys keep their development default.
///
/// Amounts accept a TOML integer or, past `i64::MAX`, a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsConfig {
    #[serde(with = "amount")]
    pub price: Wei,
    #[serde(with = "amount")]
    pub min_vote_stake: TokenAmount,
    #[serde(with = "amount")]
    pub min_proposal_stake: TokenAmount,
    pub voting_period: u64,
    #[serde(with = "amount")]
    pub tokens_per_vp: TokenAmount,
    pub lock_time: u64,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        GovernanceParams::dev_defaults().into()
    }
}

impl From<GovernanceParams> for ParamsConfig {
    fn from(p: GovernanceParams) -> Self {
        Self {
            price: p.price,
            min_vote_stake: p.min_vote_stake,
            min_proposal_stake: p.min_proposal_stake,
            voting_period: p.voting_period,
            tokens_per_vp: p.tokens_per_vp,
            lock_time: p.lock_time,
        }
    }
}

impl From<ParamsConfig> for GovernanceParams {
    fn from(p: ParamsConfig) -> Self {
        Self {
            price: p.price,
            min_vote_stake: p.min_vote_stake,
            min_proposal_stake: p.min_proposal_stake,
            voting_period: p.voting_period,
            tokens_per_vp: p.tokens_per_vp,
            lock_time: p.lock_time,
        }
    }
}

/// `u128` amounts in TOML, which only has 64-bit integers. Written back as
/// decimal strings.
mod amount {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dao_data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_decimals() -> u8 {
    18
}

fn default_controller() -> Address {
    Address::from_low_u64(0xC0)
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("dao.snapshot")
    }

    pub fn genesis(&self) -> GenesisConfig {
        let mut genesis = GenesisConfig::new(self.controller, self.panic_controller);
        genesis.params = self.params.clone().into();
        genesis.token_decimals = self.token_decimals;
        genesis.initial_supply = self.initial_supply;
        genesis.components = self.components;
        genesis
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            token_decimals: default_token_decimals(),
            initial_supply: 0,
            controller: default_controller(),
            panic_controller: None,
            params: ParamsConfig::default(),
            components: Components::default(),
        }
    }
}
