//! Genesis: deploy and wire a fresh DAO.
//!
//! Mirrors a deployment script: construct every component, register the
//! vault, delegation ledger, and gateway with the core, optionally set the
//! panic controller, and mint the initial token supply into the gateway.

use crate::engine::GovernanceCore;
use crate::delegation::DelegationLedger;
use crate::error::GovernanceError;
use crate::gateway::TokenGateway;
use crate::state::DaoState;
use crate::vault::StakeVault;
use dao_ledger::{MemoryLedger, TokenLedger};
use dao_types::{Address, GovernanceParams, TokenAmount, DEFAULT_DECIMALS};
use serde::{Deserialize, Serialize};

/// Addresses of the deployed components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Components {
    pub core: Address,
    pub vault: Address,
    pub delegation: Address,
    pub gateway: Address,
    pub token: Address,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            core: Address::from_low_u64(0xDA0_0001),
            vault: Address::from_low_u64(0xDA0_0002),
            delegation: Address::from_low_u64(0xDA0_0003),
            gateway: Address::from_low_u64(0xDA0_0004),
            token: Address::from_low_u64(0xDA0_0005),
        }
    }
}

/// Configuration for creating a DAO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisConfig {
    pub controller: Address,
    /// Left unset, every mutator fails until the controller sets one.
    pub panic_controller: Option<Address>,
    pub params: GovernanceParams,
    pub token_decimals: u8,
    /// Base units minted into the gateway at genesis.
    pub initial_supply: TokenAmount,
    pub components: Components,
}

impl GenesisConfig {
    pub fn new(controller: Address, panic_controller: Option<Address>) -> Self {
        Self {
            controller,
            panic_controller,
            params: GovernanceParams::dev_defaults(),
            token_decimals: DEFAULT_DECIMALS,
            initial_supply: 0,
            components: Components::default(),
        }
    }

    /// Deploy against a fresh in-memory token whose minter is the gateway.
    pub fn build(&self) -> Result<DaoState<MemoryLedger>, GovernanceError> {
        let ledger = MemoryLedger::new(self.components.gateway, self.token_decimals);
        self.build_with(ledger)
    }

    /// Deploy against an existing token ledger. The initial supply is minted
    /// with the gateway as minter.
    pub fn build_with<L: TokenLedger>(&self, mut ledger: L) -> Result<DaoState<L>, GovernanceError> {
        let c = &self.components;
        if let Some(pc) = self.panic_controller {
            if pc.is_zero() {
                return Err(GovernanceError::InvalidAddress);
            }
        }
        let mut core = GovernanceCore::new(c.core, c.token, self.controller, self.params.clone())?;
        let vault = StakeVault::new(c.vault, c.core)?;
        let delegation = DelegationLedger::new(c.delegation, c.core)?;
        let gateway = TokenGateway::new(c.gateway, c.core)?;
        core.register(self.panic_controller, c.vault, c.delegation, c.gateway);

        if self.initial_supply > 0 {
            ledger.mint(&c.gateway, &c.gateway, self.initial_supply)?;
        }

        tracing::info!(
            controller = %self.controller,
            panic_controller = ?self.panic_controller.map(|a| a.to_string()),
            supply = self.initial_supply,
            "dao genesis"
        );
        Ok(DaoState::from_parts(core, vault, delegation, gateway, ledger))
    }
}
