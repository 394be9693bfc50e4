//! The Token Gateway: sole seller and sole minting surface of the DAO token.

use crate::engine::CoreHandle;
use crate::error::GovernanceError;
use crate::event::DaoEvent;
use dao_ledger::TokenLedger;
use dao_types::amount::unit;
use dao_types::{Address, TokenAmount, Wei};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGateway {
    address: Address,
    core: Address,
    /// Wei received from every sale so far.
    wei_balance: Wei,
}

impl TokenGateway {
    pub fn new(address: Address, core: Address) -> Result<Self, GovernanceError> {
        if address.is_zero() || core.is_zero() {
            return Err(GovernanceError::InvalidAddress);
        }
        Ok(Self {
            address,
            core,
            wei_balance: 0,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn core(&self) -> Address {
        self.core
    }

    pub fn wei_balance(&self) -> Wei {
        self.wei_balance
    }

    /// Tokens left to sell.
    pub fn available(&self, ledger: &dyn TokenLedger) -> TokenAmount {
        ledger.balance_of(&self.address)
    }

    /// Base units bought by `wei` at `price` wei per whole token.
    ///
    /// The product `wei * 10^decimals` is taken at full width; only a quotient
    /// that does not fit a `TokenAmount` is an overflow.
    pub fn quote(wei: Wei, price: Wei, decimals: u8) -> Result<TokenAmount, GovernanceError> {
        if price == 0 {
            return Err(GovernanceError::Overflow);
        }
        let base = unit(decimals).ok_or(GovernanceError::Overflow)?;
        let tokens = BigUint::from(wei) * BigUint::from(base) / BigUint::from(price);
        TokenAmount::try_from(tokens).map_err(|_| GovernanceError::Overflow)
    }

    /// Sell `floor(wei * 10^decimals / price)` base units to `buyer`.
    pub fn buy_tokens(
        &mut self,
        buyer: &Address,
        wei: Wei,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        events: &mut Vec<DaoEvent>,
    ) -> Result<TokenAmount, GovernanceError> {
        core.ensure_operational()?;
        if wei == 0 {
            return Err(GovernanceError::NoFunds);
        }
        let tokens = Self::quote(wei, core.price(), ledger.decimals())?;
        if tokens == 0 {
            return Err(GovernanceError::TooLittle);
        }
        let have = self.available(ledger);
        if have < tokens {
            return Err(GovernanceError::Exhausted { have, need: tokens });
        }
        let wei_balance = self
            .wei_balance
            .checked_add(wei)
            .ok_or(GovernanceError::Overflow)?;

        ledger.transfer(&self.address, buyer, tokens)?;
        self.wei_balance = wei_balance;

        tracing::debug!(buyer = %buyer, wei, tokens, "tokens sold");
        events.push(DaoEvent::TokensPurchased {
            buyer: *buyer,
            wei,
            tokens,
        });
        Ok(tokens)
    }

    /// Create `amount` new base units into the gateway's own balance.
    pub fn mint(
        &mut self,
        caller: &Address,
        amount: TokenAmount,
        core: &dyn CoreHandle,
        ledger: &mut dyn TokenLedger,
        events: &mut Vec<DaoEvent>,
    ) -> Result<(), GovernanceError> {
        core.ensure_operational()?;
        if *caller != core.controller() {
            tracing::warn!(caller = %caller, "rejected mint");
            return Err(GovernanceError::NotController(*caller));
        }
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }
        ledger.mint(&self.address, &self.address, amount)?;

        tracing::info!(amount, supply = ledger.total_supply(), "tokens minted");
        events.push(DaoEvent::TokensMinted(amount));
        Ok(())
    }
}
