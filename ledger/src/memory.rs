//! In-process token ledger.

use crate::error::LedgerError;
use crate::ledger::TokenLedger;
use dao_types::{Address, TokenAmount, DEFAULT_DECIMALS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ERC-20 style ledger held entirely in memory.
///
/// Maps are ordered so that serialized snapshots are byte-for-byte
/// deterministic for identical state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    decimals: u8,
    minter: Address,
    total_supply: TokenAmount,
    balances: BTreeMap<Address, TokenAmount>,
    allowances: BTreeMap<Address, BTreeMap<Address, TokenAmount>>,
    paused: bool,
}

impl MemoryLedger {
    pub fn new(minter: Address, decimals: u8) -> Self {
        Self {
            decimals,
            minter,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            paused: false,
        }
    }

    /// A ledger with the default 18 decimals.
    pub fn with_minter(minter: Address) -> Self {
        Self::new(minter, DEFAULT_DECIMALS)
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Hand minting rights to another address.
    pub fn set_minter(&mut self, caller: &Address, minter: Address) -> Result<(), LedgerError> {
        if *caller != self.minter {
            return Err(LedgerError::NotMinter(*caller));
        }
        if minter.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.minter = minter;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume every transfer. Minting is unaffected.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        tracing::debug!(paused, "token ledger pause switch changed");
    }

    /// Every holder with a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &TokenAmount)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    /// Check a transfer can succeed without touching state.
    fn check_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from != to {
            self.balance_of(to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: TokenAmount) {
        if from == to || amount == 0 {
            return;
        }
        // Both sides were checked in `check_transfer`.
        let from_balance = self.balances.entry(*from).or_default();
        *from_balance -= amount;
        *self.balances.entry(*to).or_default() += amount;
    }
}

impl TokenLedger for MemoryLedger {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn total_supply(&self) -> TokenAmount {
        self.total_supply
    }

    fn balance_of(&self, holder: &Address) -> TokenAmount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.check_transfer(from, to, amount)?;
        self.move_balance(from, to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                needed: amount,
                available: allowed,
            });
        }
        self.check_transfer(from, to, amount)?;
        if let Some(spenders) = self.allowances.get_mut(from) {
            spenders.insert(*spender, allowed - amount);
        }
        self.move_balance(from, to, amount);
        Ok(())
    }

    fn mint(
        &mut self,
        minter: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if *minter != self.minter {
            return Err(LedgerError::NotMinter(*minter));
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }
}
