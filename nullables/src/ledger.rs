//! Nullable token ledger that refuses transfers on command.

use dao_ledger::{LedgerError, TokenLedger};
use dao_types::{Address, TokenAmount};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared on/off switch for a [`RefusingLedger`].
///
/// Every clone of the ledger shares the switch, including the copies a
/// transactional handle makes internally.
#[derive(Clone, Debug, Default)]
pub struct RefusalSwitch(Arc<AtomicBool>);

impl RefusalSwitch {
    pub fn refuse(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn allow(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_refusing(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps a token ledger; while the switch is on, every balance-moving call
/// fails with [`LedgerError::Refused`] and changes nothing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefusingLedger<L> {
    inner: L,
    #[serde(skip)]
    switch: RefusalSwitch,
}

impl<L: TokenLedger> RefusingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            switch: RefusalSwitch::default(),
        }
    }

    /// A handle that flips refusal for this ledger and all its clones.
    pub fn switch(&self) -> RefusalSwitch {
        self.switch.clone()
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    fn check(&self, op: &str) -> Result<(), LedgerError> {
        if self.switch.is_refusing() {
            return Err(LedgerError::Refused(format!("{op} refused by nullable ledger")));
        }
        Ok(())
    }
}

impl<L: TokenLedger> TokenLedger for RefusingLedger<L> {
    fn decimals(&self) -> u8 {
        self.inner.decimals()
    }

    fn total_supply(&self) -> TokenAmount {
        self.inner.total_supply()
    }

    fn balance_of(&self, holder: &Address) -> TokenAmount {
        self.inner.balance_of(holder)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.inner.allowance(owner, spender)
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.inner.approve(owner, spender, amount)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.check("transfer")?;
        self.inner.transfer(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.check("transfer_from")?;
        self.inner.transfer_from(spender, from, to, amount)
    }

    fn mint(
        &mut self,
        minter: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.check("mint")?;
        self.inner.mint(minter, to, amount)
    }
}
