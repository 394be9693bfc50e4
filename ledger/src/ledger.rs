//! The token interface the governance engine depends on.

use crate::error::LedgerError;
use dao_types::{Address, TokenAmount};

/// Fungible token operations used by the Token Gateway and the Stake Vault.
///
/// Every mutating method is all-or-nothing: on `Err` no balance or allowance
/// has changed.
pub trait TokenLedger {
    /// Base-unit decimals (`10^decimals` base units = one whole token).
    fn decimals(&self) -> u8;

    fn total_supply(&self) -> TokenAmount;

    fn balance_of(&self, holder: &Address) -> TokenAmount;

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount;

    /// Set the amount `spender` may pull from `owner`.
    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError>;

    /// Create `amount` new tokens for `to`. Only the ledger's minter may call this.
    fn mint(
        &mut self,
        minter: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError>;
}
