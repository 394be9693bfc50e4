//! Token and payment amounts.
//!
//! Amounts are unsigned base-unit integers (u128). All arithmetic on them in the
//! engine is checked; overflow surfaces as an error instead of wrapping.

/// Governance token amount in base units (`10^decimals` base units = one whole token).
pub type TokenAmount = u128;

/// Payment amount in wei, the smallest unit of the native currency.
pub type Wei = u128;

/// Decimals used by the default governance token.
pub const DEFAULT_DECIMALS: u8 = 18;

/// `10^decimals`, or `None` if it does not fit in a `u128`.
pub fn unit(decimals: u8) -> Option<TokenAmount> {
    10u128.checked_pow(u32::from(decimals))
}
