//! Stake → voting-power arithmetic.

use dao_types::{TokenAmount, VotingMode};

/// Integer square root (floor) by Newton iteration.
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut y = n;
    // (n + 1) / 2 without overflowing at u128::MAX
    let mut z = n / 2 + n % 2;
    while z < y {
        y = z;
        z = (n / z + z) / 2;
    }
    y
}

/// Voting power of a stake under `mode`.
///
/// `tokens_per_vp` is validated to be non-zero before it reaches here; a zero
/// value yields zero power rather than dividing by zero.
pub fn voting_power(stake: TokenAmount, tokens_per_vp: TokenAmount, mode: VotingMode) -> u128 {
    let units = stake.checked_div(tokens_per_vp).unwrap_or(0);
    match mode {
        VotingMode::Linear => units,
        VotingMode::Quadratic => isqrt(units),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt_small_values() {
        let expected = [0, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (n, root) in expected.iter().enumerate() {
            assert_eq!(isqrt(n as u128), *root, "isqrt({n})");
        }
    }

    #[test]
    fn test_isqrt_perfect_squares() {
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(1 << 64), 1 << 32);
    }

    #[test]
    fn test_isqrt_max() {
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
    }

    #[test]
    fn test_linear_power() {
        assert_eq!(voting_power(10, 1, VotingMode::Linear), 10);
        assert_eq!(voting_power(25, 10, VotingMode::Linear), 2);
        assert_eq!(voting_power(9, 10, VotingMode::Linear), 0);
    }

    #[test]
    fn test_quadratic_power() {
        assert_eq!(voting_power(100, 1, VotingMode::Quadratic), 10);
        assert_eq!(voting_power(2, 1, VotingMode::Quadratic), 1);
        assert_eq!(voting_power(1_000, 10, VotingMode::Quadratic), 10);
    }

    #[test]
    fn test_zero_tokens_per_vp_yields_zero() {
        assert_eq!(voting_power(100, 0, VotingMode::Linear), 0);
    }
}
