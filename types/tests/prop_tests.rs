use proptest::prelude::*;

use dao_types::{Address, GovernanceParams, Timestamp};

proptest! {
    /// Address display -> parse produces the identical address.
    #[test]
    fn address_display_parse(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::new(bytes);
        let parsed: Address = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }

    /// Address::is_zero is true only for all-zero bytes.
    #[test]
    fn address_is_zero_correct(bytes in prop::array::uniform20(0u8..)) {
        prop_assert_eq!(Address::new(bytes).is_zero(), bytes == [0u8; 20]);
    }

    /// Address bincode serialization roundtrip.
    #[test]
    fn address_bincode_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::new(bytes);
        let encoded = bincode::serialize(&addr).unwrap();
        let decoded: Address = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, addr);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// is_reached agrees with manual comparison.
    #[test]
    fn timestamp_is_reached_correct(unlock in 0u64..1_000_000, now in 0u64..1_000_000) {
        prop_assert_eq!(Timestamp::new(unlock).is_reached(Timestamp::new(now)), now >= unlock);
    }

    /// Parameters validate iff every field is positive and voting_period >= lock_time.
    #[test]
    fn params_validation_matches_rule(
        price in 0u128..4,
        min_vote in 0u128..4,
        min_proposal in 0u128..4,
        voting_period in 0u64..10,
        tokens_per_vp in 0u128..4,
        lock_time in 0u64..10,
    ) {
        let params = GovernanceParams {
            price,
            min_vote_stake: min_vote,
            min_proposal_stake: min_proposal,
            voting_period,
            tokens_per_vp,
            lock_time,
        };
        let expected = price > 0
            && min_vote > 0
            && min_proposal > 0
            && voting_period > 0
            && tokens_per_vp > 0
            && lock_time > 0
            && voting_period >= lock_time;
        prop_assert_eq!(params.validate().is_ok(), expected);
    }
}
