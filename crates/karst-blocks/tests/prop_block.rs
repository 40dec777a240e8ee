use karst_blocks::Block;
use proptest::prelude::*;

fn level() -> impl Strategy<Value = u8> {
    0u8..=15
}

proptest! {
    // The packed nibbles hold both light fields independently
    #[test]
    fn light_nibbles_round_trip(outdoor in level(), indoor in level(), id in any::<u8>()) {
        let mut b = Block::new(id);
        b.set_outdoor_light(outdoor);
        b.set_indoor_light(indoor);
        prop_assert_eq!(b.outdoor_light(), outdoor);
        prop_assert_eq!(b.indoor_light(), indoor);
        prop_assert_eq!(b.id, id);
    }

    // Flag writes never disturb the light byte and vice versa
    #[test]
    fn flags_and_light_are_disjoint(
        outdoor in level(),
        indoor in level(),
        sky in any::<bool>(),
        dirty in any::<bool>(),
    ) {
        let mut b = Block::new(1);
        b.set_outdoor_light(outdoor);
        b.set_indoor_light(indoor);
        b.set_sky(sky);
        b.set_light_dirty(dirty);
        prop_assert_eq!(b.outdoor_light(), outdoor);
        prop_assert_eq!(b.indoor_light(), indoor);
        prop_assert_eq!(b.is_sky(), sky);
        prop_assert_eq!(b.is_light_dirty(), dirty);

        // Clearing flags restores the untouched state byte-for-byte.
        b.set_sky(false);
        b.set_light_dirty(false);
        let mut plain = Block::new(1);
        plain.set_outdoor_light(outdoor);
        plain.set_indoor_light(indoor);
        prop_assert_eq!(b, plain);
    }
}
