//! Scroll mapping and slot visibility invariants.

use proptest::prelude::*;
use strata::scene::host::SlotVisibility;
use strata::scene::scroll::{BlendState, ScrollCoupler};

proptest! {
    #[test]
    fn blend_pair_is_adjacent_and_in_bounds(
        position in prop_oneof![-10.0f32..20.0, Just(f32::NAN), Just(f32::INFINITY)],
        sections in 2usize..12,
    ) {
        let blend = BlendState::from_position(position, sections);
        prop_assert_eq!(blend.index2, blend.index1 + 1);
        prop_assert!(blend.index2 < sections);
        prop_assert!((0.0..=1.0).contains(&blend.progress));
    }

    #[test]
    fn in_range_position_is_reconstructed(sections in 2usize..12, t in 0.0f32..1.0) {
        let position = t * (sections - 1) as f32;
        let blend = BlendState::from_position(position, sections);
        let rebuilt = blend.index1 as f32 + blend.progress;
        prop_assert!((rebuilt - position).abs() < 1e-4);
    }

    #[test]
    fn smoothing_never_overshoots(
        targets in prop::collection::vec(-5.0f32..15.0, 1..20),
        lerp in 0.0f32..1.0,
        dt in 0.0f32..0.1,
    ) {
        let mut coupler = ScrollCoupler::new(6).unwrap();
        for target in targets {
            let before = coupler.position();
            coupler.set_target(target);
            coupler.tick(dt, lerp);
            let (lo, hi) = if before < coupler.target() {
                (before, coupler.target())
            } else {
                (coupler.target(), before)
            };
            prop_assert!(coupler.position() >= lo - 1e-5 && coupler.position() <= hi + 1e-5);
            prop_assert!((0.0..=5.0).contains(&coupler.position()));
        }
    }

    #[test]
    fn at_most_two_slots_visible(
        sections in 2usize..10,
        positions in prop::collection::vec(-2.0f32..12.0, 1..30),
    ) {
        let mut visibility = SlotVisibility::new(sections);
        for position in positions {
            let blend = BlendState::from_position(position, sections);
            visibility.activate(blend.pair());
            prop_assert_eq!(visibility.visible_count(), 2);
            prop_assert!(visibility.is_visible(blend.index1));
            prop_assert!(visibility.is_visible(blend.index2));
            prop_assert_eq!(visibility.active(), Some(blend.pair()));
        }
    }
}
