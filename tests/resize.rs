//! Target sizes stay consistent across arbitrary resize sequences.

use proptest::prelude::*;
use strata::pipeline::chain::blur_uniforms;
use strata::pipeline::layout::{Extent, MIP_COUNT, TargetLayout, Viewport, floor_power_of_two};

fn viewport() -> impl Strategy<Value = Viewport> {
    (0.0f32..4096.0, 0.0f32..4096.0, prop_oneof![Just(1.0f32), Just(1.5), Just(2.0), 0.25f32..3.0])
        .prop_map(|(w, h, dpr)| Viewport::new(w, h, dpr))
}

fn assert_consistent(layout: &TargetLayout, viewport: &Viewport) {
    let expected_full = Extent::new(
        (viewport.width * viewport.dpr).round() as u32,
        (viewport.height * viewport.dpr).round() as u32,
    );
    assert_eq!(layout.full, expected_full);
    assert_eq!(
        layout.bright,
        Extent::new(
            floor_power_of_two(layout.full.width) / 2,
            floor_power_of_two(layout.full.height) / 2
        )
    );
    assert_eq!(layout.mips[0], layout.bright);
    for i in 1..MIP_COUNT {
        assert_eq!(layout.mips[i], layout.mips[i - 1].half());
    }
    for extent in layout.extents() {
        assert!(extent.width >= 1 && extent.height >= 1);
    }
}

proptest! {
    #[test]
    fn last_resize_wins(sequence in prop::collection::vec(viewport(), 1..12)) {
        let mut layout = TargetLayout::compute(&Viewport::new(800.0, 600.0, 1.0));
        for viewport in &sequence {
            layout = TargetLayout::compute(viewport);
            assert_consistent(&layout, viewport);
        }
        let last = sequence.last().unwrap();
        prop_assert_eq!(layout, TargetLayout::compute(last));
    }

    #[test]
    fn blur_resolution_follows_layout(viewport in viewport()) {
        let layout = TargetLayout::compute(&viewport);
        for (i, (h, v)) in blur_uniforms(&layout).iter().enumerate() {
            let mip = layout.mips[i];
            prop_assert_eq!(h.inv_size, [1.0 / mip.width as f32, 1.0 / mip.height as f32]);
            prop_assert_eq!(v.inv_size, h.inv_size);
        }
    }
}

#[test]
fn shrinking_to_one_pixel_clamps_everything() {
    let before = TargetLayout::compute(&Viewport::new(800.0, 600.0, 1.0));
    assert_eq!(before.full, Extent::new(800, 600));
    assert_eq!(before.bright, Extent::new(256, 256));

    let after = TargetLayout::compute(&Viewport::new(1.0, 1.0, 1.0));
    assert_eq!(after.full, Extent::new(1, 1));
    for extent in after.extents() {
        assert_eq!(extent, Extent::new(1, 1));
    }
}

#[test]
fn high_dpi_rounds_physical_size() {
    let layout = TargetLayout::compute(&Viewport::new(1280.0, 720.0, 1.5));
    assert_eq!(layout.full, Extent::new(1920, 1080));
    assert_eq!(layout.bright, Extent::new(512, 512));
    assert_eq!(layout.mips[MIP_COUNT - 1], Extent::new(32, 32));
}
