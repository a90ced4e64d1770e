mod common;

use common::{scenario_config, scenario_rows};
use genrescope::dashboard::{Interaction, ZoomGesture};
use genrescope::{Dashboard, FamilySet, GenreFallback, GenreFamily, StackOffset, YearRange};

const A: GenreFamily = GenreFamily::Pop;
const B: GenreFamily = GenreFamily::Latin;

fn dashboard(offset: StackOffset) -> Dashboard {
    Dashboard::from_rows(&scenario_rows(), GenreFallback::new(), &scenario_config(offset))
}

#[test]
fn test_scenario_buckets() {
    let d = dashboard(StackOffset::Zero);
    let buckets = d.buckets();
    assert_eq!(buckets.years(), &[2000, 2001, 2002]);
    assert_eq!(buckets.count(2000, A), 10);
    assert_eq!(buckets.count(2000, B), 5);
    assert_eq!(buckets.count(2001, A), 0);
    assert_eq!(buckets.count(2001, B), 20);
    assert_eq!(buckets.count(2002, A), 15);
    assert_eq!(buckets.count(2002, B), 15);
}

#[test]
fn test_zero_baseline_end_to_end() {
    let mut d = dashboard(StackOffset::Zero);
    let stack = d.canonical_stack();
    let b = stack.layer(B).unwrap().band_at(2000).unwrap();
    let a = stack.layer(A).unwrap().band_at(2000).unwrap();
    assert_eq!((b.low, b.high), (0.0, 5.0));
    assert_eq!((a.low, a.high), (5.0, 15.0));

    d.handle(Interaction::ToggleFamily { family: A });
    let collapsed = d.collapsed_stack();
    let b = collapsed.layer(B).unwrap().band_at(2000).unwrap();
    let a = collapsed.layer(A).unwrap().band_at(2000).unwrap();
    assert_eq!((b.low, b.high), (0.0, 5.0));
    assert_eq!(a.height(), 0.0);
}

#[test]
fn test_partition_for_every_offset() {
    for offset in [
        StackOffset::Zero,
        StackOffset::Silhouette,
        StackOffset::Wiggle,
    ] {
        let d = dashboard(offset);
        let stack = d.canonical_stack();
        for (j, &year) in stack.years().iter().enumerate() {
            let total = f64::from(d.buckets().total(year));
            let sum: f64 = stack.layers().iter().map(|l| l.bands[j].height()).sum();
            assert!(
                (sum - total).abs() < 1e-9,
                "{:?} at {}: {} != {}",
                offset,
                year,
                sum,
                total
            );
        }
    }
}

#[test]
fn test_collapse_keeps_partition_of_enabled() {
    let d = dashboard(StackOffset::Wiggle);
    let enabled = FamilySet::all().without(B);
    let collapsed = d.canonical_stack().collapse(enabled);
    for (j, &year) in collapsed.years().iter().enumerate() {
        let expected = f64::from(d.buckets().count(year, A));
        assert!((collapsed.height_at(j, enabled) - expected).abs() < 1e-9);
        // remaining bands stay contiguous
        let bottom = collapsed.layer(B).unwrap().bands[j];
        let top = collapsed.layer(A).unwrap().bands[j];
        assert_eq!(bottom.height(), 0.0);
        assert!((bottom.high - top.low).abs() < 1e-9);
    }
}

#[test]
fn test_toggle_round_trip_is_exact() {
    let mut d = dashboard(StackOffset::Wiggle);
    let canonical = d.canonical_stack().clone();
    for family in [B, A, B, A] {
        d.handle(Interaction::ToggleFamily { family });
    }
    assert_eq!(d.collapsed_stack(), &canonical);
}

#[test]
fn test_offset_change_rebuilds_canonical() {
    let mut d = dashboard(StackOffset::Zero);
    d.handle(Interaction::ToggleFamily { family: A });
    d.handle(Interaction::SetOffset {
        offset: StackOffset::Silhouette,
    });
    assert_eq!(d.canonical_stack().offset(), StackOffset::Silhouette);
    let b = d.collapsed_stack().layer(B).unwrap().band_at(2000).unwrap();
    assert_eq!((b.low, b.high), (-7.5, -2.5));
    assert_eq!(d.collapsed_stack().layer(A).unwrap().bands[0].height(), 0.0);
}

#[test]
fn test_single_family_window_domain() {
    let d = dashboard(StackOffset::Zero);
    let domain = d
        .canonical_stack()
        .vertical_domain(&YearRange::from_years(2001, 2001), FamilySet::all())
        .unwrap();
    let band = d.canonical_stack().layer(B).unwrap().band_at(2001).unwrap();
    assert_eq!((domain.min, domain.max), (band.low, band.high));
}

#[test]
fn test_zoomed_stream_fits_visible_family() {
    let mut d = dashboard(StackOffset::Zero);
    // 2001 sits in the middle of the 960px default width
    d.handle(Interaction::StreamZoom {
        gesture: ZoomGesture::ZoomBy {
            factor: 8.0,
            anchor: 480.0,
        },
    });
    let frame = d.on_animation_frame().unwrap();
    let stream = frame.stream.unwrap();
    assert!(stream.visible.start > 2000.0 && stream.visible.end < 2002.0);
    assert_eq!(stream.y_domain, (0.0, 20.0));
    assert!(stream.layers.iter().all(|l| l.bands.len() == 1));

    d.handle(Interaction::SetMagnitudeScaling { enabled: false });
    let frame = d.render();
    assert_eq!(frame.stream.unwrap().y_domain, (0.0, 30.0));
}
