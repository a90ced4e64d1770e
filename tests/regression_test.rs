use genrescope::regression::{TrendGroup, MIN_FAMILY_SAMPLES};
use genrescope::{
    FamilySet, GenreFamily, NumericField, RawTrackRow, RecordNormalizer, RegressionEngine,
    TrackRecord,
};

fn record(artist: &str, genres: &str, x: f64, y: f64) -> TrackRecord {
    RecordNormalizer::default().normalize(&RawTrackRow {
        artist_name: Some(artist.to_string()),
        artist_genres: Some(genres.to_string()),
        artist_popularity: Some(x.to_string()),
        track_popularity: Some(y.to_string()),
        ..Default::default()
    })
}

/// 60 pop tracks on `y = 3x + 2` plus a lone rock track.
fn records() -> Vec<TrackRecord> {
    let mut out: Vec<TrackRecord> = (0..60)
        .map(|i| {
            let x = f64::from(i);
            record("Artist", "['dance pop']", x, 3.0 * x + 2.0)
        })
        .collect();
    out.push(record("Loner", "['rock']", 10.0, 10.0));
    out
}

const X: NumericField = NumericField::ArtistPopularity;
const Y: NumericField = NumericField::TrackPopularity;

#[test]
fn test_family_line_recovers_exact_fit() {
    let trends = RegressionEngine::default().family_trends(&records(), X, Y, FamilySet::all(), None);
    assert_eq!(trends.len(), 1);
    let line = &trends[0];
    assert_eq!(line.group, TrendGroup::Family(GenreFamily::Pop));
    assert!((line.fit.slope - 3.0).abs() < 1e-9);
    assert!((line.fit.intercept - 2.0).abs() < 1e-9);
    assert_eq!(line.fit.sample_size, 60);
    assert_eq!(line.start.0, 0.0);
    assert!((line.start.1 - 2.0).abs() < 1e-9);
    assert_eq!(line.end.0, 59.0);
    assert!((line.end.1 - 179.0).abs() < 1e-9);
}

#[test]
fn test_small_or_disabled_families_have_no_line() {
    let engine = RegressionEngine::default();
    let recs = records();
    let enabled = FamilySet::all().without(GenreFamily::Pop);
    assert!(engine.family_trends(&recs, X, Y, enabled, None).is_empty());

    // the window leaves fewer than the family minimum
    let window = Some((0.0, (MIN_FAMILY_SAMPLES - 2) as f64));
    assert!(engine
        .family_trends(&recs, X, Y, FamilySet::all(), window)
        .is_empty());

    let relaxed = RegressionEngine::new(10, 2);
    let trends = relaxed.family_trends(&recs, X, Y, FamilySet::all(), Some((10.0, 20.0)));
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].fit.sample_size, 11);
    assert_eq!(trends[0].start.0, 10.0);
    assert_eq!(trends[0].end.0, 20.0);
}

#[test]
fn test_entity_trend_thresholds() {
    let engine = RegressionEngine::default();
    let recs = records();

    // one track is below the entity minimum
    assert!(engine
        .entity_trend(&recs, "loner", X, Y, (0.0, 100.0), None)
        .is_none());
    assert!(engine
        .entity_trend(&recs, "nobody", X, Y, (0.0, 100.0), None)
        .is_none());

    let line = engine
        .entity_trend(&recs, "artist", X, Y, (0.0, 100.0), None)
        .unwrap();
    assert_eq!(line.group, TrendGroup::Artist("Artist".to_string()));
    assert!((line.start.1 - 2.0).abs() < 1e-9);
    assert!((line.end.1 - 302.0).abs() < 1e-9);

    // a single point fits only a flat line, which is never drawn
    let lenient = RegressionEngine::new(MIN_FAMILY_SAMPLES, 1);
    assert!(lenient
        .entity_trend(&recs, "loner", X, Y, (0.0, 100.0), None)
        .is_none());
}

#[test]
fn test_zero_x_variance_draws_no_line() {
    let engine = RegressionEngine::default();
    let recs = vec![
        record("Stacked", "['indie rock']", 50.0, 20.0),
        record("Stacked", "['indie rock']", 50.0, 80.0),
    ];
    assert!(engine
        .entity_trend(&recs, "stacked", X, Y, (0.0, 100.0), None)
        .is_none());

    // enough family samples, but every one at the same x
    let column: Vec<TrackRecord> = (0..MIN_FAMILY_SAMPLES)
        .map(|i| record("Column", "['rock']", 40.0, f64::from(i as u32)))
        .collect();
    assert!(engine
        .family_trends(&column, X, Y, FamilySet::all(), None)
        .is_empty());
}
