use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::YearRange;
use crate::record::TrackRecord;
use crate::taxonomy::GenreFamily;

// Fixed value axis for the popularity bar chart
pub const POPULARITY_DOMAIN: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub family: GenreFamily,
    pub mean: f64,
    pub std_dev: f64, // sample std; 0 when count < 2
    pub count: usize,
}

impl GenreSummary {
    /// Error-bar extent `mean ± std_dev`, clamped to the popularity domain.
    pub fn error_bar(&self) -> (f64, f64) {
        let (lo, hi) = POPULARITY_DOMAIN;
        (
            (self.mean - self.std_dev).clamp(lo, hi),
            (self.mean + self.std_dev).clamp(lo, hi),
        )
    }
}

/// Mean and sample standard deviation of finite values.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return Some((mean, 0.0));
    }
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some((mean, variance.sqrt()))
}

/// Track-popularity summary per family, sorted by mean descending. With `window`, only records
/// whose known release year falls inside it count. Families with no finite popularity are
/// omitted.
pub fn popularity_summary(records: &[TrackRecord], window: Option<YearRange>) -> Vec<GenreSummary> {
    let mut by_family: BTreeMap<GenreFamily, Vec<f64>> = BTreeMap::new();
    for r in records {
        if !r.track_popularity.is_finite() {
            continue;
        }
        if let Some(w) = window {
            match r.release_year.get() {
                Some(y) if w.contains_year(y) => {}
                _ => continue,
            }
        }
        by_family.entry(r.genre).or_default().push(r.track_popularity);
    }

    let mut out: Vec<GenreSummary> = by_family
        .into_iter()
        .filter_map(|(family, values)| {
            let (mean, std_dev) = mean_and_std(&values)?;
            Some(GenreSummary {
                family,
                mean,
                std_dev,
                count: values.len(),
            })
        })
        .collect();
    // stable sort keeps precedence order among equal means
    out.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawTrackRow, RecordNormalizer};

    fn record(pop: &str, year: &str, genre: &str) -> TrackRecord {
        RecordNormalizer::default().normalize(&RawTrackRow {
            track_popularity: Some(pop.into()),
            album_release_date: Some(year.into()),
            artist_genres: Some(genre.into()),
            ..Default::default()
        })
    }

    #[test]
    fn sample_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert!((std - 2.138_089_935_299_395).abs() < 1e-12);
        assert_eq!(mean_and_std(&[3.0]), Some((3.0, 0.0)));
        assert_eq!(mean_and_std(&[]), None);
    }

    #[test]
    fn sorted_descending_and_skips_nan() {
        let records = vec![
            record("40", "2000", "rock"),
            record("80", "2000", "pop"),
            record("60", "2000", "pop"),
            record("", "2000", "jazz"),
        ];
        let summary = popularity_summary(&records, None);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].family, GenreFamily::Pop);
        assert_eq!(summary[0].mean, 70.0);
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[1].family, GenreFamily::RockAlternative);
        assert_eq!(summary[1].std_dev, 0.0);
    }

    #[test]
    fn window_filters_by_year() {
        let records = vec![
            record("80", "1995", "pop"),
            record("20", "2010", "pop"),
            record("50", "unknown", "pop"),
        ];
        let all = popularity_summary(&records, None);
        assert_eq!(all[0].count, 3);
        let windowed = popularity_summary(&records, Some(YearRange::from_years(1990, 2000)));
        assert_eq!(windowed[0].count, 1);
        assert_eq!(windowed[0].mean, 80.0);
    }

    #[test]
    fn error_bar_clamped() {
        let s = GenreSummary {
            family: GenreFamily::Pop,
            mean: 95.0,
            std_dev: 10.0,
            count: 4,
        };
        assert_eq!(s.error_bar(), (85.0, 100.0));
    }
}
