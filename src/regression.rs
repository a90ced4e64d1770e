//! Ordinary least-squares trend lines per genre family and for a selected artist.

use serde::Serialize;

use crate::fields::NumericField;
use crate::record::TrackRecord;
use crate::taxonomy::{FamilySet, GenreFamily};

pub const MIN_FAMILY_SAMPLES: usize = 50;
pub const MIN_ENTITY_SAMPLES: usize = 2;

/// Least-squares coefficients. `degenerate` is set when fewer than two finite pairs were
/// available or x had no variance; the fit is then the flat line at mean y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub sample_size: usize,
    pub degenerate: bool,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `y = slope * x + intercept` over the finite pairs of `points`.
pub fn fit_line(points: &[(f64, f64)]) -> LinearFit {
    let valid: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let n = valid.len();
    if n == 0 {
        return LinearFit {
            slope: 0.0,
            intercept: 0.0,
            sample_size: 0,
            degenerate: true,
        };
    }
    let nf = n as f64;
    let mean_x = valid.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = valid.iter().map(|p| p.1).sum::<f64>() / nf;
    let flat = LinearFit {
        slope: 0.0,
        intercept: mean_y,
        sample_size: n,
        degenerate: true,
    };
    if n < 2 {
        return flat;
    }

    let (mut num, mut den) = (0.0, 0.0);
    for (x, y) in &valid {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    if den == 0.0 || !den.is_finite() {
        return flat;
    }
    let slope = num / den;
    LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        sample_size: n,
        degenerate: false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TrendGroup {
    Family(GenreFamily),
    Artist(String),
}

/// A fitted line with the endpoints it is drawn between (data coordinates).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendLine {
    pub group: TrendGroup,
    pub fit: LinearFit,
    pub start: (f64, f64),
    pub end: (f64, f64),
}

impl TrendLine {
    /// `None` for a degenerate fit or non-finite endpoints.
    fn across(group: TrendGroup, fit: LinearFit, x0: f64, x1: f64) -> Option<Self> {
        if fit.degenerate {
            return None;
        }
        let start = (x0, fit.predict(x0));
        let end = (x1, fit.predict(x1));
        [start.0, start.1, end.0, end.1]
            .iter()
            .all(|v| v.is_finite())
            .then_some(Self {
                group,
                fit,
                start,
                end,
            })
    }
}

/// Finite `(x, y)` pairs of the records selected by `keep`, optionally restricted to an x window.
fn pairs<'a, F>(
    records: &'a [TrackRecord],
    x: NumericField,
    y: NumericField,
    x_window: Option<(f64, f64)>,
    keep: F,
) -> Vec<(f64, f64)>
where
    F: Fn(&TrackRecord) -> bool + 'a,
{
    records
        .iter()
        .filter(|r| keep(r))
        .map(|r| (x.value(r), y.value(r)))
        .filter(|(xv, yv)| xv.is_finite() && yv.is_finite())
        .filter(|(xv, _)| x_window.is_none_or(|(lo, hi)| *xv >= lo && *xv <= hi))
        .collect()
}

/// Sample-size policy for trend lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegressionEngine {
    pub min_family_samples: usize,
    pub min_entity_samples: usize,
}

impl Default for RegressionEngine {
    fn default() -> Self {
        Self {
            min_family_samples: MIN_FAMILY_SAMPLES,
            min_entity_samples: MIN_ENTITY_SAMPLES,
        }
    }
}

impl RegressionEngine {
    pub fn new(min_family_samples: usize, min_entity_samples: usize) -> Self {
        Self {
            min_family_samples,
            min_entity_samples,
        }
    }

    /// One line per enabled family with enough samples, spanning that family's own x extent.
    /// With `x_window`, only points inside it count and lines span the clipped extent.
    pub fn family_trends(
        &self,
        records: &[TrackRecord],
        x: NumericField,
        y: NumericField,
        enabled: FamilySet,
        x_window: Option<(f64, f64)>,
    ) -> Vec<TrendLine> {
        enabled
            .iter()
            .filter_map(|family| {
                let points = pairs(records, x, y, x_window, |r| r.genre == family);
                if points.len() < self.min_family_samples {
                    return None;
                }
                let fit = fit_line(&points);
                let (lo, hi) = points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p.0), hi.max(p.0))
                    });
                TrendLine::across(TrendGroup::Family(family), fit, lo, hi)
            })
            .collect()
    }

    /// Line for the artist whose normalized (trimmed, lowercased) name is `artist`, spanning
    /// `x_domain`. `None` below the entity threshold or when the fit is degenerate.
    pub fn entity_trend(
        &self,
        records: &[TrackRecord],
        artist: &str,
        x: NumericField,
        y: NumericField,
        x_domain: (f64, f64),
        x_window: Option<(f64, f64)>,
    ) -> Option<TrendLine> {
        let points = pairs(records, x, y, x_window, |r| r.is_by_artist(artist));
        if points.len() < self.min_entity_samples.max(1) {
            return None;
        }
        let fit = fit_line(&points);
        let name = records
            .iter()
            .find(|r| r.is_by_artist(artist))
            .map(|r| r.artist_name.clone())
            .unwrap_or_else(|| artist.to_string());
        TrendLine::across(TrendGroup::Artist(name), fit, x_domain.0, x_domain.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line_recovered() {
        let points: Vec<(f64, f64)> = (0..60).map(|i| (i as f64, 3.0 * i as f64 + 2.0)).collect();
        let fit = fit_line(&points);
        assert!((fit.slope - 3.0).abs() < 1e-9);
        assert!((fit.intercept - 2.0).abs() < 1e-9);
        assert_eq!(fit.sample_size, 60);
        assert!(!fit.degenerate);
    }

    #[test]
    fn degenerate_cases() {
        let fit = fit_line(&[]);
        assert_eq!((fit.slope, fit.intercept, fit.degenerate), (0.0, 0.0, true));

        let fit = fit_line(&[(1.0, 4.0)]);
        assert_eq!((fit.slope, fit.intercept, fit.sample_size), (0.0, 4.0, 1));

        let fit = fit_line(&[(2.0, 1.0), (2.0, 3.0)]);
        assert_eq!((fit.slope, fit.intercept), (0.0, 2.0));
        assert!(fit.degenerate);
    }

    #[test]
    fn non_finite_pairs_skipped() {
        let fit = fit_line(&[(0.0, 2.0), (f64::NAN, 100.0), (1.0, 5.0), (2.0, f64::INFINITY)]);
        assert_eq!(fit.sample_size, 2);
        assert!((fit.slope - 3.0).abs() < 1e-12);
    }
}
