//! Stack model: stacked bands per family, offset policies, the collapse transform and
//! vertical-domain derivation for the stream view.
//!
//! The stack computed from the buckets is the *canonical* stack. Hiding families never mutates
//! it; [`Stack::collapse`] derives a fresh view from it each time, so toggling cannot drift.

use serde::{Deserialize, Serialize};

use crate::aggregate::{YearBuckets, YearRange};
use crate::taxonomy::{FamilySet, GenreFamily};

/// Baseline policy for the stacked layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackOffset {
    /// Bottom band starts at zero.
    Zero,
    /// Stack centered on zero.
    Silhouette,
    /// Minimum-wiggle streamgraph baseline.
    #[default]
    Wiggle,
}

impl StackOffset {
    pub const ALL: [Self; 3] = [Self::Zero, Self::Silhouette, Self::Wiggle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Silhouette => "silhouette",
            Self::Wiggle => "wiggle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// One family's vertical interval `[low, high)` at one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub year: i32,
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn height(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedLayer {
    pub family: GenreFamily,
    pub bands: Vec<Band>,
}

impl StackedLayer {
    pub fn band_at(&self, year: i32) -> Option<&Band> {
        self.bands.iter().find(|b| b.year == year)
    }

    /// Bands whose year lies within `range`.
    pub fn bands_in(&self, range: &YearRange) -> impl Iterator<Item = &Band> + '_ {
        let range = *range;
        self.bands.iter().filter(move |b| range.contains_year(b.year))
    }
}

/// Integer-rounded value-axis domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueDomain {
    pub min: f64,
    pub max: f64,
}

/// Layers in stacking order (first layer at the bottom) over a shared year sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stack {
    offset: StackOffset,
    years: Vec<i32>,
    layers: Vec<StackedLayer>,
}

/// Baseline per year for the minimum-wiggle offset. `values[i][j]` is family `i` at year `j`.
fn wiggle_baseline(values: &[Vec<f64>], n_years: usize) -> Vec<f64> {
    let mut baseline = vec![0.0; n_years];
    let mut y = 0.0;
    for j in 1..n_years {
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        // running sum of slope changes of the layers below the current one
        let mut below = 0.0;
        for series in values {
            let cur = series[j];
            let prev = series[j - 1];
            let s3 = (cur - prev) / 2.0 + below;
            below += cur - prev;
            s1 += cur;
            s2 += s3 * cur;
        }
        if s1 != 0.0 {
            y -= s2 / s1;
        }
        baseline[j] = y;
    }
    baseline
}

impl Stack {
    /// Stack `order` (bottom first) from the buckets using `offset`. Families in `order` that the
    /// buckets do not track contribute zero-height bands.
    pub fn compute(buckets: &YearBuckets, order: &[GenreFamily], offset: StackOffset) -> Self {
        let years = buckets.years().to_vec();
        let values: Vec<Vec<f64>> = order
            .iter()
            .map(|&family| {
                years
                    .iter()
                    .map(|&year| f64::from(buckets.count(year, family)))
                    .collect()
            })
            .collect();

        let baseline: Vec<f64> = match offset {
            StackOffset::Zero => vec![0.0; years.len()],
            StackOffset::Silhouette => (0..years.len())
                .map(|j| -values.iter().map(|s| s[j]).sum::<f64>() / 2.0)
                .collect(),
            StackOffset::Wiggle => wiggle_baseline(&values, years.len()),
        };

        let mut cursor = baseline;
        let layers = order
            .iter()
            .zip(values.iter())
            .map(|(&family, series)| {
                let bands = years
                    .iter()
                    .enumerate()
                    .map(|(j, &year)| {
                        let low = cursor[j];
                        let high = low + series[j];
                        cursor[j] = high;
                        Band { year, low, high }
                    })
                    .collect();
                StackedLayer { family, bands }
            })
            .collect();

        Self {
            offset,
            years,
            layers,
        }
    }

    pub fn offset(&self) -> StackOffset {
        self.offset
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn layers(&self) -> &[StackedLayer] {
        &self.layers
    }

    pub fn layer(&self, family: GenreFamily) -> Option<&StackedLayer> {
        self.layers.iter().find(|l| l.family == family)
    }

    /// Sum of band heights at year index `j` over the families in `enabled`.
    pub fn height_at(&self, j: usize, enabled: FamilySet) -> f64 {
        self.layers
            .iter()
            .filter(|l| enabled.contains(l.family))
            .map(|l| l.bands[j].height())
            .sum()
    }

    /// Derive the view with every family outside `enabled` collapsed to zero height. Each hidden
    /// band's former height is subtracted from every band stacked above it, per year. Always
    /// call this on the canonical stack; the result is a new value.
    pub fn collapse(&self, enabled: FamilySet) -> Stack {
        let mut removed = vec![0.0; self.years.len()];
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                let visible = enabled.contains(layer.family);
                let bands = layer
                    .bands
                    .iter()
                    .enumerate()
                    .map(|(j, band)| {
                        let low = band.low - removed[j];
                        if visible {
                            Band {
                                year: band.year,
                                low,
                                high: band.high - removed[j],
                            }
                        } else {
                            removed[j] += band.height();
                            Band {
                                year: band.year,
                                low,
                                high: low,
                            }
                        }
                    })
                    .collect();
                StackedLayer {
                    family: layer.family,
                    bands,
                }
            })
            .collect();
        Stack {
            offset: self.offset,
            years: self.years.clone(),
            layers,
        }
    }

    /// Year extent as a continuous range.
    pub fn extent(&self) -> Option<YearRange> {
        Some(YearRange::from_years(
            *self.years.first()?,
            *self.years.last()?,
        ))
    }

    /// `[floor(min low), ceil(max high)]` over the enabled families' bands inside `range`.
    /// `None` when no band qualifies, which callers treat as "keep the previous domain".
    pub fn vertical_domain(&self, range: &YearRange, enabled: FamilySet) -> Option<ValueDomain> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for layer in self.layers.iter().filter(|l| enabled.contains(l.family)) {
            for band in layer.bands_in(range) {
                min = min.min(band.low);
                max = max.max(band.high);
            }
        }
        (min.is_finite() && max.is_finite()).then(|| ValueDomain {
            min: min.floor(),
            max: max.ceil(),
        })
    }

    /// Vertical domain over the full year extent.
    pub fn global_domain(&self, enabled: FamilySet) -> Option<ValueDomain> {
        self.vertical_domain(&self.extent()?, enabled)
    }

    /// Copy of the stack restricted to the bands inside `range` (for handing to the renderer).
    pub fn clip(&self, range: &YearRange) -> Stack {
        Stack {
            offset: self.offset,
            years: self
                .years
                .iter()
                .copied()
                .filter(|y| range.contains_year(*y))
                .collect(),
            layers: self
                .layers
                .iter()
                .map(|l| StackedLayer {
                    family: l.family,
                    bands: l.bands_in(range).copied().collect(),
                })
                .collect(),
        }
    }
}
