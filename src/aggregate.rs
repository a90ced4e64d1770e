//! Temporal aggregation: dense (year, family) -> count table for the stream view.

use serde::Serialize;

use crate::record::TrackRecord;
use crate::taxonomy::GenreFamily;

pub const TEMPORAL_MIN_YEAR: i32 = 1950;
pub const TEMPORAL_MAX_YEAR: i32 = 2025;

/// Inclusive year window a record must fall in to appear in the temporal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self::new(TEMPORAL_MIN_YEAR, TEMPORAL_MAX_YEAR)
    }
}

/// Continuous visible time range `[start, end]` on the temporal axis. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearRange {
    pub start: f64,
    pub end: f64,
}

impl YearRange {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn from_years(start: i32, end: i32) -> Self {
        Self::new(f64::from(start), f64::from(end))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && value <= self.end
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.contains(f64::from(year))
    }

    /// Intersection with `other`; `None` when they do not overlap.
    pub fn intersect(&self, other: &YearRange) -> Option<YearRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(YearRange { start, end })
    }

    /// First and last whole year inside the range, `None` when it holds no whole year.
    pub fn whole_years(&self) -> Option<(i32, i32)> {
        let first = self.start.ceil();
        let last = self.end.floor();
        (first <= last).then_some((first as i32, last as i32))
    }

    /// Label naming the whole years `contains_year` accepts, such as `1990–2005`.
    pub fn label(&self) -> String {
        match self.whole_years() {
            Some((first, last)) => format!("{}\u{2013}{}", first, last),
            None => format!("{:.1}\u{2013}{:.1}", self.start, self.end),
        }
    }
}

/// Dense count table: one row per year from the first to the last observed year, one column
/// per family in the given order. Years with no records still have a (zero) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearBuckets {
    years: Vec<i32>,
    families: Vec<GenreFamily>,
    /// `counts[year_index][family_index]`
    counts: Vec<Vec<u32>>,
}

impl YearBuckets {
    pub fn from_records(
        records: &[TrackRecord],
        families: &[GenreFamily],
        window: YearWindow,
    ) -> Self {
        let in_window: Vec<(i32, GenreFamily)> = records
            .iter()
            .filter_map(|r| r.release_year.get().map(|y| (y, r.genre)))
            .filter(|(y, _)| window.contains(*y))
            .collect();

        let (Some(first), Some(last)) = (
            in_window.iter().map(|(y, _)| *y).min(),
            in_window.iter().map(|(y, _)| *y).max(),
        ) else {
            return Self::empty(families);
        };

        let years: Vec<i32> = (first..=last).collect();
        let mut counts = vec![vec![0u32; families.len()]; years.len()];
        for (year, genre) in in_window {
            if let Some(fi) = families.iter().position(|f| *f == genre) {
                counts[(year - first) as usize][fi] += 1;
            }
        }

        tracing::debug!(
            first_year = first,
            last_year = last,
            families = families.len(),
            "aggregated year buckets"
        );

        Self {
            years,
            families: families.to_vec(),
            counts,
        }
    }

    /// Build directly from `(year, family, count)` triples. Years between the extremes that are not
    /// mentioned are filled with zeros; unknown families are ignored.
    pub fn from_counts(families: &[GenreFamily], entries: &[(i32, GenreFamily, u32)]) -> Self {
        let (Some(first), Some(last)) = (
            entries.iter().map(|e| e.0).min(),
            entries.iter().map(|e| e.0).max(),
        ) else {
            return Self::empty(families);
        };
        let years: Vec<i32> = (first..=last).collect();
        let mut counts = vec![vec![0u32; families.len()]; years.len()];
        for &(year, family, count) in entries {
            if let Some(fi) = families.iter().position(|f| *f == family) {
                counts[(year - first) as usize][fi] += count;
            }
        }
        Self {
            years,
            families: families.to_vec(),
            counts,
        }
    }

    fn empty(families: &[GenreFamily]) -> Self {
        Self {
            years: Vec::new(),
            families: families.to_vec(),
            counts: Vec::new(),
        }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn families(&self) -> &[GenreFamily] {
        &self.families
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// First and last year of the table.
    pub fn extent(&self) -> Option<(i32, i32)> {
        Some((*self.years.first()?, *self.years.last()?))
    }

    fn year_index(&self, year: i32) -> Option<usize> {
        let first = *self.years.first()?;
        let idx = usize::try_from(year - first).ok()?;
        (idx < self.years.len()).then_some(idx)
    }

    /// Count for `(year, family)`; zero when either is outside the table.
    pub fn count(&self, year: i32, family: GenreFamily) -> u32 {
        let Some(yi) = self.year_index(year) else {
            return 0;
        };
        self.families
            .iter()
            .position(|f| *f == family)
            .map(|fi| self.counts[yi][fi])
            .unwrap_or(0)
    }

    /// Counts for the year at `year_index`, in family order.
    pub fn row(&self, year_index: usize) -> &[u32] {
        &self.counts[year_index]
    }

    pub fn total(&self, year: i32) -> u32 {
        self.year_index(year)
            .map(|yi| self.counts[yi].iter().sum())
            .unwrap_or(0)
    }
}
