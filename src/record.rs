//! Raw dataset rows and their normalization into typed track records.
//!
//! Normalization never fails: malformed numbers become `NaN`, bad years become
//! [`ReleaseYear::Unknown`], and every row yields a record. Aggregations filter for finite values.

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::taxonomy::{classify_with_fallback, GenreFallback, GenreFamily};

/// Durations below this are assumed to be minutes rather than milliseconds.
pub const MINUTES_THRESHOLD: f64 = 1_000.0;
pub const MS_PER_MINUTE: f64 = 60_000.0;
/// Shortest duration treated as a real song.
pub const MIN_PLAUSIBLE_DURATION_MS: f64 = 1_000.0;
pub const MIN_RELEASE_YEAR: i32 = 1900;
pub const MAX_RELEASE_YEAR: i32 = 2025;

/// One row of the source dataset, every field as read (text, possibly missing).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrackRow {
    pub track_popularity: Option<String>,
    pub artist_popularity: Option<String>,
    pub artist_followers: Option<String>,
    pub album_release_date: Option<String>,
    pub artist_genres: Option<String>,
    pub danceability: Option<String>,
    pub energy: Option<String>,
    pub valence: Option<String>,
    pub tempo: Option<String>,
    pub duration: Option<String>,
    pub explicit: Option<String>,
    pub artist_name: Option<String>,
    pub track_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReleaseYear {
    Known(i32),
    #[default]
    Unknown,
}

impl ReleaseYear {
    pub fn get(self) -> Option<i32> {
        match self {
            Self::Known(y) => Some(y),
            Self::Unknown => None,
        }
    }

    /// Year as f64 for numeric axes; `NaN` when unknown.
    pub fn as_f64(self) -> f64 {
        self.get().map(f64::from).unwrap_or(f64::NAN)
    }

    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// A normalized track. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub track_popularity: f64,
    pub artist_popularity: f64,
    pub artist_followers: f64,
    pub release_year: ReleaseYear,
    pub genre: GenreFamily,
    pub raw_genres: Vec<String>,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: f64,
    pub explicit: bool,
    pub artist_name: String,
    pub track_name: String,
}

impl TrackRecord {
    /// Duration is usable for duration-sensitive aggregation.
    pub fn has_plausible_duration(&self, min_duration_ms: f64) -> bool {
        self.duration_ms.is_finite() && self.duration_ms >= min_duration_ms
    }

    /// Case-insensitive, whitespace-insensitive artist match.
    pub fn is_by_artist(&self, normalized_artist: &str) -> bool {
        self.artist_name.trim().to_lowercase() == normalized_artist
    }
}

/// Tunables for normalization (defaults match the dataset conventions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    pub min_year: i32,
    pub max_year: i32,
    pub minutes_threshold: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_year: MIN_RELEASE_YEAR,
            max_year: MAX_RELEASE_YEAR,
            minutes_threshold: MINUTES_THRESHOLD,
        }
    }
}

/// Parse a numeric text field; anything missing or unparseable is `NaN`.
pub fn parse_number(field: Option<&str>) -> f64 {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Unit-correct a duration: small positive values are minutes.
pub fn normalize_duration_ms(value: f64, minutes_threshold: f64) -> f64 {
    if value.is_finite() && value > 0.0 && value < minutes_threshold {
        value * MS_PER_MINUTE
    } else {
        value
    }
}

pub fn parse_explicit(field: Option<&str>) -> bool {
    field
        .map(|s| s.trim().to_ascii_lowercase())
        .is_some_and(|s| matches!(s.as_str(), "true" | "1" | "yes"))
}

static LEADING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?$").expect("static date pattern is valid")
});

/// Extract the calendar year from a release date string. Returns `None` for anything that is
/// not a real calendar date.
pub fn parse_release_year(field: Option<&str>) -> Option<i32> {
    let s = field.map(str::trim).filter(|s| !s.is_empty())?;

    if let Some(caps) = LEADING_DATE.captures(s) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2).map_or(Some(1), |m| m.as_str().parse().ok())?;
        let day: u32 = caps.get(3).map_or(Some(1), |d| d.as_str().parse().ok())?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| d.year());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.year());
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .ok()
        .map(|d| d.year())
}

/// Validate a parsed year against the accepted bounds.
pub fn normalize_year(year: Option<i32>, options: &NormalizeOptions) -> ReleaseYear {
    match year {
        Some(y) if (options.min_year..=options.max_year).contains(&y) => ReleaseYear::Known(y),
        _ => ReleaseYear::Unknown,
    }
}

/// Turns raw rows into [`TrackRecord`]s using the taxonomy and the fallback table.
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    options: NormalizeOptions,
    fallback: GenreFallback,
}

impl RecordNormalizer {
    pub fn new(options: NormalizeOptions, fallback: GenreFallback) -> Self {
        Self { options, fallback }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn normalize(&self, row: &RawTrackRow) -> TrackRecord {
        let artist_name = row.artist_name.as_deref().unwrap_or("").trim().to_string();
        let classification = classify_with_fallback(
            row.artist_genres.as_deref().unwrap_or(""),
            &artist_name,
            &self.fallback,
        );

        let duration = parse_number(row.duration.as_deref());

        TrackRecord {
            track_popularity: parse_number(row.track_popularity.as_deref()),
            artist_popularity: parse_number(row.artist_popularity.as_deref()),
            artist_followers: parse_number(row.artist_followers.as_deref()),
            release_year: normalize_year(
                parse_release_year(row.album_release_date.as_deref()),
                &self.options,
            ),
            genre: classification.family,
            raw_genres: classification.tokens,
            danceability: parse_number(row.danceability.as_deref()),
            energy: parse_number(row.energy.as_deref()),
            valence: parse_number(row.valence.as_deref()),
            tempo: parse_number(row.tempo.as_deref()),
            duration_ms: normalize_duration_ms(duration, self.options.minutes_threshold),
            explicit: parse_explicit(row.explicit.as_deref()),
            artist_name,
            track_name: row.track_name.as_deref().unwrap_or("").trim().to_string(),
        }
    }

    pub fn normalize_all(&self, rows: &[RawTrackRow]) -> Vec<TrackRecord> {
        let records: Vec<TrackRecord> = rows.iter().map(|r| self.normalize(r)).collect();
        let unknown_years = records
            .iter()
            .filter(|r| !r.release_year.is_known())
            .count();
        let other = records
            .iter()
            .filter(|r| r.genre == GenreFamily::Other)
            .count();
        tracing::debug!(
            rows = records.len(),
            unknown_years,
            other_genre = other,
            fallback_entries = self.fallback.len(),
            "normalized track rows"
        );
        records
    }
}

/// Sorted, de-duplicated artist names (for the entity selector).
pub fn unique_artists(records: &[TrackRecord]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .map(|r| r.artist_name.clone())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}
