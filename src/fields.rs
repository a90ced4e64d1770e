//! Numeric fields selectable on the scatter axes, and the x/y/size axis selection.

use serde::{Deserialize, Serialize};

use crate::record::{TrackRecord, MIN_PLAUSIBLE_DURATION_MS};
use crate::scale::format_duration_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    ArtistFollowers,
    ArtistPopularity,
    TrackPopularity,
    ReleaseYear,
    Danceability,
    Energy,
    Valence,
    Tempo,
    DurationMs,
}

impl NumericField {
    pub const ALL: [Self; 9] = [
        Self::ArtistFollowers,
        Self::ArtistPopularity,
        Self::TrackPopularity,
        Self::ReleaseYear,
        Self::Danceability,
        Self::Energy,
        Self::Valence,
        Self::Tempo,
        Self::DurationMs,
    ];

    /// Fields offered for the scatter x, y and size roles.
    pub const AXIS_OPTIONS: [Self; 4] = [
        Self::ArtistFollowers,
        Self::ArtistPopularity,
        Self::TrackPopularity,
        Self::ReleaseYear,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::ArtistFollowers => "artist_followers",
            Self::ArtistPopularity => "artist_popularity",
            Self::TrackPopularity => "track_popularity",
            Self::ReleaseYear => "release_year",
            Self::Danceability => "danceability",
            Self::Energy => "energy",
            Self::Valence => "valence",
            Self::Tempo => "tempo",
            Self::DurationMs => "duration_ms",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ArtistFollowers => "Artist Followers",
            Self::ArtistPopularity => "Artist Popularity",
            Self::TrackPopularity => "Track Popularity",
            Self::ReleaseYear => "Release Year",
            Self::Danceability => "Danceability",
            Self::Energy => "Energy",
            Self::Valence => "Valence",
            Self::Tempo => "Tempo",
            Self::DurationMs => "Duration",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL.into_iter().find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn is_axis_option(self) -> bool {
        Self::AXIS_OPTIONS.contains(&self)
    }

    /// The record's value for this field. Non-finite when missing; implausible durations read
    /// as NaN.
    pub fn value(self, record: &TrackRecord) -> f64 {
        match self {
            Self::ArtistFollowers => record.artist_followers,
            Self::ArtistPopularity => record.artist_popularity,
            Self::TrackPopularity => record.track_popularity,
            Self::ReleaseYear => record.release_year.as_f64(),
            Self::Danceability => record.danceability,
            Self::Energy => record.energy,
            Self::Valence => record.valence,
            Self::Tempo => record.tempo,
            Self::DurationMs => {
                if record.has_plausible_duration(MIN_PLAUSIBLE_DURATION_MS) {
                    record.duration_ms
                } else {
                    f64::NAN
                }
            }
        }
    }

    /// Human-readable value for tooltips and tick labels.
    pub fn format_value(self, v: f64) -> String {
        if !v.is_finite() {
            return "-".to_string();
        }
        match self {
            Self::ArtistFollowers => format_compact(v),
            Self::ArtistPopularity | Self::TrackPopularity | Self::ReleaseYear => {
                format!("{}", v.round() as i64)
            }
            Self::Danceability | Self::Energy | Self::Valence => format!("{:.2}", v),
            Self::Tempo => format!("{:.0} BPM", v),
            Self::DurationMs => format_duration_ms(v),
        }
    }
}

impl std::fmt::Display for NumericField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// `1.2M`, `45.3K`, `812`.
fn format_compact(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        format!("{}", v.round() as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisRole {
    X,
    Y,
    Size,
}

/// Fields bound to the scatter's x, y and point-size roles. The three are always distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisSelection {
    x: NumericField,
    y: NumericField,
    size: NumericField,
}

impl Default for AxisSelection {
    fn default() -> Self {
        Self {
            x: NumericField::ArtistPopularity,
            y: NumericField::TrackPopularity,
            size: NumericField::ArtistFollowers,
        }
    }
}

impl AxisSelection {
    /// `None` unless the three fields are distinct axis options.
    pub fn new(x: NumericField, y: NumericField, size: NumericField) -> Option<Self> {
        let all_options = [x, y, size].iter().all(|f| f.is_axis_option());
        (all_options && x != y && x != size && y != size).then_some(Self { x, y, size })
    }

    pub fn x(&self) -> NumericField {
        self.x
    }

    pub fn y(&self) -> NumericField {
        self.y
    }

    pub fn size(&self) -> NumericField {
        self.size
    }

    pub fn get(&self, role: AxisRole) -> NumericField {
        match role {
            AxisRole::X => self.x,
            AxisRole::Y => self.y,
            AxisRole::Size => self.size,
        }
    }

    /// Bind `field` to `role`. Returns `false` and leaves the selection unchanged when the field
    /// is already used by another role or is not an axis option.
    pub fn set(&mut self, role: AxisRole, field: NumericField) -> bool {
        if !field.is_axis_option() {
            return false;
        }
        if self.get(role) == field {
            return true;
        }
        if [self.x, self.y, self.size].contains(&field) {
            return false;
        }
        match role {
            AxisRole::X => self.x = field,
            AxisRole::Y => self.y = field,
            AxisRole::Size => self.size = field,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawTrackRow, RecordNormalizer};

    #[test]
    fn duplicate_axis_rejected() {
        let mut sel = AxisSelection::default();
        assert!(!sel.set(AxisRole::X, NumericField::TrackPopularity));
        assert_eq!(sel, AxisSelection::default());
        assert!(sel.set(AxisRole::X, NumericField::ReleaseYear));
        assert_eq!(sel.x(), NumericField::ReleaseYear);
        assert!(sel.set(AxisRole::X, NumericField::ReleaseYear));
    }

    #[test]
    fn non_axis_field_rejected() {
        let mut sel = AxisSelection::default();
        assert!(!sel.set(AxisRole::Size, NumericField::Tempo));
        assert!(AxisSelection::new(
            NumericField::ReleaseYear,
            NumericField::ReleaseYear,
            NumericField::ArtistFollowers
        )
        .is_none());
    }

    #[test]
    fn implausible_duration_reads_nan() {
        let n = RecordNormalizer::default();
        let short = n.normalize(&RawTrackRow {
            duration: Some("0".into()),
            ..Default::default()
        });
        assert!(NumericField::DurationMs.value(&short).is_nan());
        let ok = n.normalize(&RawTrackRow {
            duration: Some("3.5".into()),
            ..Default::default()
        });
        assert_eq!(NumericField::DurationMs.value(&ok), 210_000.0);
    }

    #[test]
    fn formatting() {
        assert_eq!(NumericField::ArtistFollowers.format_value(1_230_000.0), "1.2M");
        assert_eq!(NumericField::TrackPopularity.format_value(71.6), "72");
        assert_eq!(NumericField::Energy.format_value(0.5), "0.50");
        assert_eq!(NumericField::DurationMs.format_value(210_000.0), "3:30");
        assert_eq!(NumericField::Tempo.format_value(f64::NAN), "-");
        assert_eq!(NumericField::parse("Release_Year"), Some(NumericField::ReleaseYear));
    }
}
