//! Computational core of a coordinated multi-view dashboard over a music-track dataset.
//!
//! Raw rows are normalized into [`TrackRecord`]s, bucketed by year and genre family, stacked
//! into streamgraph bands and exposed through three linked views (stream, scatter, popularity
//! bars). All geometry is plain serializable data handed to an external renderer.

pub mod aggregate;
pub mod broker;
pub mod config;
pub mod dashboard;
pub mod error_display;
pub mod fields;
pub mod record;
pub mod regression;
pub mod scale;
pub mod scatter;
pub mod source;
pub mod stack;
pub mod statistics;
pub mod taxonomy;
pub mod viewport;

pub use aggregate::{YearBuckets, YearRange, YearWindow};
pub use broker::CoordinationBroker;
pub use config::{AppConfig, ConfigManager};
pub use dashboard::{Dashboard, Interaction, RenderFrame, View, ZoomGesture};
pub use error_display::user_message;
pub use fields::{AxisRole, AxisSelection, NumericField};
pub use record::{RawTrackRow, RecordNormalizer, ReleaseYear, TrackRecord};
pub use regression::{fit_line, LinearFit, RegressionEngine, TrendLine};
pub use stack::{Band, Stack, StackOffset, StackedLayer};
pub use taxonomy::{classify, FamilySet, GenreFallback, GenreFamily};
pub use viewport::{ViewportController, ZoomTransform};

/// Application name used for the config directory
pub const APP_NAME: &str = "genrescope";
