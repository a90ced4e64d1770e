//! Scatter view: point geometry, emphasis, radius scale, auto-y refit and trend lines.

use serde::Serialize;

use crate::fields::{AxisSelection, NumericField};
use crate::record::TrackRecord;
use crate::regression::{RegressionEngine, TrendLine};
use crate::scale::{axis_ticks_with, LinearScale, SqrtScale, Tick, DEFAULT_TICK_COUNT};
use crate::taxonomy::{FamilySet, GenreFamily};
use crate::viewport::ViewportController;

pub const BASE_OPACITY: f64 = 0.28;
pub const FAINT_OPACITY: f64 = 0.12;
pub const RADIUS_RANGE: (f64, f64) = (2.0, 10.0);
const SCATTER_TICK_COUNT: usize = 8;

/// Per-render switches for the scatter view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScatterOptions {
    /// Trimmed, lowercased artist name.
    pub selected_artist: Option<String>,
    pub show_artist_points: bool,
    pub show_genre_lines: bool,
    pub restrict_trends_to_window: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub record_index: usize,
    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
    pub radius: f64,
    pub family: GenreFamily,
    pub color: &'static str,
    pub opacity: f64,
    pub selected: bool,
    pub artist_name: String,
    pub track_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterFrame {
    pub x_field: NumericField,
    pub y_field: NumericField,
    pub size_field: NumericField,
    pub title: String,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub points: Vec<ScatterPoint>,
    pub trend_lines: Vec<TrendLine>,
    pub artist_line: Option<TrendLine>,
}

fn finite_extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn valid_pairs<'a>(
    records: &'a [TrackRecord],
    axes: &'a AxisSelection,
) -> impl Iterator<Item = (usize, f64, f64)> + 'a {
    records.iter().enumerate().filter_map(|(i, r)| {
        let (x, y) = (axes.x().value(r), axes.y().value(r));
        (x.is_finite() && y.is_finite()).then_some((i, x, y))
    })
}

/// Niced `(x, y)` extents over records with both values finite; unit domains when none are.
pub fn scatter_extents(records: &[TrackRecord], axes: &AxisSelection) -> ((f64, f64), (f64, f64)) {
    let pairs: Vec<(usize, f64, f64)> = valid_pairs(records, axes).collect();
    let x = finite_extent(pairs.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let y = finite_extent(pairs.iter().map(|p| p.2)).unwrap_or((0.0, 1.0));
    let nice = |d: (f64, f64)| LinearScale::new(d, (0.0, 1.0)).nice(DEFAULT_TICK_COUNT).domain();
    (nice(x), nice(y))
}

/// Square-root radius scale over the positive finite values of `size`.
pub fn radius_scale(records: &[TrackRecord], size: NumericField) -> SqrtScale {
    let extent = finite_extent(records.iter().map(|r| size.value(r)).filter(|v| *v > 0.0));
    let (lo, hi) = extent.unwrap_or((1.0, 2.0));
    SqrtScale::new((lo.max(1.0), hi.max(2.0)), RADIUS_RANGE)
}

/// y domain fitted to the points inside `x_window`: `[max(0, floor(min)), ceil(max)]`, niced.
/// `None` when the window holds no valid point.
pub fn auto_y_domain(
    records: &[TrackRecord],
    axes: &AxisSelection,
    x_window: (f64, f64),
) -> Option<(f64, f64)> {
    let (lo, hi) = finite_extent(
        valid_pairs(records, axes)
            .filter(|(_, x, _)| *x >= x_window.0 && *x <= x_window.1)
            .map(|(_, _, y)| y),
    )?;
    let domain = (lo.floor().max(0.0), hi.ceil());
    Some(LinearScale::new(domain, (0.0, 1.0)).nice(DEFAULT_TICK_COUNT).domain())
}

pub fn point_opacity(record: &TrackRecord, enabled: FamilySet, options: &ScatterOptions) -> f64 {
    let selected = options.selected_artist.as_deref();
    if selected.is_some_and(|a| record.is_by_artist(a)) {
        return 1.0;
    }
    if !enabled.contains(record.genre) {
        return 0.0;
    }
    match selected {
        Some(_) if !options.show_artist_points => 0.0,
        Some(_) => FAINT_OPACITY,
        None => BASE_OPACITY,
    }
}

/// Scatter state that outlives a single frame: the x viewport, the fitted y domain and the
/// radius scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterView {
    viewport: ViewportController,
    height: f64,
    base_y: (f64, f64),
    y_domain: (f64, f64),
    radius: SqrtScale,
}

impl ScatterView {
    pub fn new(
        records: &[TrackRecord],
        axes: &AxisSelection,
        width: f64,
        height: f64,
        max_zoom: f64,
    ) -> Self {
        let (x, y) = scatter_extents(records, axes);
        Self {
            viewport: ViewportController::new(x, width, max_zoom),
            height: height.max(0.0),
            base_y: y,
            y_domain: y,
            radius: radius_scale(records, axes.size()),
        }
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn y_domain(&self) -> (f64, f64) {
        self.y_domain
    }

    /// Recompute extents and radius for a new axis selection; resets the zoom.
    pub fn rebuild(&mut self, records: &[TrackRecord], axes: &AxisSelection) {
        let (x, y) = scatter_extents(records, axes);
        self.viewport.set_domain(x);
        self.base_y = y;
        self.y_domain = y;
        self.radius = radius_scale(records, axes.size());
    }

    /// Refit y after the x window changed. Without auto-y, or with an empty window, the y domain
    /// stays as it was (base domain when auto-y is off).
    pub fn refit_y(&mut self, records: &[TrackRecord], axes: &AxisSelection, auto_y: bool) {
        if !auto_y || !self.viewport.is_zoomed() {
            self.y_domain = self.base_y;
            return;
        }
        if let Some(domain) = auto_y_domain(records, axes, self.viewport.visible_domain()) {
            self.y_domain = domain;
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width);
        self.height = height.max(0.0);
    }

    pub fn frame(
        &self,
        records: &[TrackRecord],
        axes: &AxisSelection,
        enabled: FamilySet,
        options: &ScatterOptions,
        engine: &RegressionEngine,
    ) -> ScatterFrame {
        let x_scale = self.viewport.rescaled();
        let x_domain = self.viewport.visible_domain();
        let y_scale = LinearScale::new(self.y_domain, (self.height, 0.0));

        let points = valid_pairs(records, axes)
            .filter(|(_, x, _)| *x >= x_domain.0 && *x <= x_domain.1)
            .filter_map(|(i, x, y)| {
                let r = &records[i];
                let opacity = point_opacity(r, enabled, options);
                (opacity > 0.0).then(|| ScatterPoint {
                    record_index: i,
                    x,
                    y,
                    px: x_scale.map(x),
                    py: y_scale.map(y),
                    radius: self.radius.map(axes.size().value(r)),
                    family: r.genre,
                    color: r.genre.color_hex(),
                    opacity,
                    selected: opacity == 1.0,
                    artist_name: r.artist_name.clone(),
                    track_name: r.track_name.clone(),
                })
            })
            .collect();

        let window = (options.restrict_trends_to_window && self.viewport.is_zoomed())
            .then_some(x_domain);
        let trend_lines = if options.show_genre_lines {
            engine.family_trends(records, axes.x(), axes.y(), enabled, window)
        } else {
            Vec::new()
        };
        let artist_line = options.selected_artist.as_deref().and_then(|artist| {
            engine.entity_trend(records, artist, axes.x(), axes.y(), x_domain, window)
        });

        ScatterFrame {
            x_field: axes.x(),
            y_field: axes.y(),
            size_field: axes.size(),
            title: format!("{} vs {}", axes.y().label(), axes.x().label()),
            x_domain,
            y_domain: self.y_domain,
            x_ticks: axis_ticks_with(&x_scale, SCATTER_TICK_COUNT, |v| axes.x().format_value(v)),
            y_ticks: axis_ticks_with(&y_scale, SCATTER_TICK_COUNT, |v| axes.y().format_value(v)),
            points,
            trend_lines,
            artist_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RawTrackRow, RecordNormalizer};
    use crate::viewport::ZoomTransform;

    fn record(artist: &str, artist_pop: f64, track_pop: f64, followers: f64, genre: &str) -> TrackRecord {
        RecordNormalizer::default().normalize(&RawTrackRow {
            artist_name: Some(artist.into()),
            artist_popularity: Some(artist_pop.to_string()),
            track_popularity: Some(track_pop.to_string()),
            artist_followers: Some(followers.to_string()),
            artist_genres: Some(genre.into()),
            ..Default::default()
        })
    }

    fn records() -> Vec<TrackRecord> {
        vec![
            record("A", 10.0, 20.0, 100.0, "pop"),
            record("B", 50.0, 55.0, 10_000.0, "rock"),
            record("A", 90.0, 87.0, 1_000.0, "pop"),
            record("C", f64::NAN, 40.0, 5.0, "jazz"),
        ]
    }

    #[test]
    fn extents_ignore_invalid_pairs() {
        let (x, y) = scatter_extents(&records(), &AxisSelection::default());
        assert_eq!(x, (10.0, 90.0));
        assert_eq!(y, (20.0, 90.0));
    }

    #[test]
    fn radius_domain_floor() {
        let r = radius_scale(&records(), NumericField::ArtistFollowers);
        assert_eq!(r.domain(), (5.0, 10_000.0));
        let r = radius_scale(&[], NumericField::ArtistFollowers);
        assert_eq!(r.domain(), (1.0, 2.0));
    }

    #[test]
    fn emphasis_rules() {
        let recs = records();
        let mut opts = ScatterOptions {
            show_artist_points: true,
            ..Default::default()
        };
        assert_eq!(point_opacity(&recs[1], FamilySet::all(), &opts), BASE_OPACITY);
        assert_eq!(point_opacity(&recs[1], FamilySet::all().without(GenreFamily::RockAlternative), &opts), 0.0);

        opts.selected_artist = Some("a".into());
        assert_eq!(point_opacity(&recs[0], FamilySet::all(), &opts), 1.0);
        assert_eq!(point_opacity(&recs[1], FamilySet::all(), &opts), FAINT_OPACITY);

        opts.show_artist_points = false;
        assert_eq!(point_opacity(&recs[1], FamilySet::all(), &opts), 0.0);
        assert_eq!(point_opacity(&recs[0], FamilySet::empty(), &opts), 1.0);
    }

    #[test]
    fn auto_y_fits_window() {
        let recs = records();
        let d = auto_y_domain(&recs, &AxisSelection::default(), (40.0, 95.0)).unwrap();
        assert_eq!(d, (55.0, 90.0));
        assert!(auto_y_domain(&recs, &AxisSelection::default(), (95.0, 99.0)).is_none());
    }

    #[test]
    fn frame_with_selected_artist() {
        let recs = records();
        let axes = AxisSelection::default();
        let view = ScatterView::new(&recs, &axes, 400.0, 300.0, 8.0);
        let opts = ScatterOptions {
            selected_artist: Some("a".into()),
            show_artist_points: false,
            show_genre_lines: true,
            restrict_trends_to_window: true,
        };
        let frame = view.frame(&recs, &axes, FamilySet::all(), &opts, &RegressionEngine::default());
        assert_eq!(frame.points.len(), 2);
        assert!(frame.points.iter().all(|p| p.selected));
        // too few points per family for a genre line
        assert!(frame.trend_lines.is_empty());
        let line = frame.artist_line.unwrap();
        assert_eq!(line.start.0, 10.0);
        assert_eq!(line.end.0, 90.0);
        assert_eq!(frame.title, "Track Popularity vs Artist Popularity");
    }

    #[test]
    fn zoom_refits_y() {
        let recs = records();
        let axes = AxisSelection::default();
        let mut view = ScatterView::new(&recs, &axes, 400.0, 300.0, 8.0);
        view.viewport_mut().set_transform(ZoomTransform::new(2.0, -400.0));
        view.refit_y(&recs, &axes, true);
        assert_eq!(view.viewport().visible_domain(), (50.0, 90.0));
        assert_eq!(view.y_domain(), (55.0, 90.0));
        view.refit_y(&recs, &axes, false);
        assert_eq!(view.y_domain(), (20.0, 90.0));
    }
}
