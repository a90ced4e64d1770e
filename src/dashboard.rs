//! The dashboard context: owns every piece of shared view state and turns interaction events
//! into freshly derived render frames.
//!
//! Discrete events (toggles, axis changes, linking) recompute immediately and return a frame.
//! Continuous gestures (zoom, pan) only land in the owning viewport's pending slot; the frame
//! driver calls [`Dashboard::on_animation_frame`] once per frame to apply the latest one.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::aggregate::{YearBuckets, YearRange};
use crate::broker::CoordinationBroker;
use crate::config::AppConfig;
use crate::fields::{AxisRole, AxisSelection, NumericField};
use crate::record::{unique_artists, RawTrackRow, RecordNormalizer, TrackRecord};
use crate::regression::RegressionEngine;
use crate::scale::{
    axis_ticks, axis_ticks_with, tick_count_for_span, LinearScale, Tick, DEFAULT_TICK_COUNT,
};
use crate::scatter::{ScatterFrame, ScatterOptions, ScatterView};
use crate::source;
use crate::stack::{Stack, StackOffset, StackedLayer};
use crate::statistics::{popularity_summary, POPULARITY_DOMAIN};
use crate::taxonomy::{FamilySet, GenreFallback, GenreFamily};
use crate::viewport::{ViewportController, ZoomTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Stream,
    Scatter,
}

/// A continuous zoom/pan gesture in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoomGesture {
    /// Absolute transform as reported by the input layer.
    Transform { k: f64, x: f64 },
    ZoomBy { factor: f64, anchor: f64 },
    PanBy { dx: f64 },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    StreamZoom { gesture: ZoomGesture },
    ScatterZoom { gesture: ZoomGesture },
    ToggleFamily { family: GenreFamily },
    SetAxis { role: AxisRole, field: NumericField },
    SelectArtist { artist: Option<String> },
    SetShowArtistPoints { show: bool },
    SetShowGenreLines { show: bool },
    SetLinked { linked: bool },
    SetMagnitudeScaling { enabled: bool },
    SetOffset { offset: StackOffset },
    Resize { view: View, width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub family: GenreFamily,
    pub label: &'static str,
    pub color: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamFrame {
    pub offset: StackOffset,
    pub magnitude_scaling: bool,
    pub visible: YearRange,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    /// Collapsed layers, restricted to the visible years.
    pub layers: Vec<StackedLayer>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    pub family: GenreFamily,
    pub label: &'static str,
    pub color: &'static str,
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
    pub error_low: f64,
    pub error_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarFrame {
    pub title: String,
    pub window_label: String,
    pub y_domain: (f64, f64),
    pub bars: Vec<BarEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerState {
    pub visible: Option<YearRange>,
    pub linked: bool,
    pub window_label: String,
}

/// Everything the renderer needs for one paint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub sequence: u64,
    /// `None` only until the first non-empty stream window has been derived.
    pub stream: Option<StreamFrame>,
    pub scatter: ScatterFrame,
    pub bars: BarFrame,
    pub broker: BrokerState,
}

impl RenderFrame {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn apply_gesture(viewport: &mut ViewportController, gesture: ZoomGesture) {
    match gesture {
        ZoomGesture::Transform { k, x } => viewport.request(ZoomTransform::new(k, x)),
        ZoomGesture::ZoomBy { factor, anchor } => viewport.zoom_by(factor, anchor),
        ZoomGesture::PanBy { dx } => viewport.pan_by(dx),
        ZoomGesture::Reset => viewport.request(ZoomTransform::IDENTITY),
    }
}

fn normalize_artist(artist: Option<String>) -> Option<String> {
    artist
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
}

pub struct Dashboard {
    records: Vec<TrackRecord>,
    buckets: YearBuckets,
    order: Vec<GenreFamily>,
    canonical: Stack,
    collapsed: Stack,
    enabled: FamilySet,
    stream_viewport: ViewportController,
    stream_height: f64,
    magnitude_scaling: bool,
    last_stream: Option<StreamFrame>,
    scatter: ScatterView,
    axes: AxisSelection,
    scatter_options: ScatterOptions,
    auto_y: bool,
    broker: CoordinationBroker,
    engine: RegressionEngine,
    recomputes: u64,
}

impl Dashboard {
    pub fn new(records: Vec<TrackRecord>, config: &AppConfig) -> Self {
        let order = config.stream.stack_order();
        let window = config.stream.window();
        let buckets = YearBuckets::from_records(&records, &order, window);
        let canonical = Stack::compute(&buckets, &order, config.stream.offset);
        let enabled = FamilySet::all();
        let collapsed = canonical.collapse(enabled);

        let extent = buckets
            .extent()
            .unwrap_or((window.start, window.end));
        let stream_viewport = ViewportController::new(
            (f64::from(extent.0), f64::from(extent.1)),
            config.stream.width,
            config.stream.max_zoom,
        );

        let axes = AxisSelection::default();
        let scatter = ScatterView::new(
            &records,
            &axes,
            config.scatter.width,
            config.scatter.height,
            config.scatter.max_zoom,
        );

        tracing::info!(
            records = records.len(),
            first_year = extent.0,
            last_year = extent.1,
            offset = config.stream.offset.as_str(),
            "dashboard ready"
        );

        Self {
            records,
            buckets,
            order,
            canonical,
            collapsed,
            enabled,
            stream_viewport,
            stream_height: config.stream.height,
            magnitude_scaling: config.stream.magnitude_scaling,
            last_stream: None,
            scatter,
            axes,
            scatter_options: ScatterOptions {
                selected_artist: None,
                show_artist_points: config.scatter.show_artist_points,
                show_genre_lines: config.scatter.show_genre_lines,
                restrict_trends_to_window: config.scatter.restrict_trends_to_window,
            },
            auto_y: config.scatter.auto_y_scaling,
            broker: CoordinationBroker::new(config.linking.linked),
            engine: config.regression.engine(),
            recomputes: 0,
        }
    }

    /// Normalize raw rows and build the dashboard.
    pub fn from_rows(rows: &[RawTrackRow], fallback: GenreFallback, config: &AppConfig) -> Self {
        let normalizer = RecordNormalizer::new(config.normalize.options(), fallback);
        Self::new(normalizer.normalize_all(rows), config)
    }

    /// Load the datasets named in `config.data` and build the dashboard.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let tracks_path = config
            .data
            .tracks_path
            .as_deref()
            .ok_or_else(|| eyre!("No track dataset configured (set data.tracks_path)"))?;
        let rows = source::load_track_rows(tracks_path)?;
        let fallback = match config.data.genre_fallback_path.as_deref() {
            Some(path) => source::load_genre_fallback(path)?,
            None => GenreFallback::new(),
        };
        Ok(Self::from_rows(&rows, fallback, config))
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn buckets(&self) -> &YearBuckets {
        &self.buckets
    }

    pub fn canonical_stack(&self) -> &Stack {
        &self.canonical
    }

    pub fn collapsed_stack(&self) -> &Stack {
        &self.collapsed
    }

    pub fn enabled(&self) -> FamilySet {
        self.enabled
    }

    pub fn axes(&self) -> AxisSelection {
        self.axes
    }

    pub fn broker(&self) -> CoordinationBroker {
        self.broker
    }

    pub fn stream_viewport(&self) -> &ViewportController {
        &self.stream_viewport
    }

    pub fn scatter_view(&self) -> &ScatterView {
        &self.scatter
    }

    pub fn selected_artist(&self) -> Option<&str> {
        self.scatter_options.selected_artist.as_deref()
    }

    /// Number of full recomputes so far.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Sorted unique artist names for the entity selector.
    pub fn artists(&self) -> Vec<String> {
        unique_artists(&self.records)
    }

    /// Apply one interaction. Discrete events return the recomputed frame; continuous gestures
    /// and rejected changes return `None`.
    pub fn handle(&mut self, event: Interaction) -> Option<RenderFrame> {
        tracing::debug!(?event, "interaction");
        match event {
            Interaction::StreamZoom { gesture } => {
                apply_gesture(&mut self.stream_viewport, gesture);
                return None;
            }
            Interaction::ScatterZoom { gesture } => {
                apply_gesture(self.scatter.viewport_mut(), gesture);
                return None;
            }
            Interaction::ToggleFamily { family } => {
                self.enabled.toggle(family);
                self.collapsed = self.canonical.collapse(self.enabled);
            }
            Interaction::SetAxis { role, field } => {
                if !self.axes.set(role, field) {
                    tracing::debug!(?role, ?field, "axis change rejected");
                    return None;
                }
                self.scatter.rebuild(&self.records, &self.axes);
            }
            Interaction::SelectArtist { artist } => {
                self.scatter_options.selected_artist = normalize_artist(artist);
            }
            Interaction::SetShowArtistPoints { show } => {
                self.scatter_options.show_artist_points = show;
            }
            Interaction::SetShowGenreLines { show } => {
                self.scatter_options.show_genre_lines = show;
            }
            Interaction::SetLinked { linked } => {
                self.broker = self.broker.with_linked(linked);
            }
            Interaction::SetMagnitudeScaling { enabled } => {
                self.magnitude_scaling = enabled;
            }
            Interaction::SetOffset { offset } => {
                self.canonical = Stack::compute(&self.buckets, &self.order, offset);
                self.collapsed = self.canonical.collapse(self.enabled);
            }
            Interaction::Resize {
                view,
                width,
                height,
            } => match view {
                View::Stream => {
                    self.stream_viewport.resize(width);
                    self.stream_height = height.max(0.0);
                }
                View::Scatter => {
                    self.scatter.resize(width, height);
                }
            },
        }
        Some(self.render())
    }

    /// Drain both pending slots. Returns a frame only when a queued transform was applied.
    pub fn on_animation_frame(&mut self) -> Option<RenderFrame> {
        let stream_changed = self.stream_viewport.apply_pending().is_some();
        let scatter_changed = self.scatter.viewport_mut().apply_pending().is_some();
        if scatter_changed {
            self.scatter.refit_y(&self.records, &self.axes, self.auto_y);
        }
        if !stream_changed && !scatter_changed {
            return None;
        }
        Some(self.render())
    }

    fn legend(&self) -> Vec<LegendEntry> {
        self.order
            .iter()
            .map(|&family| LegendEntry {
                family,
                label: family.as_str(),
                color: family.color_hex(),
                enabled: self.enabled.contains(family),
            })
            .collect()
    }

    /// Stream geometry for the current window, or `None` when families are enabled but none of
    /// their bands is visible. With nothing enabled the layers lie flat on the previous y domain.
    fn stream_frame(&self) -> Option<StreamFrame> {
        let visible = self.stream_viewport.visible_range();
        let (y_domain, span) = match self.collapsed.vertical_domain(&visible, self.enabled) {
            Some(in_window) => {
                let domain = if self.magnitude_scaling {
                    in_window
                } else {
                    self.collapsed.global_domain(self.enabled)?
                };
                let y_domain = LinearScale::new((domain.min, domain.max), (self.stream_height, 0.0))
                    .nice(DEFAULT_TICK_COUNT)
                    .domain();
                (y_domain, in_window.max - in_window.min)
            }
            None if self.enabled.is_empty() => {
                let y_domain = self
                    .last_stream
                    .as_ref()
                    .map_or((0.0, 1.0), |frame| frame.y_domain);
                (y_domain, y_domain.1 - y_domain.0)
            }
            None => return None,
        };

        let y_scale = LinearScale::new(y_domain, (self.stream_height, 0.0));
        let x_scale = self.stream_viewport.rescaled();
        let y_ticks = axis_ticks(&y_scale, tick_count_for_span(span));
        let x_ticks = axis_ticks_with(&x_scale, DEFAULT_TICK_COUNT, |v| {
            format!("{}", v.round() as i64)
        });

        Some(StreamFrame {
            offset: self.canonical.offset(),
            magnitude_scaling: self.magnitude_scaling,
            visible,
            x_domain: (visible.start, visible.end),
            y_domain,
            x_ticks,
            y_ticks,
            layers: self.collapsed.clip(&visible).layers().to_vec(),
            legend: self.legend(),
        })
    }

    fn bar_frame(&self) -> BarFrame {
        let window_label = self.broker.window_label();
        let bars = popularity_summary(&self.records, self.broker.active_window())
            .into_iter()
            .map(|s| {
                let (error_low, error_high) = s.error_bar();
                BarEntry {
                    family: s.family,
                    label: s.family.as_str(),
                    color: s.family.color_hex(),
                    mean: s.mean,
                    std_dev: s.std_dev,
                    count: s.count,
                    error_low,
                    error_high,
                }
            })
            .collect();
        BarFrame {
            title: format!("Mean Track Popularity by Genre Family ({})", window_label),
            window_label,
            y_domain: POPULARITY_DOMAIN,
            bars,
        }
    }

    /// Recompute every view from the current state.
    pub fn render(&mut self) -> RenderFrame {
        self.recomputes += 1;

        match self.stream_frame() {
            Some(frame) => {
                // the full extent counts as "no window"
                let range = self
                    .stream_viewport
                    .is_zoomed()
                    .then_some(frame.visible);
                self.broker = self.broker.with_range(range);
                self.last_stream = Some(frame);
            }
            None => {
                tracing::debug!("empty stream window, keeping previous geometry");
                let legend = self.legend();
                if let Some(frame) = self.last_stream.as_mut() {
                    frame.legend = legend;
                }
            }
        }

        let scatter = self.scatter.frame(
            &self.records,
            &self.axes,
            self.enabled,
            &self.scatter_options,
            &self.engine,
        );
        let bars = self.bar_frame();

        RenderFrame {
            sequence: self.recomputes,
            stream: self.last_stream.clone(),
            scatter,
            bars,
            broker: BrokerState {
                visible: self.broker.visible(),
                linked: self.broker.is_linked(),
                window_label: self.broker.window_label(),
            },
        }
    }
}
