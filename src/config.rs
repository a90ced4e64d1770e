use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::aggregate::{YearWindow, TEMPORAL_MAX_YEAR, TEMPORAL_MIN_YEAR};
use crate::record::{NormalizeOptions, MAX_RELEASE_YEAR, MINUTES_THRESHOLD, MIN_RELEASE_YEAR};
use crate::regression::{RegressionEngine, MIN_ENTITY_SAMPLES, MIN_FAMILY_SAMPLES};
use crate::stack::StackOffset;
use crate::taxonomy::GenreFamily;
use crate::viewport::DEFAULT_MAX_ZOOM;

const CONFIG_FILE: &str = "config.toml";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration as TOML with every field commented out, so defaults apply until a
    /// user uncomments a line.
    pub fn generate_default_config(&self) -> Result<String> {
        let toml_str = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        Ok(Self::comment_all_fields(&toml_str, &Self::collect_all_comments()))
    }

    /// Collect all field comments from the per-section tables, keyed by `section.field`
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();
        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        let sections: [(&str, &[(&str, &str)]); 6] = [
            ("data", DATA_COMMENTS),
            ("normalize", NORMALIZE_COMMENTS),
            ("stream", STREAM_COMMENTS),
            ("scatter", SCATTER_COMMENTS),
            ("regression", REGRESSION_COMMENTS),
            ("linking", LINKING_COMMENTS),
        ];
        for (section, table) in sections {
            for (field, comment) in table {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }
        comments
    }

    fn comment_all_fields(toml: &str, comments: &HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# genrescope configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if let Some((_, header)) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header);
                    result.push('\n');
                }
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                current_section = section;
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, comments, &seen_fields)
    }

    /// Option fields are skipped by the serializer when `None`; list them as `# field = null`.
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        const OPTION_FIELDS: &[&str] = &[
            "data.tracks_path",
            "data.genre_fallback_path",
            "stream.family_order",
        ];

        for field_path in OPTION_FIELDS {
            if seen_fields.contains(*field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.split_once('.') else {
                continue;
            };
            let section_header = format!("# [{}]", section);
            let mut new_content = String::new();
            let insert_pos = match result.find(&section_header) {
                Some(section_pos) => {
                    let after_header_start = section_pos + section_header.len();
                    let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
                    after_header_start + newline_pos + 1
                }
                // empty tables may be left out by the serializer
                None => {
                    new_content.push_str(&section_header);
                    new_content.push('\n');
                    result.len()
                }
            };

            if let Some(comment) = comments.get(*field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n", field_name));
            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from a TOML line like "[stream]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    /// Extract `section.field` from a line like "max_zoom = 8.0"
    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write the commented default template to the config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Pass force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;
        tracing::info!(path = %config_path.display(), "wrote default config");

        Ok(config_path)
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub data: DataConfig,
    pub normalize: NormalizeConfig,
    pub stream: StreamConfig,
    pub scatter: ScatterConfig,
    pub regression: RegressionConfig,
    pub linking: LinkingConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "data",
        "# ============================================================================\n# Datasets\n# ============================================================================",
    ),
    (
        "normalize",
        "# ============================================================================\n# Record Normalization\n# ============================================================================",
    ),
    (
        "stream",
        "# ============================================================================\n# Stream View\n# ============================================================================",
    ),
    (
        "scatter",
        "# ============================================================================\n# Scatter View\n# ============================================================================",
    ),
    (
        "regression",
        "# ============================================================================\n# Trend Lines\n# ============================================================================",
    ),
    (
        "linking",
        "# ============================================================================\n# View Linking\n# ============================================================================",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    pub tracks_path: Option<PathBuf>,
    pub genre_fallback_path: Option<PathBuf>,
}

const DATA_COMMENTS: &[(&str, &str)] = &[
    (
        "tracks_path",
        "Track dataset CSV (track_popularity, artist_genres, album_release_date, ...)",
    ),
    (
        "genre_fallback_path",
        "Optional CSV with artist_name and artist_genres, consulted when a track has no genres",
    ),
];

impl DataConfig {
    pub fn merge(&mut self, other: Self) {
        if other.tracks_path.is_some() {
            self.tracks_path = other.tracks_path;
        }
        if other.genre_fallback_path.is_some() {
            self.genre_fallback_path = other.genre_fallback_path;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub min_year: i32,
    pub max_year: i32,
    pub minutes_threshold: f64,
}

const NORMALIZE_COMMENTS: &[(&str, &str)] = &[
    (
        "min_year",
        "Earliest accepted release year; earlier years are treated as unknown",
    ),
    (
        "max_year",
        "Latest accepted release year; later years are treated as unknown",
    ),
    (
        "minutes_threshold",
        "Durations below this value (and above zero) are read as minutes and converted to ms",
    ),
];

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            min_year: MIN_RELEASE_YEAR,
            max_year: MAX_RELEASE_YEAR,
            minutes_threshold: MINUTES_THRESHOLD,
        }
    }
}

impl NormalizeConfig {
    pub fn merge(&mut self, other: Self) {
        let default = NormalizeConfig::default();
        if other.min_year != default.min_year {
            self.min_year = other.min_year;
        }
        if other.max_year != default.max_year {
            self.max_year = other.max_year;
        }
        if other.minutes_threshold != default.minutes_threshold {
            self.minutes_threshold = other.minutes_threshold;
        }
    }

    pub fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            min_year: self.min_year,
            max_year: self.max_year,
            minutes_threshold: self.minutes_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub offset: StackOffset,
    pub min_year: i32,
    pub max_year: i32,
    pub max_zoom: f64,
    pub magnitude_scaling: bool,
    pub width: f64,
    pub height: f64,
    /// Stacking order, bottom first. None = precedence order.
    pub family_order: Option<Vec<GenreFamily>>,
}

const STREAM_COMMENTS: &[(&str, &str)] = &[
    (
        "offset",
        "Stack baseline: \"zero\", \"silhouette\" or \"wiggle\"",
    ),
    ("min_year", "First year shown in the stream view"),
    ("max_year", "Last year shown in the stream view"),
    ("max_zoom", "Maximum zoom factor (at least 1)"),
    (
        "magnitude_scaling",
        "Fit the value axis to the visible window (true) or keep the global domain (false)",
    ),
    ("width", "Initial plot width in pixels"),
    ("height", "Initial plot height in pixels"),
    (
        "family_order",
        "Stacking order, bottom first, e.g. [\"Pop\", \"HipHopRap\"]. Unlisted families follow in precedence order",
    ),
];

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            offset: StackOffset::Wiggle,
            min_year: TEMPORAL_MIN_YEAR,
            max_year: TEMPORAL_MAX_YEAR,
            max_zoom: DEFAULT_MAX_ZOOM,
            magnitude_scaling: true,
            width: 960.0,
            height: 320.0,
            family_order: None,
        }
    }
}

impl StreamConfig {
    pub fn merge(&mut self, other: Self) {
        let default = StreamConfig::default();
        if other.offset != default.offset {
            self.offset = other.offset;
        }
        if other.min_year != default.min_year {
            self.min_year = other.min_year;
        }
        if other.max_year != default.max_year {
            self.max_year = other.max_year;
        }
        if other.max_zoom != default.max_zoom {
            self.max_zoom = other.max_zoom;
        }
        if other.magnitude_scaling != default.magnitude_scaling {
            self.magnitude_scaling = other.magnitude_scaling;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.family_order.is_some() {
            self.family_order = other.family_order;
        }
    }

    pub fn window(&self) -> YearWindow {
        YearWindow::new(self.min_year, self.max_year)
    }

    /// Full stacking order: configured families first (duplicates dropped), then the rest in
    /// precedence order.
    pub fn stack_order(&self) -> Vec<GenreFamily> {
        let mut order: Vec<GenreFamily> = Vec::with_capacity(GenreFamily::COUNT);
        for family in self.family_order.iter().flatten() {
            if !order.contains(family) {
                order.push(*family);
            }
        }
        for family in GenreFamily::ALL {
            if !order.contains(&family) {
                order.push(family);
            }
        }
        order
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    pub max_zoom: f64,
    pub auto_y_scaling: bool,
    pub show_genre_lines: bool,
    pub show_artist_points: bool,
    pub restrict_trends_to_window: bool,
    pub width: f64,
    pub height: f64,
}

const SCATTER_COMMENTS: &[(&str, &str)] = &[
    ("max_zoom", "Maximum zoom factor on the x axis (at least 1)"),
    (
        "auto_y_scaling",
        "Refit the y axis to the points in the visible x window while zoomed",
    ),
    ("show_genre_lines", "Draw per-family trend lines"),
    (
        "show_artist_points",
        "With an artist selected, keep other points visible (faded)",
    ),
    (
        "restrict_trends_to_window",
        "While zoomed, fit trend lines only to points inside the visible x window",
    ),
    ("width", "Initial plot width in pixels"),
    ("height", "Initial plot height in pixels"),
];

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            auto_y_scaling: true,
            show_genre_lines: false,
            show_artist_points: true,
            restrict_trends_to_window: true,
            width: 480.0,
            height: 360.0,
        }
    }
}

impl ScatterConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ScatterConfig::default();
        if other.max_zoom != default.max_zoom {
            self.max_zoom = other.max_zoom;
        }
        if other.auto_y_scaling != default.auto_y_scaling {
            self.auto_y_scaling = other.auto_y_scaling;
        }
        if other.show_genre_lines != default.show_genre_lines {
            self.show_genre_lines = other.show_genre_lines;
        }
        if other.show_artist_points != default.show_artist_points {
            self.show_artist_points = other.show_artist_points;
        }
        if other.restrict_trends_to_window != default.restrict_trends_to_window {
            self.restrict_trends_to_window = other.restrict_trends_to_window;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub min_family_samples: usize,
    pub min_entity_samples: usize,
}

const REGRESSION_COMMENTS: &[(&str, &str)] = &[
    (
        "min_family_samples",
        "Minimum valid points before a genre family gets a trend line",
    ),
    (
        "min_entity_samples",
        "Minimum valid points before the selected artist gets a trend line",
    ),
];

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            min_family_samples: MIN_FAMILY_SAMPLES,
            min_entity_samples: MIN_ENTITY_SAMPLES,
        }
    }
}

impl RegressionConfig {
    pub fn merge(&mut self, other: Self) {
        let default = RegressionConfig::default();
        if other.min_family_samples != default.min_family_samples {
            self.min_family_samples = other.min_family_samples;
        }
        if other.min_entity_samples != default.min_entity_samples {
            self.min_entity_samples = other.min_entity_samples;
        }
    }

    pub fn engine(&self) -> RegressionEngine {
        RegressionEngine::new(self.min_family_samples, self.min_entity_samples)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    pub linked: bool,
}

const LINKING_COMMENTS: &[(&str, &str)] = &[(
    "linked",
    "Bar chart statistics follow the stream view's visible years",
)];

impl Default for LinkingConfig {
    fn default() -> Self {
        Self { linked: true }
    }
}

impl LinkingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.linked != LinkingConfig::default().linked {
            self.linked = other.linked;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            data: DataConfig::default(),
            normalize: NormalizeConfig::default(),
            stream: StreamConfig::default(),
            scatter: ScatterConfig::default(),
            regression: RegressionConfig::default(),
            linking: LinkingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load using an explicit config directory
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(&config_path)?);

        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;

        tracing::debug!(path = %config_path.display(), "loaded configuration");
        Ok(config)
    }

    fn load_user_config(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        Self::from_toml(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    pub fn from_toml(content: &str) -> Result<AppConfig> {
        Ok(toml::from_str(content)?)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.data.merge(other.data);
        self.normalize.merge(other.normalize);
        self.stream.merge(other.stream);
        self.scatter.merge(other.scatter);
        self.regression.merge(other.regression);
        self.linking.merge(other.linking);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.normalize.min_year > self.normalize.max_year {
            return Err(eyre!(
                "normalize.min_year ({}) must not exceed normalize.max_year ({})",
                self.normalize.min_year,
                self.normalize.max_year
            ));
        }
        if self.normalize.minutes_threshold.is_nan() || self.normalize.minutes_threshold < 0.0 {
            return Err(eyre!("normalize.minutes_threshold must be zero or greater"));
        }

        if self.stream.min_year > self.stream.max_year {
            return Err(eyre!(
                "stream.min_year ({}) must not exceed stream.max_year ({})",
                self.stream.min_year,
                self.stream.max_year
            ));
        }

        for (name, zoom) in [
            ("stream.max_zoom", self.stream.max_zoom),
            ("scatter.max_zoom", self.scatter.max_zoom),
        ] {
            if !zoom.is_finite() || zoom < 1.0 {
                return Err(eyre!("{} must be a finite value of at least 1, got {}", name, zoom));
            }
        }

        for (name, size) in [
            ("stream.width", self.stream.width),
            ("stream.height", self.stream.height),
            ("scatter.width", self.scatter.width),
            ("scatter.height", self.scatter.height),
        ] {
            if !size.is_finite() || size <= 0.0 {
                return Err(eyre!("{} must be greater than 0, got {}", name, size));
            }
        }

        if self.regression.min_family_samples < 2 {
            return Err(eyre!("regression.min_family_samples must be at least 2"));
        }
        if self.regression.min_entity_samples < 2 {
            return Err(eyre!("regression.min_entity_samples must be at least 2"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_zoom_rejected() {
        let mut config = AppConfig::default();
        config.stream.max_zoom = 0.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("stream.max_zoom"));
    }

    #[test]
    fn inverted_years_rejected() {
        let mut config = AppConfig::default();
        config.normalize.min_year = 2030;
        assert!(config.validate().is_err());
        let mut config = AppConfig::default();
        config.stream.min_year = 2000;
        config.stream.max_year = 1990;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_merges() {
        let user = AppConfig::from_toml(
            "[stream]\noffset = \"zero\"\nfamily_order = [\"Latin\", \"Pop\"]\n[linking]\nlinked = false\n",
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.merge(user);
        assert_eq!(config.stream.offset, StackOffset::Zero);
        assert!(!config.linking.linked);
        assert_eq!(config.stream.max_zoom, DEFAULT_MAX_ZOOM);
        let order = config.stream.stack_order();
        assert_eq!(&order[..3], &[GenreFamily::Latin, GenreFamily::Pop, GenreFamily::HipHopRap]);
        assert_eq!(order.len(), GenreFamily::COUNT);
    }

    #[test]
    fn template_is_fully_commented() {
        let manager = ConfigManager::with_dir(PathBuf::from("/nonexistent"));
        let template = manager.generate_default_config().unwrap();
        assert!(template.contains("# [stream]"));
        assert!(template.contains("# offset = \"wiggle\""));
        assert!(template.contains("# tracks_path = null"));
        for line in template.lines() {
            assert!(line.is_empty() || line.starts_with('#'), "uncommented line: {line}");
        }
        // uncommenting nothing yields the defaults
        let stripped: String = template
            .lines()
            .filter(|l| !l.starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(AppConfig::from_toml(&stripped).unwrap(), AppConfig::default());
    }
}
