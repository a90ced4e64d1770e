#![allow(dead_code)]

use genrescope::config::AppConfig;
use genrescope::{GenreFamily, RawTrackRow, StackOffset};
use std::fs;
use std::path::{Path, PathBuf};

pub fn track_row(year: &str, genres: &str, popularity: &str, artist: &str) -> RawTrackRow {
    RawTrackRow {
        album_release_date: Some(year.to_string()),
        artist_genres: Some(genres.to_string()),
        track_popularity: Some(popularity.to_string()),
        artist_name: Some(artist.to_string()),
        ..Default::default()
    }
}

/// `count` identical rows.
pub fn repeated(count: usize, year: &str, genres: &str, popularity: &str) -> Vec<RawTrackRow> {
    (0..count)
        .map(|_| track_row(year, genres, popularity, "Filler"))
        .collect()
}

/// Three years × two families: Latin ("B", bottom) and Pop ("A", top).
///
/// (2000, A) 10, (2000, B) 5, (2001, A) 0, (2001, B) 20, (2002, A) 15, (2002, B) 15
pub fn scenario_rows() -> Vec<RawTrackRow> {
    let mut rows = Vec::new();
    rows.extend(repeated(10, "2000-05-01", "['pop']", "70"));
    rows.extend(repeated(5, "2000", "['latin']", "50"));
    rows.extend(repeated(20, "2001-01-01", "['reggaeton']", "60"));
    rows.extend(repeated(15, "2002", "['dance pop']", "40"));
    rows.extend(repeated(15, "2002", "['reggaeton', 'latin']", "30"));
    rows
}

pub fn scenario_config(offset: StackOffset) -> AppConfig {
    let mut config = AppConfig::default();
    config.stream.offset = offset;
    config.stream.family_order = Some(vec![GenreFamily::Latin, GenreFamily::Pop]);
    config
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture file");
    path
}
