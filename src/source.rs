//! Dataset loading: read the track CSV and the fallback genre CSV with Polars.
//!
//! Every column is read as text (schema inference disabled) so that all coercion rules live in
//! [`crate::record`] rather than in the CSV parser.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::path::Path;

use crate::record::RawTrackRow;
use crate::taxonomy::GenreFallback;

/// Column names accepted for the duration field, in lookup order.
const DURATION_COLUMNS: &[&str] = &["track_duration_ms", "duration_ms"];

/// Read a CSV file with every column typed as a string.
pub fn read_csv_as_text(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(eyre!("Dataset not found at {}", path.display()));
    }
    let mut read_options = CsvReadOptions::default();
    read_options.has_header = true;
    read_options.infer_schema_length = Some(0);
    let df = read_options
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    tracing::info!(path = %path.display(), rows = df.height(), "loaded csv");
    Ok(df)
}

/// Text values of one column; `None` when the column is absent.
fn text_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let column = column.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(String::from))
        .collect();
    Ok(Some(values))
}

fn first_text_column(df: &DataFrame, names: &[&str]) -> Result<Option<Vec<Option<String>>>> {
    for name in names {
        if let Some(values) = text_column(df, name)? {
            return Ok(Some(values));
        }
    }
    Ok(None)
}

/// Convert a frame of the track dataset into raw rows. Missing columns become `None` fields.
pub fn raw_rows_from_frame(df: &DataFrame) -> Result<Vec<RawTrackRow>> {
    let n = df.height();
    let get = |values: &Option<Vec<Option<String>>>, i: usize| -> Option<String> {
        values.as_ref().and_then(|v| v.get(i).cloned().flatten())
    };

    let track_popularity = text_column(df, "track_popularity")?;
    let artist_popularity = text_column(df, "artist_popularity")?;
    let artist_followers = text_column(df, "artist_followers")?;
    let album_release_date = text_column(df, "album_release_date")?;
    let artist_genres = text_column(df, "artist_genres")?;
    let danceability = text_column(df, "danceability")?;
    let energy = text_column(df, "energy")?;
    let valence = text_column(df, "valence")?;
    let tempo = text_column(df, "tempo")?;
    let duration = first_text_column(df, DURATION_COLUMNS)?;
    let explicit = text_column(df, "explicit")?;
    let artist_name = text_column(df, "artist_name")?;
    let track_name = text_column(df, "track_name")?;

    if track_popularity.is_none() && artist_name.is_none() {
        tracing::warn!("track dataset has neither track_popularity nor artist_name columns");
    }

    Ok((0..n)
        .map(|i| RawTrackRow {
            track_popularity: get(&track_popularity, i),
            artist_popularity: get(&artist_popularity, i),
            artist_followers: get(&artist_followers, i),
            album_release_date: get(&album_release_date, i),
            artist_genres: get(&artist_genres, i),
            danceability: get(&danceability, i),
            energy: get(&energy, i),
            valence: get(&valence, i),
            tempo: get(&tempo, i),
            duration: get(&duration, i),
            explicit: get(&explicit, i),
            artist_name: get(&artist_name, i),
            track_name: get(&track_name, i),
        })
        .collect())
}

/// Build the artist -> genres fallback table from a frame with `artist_name` and `artist_genres`.
pub fn genre_fallback_from_frame(df: &DataFrame) -> Result<GenreFallback> {
    let artists = text_column(df, "artist_name")?
        .ok_or_else(|| eyre!("fallback dataset is missing the artist_name column"))?;
    let genres = text_column(df, "artist_genres")?
        .ok_or_else(|| eyre!("fallback dataset is missing the artist_genres column"))?;

    let mut fallback = GenreFallback::new();
    for (artist, genre) in artists.iter().zip(genres.iter()) {
        if let (Some(a), Some(g)) = (artist, genre) {
            fallback.insert(a, g);
        }
    }
    Ok(fallback)
}

pub fn load_track_rows(path: &Path) -> Result<Vec<RawTrackRow>> {
    let df = read_csv_as_text(path)?;
    raw_rows_from_frame(&df)
}

pub fn load_genre_fallback(path: &Path) -> Result<GenreFallback> {
    let df = read_csv_as_text(path)?;
    let fallback = genre_fallback_from_frame(&df)?;
    tracing::info!(entries = fallback.len(), "built genre fallback table");
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_from_frame_with_missing_columns() {
        let df = df!(
            "track_popularity" => &["50", "x"],
            "artist_name" => &["A", "B"],
            "duration_ms" => &["3.5", "200000"]
        )
        .unwrap();
        let rows = raw_rows_from_frame(&df).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].track_popularity.as_deref(), Some("50"));
        assert_eq!(rows[1].duration.as_deref(), Some("200000"));
        assert_eq!(rows[0].energy, None);
        assert_eq!(rows[1].artist_name.as_deref(), Some("B"));
    }

    #[test]
    fn track_duration_column_preferred() {
        let df = df!(
            "track_duration_ms" => &["1"],
            "duration_ms" => &["2"]
        )
        .unwrap();
        let rows = raw_rows_from_frame(&df).unwrap();
        assert_eq!(rows[0].duration.as_deref(), Some("1"));
    }

    #[test]
    fn fallback_from_frame() {
        let df = df!(
            "artist_name" => &["Artist One", "", "Artist Two"],
            "artist_genres" => &["['pop']", "['rock']", ""]
        )
        .unwrap();
        let fb = genre_fallback_from_frame(&df).unwrap();
        assert_eq!(fb.len(), 1);
        assert_eq!(fb.lookup("artist one"), Some("['pop']"));
    }

    #[test]
    fn fallback_requires_columns() {
        let df = df!("artist_name" => &["A"]).unwrap();
        assert!(genre_fallback_from_frame(&df).is_err());
    }
}
