//! Incident CSV Loader Module
//! Decodes the legacy-encoded incident export and loads it with Polars.

use encoding_rs::Encoding;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const YEAR_COL: &str = "CalYear";
pub const REGION_COL: &str = "Borough";
pub const CATEGORY_COL: &str = "AnimalGroupParent";

/// The export is produced on Windows; it is not valid UTF-8.
pub const INCIDENT_ENCODING: &Encoding = encoding_rs::WINDOWS_1252;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Failed to read shapefile: {0}")]
    ShapefileError(#[from] shapefile::Error),
    #[error("Column `{column}` missing from {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("Region #{index} has no usable `{attribute}` attribute")]
    MissingAttribute { attribute: String, index: usize },
    #[error("Region #{index} is a {shape} shape, expected a polygon")]
    UnsupportedShape { shape: String, index: usize },
    #[error("Cannot normalize areas: all regions have {hectares} hectares")]
    DegenerateAreaRange { hectares: f64 },
    #[error("Boundary dataset contains no regions")]
    NoRegions,
}

/// Missing inputs surface as `MissingInput` before any reader is opened.
pub(crate) fn ensure_exists(path: &Path) -> Result<(), LoaderError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoaderError::MissingInput(path.to_path_buf()))
    }
}

/// Loads the incident table and narrows it to the columns the pipeline uses.
pub struct IncidentLoader;

impl IncidentLoader {
    /// Load the incident CSV at `path`, decoding it from `encoding`.
    ///
    /// Returns a frame with exactly `CalYear`, `Borough` and
    /// `AnimalGroupParent`; every other field is discarded here.
    pub fn load_csv(path: &Path, encoding: &'static Encoding) -> Result<DataFrame, LoaderError> {
        ensure_exists(path)?;
        let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            tracing::warn!(
                path = %path.display(),
                encoding = encoding.name(),
                "incident file contained undecodable bytes; replaced with U+FFFD"
            );
        }

        let df = Self::parse(text.into_owned().into_bytes())?;
        let df = Self::select_required(df, path)?;

        tracing::info!(
            path = %path.display(),
            rows = df.height(),
            "loaded incident table"
        );
        Ok(df)
    }

    /// Parse already-decoded UTF-8 CSV bytes.
    fn parse(bytes: Vec<u8>) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(df)
    }

    fn select_required(df: DataFrame, path: &Path) -> Result<DataFrame, LoaderError> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for required in [YEAR_COL, REGION_COL, CATEGORY_COL] {
            if !present.iter().any(|c| c == required) {
                return Err(LoaderError::MissingColumn {
                    column: required.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(df.select([YEAR_COL, REGION_COL, CATEGORY_COL])?)
    }
}
