//! Loads assessment answers from CSV exports or JSON documents.

mod parser;

pub use parser::parse_timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::scoring::domain::{EvidenceUploads, ResponseSet};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidTimestamp { row: usize, value: String },
    EmptyKpiId { row: usize },
    DuplicateKpi { row: usize, kpi_id: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read responses: {}", err),
            ImportError::Csv(err) => write!(f, "invalid response CSV data: {}", err),
            ImportError::Json(err) => write!(f, "invalid response JSON document: {}", err),
            ImportError::InvalidTimestamp { row, value } => {
                write!(f, "row {row}: '{value}' is not an RFC 3339 timestamp or date")
            }
            ImportError::EmptyKpiId { row } => write!(f, "row {row}: kpi_id is empty"),
            ImportError::DuplicateKpi { row, kpi_id } => {
                write!(f, "row {row}: KPI '{kpi_id}' is answered more than once")
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Answers plus evidence upload instants, ready for the scoring engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseImport {
    #[serde(default)]
    pub responses: ResponseSet,
    #[serde(default)]
    pub evidence_uploads: EvidenceUploads,
}

pub struct ResponseImporter;

impl ResponseImporter {
    /// Picks the format from the extension: `.json` is a document, anything else CSV.
    /// `received_at` stands in for rows without an `answered_at`.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        received_at: DateTime<Utc>,
    ) -> Result<ResponseImport, ImportError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let is_json = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_reader(file)
        } else {
            Self::from_csv_reader(file, received_at)
        }
    }

    pub fn from_csv_reader<R: Read>(
        reader: R,
        received_at: DateTime<Utc>,
    ) -> Result<ResponseImport, ImportError> {
        parser::parse_rows(reader, received_at)
    }

    /// `{"responses": {id: response}, "evidence_uploads": {id: timestamp}}`
    pub fn from_json_reader<R: Read>(reader: R) -> Result<ResponseImport, ImportError> {
        Ok(serde_json::from_reader(reader)?)
    }
}
