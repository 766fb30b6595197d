use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::debug;

use super::{ImportError, ResponseImport};
use crate::scoring::domain::{EvidenceType, KpiResponse, KpiValue};

/// Reads `kpi_id,value,evidence_type,evidence_id,answered_at,uploaded_at` rows.
/// Rows are numbered from 1, excluding the header.
pub(crate) fn parse_rows<R: Read>(
    reader: R,
    received_at: DateTime<Utc>,
) -> Result<ResponseImport, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut import = ResponseImport::default();

    for (index, record) in csv_reader.deserialize::<ResponseRow>().enumerate() {
        let row_number = index + 1;
        let row = record?;

        if row.kpi_id.is_empty() {
            return Err(ImportError::EmptyKpiId { row: row_number });
        }
        let Some(raw_value) = row.value.as_deref() else {
            debug!(row = row_number, kpi = %row.kpi_id, "skipping row without a value");
            continue;
        };
        if import.responses.contains_key(&row.kpi_id) {
            return Err(ImportError::DuplicateKpi {
                row: row_number,
                kpi_id: row.kpi_id,
            });
        }

        let answered_at = match row.answered_at.as_deref() {
            Some(value) => parse_timestamp(value).ok_or_else(|| ImportError::InvalidTimestamp {
                row: row_number,
                value: value.to_string(),
            })?,
            None => received_at,
        };
        if let Some(value) = row.uploaded_at.as_deref() {
            let uploaded_at =
                parse_timestamp(value).ok_or_else(|| ImportError::InvalidTimestamp {
                    row: row_number,
                    value: value.to_string(),
                })?;
            import.evidence_uploads.insert(row.kpi_id.clone(), uploaded_at);
        }

        let response = KpiResponse {
            value: KpiValue::infer(raw_value),
            evidence_type: row
                .evidence_type
                .as_deref()
                .map(EvidenceType::from_label)
                .unwrap_or_default(),
            evidence_id: row.evidence_id,
            answered_at,
        };
        import.responses.insert(row.kpi_id, response);
    }

    Ok(import)
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    kpi_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    value: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    evidence_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    evidence_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    answered_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    uploaded_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// RFC 3339, or a bare `YYYY-MM-DD` read as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
