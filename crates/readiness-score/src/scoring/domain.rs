use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answers keyed by KPI identifier.
pub type ResponseSet = BTreeMap<String, KpiResponse>;

/// Evidence upload instants keyed by KPI identifier. Only consulted for decay.
pub type EvidenceUploads = BTreeMap<String, DateTime<Utc>>;

/// Maturity stage of the assessed startup; selects the stage-specific category weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupStage {
    Idea,
    MvpNoTraction,
    MvpEarlyTraction,
    Growth,
    Scale,
}

impl StartupStage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Idea,
            Self::MvpNoTraction,
            Self::MvpEarlyTraction,
            Self::Growth,
            Self::Scale,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::MvpNoTraction => "mvp_no_traction",
            Self::MvpEarlyTraction => "mvp_early_traction",
            Self::Growth => "growth",
            Self::Scale => "scale",
        }
    }

    /// Configuration key holding a category's weight for this stage.
    pub fn weight_key(self) -> String {
        format!("weight_{}", self.as_str())
    }
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartupStage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown stage '{value}' (expected one of idea, mvp_no_traction, mvp_early_traction, growth, scale)"
                )
            })
    }
}

/// Kind of proof backing an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    #[default]
    SelfReported,
    DocumentUploaded,
    LinkedinVerified,
    ReferenceCheck,
    CaVerified,
    #[serde(other)]
    Unrecognized,
}

impl EvidenceType {
    /// Confidence factor applied to the earned value.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::DocumentUploaded | Self::ReferenceCheck | Self::CaVerified => 1.0,
            Self::LinkedinVerified => 0.9,
            Self::SelfReported | Self::Unrecognized => 0.6,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfReported => "self_reported",
            Self::DocumentUploaded => "document_uploaded",
            Self::LinkedinVerified => "linkedin_verified",
            Self::ReferenceCheck => "reference_check",
            Self::CaVerified => "ca_verified",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Lenient parse used by importers: unknown names map to [`EvidenceType::Unrecognized`].
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "" | "self_reported" => Self::SelfReported,
            "document_uploaded" | "document" => Self::DocumentUploaded,
            "linkedin_verified" | "linkedin" => Self::LinkedinVerified,
            "reference_check" | "reference" => Self::ReferenceCheck,
            "ca_verified" => Self::CaVerified,
            _ => Self::Unrecognized,
        }
    }
}

/// Discriminant of a [`KpiValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Number,
    Text,
}

/// Answer payload. On the wire the variant is inferred from the JSON/YAML scalar type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl KpiValue {
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Number(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// Interpret a raw cell: `true`/`false`, then numbers, then free text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Boolean(false);
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A single answered KPI as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResponse {
    pub value: KpiValue,
    #[serde(default)]
    pub evidence_type: EvidenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub answered_at: DateTime<Utc>,
}

impl KpiResponse {
    pub fn new(value: KpiValue, evidence_type: EvidenceType) -> Self {
        Self {
            value,
            evidence_type,
            evidence_id: None,
            answered_at: Utc::now(),
        }
    }
}

/// Correctness tier of an answer against its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correctness {
    Correct,
    Partial,
    Incorrect,
}

impl Correctness {
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Correct => 1.0,
            Self::Partial => 0.5,
            Self::Incorrect => 0.0,
        }
    }
}
