use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::domain::{EvidenceType, ResponseSet, StartupStage};

/// Identifier wrapper for stored assessments (`asm-000042`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub String);

impl fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Draft,
    InProgress,
    Completed,
    Published,
    Archived,
}

impl AssessmentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AssessmentStatus::Draft => "draft",
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Published => "published",
            AssessmentStatus::Archived => "archived",
        }
    }

    /// Completed assessments reopen when answers change and may be rescored.
    /// Published ones only move to archived; archived is terminal.
    pub fn can_transition_to(&self, next: AssessmentStatus) -> bool {
        use AssessmentStatus::*;

        match (*self, next) {
            (Archived, _) => false,
            (_, Archived) => true,
            (Draft | InProgress | Completed, InProgress) => true,
            (Draft | InProgress | Completed, Completed) => true,
            (Completed, Published) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `draft` previews a score; `final` stores it and completes the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    Draft,
    #[default]
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssessment {
    pub startup_id: String,
    pub stage: StartupStage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseUpdate {
    pub responses: ResponseSet,
}

/// Proof uploaded for an answered KPI. `uploaded_at` defaults to the time of attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAttachment {
    pub kpi_id: String,
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub evidence_id: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}
