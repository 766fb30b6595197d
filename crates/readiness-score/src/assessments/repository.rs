use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AssessmentId, AssessmentStatus};
use crate::scoring::domain::{EvidenceUploads, ResponseSet, StartupStage};
use crate::scoring::{ScoreBand, ScoreBreakdown};

/// Repository record holding the answers, evidence and last stored score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: AssessmentId,
    pub startup_id: String,
    pub stage: StartupStage,
    pub status: AssessmentStatus,
    pub responses: ResponseSet,
    pub evidence_uploads: EvidenceUploads,
    pub breakdown: Option<ScoreBreakdown>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn view(&self) -> AssessmentView {
        AssessmentView {
            assessment_id: self.id.clone(),
            startup_id: self.startup_id.clone(),
            stage: self.stage,
            status: self.status.label(),
            responses_recorded: self.responses.len(),
            final_score: self.breakdown.as_ref().map(|breakdown| breakdown.final_score),
            score_band: self.breakdown.as_ref().map(|breakdown| breakdown.score_band),
            updated_at: self.updated_at,
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError>;
    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError>;
    /// Newest first, optionally filtered by status.
    fn list(
        &self,
        status: Option<AssessmentStatus>,
        limit: usize,
    ) -> Result<Vec<AssessmentRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Summary returned by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub assessment_id: AssessmentId,
    pub startup_id: String,
    pub stage: StartupStage,
    pub status: &'static str,
    pub responses_recorded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_band: Option<ScoreBand>,
    pub updated_at: DateTime<Utc>,
}
