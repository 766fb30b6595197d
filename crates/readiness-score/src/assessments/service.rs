use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{AssessmentId, AssessmentStatus, EvidenceAttachment, NewAssessment, ScoreMode};
use super::repository::{AssessmentRecord, AssessmentRepository, RepositoryError};
use crate::scoring::domain::{EvidenceUploads, ResponseSet, StartupStage};
use crate::scoring::{ScoreBreakdown, ScoringEngine};

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Service composing the repository and the scoring engine.
pub struct AssessmentService<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    draft_scores_enabled: bool,
}

static ASSESSMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assessment_id() -> AssessmentId {
    let id = ASSESSMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssessmentId(format!("asm-{id:06}"))
}

impl<R> AssessmentService<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<ScoringEngine>) -> Self {
        Self {
            repository,
            engine,
            draft_scores_enabled: true,
        }
    }

    pub fn with_draft_scores(mut self, enabled: bool) -> Self {
        self.draft_scores_enabled = enabled;
        self
    }

    pub fn engine(&self) -> &Arc<ScoringEngine> {
        &self.engine
    }

    /// Open an empty assessment in `draft`.
    pub fn create(&self, request: NewAssessment) -> Result<AssessmentRecord, AssessmentServiceError> {
        let now = Utc::now();
        let record = AssessmentRecord {
            id: next_assessment_id(),
            startup_id: request.startup_id,
            stage: request.stage,
            status: AssessmentStatus::Draft,
            responses: ResponseSet::new(),
            evidence_uploads: EvidenceUploads::new(),
            breakdown: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(assessment = %stored.id, startup = %stored.startup_id, stage = %stored.stage, "assessment created");
        Ok(stored)
    }

    /// Merge answers into the assessment. Every KPI must exist in the framework.
    pub fn record_responses(
        &self,
        id: &AssessmentId,
        responses: ResponseSet,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.fetch(id)?;
        transition(&mut record, AssessmentStatus::InProgress)?;

        let framework = self.engine.framework();
        if let Some(unknown) = responses.keys().find(|kpi_id| framework.kpi(kpi_id).is_none()) {
            return Err(AssessmentServiceError::UnknownKpi(unknown.clone()));
        }

        let recorded = responses.len();
        record.responses.extend(responses);
        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;

        info!(assessment = %record.id, recorded, total = record.responses.len(), "responses recorded");
        Ok(record)
    }

    /// Upgrade an answered KPI's evidence type and remember when the proof was uploaded.
    pub fn attach_evidence(
        &self,
        id: &AssessmentId,
        attachment: EvidenceAttachment,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.fetch(id)?;
        transition(&mut record, AssessmentStatus::InProgress)?;
        if self.engine.framework().kpi(&attachment.kpi_id).is_none() {
            return Err(AssessmentServiceError::UnknownKpi(attachment.kpi_id));
        }

        let uploaded_at = attachment.uploaded_at.unwrap_or_else(Utc::now);
        let Some(response) = record.responses.get_mut(&attachment.kpi_id) else {
            return Err(AssessmentServiceError::UnansweredKpi(attachment.kpi_id));
        };
        response.evidence_type = attachment.evidence_type;
        if attachment.evidence_id.is_some() {
            response.evidence_id = attachment.evidence_id;
        }
        record
            .evidence_uploads
            .insert(attachment.kpi_id.clone(), uploaded_at);
        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;

        info!(
            assessment = %record.id,
            kpi = %attachment.kpi_id,
            evidence = attachment.evidence_type.label(),
            "evidence attached"
        );
        Ok(record)
    }

    pub fn score(
        &self,
        id: &AssessmentId,
        mode: ScoreMode,
    ) -> Result<ScoreBreakdown, AssessmentServiceError> {
        self.score_at(id, mode, Utc::now())
    }

    /// `Draft` previews without touching the record; `Final` stores the breakdown and
    /// completes the assessment.
    pub fn score_at(
        &self,
        id: &AssessmentId,
        mode: ScoreMode,
        now: DateTime<Utc>,
    ) -> Result<ScoreBreakdown, AssessmentServiceError> {
        let mut record = self.fetch(id)?;

        match mode {
            ScoreMode::Draft => {
                if !self.draft_scores_enabled {
                    return Err(AssessmentServiceError::DraftScoresDisabled);
                }
                if record.status == AssessmentStatus::Archived {
                    return Err(AssessmentServiceError::InvalidTransition {
                        from: record.status,
                        to: record.status,
                    });
                }
                Ok(self.compute(&record, now))
            }
            ScoreMode::Final => {
                transition(&mut record, AssessmentStatus::Completed)?;
                let breakdown = self.compute(&record, now);
                record.breakdown = Some(breakdown.clone());
                record.updated_at = Utc::now();
                self.repository.update(record)?;

                info!(
                    assessment = %id,
                    final_score = breakdown.final_score,
                    band = %breakdown.score_band,
                    "assessment scored"
                );
                Ok(breakdown)
            }
        }
    }

    pub fn publish(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        self.move_to(id, AssessmentStatus::Published)
    }

    /// Soft delete; the record stays readable.
    pub fn archive(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        self.move_to(id, AssessmentStatus::Archived)
    }

    pub fn get(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        self.fetch(id)
    }

    pub fn list(
        &self,
        status: Option<AssessmentStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<AssessmentRecord>, AssessmentServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        Ok(self.repository.list(status, limit)?)
    }

    /// Stateless scoring for callers that keep their own answers.
    pub fn score_responses(
        &self,
        responses: &ResponseSet,
        stage: StartupStage,
        evidence_uploads: &EvidenceUploads,
    ) -> ScoreBreakdown {
        self.engine.compute(responses, stage, evidence_uploads)
    }

    fn compute(&self, record: &AssessmentRecord, now: DateTime<Utc>) -> ScoreBreakdown {
        self.engine
            .compute_at(&record.responses, record.stage, &record.evidence_uploads, now)
    }

    fn move_to(
        &self,
        id: &AssessmentId,
        next: AssessmentStatus,
    ) -> Result<AssessmentRecord, AssessmentServiceError> {
        let mut record = self.fetch(id)?;
        transition(&mut record, next)?;
        record.updated_at = Utc::now();
        self.repository.update(record.clone())?;

        info!(assessment = %record.id, status = %record.status, "assessment status changed");
        Ok(record)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<AssessmentRecord, AssessmentServiceError> {
        let record = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }
}

fn transition(
    record: &mut AssessmentRecord,
    next: AssessmentStatus,
) -> Result<(), AssessmentServiceError> {
    if !record.status.can_transition_to(next) {
        return Err(AssessmentServiceError::InvalidTransition {
            from: record.status,
            to: next,
        });
    }
    record.status = next;
    Ok(())
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("assessment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AssessmentStatus,
        to: AssessmentStatus,
    },
    #[error("KPI '{0}' is not part of the scoring framework")]
    UnknownKpi(String),
    #[error("KPI '{0}' has no answer to attach evidence to")]
    UnansweredKpi(String),
    #[error("draft scores are disabled")]
    DraftScoresDisabled,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
