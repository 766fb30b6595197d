//! Stored assessments: answers collected over time, scored on demand and published.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AssessmentId, AssessmentStatus, EvidenceAttachment, NewAssessment, ResponseUpdate, ScoreMode,
};
pub use repository::{AssessmentRecord, AssessmentRepository, AssessmentView, RepositoryError};
pub use router::assessment_router;
pub use service::{AssessmentService, AssessmentServiceError, DEFAULT_LIST_LIMIT};
