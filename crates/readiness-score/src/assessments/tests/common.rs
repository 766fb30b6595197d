use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::assessments::domain::{AssessmentId, AssessmentStatus, NewAssessment};
use crate::assessments::repository::{AssessmentRecord, AssessmentRepository, RepositoryError};
use crate::assessments::service::AssessmentService;
use crate::scoring::domain::{EvidenceType, KpiResponse, KpiValue, ResponseSet, StartupStage};
use crate::scoring::framework::Framework;
use crate::scoring::ScoringEngine;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> Arc<ScoringEngine> {
    let framework = Framework::sample().expect("sample framework loads");
    Arc::new(ScoringEngine::new(Arc::new(framework)))
}

pub(super) fn build_service() -> (AssessmentService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = AssessmentService::new(repository.clone(), engine());
    (service, repository)
}

pub(super) fn new_assessment(startup_id: &str) -> NewAssessment {
    NewAssessment {
        startup_id: startup_id.to_string(),
        stage: StartupStage::MvpEarlyTraction,
    }
}

pub(super) fn answer(value: KpiValue, evidence_type: EvidenceType) -> KpiResponse {
    KpiResponse {
        value,
        evidence_type,
        evidence_id: None,
        answered_at: now(),
    }
}

pub(super) fn founder_answers() -> ResponseSet {
    [
        ("team_full_time_founders", answer(KpiValue::Boolean(true), EvidenceType::SelfReported)),
        ("team_technical_cofounder", answer(KpiValue::Boolean(true), EvidenceType::LinkedinVerified)),
        ("legal_incorporation", answer(KpiValue::Boolean(true), EvidenceType::SelfReported)),
        ("financial_runway_months", answer(KpiValue::Number(14.0), EvidenceType::SelfReported)),
    ]
    .into_iter()
    .map(|(id, response)| (id.to_string(), response))
    .collect()
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<AssessmentId, AssessmentRecord>>>,
}

impl AssessmentRepository for MemoryRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(
        &self,
        status: Option<AssessmentStatus>,
        limit: usize,
    ) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<AssessmentRecord> = guard
            .values()
            .filter(|record| status.map_or(true, |status| record.status == status))
            .cloned()
            .collect();
        records.sort_by(|left, right| right.id.cmp(&left.id));
        records.truncate(limit);
        Ok(records)
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn insert(&self, _record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: AssessmentRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(
        &self,
        _status: Option<AssessmentStatus>,
        _limit: usize,
    ) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
