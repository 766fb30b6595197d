use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::assessments::domain::{AssessmentStatus, EvidenceAttachment, ScoreMode};
use crate::assessments::repository::{AssessmentRepository, RepositoryError};
use crate::assessments::service::{AssessmentService, AssessmentServiceError};
use crate::scoring::domain::{EvidenceType, KpiValue};

#[test]
fn create_opens_a_draft_with_a_sequenced_id() {
    let (service, repository) = build_service();

    let record = service.create(new_assessment("acme")).expect("assessment created");

    assert!(record.id.0.starts_with("asm-"));
    assert_eq!(record.id.0.len(), "asm-000000".len());
    assert_eq!(record.status, AssessmentStatus::Draft);
    assert!(record.responses.is_empty());
    assert!(repository
        .records
        .lock()
        .expect("repository mutex poisoned")
        .contains_key(&record.id));
}

#[test]
fn recording_responses_moves_the_assessment_in_progress() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");

    let updated = service
        .record_responses(&record.id, founder_answers())
        .expect("responses recorded");
    let more = [(
        "market_tam_usd_bn".to_string(),
        answer(KpiValue::Number(3.0), EvidenceType::SelfReported),
    )]
    .into_iter()
    .collect();
    let merged = service.record_responses(&record.id, more).expect("merged");

    assert_eq!(updated.status, AssessmentStatus::InProgress);
    assert_eq!(merged.responses.len(), founder_answers().len() + 1);
}

#[test]
fn responses_for_unknown_kpis_are_rejected() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");
    let answers = [(
        "favorite_color".to_string(),
        answer(KpiValue::Text("teal".to_string()), EvidenceType::SelfReported),
    )]
    .into_iter()
    .collect();

    match service.record_responses(&record.id, answers) {
        Err(AssessmentServiceError::UnknownKpi(kpi)) => assert_eq!(kpi, "favorite_color"),
        other => panic!("expected unknown KPI, got {other:?}"),
    }
    let stored = service.get(&record.id).expect("still stored");
    assert_eq!(stored.status, AssessmentStatus::Draft);
}

#[test]
fn evidence_upgrades_an_answer_and_records_the_upload() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");
    service
        .record_responses(&record.id, founder_answers())
        .expect("responses recorded");
    let uploaded_at = now() - Duration::days(2);

    let updated = service
        .attach_evidence(
            &record.id,
            EvidenceAttachment {
                kpi_id: "financial_runway_months".to_string(),
                evidence_type: EvidenceType::DocumentUploaded,
                evidence_id: Some("bank-statement-09".to_string()),
                uploaded_at: Some(uploaded_at),
            },
        )
        .expect("evidence attached");

    let response = &updated.responses["financial_runway_months"];
    assert_eq!(response.evidence_type, EvidenceType::DocumentUploaded);
    assert_eq!(response.evidence_id.as_deref(), Some("bank-statement-09"));
    assert_eq!(
        updated.evidence_uploads.get("financial_runway_months"),
        Some(&uploaded_at)
    );
}

#[test]
fn evidence_after_a_final_score_reopens_the_assessment() {
    let (service, repository) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");
    service
        .record_responses(&record.id, founder_answers())
        .expect("responses recorded");
    let first = service
        .score_at(&record.id, ScoreMode::Final, now())
        .expect("final score");

    let reopened = service
        .attach_evidence(
            &record.id,
            EvidenceAttachment {
                kpi_id: "team_full_time_founders".to_string(),
                evidence_type: EvidenceType::DocumentUploaded,
                evidence_id: None,
                uploaded_at: Some(now()),
            },
        )
        .expect("evidence attached");

    assert_eq!(reopened.status, AssessmentStatus::InProgress);
    let stored = repository
        .fetch(&record.id)
        .expect("repository available")
        .expect("record stored");
    assert_eq!(stored.status, AssessmentStatus::InProgress);
    assert!(matches!(
        service.publish(&record.id),
        Err(AssessmentServiceError::InvalidTransition {
            from: AssessmentStatus::InProgress,
            to: AssessmentStatus::Published,
        })
    ));

    let rescored = service
        .score_at(&record.id, ScoreMode::Final, now())
        .expect("rescored");
    assert!(rescored.final_score >= first.final_score);
    assert_eq!(
        rescored.kpi_scores["team_full_time_founders"].evidence_multiplier,
        1.0
    );
    let published = service.publish(&record.id).expect("published");
    assert_eq!(
        published.breakdown.map(|breakdown| breakdown.final_score),
        Some(rescored.final_score)
    );
}

#[test]
fn evidence_needs_an_answer_first() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");

    let result = service.attach_evidence(
        &record.id,
        EvidenceAttachment {
            kpi_id: "legal_ip_assignment".to_string(),
            evidence_type: EvidenceType::DocumentUploaded,
            evidence_id: None,
            uploaded_at: None,
        },
    );

    assert!(matches!(result, Err(AssessmentServiceError::UnansweredKpi(_))));
}

#[test]
fn draft_scores_preview_without_completing() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");
    service
        .record_responses(&record.id, founder_answers())
        .expect("responses recorded");

    let mut draft = service
        .score_at(&record.id, ScoreMode::Draft, now())
        .expect("draft scored");
    let stored = service.get(&record.id).expect("stored");
    assert_eq!(stored.status, AssessmentStatus::InProgress);
    assert!(stored.breakdown.is_none());

    let mut finalized = service
        .score_at(&record.id, ScoreMode::Final, now())
        .expect("final scored");
    let stored = service.get(&record.id).expect("stored");
    assert_eq!(stored.status, AssessmentStatus::Completed);
    assert_eq!(
        stored.breakdown.as_ref().map(|breakdown| breakdown.final_score),
        Some(finalized.final_score)
    );

    draft.calculation_duration_ms = 0;
    finalized.calculation_duration_ms = 0;
    assert_eq!(draft, finalized);
}

#[test]
fn draft_scores_can_be_disabled() {
    let repository = Arc::new(MemoryRepository::default());
    let service = AssessmentService::new(repository, engine()).with_draft_scores(false);
    let record = service.create(new_assessment("acme")).expect("created");

    assert!(matches!(
        service.score(&record.id, ScoreMode::Draft),
        Err(AssessmentServiceError::DraftScoresDisabled)
    ));
    assert!(service.score(&record.id, ScoreMode::Final).is_ok());
}

#[test]
fn published_assessments_reject_new_answers() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");
    service
        .record_responses(&record.id, founder_answers())
        .expect("responses recorded");

    assert!(matches!(
        service.publish(&record.id),
        Err(AssessmentServiceError::InvalidTransition {
            from: AssessmentStatus::InProgress,
            to: AssessmentStatus::Published,
        })
    ));

    service.score(&record.id, ScoreMode::Final).expect("scored");
    let published = service.publish(&record.id).expect("published");
    assert_eq!(published.status, AssessmentStatus::Published);

    assert!(matches!(
        service.record_responses(&record.id, founder_answers()),
        Err(AssessmentServiceError::InvalidTransition { .. })
    ));
}

#[test]
fn archived_assessments_stay_readable_but_frozen() {
    let (service, _) = build_service();
    let record = service.create(new_assessment("acme")).expect("created");

    let archived = service.archive(&record.id).expect("archived");

    assert_eq!(archived.status, AssessmentStatus::Archived);
    assert_eq!(
        service.get(&record.id).expect("readable").status,
        AssessmentStatus::Archived
    );
    assert!(service.record_responses(&record.id, founder_answers()).is_err());
    assert!(service.score(&record.id, ScoreMode::Final).is_err());
    assert!(service.score(&record.id, ScoreMode::Draft).is_err());
    assert!(service.archive(&record.id).is_err());
}

#[test]
fn list_filters_by_status() {
    let (service, _) = build_service();
    let draft = service.create(new_assessment("draft-co")).expect("created");
    let active = service.create(new_assessment("active-co")).expect("created");
    service
        .record_responses(&active.id, founder_answers())
        .expect("responses recorded");

    let drafts = service
        .list(Some(AssessmentStatus::Draft), None)
        .expect("listed");
    let everything = service.list(None, Some(1)).expect("listed");

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, draft.id);
    assert_eq!(everything.len(), 1);
}

#[test]
fn missing_assessments_surface_not_found() {
    let (service, _) = build_service();

    let result = service.get(&crate::assessments::AssessmentId("asm-999999".to_string()));

    assert!(matches!(
        result,
        Err(AssessmentServiceError::Repository(RepositoryError::NotFound))
    ));
}
