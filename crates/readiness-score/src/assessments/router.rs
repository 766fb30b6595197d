use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AssessmentId, AssessmentStatus, EvidenceAttachment, NewAssessment, ResponseUpdate, ScoreMode,
};
use super::repository::{AssessmentRepository, AssessmentView, RepositoryError};
use super::service::{AssessmentService, AssessmentServiceError};
use crate::scoring::domain::{EvidenceUploads, ResponseSet, StartupStage};

/// Router builder exposing stateless scoring plus the assessment lifecycle.
pub fn assessment_router<R>(service: Arc<AssessmentService<R>>) -> Router
where
    R: AssessmentRepository + 'static,
{
    Router::new()
        .route("/api/v1/score", post(score_handler::<R>))
        .route(
            "/api/v1/assessments",
            post(create_handler::<R>).get(list_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id",
            get(get_handler::<R>).delete(archive_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/responses",
            put(responses_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/evidence",
            post(evidence_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/score",
            get(assessment_score_handler::<R>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/publish",
            post(publish_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    stage: StartupStage,
    #[serde(default)]
    responses: ResponseSet,
    #[serde(default)]
    evidence_uploads: EvidenceUploads,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    status: Option<AssessmentStatus>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreQuery {
    #[serde(default)]
    mode: ScoreMode,
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let breakdown =
        service.score_responses(&request.responses, request.stage, &request.evidence_uploads);
    (StatusCode::OK, axum::Json(breakdown)).into_response()
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    axum::Json(request): axum::Json<NewAssessment>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.create(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.list(query.status, query.limit) {
        Ok(records) => {
            let views: Vec<AssessmentView> = records.iter().map(|record| record.view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.get(&AssessmentId(assessment_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn responses_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
    axum::Json(update): axum::Json<ResponseUpdate>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.record_responses(&AssessmentId(assessment_id), update.responses) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evidence_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
    axum::Json(attachment): axum::Json<EvidenceAttachment>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.attach_evidence(&AssessmentId(assessment_id), attachment) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assessment_score_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
    Query(query): Query<ScoreQuery>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.score(&AssessmentId(assessment_id), query.mode) {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn publish_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.publish(&AssessmentId(assessment_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn archive_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.archive(&AssessmentId(assessment_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// HTTP status for a service failure.
pub(crate) fn status_for(err: &AssessmentServiceError) -> StatusCode {
    match err {
        AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(RepositoryError::Conflict)
        | AssessmentServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AssessmentServiceError::UnknownKpi(_) | AssessmentServiceError::UnansweredKpi(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssessmentServiceError::DraftScoresDisabled => StatusCode::FORBIDDEN,
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: AssessmentServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (status_for(&err), axum::Json(payload)).into_response()
}
