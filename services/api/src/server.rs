use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAssessmentRepository};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use readiness_score::assessments::AssessmentService;
use readiness_score::config::AppConfig;
use readiness_score::error::AppError;
use readiness_score::scoring::ScoringEngine;
use readiness_score::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let framework = Arc::new(config.scoring.load_framework()?);
    info!(
        version = framework.version(),
        categories = framework.categories().len(),
        kpis = framework.kpis().count(),
        source = ?config.scoring.framework_path,
        "scoring framework loaded"
    );
    let engine = Arc::new(ScoringEngine::new(framework).with_decay_policy(config.scoring.decay));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let assessment_service = Arc::new(
        AssessmentService::new(repository, engine)
            .with_draft_scores(config.scoring.enable_draft_scores),
    );

    let app = with_operational_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "readiness scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
