use crate::infra::InMemoryAssessmentRepository;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use readiness_score::assessments::{
    AssessmentService, EvidenceAttachment, NewAssessment, ScoreMode,
};
use readiness_score::config::AppConfig;
use readiness_score::error::AppError;
use readiness_score::import::ResponseImporter;
use readiness_score::scoring::{
    EvidenceType, Framework, KpiResponse, KpiValue, ResponseSet, ScoreBreakdown,
    ScoringEngine, StartupStage,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV export or JSON document with the startup's answers
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// Stage to score against (idea, mvp_no_traction, mvp_early_traction, growth, scale)
    #[arg(long)]
    pub(crate) stage: StartupStage,
    /// Framework YAML (defaults to SCORE_FRAMEWORK_PATH, then the bundled framework)
    #[arg(long)]
    pub(crate) framework: Option<PathBuf>,
    /// Evaluate decay as of this instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print the full breakdown as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stage of the sample startup (defaults to mvp_early_traction)
    #[arg(long)]
    pub(crate) stage: Option<StartupStage>,
    /// Print the stored breakdown as JSON after the summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        responses,
        stage,
        framework,
        now,
        json,
    } = args;

    let mut scoring = AppConfig::load()?.scoring;
    if framework.is_some() {
        scoring.framework_path = framework;
    }

    let now = now.unwrap_or_else(Utc::now);
    let framework = scoring.load_framework()?;
    let import = ResponseImporter::from_path(responses, now)?;

    let engine = ScoringEngine::new(Arc::new(framework)).with_decay_policy(scoring.decay);
    let breakdown = engine.compute_at(&import.responses, stage, &import.evidence_uploads, now);

    if json {
        print_json(&breakdown);
    } else {
        render_breakdown(&breakdown);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let stage = args.stage.unwrap_or(StartupStage::MvpEarlyTraction);
    let now = Utc::now();

    println!("Readiness scoring demo");
    let engine = Arc::new(ScoringEngine::new(Arc::new(Framework::sample()?)));
    let service = AssessmentService::new(Arc::new(InMemoryAssessmentRepository::default()), engine);

    let record = service.create(NewAssessment {
        startup_id: "demo-startup".to_string(),
        stage,
    })?;
    println!(
        "- Opened assessment {} for {} at stage {}",
        record.id, record.startup_id, record.stage
    );

    let record = service.record_responses(&record.id, demo_responses(now))?;
    println!(
        "- Recorded {} answers -> status {}",
        record.responses.len(),
        record.status
    );

    let record = service.attach_evidence(
        &record.id,
        EvidenceAttachment {
            kpi_id: "financial_runway_months".to_string(),
            evidence_type: EvidenceType::DocumentUploaded,
            evidence_id: Some("bank-statement-q3".to_string()),
            uploaded_at: Some(now - Duration::days(10)),
        },
    )?;
    println!("- Attached a 10 day old bank statement to financial_runway_months");

    let draft = service.score_at(&record.id, ScoreMode::Draft, now)?;
    println!("- Draft preview: {} ({})", draft.final_score, draft.score_band);

    let breakdown = service.score_at(&record.id, ScoreMode::Final, now)?;
    let record = service.publish(&record.id)?;
    println!("- Final score stored; assessment {} is {}", record.id, record.status);

    println!();
    render_breakdown(&breakdown);
    if args.json {
        print_json(&breakdown);
    }

    Ok(())
}

fn demo_responses(now: DateTime<Utc>) -> ResponseSet {
    let answer = |value: KpiValue, evidence_type: EvidenceType| KpiResponse {
        value,
        evidence_type,
        evidence_id: None,
        answered_at: now,
    };

    [
        ("team_full_time_founders", answer(KpiValue::Boolean(true), EvidenceType::LinkedinVerified)),
        ("team_technical_cofounder", answer(KpiValue::Boolean(false), EvidenceType::SelfReported)),
        ("team_key_hires_count", answer(KpiValue::Number(2.0), EvidenceType::SelfReported)),
        ("product_stage", answer(KpiValue::Text("beta".to_string()), EvidenceType::DocumentUploaded)),
        ("product_user_interviews", answer(KpiValue::Number(32.0), EvidenceType::ReferenceCheck)),
        ("market_tam_usd_bn", answer(KpiValue::Number(3.5), EvidenceType::SelfReported)),
        ("market_monthly_active_users", answer(KpiValue::Number(640.0), EvidenceType::DocumentUploaded)),
        ("financial_runway_months", answer(KpiValue::Number(11.0), EvidenceType::SelfReported)),
        ("legal_incorporation", answer(KpiValue::Boolean(true), EvidenceType::CaVerified)),
        ("legal_ip_assignment", answer(KpiValue::Boolean(true), EvidenceType::DocumentUploaded)),
    ]
    .into_iter()
    .map(|(kpi_id, response)| (kpi_id.to_string(), response))
    .collect()
}

pub(crate) fn render_breakdown(breakdown: &ScoreBreakdown) {
    println!(
        "Readiness score {} ({}) for stage {} [framework {}]",
        breakdown.final_score, breakdown.score_band, breakdown.stage, breakdown.framework_version
    );
    println!(
        "- Weighted raw score {:.3} | {} penalty points{}",
        breakdown.raw_score,
        breakdown.total_penalty_points,
        breakdown
            .global_cap_applied
            .map(|cap| format!(" | capped at {cap}"))
            .unwrap_or_default()
    );

    println!("Categories:");
    for category in &breakdown.category_scores {
        let cap = match (&category.cap_applied, &category.cap_reason) {
            (Some(cap), Some(reason)) => format!(" (capped to {cap:.2}: {reason})"),
            (Some(cap), None) => format!(" (capped to {cap:.2})"),
            _ => String::new(),
        };
        println!(
            "  - {}: {:.0}% of weight {:.2} -> {:.3}{}",
            category.category_id,
            category.capped_score * 100.0,
            category.stage_weight,
            category.weighted_contribution,
            cap
        );
    }

    if !breakdown.fatal_flags_triggered.is_empty() {
        println!("Fatal flags:");
        for flag in &breakdown.fatal_flags_triggered {
            println!(
                "  - {} [{:?}] -{} pts: {}",
                flag.flag_id, flag.severity, flag.penalty_points, flag.reason
            );
        }
    }

    if breakdown.recommendations.is_empty() {
        println!("Recommendations: none");
    } else {
        println!("Recommendations:");
        for recommendation in &breakdown.recommendations {
            println!("  - {recommendation}");
        }
    }
}

fn print_json(breakdown: &ScoreBreakdown) {
    match serde_json::to_string_pretty(breakdown) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("Breakdown unavailable as JSON: {err}"),
    }
}
