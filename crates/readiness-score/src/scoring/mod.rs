//! Readiness scoring engine.
//!
//! [`ScoringEngine::compute`] turns a response set into a [`ScoreBreakdown`]: KPI
//! evaluation, aggregation, fatal flags, dependency caps, the 300–900 transform and the
//! explainability output. The engine holds only the shared framework and decay rates, so a
//! single instance can serve any number of threads.

pub mod aggregate;
pub mod decay;
pub mod domain;
pub mod explain;
pub mod framework;
pub mod kpi;
pub mod predicate;
pub mod rules;
pub mod transform;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use aggregate::{CategoryScore, SubCategoryScore};
pub use decay::{DecayPolicy, Volatility};
pub use domain::{
    Correctness, EvidenceType, EvidenceUploads, KpiResponse, KpiValue, ResponseSet, StartupStage,
    ValueKind,
};
pub use explain::{Gap, GapKind};
pub use framework::{
    CategoryConfig, DependencyAction, DependencyRule, FatalFlagRule, Framework, FrameworkError,
    KpiConfig, ScoringLogic, Severity, SubCategoryConfig, Thresholds,
};
pub use kpi::KpiScore;
pub use predicate::{Predicate, PredicateError};
pub use rules::{DependencyViolation, FatalFlag};
pub use transform::{ScoreBand, MAX_SCORE, MIN_SCORE};

/// Complete, self-describing result of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub final_score: u16,
    pub score_band: ScoreBand,
    pub raw_score: f64,
    pub stage: StartupStage,
    pub framework_version: String,
    pub category_scores: Vec<CategoryScore>,
    pub kpi_scores: BTreeMap<String, KpiScore>,
    pub fatal_flags_triggered: Vec<FatalFlag>,
    pub total_penalty_points: u32,
    /// Present only when a triggered flag lowered the ceiling below 900.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_cap_applied: Option<u16>,
    pub dependency_violations: Vec<DependencyViolation>,
    pub gaps: Vec<Gap>,
    pub recommendations: Vec<String>,
    pub calculation_timestamp: DateTime<Utc>,
    pub calculation_duration_ms: u64,
}

impl ScoreBreakdown {
    pub fn category(&self, category_id: &str) -> Option<&CategoryScore> {
        self.category_scores
            .iter()
            .find(|category| category.category_id == category_id)
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    framework: Arc<Framework>,
    decay: DecayPolicy,
}

impl ScoringEngine {
    pub fn new(framework: Arc<Framework>) -> Self {
        Self {
            framework,
            decay: DecayPolicy::default(),
        }
    }

    pub fn with_decay_policy(mut self, decay: DecayPolicy) -> Self {
        self.decay = decay;
        self
    }

    pub fn framework(&self) -> &Arc<Framework> {
        &self.framework
    }

    pub fn decay_policy(&self) -> &DecayPolicy {
        &self.decay
    }

    pub fn compute(
        &self,
        responses: &ResponseSet,
        stage: StartupStage,
        evidence_uploads: &EvidenceUploads,
    ) -> ScoreBreakdown {
        self.compute_at(responses, stage, evidence_uploads, Utc::now())
    }

    /// Same as [`ScoringEngine::compute`] with decay measured against `now`.
    pub fn compute_at(
        &self,
        responses: &ResponseSet,
        stage: StartupStage,
        evidence_uploads: &EvidenceUploads,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let started = Instant::now();
        let framework = self.framework.as_ref();

        let kpi_scores =
            kpi::evaluate_kpis(framework, responses, stage, evidence_uploads, &self.decay, now);
        let mut category_scores = aggregate::aggregate_categories(framework, stage, &kpi_scores);

        let penalties = rules::evaluate_fatal_flags(framework.fatal_flags(), responses);
        let dependency_violations =
            rules::resolve_dependencies(framework.dependency_rules(), responses);
        rules::apply_category_caps(&mut category_scores, &dependency_violations);

        let raw_score = transform::raw_score(&category_scores);
        let final_score = transform::final_score(
            raw_score,
            penalties.total_penalty_points,
            penalties.global_cap,
        );
        let score_band = ScoreBand::from_score(final_score);

        let gaps = explain::identify_gaps(framework, &kpi_scores);
        let recommendations =
            explain::recommendations(&penalties.flags, &dependency_violations, &gaps);

        let calculation_duration_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            %stage,
            final_score,
            band = %score_band,
            raw_score,
            flags = penalties.flags.len(),
            violations = dependency_violations.len(),
            duration_ms = calculation_duration_ms,
            "readiness score computed"
        );

        ScoreBreakdown {
            final_score,
            score_band,
            raw_score,
            stage,
            framework_version: framework.version().to_string(),
            category_scores,
            kpi_scores,
            fatal_flags_triggered: penalties.flags,
            total_penalty_points: penalties.total_penalty_points,
            global_cap_applied: (penalties.global_cap < MAX_SCORE).then_some(penalties.global_cap),
            dependency_violations,
            gaps,
            recommendations,
            calculation_timestamp: now,
            calculation_duration_ms,
        }
    }
}
