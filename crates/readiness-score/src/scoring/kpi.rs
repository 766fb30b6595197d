use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decay::DecayPolicy;
use super::domain::{
    Correctness, EvidenceType, EvidenceUploads, KpiResponse, KpiValue, ResponseSet, StartupStage,
};
use super::framework::{Framework, KpiConfig, Thresholds};
use super::predicate::Predicate;

/// Per-KPI contribution, with every multiplier kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiScore {
    pub kpi_id: String,
    pub answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correctness: Option<Correctness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<EvidenceType>,
    pub base_weight: f64,
    pub stage_multiplier: f64,
    pub correctness_multiplier: f64,
    pub evidence_multiplier: f64,
    pub decay_multiplier: f64,
    pub earned_value: f64,
    pub max_possible: f64,
}

/// Green wins over yellow; anything unmatched is incorrect.
pub fn classify(value: &KpiValue, thresholds: &Thresholds) -> Correctness {
    let satisfied = |predicate: &Option<Predicate>| {
        predicate
            .as_ref()
            .is_some_and(|predicate| predicate.matches(Some(value)))
    };

    if satisfied(&thresholds.green) {
        Correctness::Correct
    } else if satisfied(&thresholds.yellow) {
        Correctness::Partial
    } else {
        Correctness::Incorrect
    }
}

pub fn score_kpi(
    kpi: &KpiConfig,
    response: Option<&KpiResponse>,
    stage: StartupStage,
    uploaded_at: Option<DateTime<Utc>>,
    decay: &DecayPolicy,
    now: DateTime<Utc>,
) -> KpiScore {
    let base_weight = if kpi.base_weight.is_finite() {
        kpi.base_weight.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let Some(response) = response else {
        return KpiScore {
            kpi_id: kpi.id.clone(),
            answered: false,
            correctness: None,
            evidence_type: None,
            base_weight,
            stage_multiplier: kpi.stage_multiplier(stage),
            correctness_multiplier: 0.0,
            evidence_multiplier: 0.0,
            decay_multiplier: 0.0,
            earned_value: 0.0,
            max_possible: base_weight,
        };
    };

    let correctness = classify(&response.value, kpi.scoring_logic.for_stage(stage));
    let correctness_multiplier = correctness.multiplier();
    let evidence_multiplier = response.evidence_type.multiplier();
    let decay_multiplier = decay.multiplier(&kpi.id, uploaded_at, now);
    let earned_value =
        (base_weight * correctness_multiplier * evidence_multiplier * decay_multiplier)
            .clamp(0.0, base_weight);

    KpiScore {
        kpi_id: kpi.id.clone(),
        answered: true,
        correctness: Some(correctness),
        evidence_type: Some(response.evidence_type),
        base_weight,
        stage_multiplier: kpi.stage_multiplier(stage),
        correctness_multiplier,
        evidence_multiplier,
        decay_multiplier,
        earned_value,
        max_possible: base_weight,
    }
}

/// Scores every configured KPI. Responses for KPIs outside the framework are ignored.
pub fn evaluate_kpis(
    framework: &Framework,
    responses: &ResponseSet,
    stage: StartupStage,
    evidence_uploads: &EvidenceUploads,
    decay: &DecayPolicy,
    now: DateTime<Utc>,
) -> BTreeMap<String, KpiScore> {
    framework
        .kpis()
        .map(|kpi| {
            let score = score_kpi(
                kpi,
                responses.get(&kpi.id),
                stage,
                evidence_uploads.get(&kpi.id).copied(),
                decay,
                now,
            );
            (kpi.id.clone(), score)
        })
        .collect()
}
