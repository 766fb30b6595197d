use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::scoring::domain::{EvidenceType, KpiResponse, KpiValue, ResponseSet, StartupStage};
use crate::scoring::framework::{
    CategoryConfig, DependencyAction, DependencyRule, FatalFlagRule, Framework, KpiConfig,
    Severity, SubCategoryConfig, Thresholds,
};
use crate::scoring::predicate::Predicate;
use crate::scoring::ScoringEngine;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn predicate(raw: &str) -> Predicate {
    Predicate::parse(raw).expect("valid predicate")
}

pub(super) fn bool_kpi(id: &str, base_weight: f64) -> KpiConfig {
    KpiConfig::new(
        id,
        base_weight,
        Thresholds {
            green: Some(predicate("value == true")),
            yellow: None,
            red: Some(predicate("value == false")),
        },
    )
}

pub(super) fn numeric_kpi(id: &str, base_weight: f64, green: &str, yellow: &str) -> KpiConfig {
    KpiConfig::new(
        id,
        base_weight,
        Thresholds {
            green: Some(predicate(green)),
            yellow: Some(predicate(yellow)),
            red: None,
        },
    )
}

pub(super) fn category(id: &str, stage_weight: f64, sub_weight: f64, kpis: Vec<KpiConfig>) -> CategoryConfig {
    CategoryConfig {
        id: id.to_string(),
        stage_weights: StartupStage::ordered()
            .into_iter()
            .map(|stage| (stage, stage_weight))
            .collect(),
        sub_categories: vec![SubCategoryConfig {
            id: format!("{id}_core"),
            weight: sub_weight,
            kpis,
        }],
    }
}

pub(super) fn fatal_flag(id: &str, kpi: &str, condition: &str, penalty: u32, cap: Option<u16>) -> FatalFlagRule {
    FatalFlagRule {
        id: id.to_string(),
        trigger_kpi: kpi.to_string(),
        condition: predicate(condition),
        penalty_points: penalty,
        global_cap: cap,
        severity: Severity::Critical,
        reason: format!("{kpi} failed"),
        user_message: format!("Fix {kpi}"),
    }
}

pub(super) fn cap_rule(id: &str, kpi: &str, condition: &str, target: &str, cap: f64) -> DependencyRule {
    DependencyRule {
        id: id.to_string(),
        source_kpi: kpi.to_string(),
        condition: predicate(condition),
        target_category: target.to_string(),
        action: DependencyAction::ApplyCap,
        cap_value: Some(cap),
        reason: format!("{id} limits {target}"),
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

pub(super) fn responses<const N: usize>(entries: [(&str, KpiResponse); N]) -> ResponseSet {
    entries
        .into_iter()
        .map(|(id, response)| (id.to_string(), response))
        .collect()
}

pub(super) fn engine(framework: Framework) -> ScoringEngine {
    ScoringEngine::new(Arc::new(framework))
}

pub(super) fn no_uploads() -> BTreeMap<String, DateTime<Utc>> {
    BTreeMap::new()
}
