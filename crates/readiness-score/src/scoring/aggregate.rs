use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::StartupStage;
use super::framework::{CategoryConfig, Framework, SubCategoryConfig};
use super::kpi::KpiScore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategoryScore {
    pub sub_category_id: String,
    pub weight: f64,
    pub normalized_score: f64,
    pub total_earned: f64,
    pub total_possible: f64,
    /// KPIs that earned any points.
    pub kpis_completed: usize,
    pub kpis_total: usize,
}

/// Category result. `capped_score` never exceeds `raw_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: String,
    pub stage_weight: f64,
    pub raw_score: f64,
    pub capped_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_applied: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_reason: Option<String>,
    pub weighted_contribution: f64,
    pub max_possible_contribution: f64,
    pub sub_categories: Vec<SubCategoryScore>,
}

pub fn aggregate_sub_category(
    config: &SubCategoryConfig,
    kpi_scores: &BTreeMap<String, KpiScore>,
) -> SubCategoryScore {
    let members: Vec<&KpiScore> = config
        .kpis
        .iter()
        .filter_map(|kpi| kpi_scores.get(&kpi.id))
        .collect();

    let total_earned: f64 = members.iter().map(|score| score.earned_value).sum();
    let total_possible: f64 = members.iter().map(|score| score.max_possible).sum();
    let normalized_score = if total_possible > 0.0 {
        (total_earned / total_possible).clamp(0.0, 1.0)
    } else {
        0.0
    };

    SubCategoryScore {
        sub_category_id: config.id.clone(),
        weight: finite_or_zero(config.weight),
        normalized_score,
        total_earned,
        total_possible,
        kpis_completed: members.iter().filter(|score| score.earned_value > 0.0).count(),
        kpis_total: config.kpis.len(),
    }
}

pub fn aggregate_category(
    config: &CategoryConfig,
    stage: StartupStage,
    kpi_scores: &BTreeMap<String, KpiScore>,
) -> CategoryScore {
    let sub_categories: Vec<SubCategoryScore> = config
        .sub_categories
        .iter()
        .map(|sub_category| aggregate_sub_category(sub_category, kpi_scores))
        .collect();

    let raw_score = finite_or_zero(
        sub_categories
            .iter()
            .map(|sub_category| sub_category.weight * sub_category.normalized_score)
            .sum(),
    )
    .clamp(0.0, 1.0);
    let stage_weight = finite_or_zero(config.stage_weight(stage));

    CategoryScore {
        category_id: config.id.clone(),
        stage_weight,
        raw_score,
        capped_score: raw_score,
        cap_applied: None,
        cap_reason: None,
        weighted_contribution: raw_score * stage_weight,
        max_possible_contribution: stage_weight,
        sub_categories,
    }
}

/// Uncapped category scores in framework order.
pub fn aggregate_categories(
    framework: &Framework,
    stage: StartupStage,
    kpi_scores: &BTreeMap<String, KpiScore>,
) -> Vec<CategoryScore> {
    framework
        .categories()
        .iter()
        .map(|category| aggregate_category(category, stage, kpi_scores))
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
