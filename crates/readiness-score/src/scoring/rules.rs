use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::CategoryScore;
use super::domain::ResponseSet;
use super::framework::{DependencyAction, DependencyRule, FatalFlagRule, Severity};
use super::transform::MAX_SCORE;

/// A fatal-flag rule that fired for this assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatalFlag {
    pub flag_id: String,
    pub trigger_kpi: String,
    pub trigger_condition: String,
    pub penalty_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_cap: Option<u16>,
    pub severity: Severity,
    pub reason: String,
    pub user_message: String,
}

impl FatalFlag {
    fn from_rule(rule: &FatalFlagRule) -> Self {
        Self {
            flag_id: rule.id.clone(),
            trigger_kpi: rule.trigger_kpi.clone(),
            trigger_condition: rule.condition.to_string(),
            penalty_points: rule.penalty_points,
            global_cap: rule.global_cap,
            severity: rule.severity,
            reason: rule.reason.clone(),
            user_message: rule.user_message.clone(),
        }
    }
}

/// A dependency rule whose condition held. Every action is reported; only
/// [`DependencyAction::ApplyCap`] changes a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyViolation {
    pub rule_id: String,
    pub source_kpi: String,
    pub condition: String,
    pub target_category: String,
    pub action: DependencyAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_value: Option<f64>,
    pub reason: String,
}

impl DependencyViolation {
    fn from_rule(rule: &DependencyRule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            source_kpi: rule.source_kpi.clone(),
            condition: rule.condition.to_string(),
            target_category: rule.target_category.clone(),
            action: rule.action,
            cap_value: rule.cap_value,
            reason: rule.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltySummary {
    pub flags: Vec<FatalFlag>,
    pub total_penalty_points: u32,
    /// Lowest cap among triggered flags, or 900 when none sets one.
    pub global_cap: u16,
}

pub fn evaluate_fatal_flags(rules: &[FatalFlagRule], responses: &ResponseSet) -> PenaltySummary {
    let flags: Vec<FatalFlag> = rules
        .iter()
        .filter(|rule| {
            let answer = responses.get(&rule.trigger_kpi).map(|response| &response.value);
            rule.condition.matches(answer)
        })
        .map(FatalFlag::from_rule)
        .collect();

    let total_penalty_points = flags
        .iter()
        .fold(0u32, |total, flag| total.saturating_add(flag.penalty_points));
    let global_cap = flags
        .iter()
        .filter_map(|flag| flag.global_cap)
        .min()
        .unwrap_or(MAX_SCORE)
        .min(MAX_SCORE);

    for flag in &flags {
        debug!(flag = %flag.flag_id, severity = ?flag.severity, penalty = flag.penalty_points, "fatal flag triggered");
    }

    PenaltySummary {
        flags,
        total_penalty_points,
        global_cap,
    }
}

/// Violations in configured rule order.
pub fn resolve_dependencies(
    rules: &[DependencyRule],
    responses: &ResponseSet,
) -> Vec<DependencyViolation> {
    rules
        .iter()
        .filter(|rule| {
            let answer = responses.get(&rule.source_kpi).map(|response| &response.value);
            rule.condition.matches(answer)
        })
        .map(DependencyViolation::from_rule)
        .collect()
}

/// Lowers each category to the tightest `apply_cap` aimed at it. Among equal caps the
/// smallest rule id supplies the reason.
pub fn apply_category_caps(categories: &mut [CategoryScore], violations: &[DependencyViolation]) {
    for category in categories.iter_mut() {
        let tightest = violations
            .iter()
            .filter(|violation| {
                violation.action == DependencyAction::ApplyCap
                    && violation.target_category == category.category_id
            })
            .filter_map(|violation| {
                violation
                    .cap_value
                    .filter(|cap| cap.is_finite())
                    .map(|cap| (cap.clamp(0.0, 1.0), violation))
            })
            .min_by(|(left_cap, left), (right_cap, right)| {
                left_cap
                    .total_cmp(right_cap)
                    .then_with(|| left.rule_id.cmp(&right.rule_id))
            });

        if let Some((cap, violation)) = tightest {
            if category.raw_score > cap {
                debug!(
                    category = %category.category_id,
                    rule = %violation.rule_id,
                    raw = category.raw_score,
                    cap,
                    "category capped by dependency rule"
                );
                category.capped_score = cap;
                category.cap_applied = Some(cap);
                category.cap_reason = Some(violation.reason.clone());
            }
        }

        category.weighted_contribution = category.capped_score * category.stage_weight;
    }
}
