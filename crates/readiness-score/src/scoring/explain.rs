use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::framework::Framework;
use super::kpi::KpiScore;
use super::rules::{DependencyViolation, FatalFlag};

pub const MAX_GAPS: usize = 10;
pub const RECOMMENDED_GAPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    NotAnswered,
    NoEvidence,
}

/// Points a startup could still earn on one KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub kpi_id: String,
    pub kind: GapKind,
    pub potential_gain: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl Gap {
    pub fn recommendation(&self) -> String {
        match self.kind {
            GapKind::NotAnswered => format!("Answer question: {}", self.kpi_id),
            GapKind::NoEvidence => format!("Upload evidence for: {}", self.kpi_id),
        }
    }
}

/// Largest gains first, ties broken by KPI id, at most [`MAX_GAPS`] entries.
pub fn identify_gaps(framework: &Framework, kpi_scores: &BTreeMap<String, KpiScore>) -> Vec<Gap> {
    let mut gaps: Vec<Gap> = kpi_scores
        .values()
        .filter_map(|score| {
            let (kind, potential_gain) = if score.earned_value == 0.0 {
                (GapKind::NotAnswered, score.max_possible)
            } else if score.answered && score.evidence_multiplier < 1.0 {
                (
                    GapKind::NoEvidence,
                    score.max_possible * (1.0 - score.evidence_multiplier),
                )
            } else {
                return None;
            };

            Some(Gap {
                kpi_id: score.kpi_id.clone(),
                kind,
                potential_gain,
                question: framework
                    .kpi(&score.kpi_id)
                    .and_then(|kpi| kpi.question.clone()),
            })
        })
        .collect();

    gaps.sort_by(|left, right| {
        right
            .potential_gain
            .partial_cmp(&left.potential_gain)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.kpi_id.cmp(&right.kpi_id))
    });
    gaps.truncate(MAX_GAPS);
    gaps
}

/// Fatal-flag messages, then dependency unlocks, then the top gaps.
pub fn recommendations(
    flags: &[FatalFlag],
    violations: &[DependencyViolation],
    gaps: &[Gap],
) -> Vec<String> {
    let flag_messages = flags
        .iter()
        .filter(|flag| !flag.user_message.trim().is_empty())
        .map(|flag| flag.user_message.clone());

    let dependency_messages = violations.iter().map(|violation| {
        format!(
            "Resolve '{}' to unlock '{}' category",
            violation.source_kpi, violation.target_category
        )
    });

    let gap_messages = gaps.iter().take(RECOMMENDED_GAPS).map(Gap::recommendation);

    flag_messages
        .chain(dependency_messages)
        .chain(gap_messages)
        .collect()
}
