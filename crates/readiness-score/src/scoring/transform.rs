use std::fmt;

use serde::{Deserialize, Serialize};

use super::aggregate::CategoryScore;

pub const MIN_SCORE: u16 = 300;
pub const MAX_SCORE: u16 = 900;
const SCORE_SPAN: f64 = (MAX_SCORE - MIN_SCORE) as f64;

/// Absorbs float noise from summed weights (0.1 + 0.2 style) before flooring.
const FLOOR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ScoreBand {
    /// Upper bounds are inclusive: 400, 550, 680, 800.
    pub fn from_score(score: u16) -> Self {
        match score {
            0..=400 => Self::Critical,
            401..=550 => Self::Poor,
            551..=680 => Self::Fair,
            681..=800 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Σ capped category score × stage weight, within [0, 1].
pub fn raw_score(categories: &[CategoryScore]) -> f64 {
    let total: f64 = categories
        .iter()
        .map(|category| category.capped_score * category.stage_weight)
        .sum();
    if total.is_finite() {
        total.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Maps a raw score onto 300–900, subtracts penalties, then applies the global cap.
/// The 300 floor wins over a cap configured below it.
pub fn final_score(raw_score: f64, total_penalty_points: u32, global_cap: u16) -> u16 {
    let raw_score = if raw_score.is_finite() {
        raw_score.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let scaled = raw_score * SCORE_SPAN + f64::from(MIN_SCORE);
    let penalized = (scaled - f64::from(total_penalty_points) + FLOOR_EPSILON).floor();
    let ceiling = f64::from(global_cap.min(MAX_SCORE));

    penalized.min(ceiling).max(f64::from(MIN_SCORE)) as u16
}
