use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LAMBDA: f64 = 0.005;
/// Roughly a week of half-life: bank statements, runway, revenue.
pub const HIGH_VOLATILITY_LAMBDA: f64 = 0.1;
/// Roughly two years of half-life: incorporation papers, contracts, patents.
pub const LOW_VOLATILITY_LAMBDA: f64 = 0.001;

const HIGH_VOLATILITY_KEYWORDS: [&str; 4] = ["financial", "runway", "revenue", "burn"];
const LOW_VOLATILITY_KEYWORDS: [&str; 4] = ["legal", "incorporation", "patent", "contract"];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// How quickly evidence for a KPI goes stale, inferred from its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    High,
    Low,
    Standard,
}

impl Volatility {
    pub fn classify(kpi_id: &str) -> Self {
        let id = kpi_id.to_ascii_lowercase();
        if HIGH_VOLATILITY_KEYWORDS
            .iter()
            .any(|keyword| id.contains(keyword))
        {
            Self::High
        } else if LOW_VOLATILITY_KEYWORDS
            .iter()
            .any(|keyword| id.contains(keyword))
        {
            Self::Low
        } else {
            Self::Standard
        }
    }
}

/// Per-day decay rates for each volatility class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayPolicy {
    pub default_lambda: f64,
    pub high_volatility_lambda: f64,
    pub low_volatility_lambda: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            default_lambda: DEFAULT_LAMBDA,
            high_volatility_lambda: HIGH_VOLATILITY_LAMBDA,
            low_volatility_lambda: LOW_VOLATILITY_LAMBDA,
        }
    }
}

impl DecayPolicy {
    pub fn lambda_for(&self, kpi_id: &str) -> f64 {
        match Volatility::classify(kpi_id) {
            Volatility::High => self.high_volatility_lambda,
            Volatility::Low => self.low_volatility_lambda,
            Volatility::Standard => self.default_lambda,
        }
    }

    /// `e^(-λ·age_days)` for evidence uploaded at `uploaded_at`, or 1.0 without an upload.
    ///
    /// Uploads dated after `now` count as fresh.
    pub fn multiplier(
        &self,
        kpi_id: &str,
        uploaded_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> f64 {
        let Some(uploaded_at) = uploaded_at else {
            return 1.0;
        };

        let age_days = (now - uploaded_at).num_milliseconds().max(0) as f64 / MILLIS_PER_DAY;
        let lambda = self.lambda_for(kpi_id).max(0.0);

        (-lambda * age_days).exp().clamp(0.0, 1.0)
    }
}
