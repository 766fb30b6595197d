//! Immutable scoring framework: the category → sub-category → KPI tree plus the
//! fatal-flag and dependency rule lists.
//!
//! Documents are YAML. Every threshold and rule condition is parsed into a [`Predicate`]
//! while loading, so a malformed framework is rejected before any assessment is scored.
//! Missing weights are tolerated and contribute nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::domain::StartupStage;
use super::predicate::{Predicate, PredicateError};

pub const DEFAULT_FRAMEWORK_VERSION: &str = "1.0.0";

const SAMPLE_FRAMEWORK: &str = include_str!("../../config/framework.yaml");
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("failed to read framework document: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid framework document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("KPI '{kpi}' has an invalid {tier} threshold: {source}")]
    InvalidThreshold {
        kpi: String,
        tier: &'static str,
        source: PredicateError,
    },
    #[error("rule '{rule}' has an invalid condition: {source}")]
    InvalidCondition { rule: String, source: PredicateError },
    #[error("rule '{rule}' condition '{condition}' must be an equality or 'unanswered'")]
    UnsupportedCondition { rule: String, condition: String },
    #[error("{field} must be within [0, 1], found {value}")]
    WeightOutOfRange { field: String, value: f64 },
    #[error("KPI '{kpi}' has an invalid {stage} stage multiplier {value}")]
    InvalidMultiplier {
        kpi: String,
        stage: StartupStage,
        value: f64,
    },
    #[error("category '{0}' is defined more than once")]
    DuplicateCategory(String),
    #[error("KPI '{0}' is defined more than once")]
    DuplicateKpi(String),
    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),
    #[error("rule '{rule}' references unknown KPI '{kpi}'")]
    UnknownKpi { rule: String, kpi: String },
    #[error("rule '{rule}' targets unknown category '{category}'")]
    UnknownCategory { rule: String, category: String },
    #[error("rule '{rule}' applies a cap but has no cap value within [0, 1]")]
    InvalidCap { rule: String },
}

/// Severity of a fatal flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Warning,
    Critical,
}

/// What a satisfied dependency rule does to its target category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyAction {
    ApplyCap,
    TriggerFlag,
    ReduceConfidence,
}

/// Green/yellow/red conditions for one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thresholds {
    pub green: Option<Predicate>,
    pub yellow: Option<Predicate>,
    pub red: Option<Predicate>,
}

/// Thresholds with optional per-stage overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringLogic {
    pub default: Thresholds,
    pub per_stage: BTreeMap<StartupStage, Thresholds>,
}

impl ScoringLogic {
    pub fn uniform(thresholds: Thresholds) -> Self {
        Self {
            default: thresholds,
            per_stage: BTreeMap::new(),
        }
    }

    pub fn for_stage(&self, stage: StartupStage) -> &Thresholds {
        self.per_stage.get(&stage).unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiConfig {
    pub id: String,
    pub question: Option<String>,
    pub answer_type: Option<String>,
    pub priority: Option<String>,
    pub base_weight: f64,
    pub stage_multipliers: BTreeMap<StartupStage, f64>,
    pub scoring_logic: ScoringLogic,
}

impl KpiConfig {
    pub fn new(id: impl Into<String>, base_weight: f64, thresholds: Thresholds) -> Self {
        Self {
            id: id.into(),
            question: None,
            answer_type: None,
            priority: None,
            base_weight,
            stage_multipliers: BTreeMap::new(),
            scoring_logic: ScoringLogic::uniform(thresholds),
        }
    }

    /// Reported alongside the score; the formula itself does not apply it.
    pub fn stage_multiplier(&self, stage: StartupStage) -> f64 {
        self.stage_multipliers.get(&stage).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubCategoryConfig {
    pub id: String,
    pub weight: f64,
    pub kpis: Vec<KpiConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub id: String,
    pub stage_weights: BTreeMap<StartupStage, f64>,
    pub sub_categories: Vec<SubCategoryConfig>,
}

impl CategoryConfig {
    /// Weight for `stage`; an unset `weight_<stage>` key counts as zero.
    pub fn stage_weight(&self, stage: StartupStage) -> f64 {
        self.stage_weights.get(&stage).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FatalFlagRule {
    pub id: String,
    pub trigger_kpi: String,
    pub condition: Predicate,
    pub penalty_points: u32,
    pub global_cap: Option<u16>,
    pub severity: Severity,
    pub reason: String,
    pub user_message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRule {
    pub id: String,
    pub source_kpi: String,
    pub condition: Predicate,
    pub target_category: String,
    pub action: DependencyAction,
    pub cap_value: Option<f64>,
    pub reason: String,
}

/// Validated, read-only scoring configuration. Share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Framework {
    version: String,
    categories: Vec<CategoryConfig>,
    fatal_flags: Vec<FatalFlagRule>,
    dependency_rules: Vec<DependencyRule>,
}

impl Framework {
    pub fn new(
        version: impl Into<String>,
        categories: Vec<CategoryConfig>,
        fatal_flags: Vec<FatalFlagRule>,
        dependency_rules: Vec<DependencyRule>,
    ) -> Result<Self, FrameworkError> {
        let framework = Self {
            version: version.into(),
            categories,
            fatal_flags,
            dependency_rules,
        };
        framework.validate()?;
        Ok(framework)
    }

    /// A framework with no categories or rules. Every assessment scores 300.
    pub fn empty() -> Self {
        Self {
            version: DEFAULT_FRAMEWORK_VERSION.to_string(),
            categories: Vec::new(),
            fatal_flags: Vec::new(),
            dependency_rules: Vec::new(),
        }
    }

    /// The framework bundled with the crate.
    pub fn sample() -> Result<Self, FrameworkError> {
        Self::from_yaml_str(SAMPLE_FRAMEWORK)
    }

    pub fn from_yaml_str(document: &str) -> Result<Self, FrameworkError> {
        let raw: RawFramework = serde_yaml::from_str(document)?;
        raw.into_framework()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FrameworkError> {
        let raw: RawFramework = serde_yaml::from_reader(reader)?;
        raw.into_framework()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, FrameworkError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Combine a KPI tree document with separately maintained rule documents
    /// (`{fatal_flags: [...]}` and `{dependency_rules: [...]}`).
    pub fn from_documents(
        kpis: &str,
        fatal_flags: Option<&str>,
        dependency_rules: Option<&str>,
    ) -> Result<Self, FrameworkError> {
        let mut raw: RawFramework = serde_yaml::from_str(kpis)?;
        if let Some(document) = fatal_flags {
            let extra: RawFramework = serde_yaml::from_str(document)?;
            raw.fatal_flags.extend(extra.fatal_flags);
        }
        if let Some(document) = dependency_rules {
            let extra: RawFramework = serde_yaml::from_str(document)?;
            raw.dependency_rules.extend(extra.dependency_rules);
        }
        raw.into_framework()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn categories(&self) -> &[CategoryConfig] {
        &self.categories
    }

    pub fn fatal_flags(&self) -> &[FatalFlagRule] {
        &self.fatal_flags
    }

    pub fn dependency_rules(&self) -> &[DependencyRule] {
        &self.dependency_rules
    }

    pub fn kpis(&self) -> impl Iterator<Item = &KpiConfig> {
        self.categories
            .iter()
            .flat_map(|category| category.sub_categories.iter())
            .flat_map(|sub_category| sub_category.kpis.iter())
    }

    pub fn kpi(&self, kpi_id: &str) -> Option<&KpiConfig> {
        self.kpis().find(|kpi| kpi.id == kpi_id)
    }

    pub fn category(&self, category_id: &str) -> Option<&CategoryConfig> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
    }

    fn validate(&self) -> Result<(), FrameworkError> {
        let mut category_ids = BTreeSet::new();
        let mut kpi_ids = BTreeSet::new();

        for category in &self.categories {
            if !category_ids.insert(category.id.as_str()) {
                return Err(FrameworkError::DuplicateCategory(category.id.clone()));
            }
            for (stage, weight) in &category.stage_weights {
                check_unit_weight(
                    || format!("category '{}' {}", category.id, stage.weight_key()),
                    *weight,
                )?;
            }

            let mut sub_weight_total = 0.0;
            for sub_category in &category.sub_categories {
                check_unit_weight(
                    || format!("sub-category '{}' weight", sub_category.id),
                    sub_category.weight,
                )?;
                sub_weight_total += sub_category.weight;

                for kpi in &sub_category.kpis {
                    if !kpi_ids.insert(kpi.id.as_str()) {
                        return Err(FrameworkError::DuplicateKpi(kpi.id.clone()));
                    }
                    check_unit_weight(
                        || format!("KPI '{}' base_weight", kpi.id),
                        kpi.base_weight,
                    )?;
                    for (stage, multiplier) in &kpi.stage_multipliers {
                        if !multiplier.is_finite() || *multiplier < 0.0 {
                            return Err(FrameworkError::InvalidMultiplier {
                                kpi: kpi.id.clone(),
                                stage: *stage,
                                value: *multiplier,
                            });
                        }
                    }
                }
            }

            if sub_weight_total > 1.0 + WEIGHT_SUM_TOLERANCE {
                warn!(
                    category = %category.id,
                    total = sub_weight_total,
                    "sub-category weights exceed 1.0; category scores will be clamped"
                );
            }
        }

        for stage in StartupStage::ordered() {
            let total: f64 = self
                .categories
                .iter()
                .map(|category| category.stage_weight(stage))
                .sum();
            if total > 1.0 + WEIGHT_SUM_TOLERANCE {
                warn!(%stage, total, "category stage weights exceed 1.0; raw score will be clamped");
            }
        }

        let mut rule_ids = BTreeSet::new();
        for flag in &self.fatal_flags {
            if !rule_ids.insert(flag.id.as_str()) {
                return Err(FrameworkError::DuplicateRule(flag.id.clone()));
            }
            if !kpi_ids.contains(flag.trigger_kpi.as_str()) {
                return Err(FrameworkError::UnknownKpi {
                    rule: flag.id.clone(),
                    kpi: flag.trigger_kpi.clone(),
                });
            }
            check_rule_condition(&flag.id, &flag.condition)?;
        }

        for rule in &self.dependency_rules {
            if !rule_ids.insert(rule.id.as_str()) {
                return Err(FrameworkError::DuplicateRule(rule.id.clone()));
            }
            if !category_ids.contains(rule.target_category.as_str()) {
                return Err(FrameworkError::UnknownCategory {
                    rule: rule.id.clone(),
                    category: rule.target_category.clone(),
                });
            }
            if !kpi_ids.contains(rule.source_kpi.as_str()) {
                return Err(FrameworkError::UnknownKpi {
                    rule: rule.id.clone(),
                    kpi: rule.source_kpi.clone(),
                });
            }
            check_rule_condition(&rule.id, &rule.condition)?;
            if rule.action == DependencyAction::ApplyCap {
                let valid_cap = rule
                    .cap_value
                    .map(|cap| cap.is_finite() && (0.0..=1.0).contains(&cap))
                    .unwrap_or(false);
                if !valid_cap {
                    return Err(FrameworkError::InvalidCap {
                        rule: rule.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Rule conditions compare one answer: `value == x` or `unanswered`.
fn check_rule_condition(rule_id: &str, condition: &Predicate) -> Result<(), FrameworkError> {
    match condition {
        Predicate::Equals(_) | Predicate::Unanswered => Ok(()),
        Predicate::Range(_) | Predicate::OneOf(_) => Err(FrameworkError::UnsupportedCondition {
            rule: rule_id.to_string(),
            condition: condition.to_string(),
        }),
    }
}

fn check_unit_weight(field: impl FnOnce() -> String, value: f64) -> Result<(), FrameworkError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FrameworkError::WeightOutOfRange {
            field: field(),
            value,
        })
    }
}

/// Map entries in document order, so categories and KPIs report the way they were written.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map keyed by identifier")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

#[derive(Debug, Default, Deserialize)]
struct RawFramework {
    #[serde(default)]
    version: Option<String>,
    #[serde(default, deserialize_with = "ordered_entries")]
    categories: Vec<(String, RawCategory)>,
    #[serde(default)]
    fatal_flags: Vec<RawFatalFlag>,
    #[serde(default)]
    dependency_rules: Vec<RawDependencyRule>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    weight_idea: Option<f64>,
    weight_mvp_no_traction: Option<f64>,
    weight_mvp_early_traction: Option<f64>,
    weight_growth: Option<f64>,
    weight_scale: Option<f64>,
    #[serde(default, deserialize_with = "ordered_entries")]
    sub_categories: Vec<(String, RawSubCategory)>,
}

impl RawCategory {
    fn stage_weights(&self) -> BTreeMap<StartupStage, f64> {
        [
            (StartupStage::Idea, self.weight_idea),
            (StartupStage::MvpNoTraction, self.weight_mvp_no_traction),
            (StartupStage::MvpEarlyTraction, self.weight_mvp_early_traction),
            (StartupStage::Growth, self.weight_growth),
            (StartupStage::Scale, self.weight_scale),
        ]
        .into_iter()
        .filter_map(|(stage, weight)| weight.map(|weight| (stage, weight)))
        .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawSubCategory {
    weight: Option<f64>,
    #[serde(default, deserialize_with = "ordered_entries")]
    kpis: Vec<(String, RawKpi)>,
}

#[derive(Debug, Deserialize)]
struct RawKpi {
    question: Option<String>,
    #[serde(rename = "type")]
    answer_type: Option<String>,
    priority: Option<String>,
    base_weight: Option<f64>,
    #[serde(default)]
    stage_multiplier: BTreeMap<StartupStage, f64>,
    #[serde(default)]
    scoring_logic: RawScoringLogic,
}

#[derive(Debug, Default, Deserialize)]
struct RawScoringLogic {
    green: Option<RawCondition>,
    yellow: Option<RawCondition>,
    red: Option<RawCondition>,
    #[serde(flatten)]
    stages: BTreeMap<StartupStage, RawThresholds>,
}

#[derive(Debug, Default, Deserialize)]
struct RawThresholds {
    green: Option<RawCondition>,
    yellow: Option<RawCondition>,
    red: Option<RawCondition>,
}

/// Conditions are usually strings, but YAML turns `true` or `12` into typed scalars.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawCondition {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl RawCondition {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Bool(value) => format!("value == {value}"),
            Self::Number(value) => format!("value == {value}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFatalFlag {
    flag_id: String,
    trigger_kpi: String,
    #[serde(alias = "condition")]
    trigger_condition: RawCondition,
    #[serde(default)]
    penalty_points: u32,
    global_cap: Option<u16>,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    user_message: String,
}

#[derive(Debug, Deserialize)]
struct RawDependencyRule {
    rule_id: String,
    source_kpi: String,
    #[serde(alias = "trigger_condition")]
    condition: RawCondition,
    target_category: String,
    action: DependencyAction,
    cap_value: Option<f64>,
    #[serde(default)]
    reason: String,
}

impl RawFramework {
    fn into_framework(self) -> Result<Framework, FrameworkError> {
        let version = self
            .version
            .unwrap_or_else(|| DEFAULT_FRAMEWORK_VERSION.to_string());

        let mut categories = Vec::with_capacity(self.categories.len());
        for (category_id, raw_category) in self.categories {
            let stage_weights = raw_category.stage_weights();
            if stage_weights.is_empty() {
                warn!(category = %category_id, "category has no weight_<stage> keys; it contributes nothing");
            }

            let mut sub_categories = Vec::with_capacity(raw_category.sub_categories.len());
            for (sub_category_id, raw_sub_category) in raw_category.sub_categories {
                let weight = raw_sub_category.weight.unwrap_or_else(|| {
                    warn!(sub_category = %sub_category_id, "sub-category has no weight; defaulting to 0");
                    0.0
                });

                let mut kpis = Vec::with_capacity(raw_sub_category.kpis.len());
                for (kpi_id, raw_kpi) in raw_sub_category.kpis {
                    kpis.push(convert_kpi(kpi_id, raw_kpi)?);
                }

                sub_categories.push(SubCategoryConfig {
                    id: sub_category_id,
                    weight,
                    kpis,
                });
            }

            categories.push(CategoryConfig {
                id: category_id,
                stage_weights,
                sub_categories,
            });
        }

        let fatal_flags = self
            .fatal_flags
            .into_iter()
            .map(|raw| {
                let condition = parse_condition(&raw.flag_id, raw.trigger_condition)?;
                Ok(FatalFlagRule {
                    id: raw.flag_id,
                    trigger_kpi: raw.trigger_kpi,
                    condition,
                    penalty_points: raw.penalty_points,
                    global_cap: raw.global_cap,
                    severity: raw.severity,
                    reason: raw.reason,
                    user_message: raw.user_message,
                })
            })
            .collect::<Result<Vec<_>, FrameworkError>>()?;

        let dependency_rules = self
            .dependency_rules
            .into_iter()
            .map(|raw| {
                let condition = parse_condition(&raw.rule_id, raw.condition)?;
                Ok(DependencyRule {
                    id: raw.rule_id,
                    source_kpi: raw.source_kpi,
                    condition,
                    target_category: raw.target_category,
                    action: raw.action,
                    cap_value: raw.cap_value,
                    reason: raw.reason,
                })
            })
            .collect::<Result<Vec<_>, FrameworkError>>()?;

        let framework = Framework::new(version, categories, fatal_flags, dependency_rules)?;
        debug!(
            version = framework.version(),
            categories = framework.categories().len(),
            kpis = framework.kpis().count(),
            fatal_flags = framework.fatal_flags().len(),
            dependency_rules = framework.dependency_rules().len(),
            "scoring framework loaded"
        );
        Ok(framework)
    }
}

fn convert_kpi(kpi_id: String, raw: RawKpi) -> Result<KpiConfig, FrameworkError> {
    let base_weight = raw.base_weight.unwrap_or_else(|| {
        warn!(kpi = %kpi_id, "KPI has no base_weight; defaulting to 0");
        0.0
    });

    let RawScoringLogic {
        green,
        yellow,
        red,
        stages,
    } = raw.scoring_logic;
    let default = convert_thresholds(&kpi_id, RawThresholds { green, yellow, red })?;
    let per_stage = stages
        .into_iter()
        .map(|(stage, thresholds)| Ok((stage, convert_thresholds(&kpi_id, thresholds)?)))
        .collect::<Result<BTreeMap<_, _>, FrameworkError>>()?;

    Ok(KpiConfig {
        id: kpi_id,
        question: raw.question,
        answer_type: raw.answer_type,
        priority: raw.priority,
        base_weight,
        stage_multipliers: raw.stage_multiplier,
        scoring_logic: ScoringLogic { default, per_stage },
    })
}

fn convert_thresholds(kpi_id: &str, raw: RawThresholds) -> Result<Thresholds, FrameworkError> {
    let tier = |tier: &'static str, condition: Option<RawCondition>| {
        condition
            .map(|condition| Predicate::parse_optional(&condition.into_text()))
            .transpose()
            .map(Option::flatten)
            .map_err(|source| FrameworkError::InvalidThreshold {
                kpi: kpi_id.to_string(),
                tier,
                source,
            })
    };

    Ok(Thresholds {
        green: tier("green", raw.green)?,
        yellow: tier("yellow", raw.yellow)?,
        red: tier("red", raw.red)?,
    })
}

fn parse_condition(rule_id: &str, condition: RawCondition) -> Result<Predicate, FrameworkError> {
    Predicate::parse(&condition.into_text()).map_err(|source| FrameworkError::InvalidCondition {
        rule: rule_id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::domain::KpiValue;
    use crate::scoring::predicate::Literal;

    const MINIMAL: &str = r#"
version: "2.1.0"
categories:
  team:
    weight_idea: 0.6
    weight_growth: 0.3
    sub_categories:
      founders:
        weight: 1.0
        kpis:
          team_full_time_founders:
            type: boolean
            base_weight: 0.8
            scoring_logic:
              green: "value == true"
              red: "value == false"
          team_key_hires:
            base_weight: 0.2
            scoring_logic:
              green: "≥3"
              yellow: "1-3"
              mvp_no_traction:
                green: "≥1"
fatal_flags:
  - flag_id: FF_SOLO
    trigger_kpi: team_full_time_founders
    trigger_condition: "value == false"
    penalty_points: 40
    severity: critical
    user_message: "Commit a full-time founder."
dependency_rules:
  - rule_id: DEP_TEAM
    source_kpi: team_key_hires
    condition: unanswered
    target_category: team
    action: apply_cap
    cap_value: 0.7
"#;

    #[test]
    fn loads_tree_and_rules() {
        let framework = Framework::from_yaml_str(MINIMAL).expect("framework loads");

        assert_eq!(framework.version(), "2.1.0");
        let team = framework.category("team").expect("team category");
        assert_eq!(team.stage_weight(StartupStage::Idea), 0.6);
        assert_eq!(team.stage_weight(StartupStage::Scale), 0.0);
        assert_eq!(framework.kpis().count(), 2);

        let flag = &framework.fatal_flags()[0];
        assert_eq!(flag.condition, Predicate::Equals(Literal::Bool(false)));
        assert_eq!(flag.severity, Severity::Critical);
        assert_eq!(flag.global_cap, None);

        let rule = &framework.dependency_rules()[0];
        assert_eq!(rule.condition, Predicate::Unanswered);
        assert_eq!(rule.cap_value, Some(0.7));
    }

    #[test]
    fn stage_specific_thresholds_override_the_default() {
        let framework = Framework::from_yaml_str(MINIMAL).expect("framework loads");
        let hires = framework.kpi("team_key_hires").expect("kpi present");

        let early = hires.scoring_logic.for_stage(StartupStage::MvpNoTraction);
        let growth = hires.scoring_logic.for_stage(StartupStage::Growth);

        let one = KpiValue::Number(1.0);
        assert!(early.green.as_ref().is_some_and(|p| p.matches(Some(&one))));
        assert!(!growth.green.as_ref().is_some_and(|p| p.matches(Some(&one))));
        assert!(growth.yellow.as_ref().is_some_and(|p| p.matches(Some(&one))));
    }

    #[test]
    fn malformed_threshold_is_rejected_at_load() {
        let document = MINIMAL.replace("\"≥3\"", "\"≥ plenty\"");

        match Framework::from_yaml_str(&document) {
            Err(FrameworkError::InvalidThreshold { kpi, tier, .. }) => {
                assert_eq!(kpi, "team_key_hires");
                assert_eq!(tier, "green");
            }
            other => panic!("expected invalid threshold, got {other:?}"),
        }
    }

    #[test]
    fn cap_rules_need_a_cap_value() {
        let document = MINIMAL.replace("    cap_value: 0.7\n", "");

        assert!(matches!(
            Framework::from_yaml_str(&document),
            Err(FrameworkError::InvalidCap { .. })
        ));
    }

    #[test]
    fn unknown_target_category_is_rejected() {
        let document = MINIMAL.replace("target_category: team", "target_category: traction");

        assert!(matches!(
            Framework::from_yaml_str(&document),
            Err(FrameworkError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn rules_must_reference_known_kpis() {
        let document = MINIMAL.replace("trigger_kpi: team_full_time_founders", "trigger_kpi: team_size");

        match Framework::from_yaml_str(&document) {
            Err(FrameworkError::UnknownKpi { rule, kpi }) => {
                assert_eq!(rule, "FF_SOLO");
                assert_eq!(kpi, "team_size");
            }
            other => panic!("expected unknown KPI, got {other:?}"),
        }
    }

    #[test]
    fn rule_conditions_must_compare_a_single_value() {
        for condition in ["value != true", "value is true", "'yes', 'no'", "≥3"] {
            let document = MINIMAL.replace(
                "trigger_condition: \"value == false\"",
                &format!("trigger_condition: \"{condition}\""),
            );

            match Framework::from_yaml_str(&document) {
                Err(FrameworkError::UnsupportedCondition { rule, .. })
                | Err(FrameworkError::InvalidCondition { rule, .. }) => assert_eq!(rule, "FF_SOLO"),
                other => panic!("expected '{condition}' to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn operator_typos_in_rule_literals_fail_to_load() {
        let document = MINIMAL.replace(
            "trigger_condition: \"value == false\"",
            "trigger_condition: \"value => false\"",
        );

        match Framework::from_yaml_str(&document) {
            Err(FrameworkError::InvalidCondition { rule, source }) => {
                assert_eq!(rule, "FF_SOLO");
                assert!(matches!(source, PredicateError::MalformedLiteral { .. }));
            }
            other => panic!("expected malformed literal, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_weights_are_rejected() {
        let document = MINIMAL.replace("base_weight: 0.8", "base_weight: 1.8");

        assert!(matches!(
            Framework::from_yaml_str(&document),
            Err(FrameworkError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn tree_keeps_document_order() {
        let framework = Framework::sample().expect("sample loads");

        let categories: Vec<&str> = framework
            .categories()
            .iter()
            .map(|category| category.id.as_str())
            .collect();
        assert_eq!(categories, ["team", "product", "market", "financials", "legal"]);
        let first_kpis: Vec<&str> = framework.kpis().take(2).map(|kpi| kpi.id.as_str()).collect();
        assert_eq!(first_kpis, ["team_full_time_founders", "team_technical_cofounder"]);
    }

    #[test]
    fn missing_weights_default_to_zero() {
        let document = MINIMAL.replace("        weight: 1.0\n", "");
        let framework = Framework::from_yaml_str(&document).expect("framework loads");

        assert_eq!(framework.categories()[0].sub_categories[0].weight, 0.0);
    }

    #[test]
    fn rule_documents_can_be_supplied_separately() {
        let kpis = r#"
categories:
  legal:
    weight_idea: 1.0
    sub_categories:
      entity:
        weight: 1.0
        kpis:
          legal_incorporation:
            base_weight: 1.0
            scoring_logic:
              green: true
"#;
        let flags = r#"
fatal_flags:
  - flag_id: FF_ENTITY
    trigger_kpi: legal_incorporation
    trigger_condition: false
    penalty_points: 100
    global_cap: 650
"#;

        let framework = Framework::from_documents(kpis, Some(flags), None).expect("loads");

        assert_eq!(framework.version(), DEFAULT_FRAMEWORK_VERSION);
        assert_eq!(framework.fatal_flags().len(), 1);
        assert_eq!(
            framework.fatal_flags()[0].condition,
            Predicate::Equals(Literal::Bool(false))
        );
        assert!(framework.dependency_rules().is_empty());
    }

    #[test]
    fn bundled_sample_is_valid() {
        let framework = Framework::sample().expect("sample framework loads");
        assert!(framework.kpis().count() >= 10);
        for stage in StartupStage::ordered() {
            let total: f64 = framework
                .categories()
                .iter()
                .map(|category| category.stage_weight(stage))
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "{stage} weights sum to {total}");
        }
    }
}
