//! Typed replacement for the string-encoded thresholds and rule conditions.
//!
//! Framework documents express conditions as short strings (`value == true`, `≥6 months`,
//! `3-6`, `'b2b', 'b2c'`). They are parsed once, at load, into a [`Predicate`]; scoring only
//! ever evaluates the typed form.

use std::fmt;

use super::domain::KpiValue;

/// Condition over an optional KPI answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Literal),
    Range(NumericRange),
    OneOf(Vec<String>),
    Unanswered,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

/// Interval over numeric answers; a missing side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Some(Bound { value: min, inclusive: true }) => value >= min,
            Some(Bound { value: min, inclusive: false }) => value > min,
            None => true,
        };
        let below = match self.upper {
            Some(Bound { value: max, inclusive: true }) => value <= max,
            Some(Bound { value: max, inclusive: false }) => value < max,
            None => true,
        };
        above && below
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("condition is empty")]
    Empty,
    #[error("expected a number after '{operator}' in '{raw}'")]
    InvalidNumber { operator: &'static str, raw: String },
    #[error("range '{raw}' has a lower bound above its upper bound")]
    InvertedRange { raw: String },
    #[error("'{raw}' uses an unsupported comparison")]
    UnsupportedOperator { raw: String },
    #[error("'{raw}' compares against an operator instead of a value")]
    MalformedLiteral { raw: String },
}

const OPERATOR_CHARS: [char; 6] = ['=', '<', '>', '!', '≥', '≤'];

const UNANSWERED_KEYWORDS: [&str; 4] = ["unanswered", "null", "none", "missing"];

impl Predicate {
    /// Parse a condition string. Blank input is [`PredicateError::Empty`].
    pub fn parse(raw: &str) -> Result<Self, PredicateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PredicateError::Empty);
        }

        let lowered = trimmed.to_lowercase();
        if UNANSWERED_KEYWORDS.contains(&lowered.as_str()) || lowered == "value is null" {
            return Ok(Self::Unanswered);
        }

        let expression = strip_subject(trimmed);
        if expression.starts_with('!') || has_dangling_subject(expression) {
            return Err(PredicateError::UnsupportedOperator {
                raw: trimmed.to_string(),
            });
        }

        for (operator, lower_bound) in [(">=", true), ("≥", true), ("<=", false), ("≤", false)] {
            if let Some(rest) = expression.strip_prefix(operator) {
                let value = leading_number(rest).ok_or_else(|| PredicateError::InvalidNumber {
                    operator,
                    raw: trimmed.to_string(),
                })?;
                return Ok(Self::Range(if lower_bound {
                    NumericRange {
                        lower: Some(Bound { value, inclusive: true }),
                        upper: None,
                    }
                } else {
                    NumericRange {
                        lower: Some(Bound { value: 0.0, inclusive: true }),
                        upper: Some(Bound { value, inclusive: true }),
                    }
                }));
            }
        }

        if let Some(rest) = expression.strip_prefix("==") {
            return parse_literal(rest, trimmed);
        }

        for (operator, lower_bound) in [(">", true), ("<", false)] {
            if let Some(rest) = expression.strip_prefix(operator) {
                let value = leading_number(rest).ok_or_else(|| PredicateError::InvalidNumber {
                    operator,
                    raw: trimmed.to_string(),
                })?;
                return Ok(Self::Range(if lower_bound {
                    NumericRange {
                        lower: Some(Bound { value, inclusive: false }),
                        upper: None,
                    }
                } else {
                    NumericRange {
                        lower: Some(Bound { value: 0.0, inclusive: true }),
                        upper: Some(Bound { value, inclusive: false }),
                    }
                }));
            }
        }

        if let Some(rest) = expression.strip_prefix('=') {
            return parse_literal(rest, trimmed);
        }

        if let Some(range) = parse_span(expression, trimmed)? {
            return Ok(Self::Range(range));
        }

        if let Ok(number) = expression.parse::<f64>() {
            return Ok(Self::Equals(Literal::Number(number)));
        }

        let values: Vec<String> = expression
            .split(',')
            .map(|value| unquote(value).to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if values.is_empty() {
            return Err(PredicateError::Empty);
        }
        Ok(Self::OneOf(values))
    }

    /// Parse an optional threshold where blank means "no condition for this tier".
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, PredicateError> {
        match Self::parse(raw) {
            Ok(predicate) => Ok(Some(predicate)),
            Err(PredicateError::Empty) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Evaluate against an answer; `None` means the KPI was not answered.
    ///
    /// An unanswered KPI satisfies [`Predicate::Unanswered`] and `== false`.
    pub fn matches(&self, answer: Option<&KpiValue>) -> bool {
        let Some(value) = answer else {
            return matches!(self, Self::Unanswered | Self::Equals(Literal::Bool(false)));
        };

        match (self, value) {
            (Self::Unanswered, _) => false,
            (Self::Equals(Literal::Bool(expected)), KpiValue::Boolean(actual)) => expected == actual,
            (Self::Equals(Literal::Number(expected)), KpiValue::Number(actual)) => {
                expected == actual
            }
            (Self::Equals(Literal::Number(expected)), KpiValue::Text(actual)) => actual
                .trim()
                .parse::<f64>()
                .map(|parsed| parsed == *expected)
                .unwrap_or(false),
            (Self::Equals(Literal::Text(expected)), KpiValue::Text(actual)) => {
                expected == actual.trim()
            }
            (Self::Range(range), KpiValue::Number(actual)) => range.contains(*actual),
            (Self::OneOf(values), KpiValue::Text(actual)) => {
                let actual = actual.trim();
                values.iter().any(|candidate| candidate == actual)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(Literal::Bool(value)) => write!(f, "value == {value}"),
            Self::Equals(Literal::Number(value)) => write!(f, "value == {value}"),
            Self::Equals(Literal::Text(value)) => write!(f, "value == '{value}'"),
            Self::Range(range) => {
                let lower = range.lower.filter(|bound| !(bound.value == 0.0 && range.upper.is_some()));
                match (lower, range.upper) {
                    (Some(min), Some(max)) => write!(f, "{}-{}", min.value, max.value),
                    (Some(min), None) if min.inclusive => write!(f, "≥{}", min.value),
                    (Some(min), None) => write!(f, ">{}", min.value),
                    (None, Some(max)) if max.inclusive => write!(f, "≤{}", max.value),
                    (None, Some(max)) => write!(f, "<{}", max.value),
                    (None, None) => f.write_str("any number"),
                }
            }
            Self::OneOf(values) => f.write_str(&values.join(", ")),
            Self::Unanswered => f.write_str("unanswered"),
        }
    }
}

/// Drop a leading `value` subject so `value >= 3` and `>= 3` parse alike.
fn strip_subject(expression: &str) -> &str {
    let lowered = expression.to_ascii_lowercase();
    if lowered.starts_with("value") {
        let rest = expression["value".len()..].trim_start();
        if rest.starts_with(OPERATOR_CHARS) {
            return rest;
        }
    }
    expression
}

/// `value is true` and similar: a subject followed by an operator the grammar lacks.
fn has_dangling_subject(expression: &str) -> bool {
    let mut words = expression.split_whitespace();
    matches!(words.next(), Some(first) if first.eq_ignore_ascii_case("value"))
        && words.next().is_some()
        && !expression.contains(',')
}

fn parse_literal(literal: &str, raw: &str) -> Result<Predicate, PredicateError> {
    let value = unquote(literal);
    if value.is_empty() || value.starts_with(OPERATOR_CHARS) {
        return Err(PredicateError::MalformedLiteral {
            raw: raw.to_string(),
        });
    }
    if value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none") {
        return Ok(Predicate::Unanswered);
    }
    if value.eq_ignore_ascii_case("true") {
        return Ok(Predicate::Equals(Literal::Bool(true)));
    }
    if value.eq_ignore_ascii_case("false") {
        return Ok(Predicate::Equals(Literal::Bool(false)));
    }
    Ok(match value.parse::<f64>() {
        Ok(number) => Predicate::Equals(Literal::Number(number)),
        Err(_) => Predicate::Equals(Literal::Text(value.to_string())),
    })
}

/// `A-B` or `A–B`: closed below, open above. Returns `None` when the text is not a span.
fn parse_span(expression: &str, raw: &str) -> Result<Option<NumericRange>, PredicateError> {
    let Some((left, right)) = expression
        .char_indices()
        .skip(1)
        .find(|(_, ch)| *ch == '-' || *ch == '–')
        .map(|(index, ch)| (&expression[..index], &expression[index + ch.len_utf8()..]))
    else {
        return Ok(None);
    };

    let (Ok(min), Some(max)) = (left.trim().parse::<f64>(), leading_number(right)) else {
        return Ok(None);
    };

    if min > max {
        return Err(PredicateError::InvertedRange {
            raw: raw.to_string(),
        });
    }

    Ok(Some(NumericRange {
        lower: Some(Bound { value: min, inclusive: true }),
        upper: Some(Bound { value: max, inclusive: false }),
    }))
}

/// Numeric prefix of `raw`, ignoring units such as `months` or `%`.
fn leading_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(index, ch)| {
            !(ch.is_ascii_digit() || *ch == '.' || ((*ch == '-' || *ch == '+') && *index == 0))
        })
        .map(|(index, _)| index)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}

fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches(|ch| ch == '\'' || ch == '"').trim()
}
