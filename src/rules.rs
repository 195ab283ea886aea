//! Ordered threshold rules mapping an observed value to a display color.
//!
//! Rules are tested in stored order and the first match wins, so two
//! overlapping rules give different results depending on which comes first.
//! Thresholds are read leniently from JSON: numbers and numeric strings are
//! accepted, anything else becomes a bound that never matches.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::RuleError;
use crate::weather::{Field, Observation};

/// Color for an observation no rule matched.
pub const DEFAULT_COLOR: &str = "#95a5a6";
/// Color for an observation lacking the rule set's field.
pub const NO_DATA_COLOR: &str = "#95a5a6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(other)]
    Unsupported,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
            Operator::Unsupported => "?",
        }
    }

    pub fn test(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Eq => value == threshold,
            Operator::Unsupported => false,
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub operator: Operator,

    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator2: Option<Operator>,

    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value2: Option<f64>,

    pub color: String,
}

impl ClassificationRule {
    pub fn single(operator: Operator, value: f64, color: &str) -> Self {
        Self {
            operator,
            value: Some(value),
            operator2: None,
            value2: None,
            color: color.to_string(),
        }
    }

    pub fn between(
        operator: Operator,
        value: f64,
        operator2: Operator,
        value2: f64,
        color: &str,
    ) -> Self {
        Self {
            operator,
            value: Some(value),
            operator2: Some(operator2),
            value2: Some(value2),
            color: color.to_string(),
        }
    }

    /// Both bounds must hold when a second operator is present.
    pub fn matches(&self, value: f64) -> bool {
        let bound = |op: Operator, threshold: Option<f64>| {
            threshold.is_some_and(|threshold| op.test(value, threshold))
        };
        match self.operator2 {
            Some(op2) => bound(self.operator, self.value) && bound(op2, self.value2),
            None => bound(self.operator, self.value),
        }
    }
}

impl Default for ClassificationRule {
    fn default() -> Self {
        Self::single(Operator::Ge, 0.0, DEFAULT_COLOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub field: String,

    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    Matched { index: usize, color: &'a str },
    NoMatch,
    NoData,
}

impl<'a> Classification<'a> {
    pub fn color(&self) -> &'a str {
        match self {
            Classification::Matched { color, .. } => *color,
            Classification::NoMatch => DEFAULT_COLOR,
            Classification::NoData => NO_DATA_COLOR,
        }
    }
}

impl RuleSet {
    pub fn new(field: &str, rules: Vec<ClassificationRule>) -> Self {
        Self {
            field: field.to_string(),
            rules,
        }
    }

    /// Cold, mild and warm bands on 2 m temperature.
    pub fn default_temperature() -> Self {
        Self::new(
            Field::Temperature.key(),
            vec![
                ClassificationRule::single(Operator::Lt, 10.0, "#ff4444"),
                ClassificationRule::between(Operator::Ge, 10.0, Operator::Lt, 25.0, "#4444ff"),
                ClassificationRule::single(Operator::Ge, 25.0, "#44ff44"),
            ],
        )
    }

    pub fn evaluate<'a>(&'a self, observation: &Observation) -> Classification<'a> {
        let Some(value) = observation.get(&self.field) else {
            return Classification::NoData;
        };
        self.rules
            .iter()
            .position(|rule| rule.matches(value))
            .map_or(Classification::NoMatch, |index| Classification::Matched {
                index,
                color: &self.rules[index].color,
            })
    }

    pub fn set_field(&mut self, field: &str) {
        self.field = field.to_string();
    }

    pub fn add_rule(&mut self, rule: ClassificationRule) {
        self.rules.push(rule);
    }

    pub fn remove_rule(&mut self, index: usize) -> Result<ClassificationRule, RuleError> {
        self.check(index)?;
        Ok(self.rules.remove(index))
    }

    pub fn update_rule(&mut self, index: usize, rule: ClassificationRule) -> Result<(), RuleError> {
        self.check(index)?;
        self.rules[index] = rule;
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), RuleError> {
        if index < self.rules.len() {
            Ok(())
        } else {
            Err(RuleError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            })
        }
    }
}

/// Color for `observation` under `rule_set`.
pub fn classify<'a>(observation: &Observation, rule_set: &'a RuleSet) -> &'a str {
    rule_set.evaluate(observation).color()
}
