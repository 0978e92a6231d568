use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Stable identifier for an employee in the directory. Surrounding whitespace is
/// stripped however the id arrives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl<'de> Deserialize<'de> for EmployeeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Identifier for positions, departments, divisions, and grades.
pub type DimensionId = u32;

/// Raw variable reading as captured by the assessment sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Numeric(f64),
    Categorical(String),
}

impl Reading {
    /// Interpret free text the way the CSV loader does: finite numbers become numeric.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(Reading::Numeric(value)),
            _ => Some(Reading::Categorical(trimmed.to_string())),
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Reading::Numeric(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    /// Uppercased, trimmed text used for categorical comparison.
    pub fn category_key(&self) -> String {
        match self {
            Reading::Numeric(value) => normalize_category(&value.to_string()),
            Reading::Categorical(value) => normalize_category(value),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Numeric(value) => write!(f, "{value}"),
            Reading::Categorical(value) => f.write_str(value),
        }
    }
}

pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Readings for one employee keyed by variable name; absent keys are missing readings.
pub type ReadingSet = BTreeMap<String, Reading>;

/// Directory entry for an employee.
///
/// `rating` is the performance rating of the most recent review period, or `None`
/// when the employee has not been rated in that period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: EmployeeId,
    pub fullname: String,
    #[serde(default)]
    pub position_id: Option<DimensionId>,
    #[serde(default)]
    pub department_id: Option<DimensionId>,
    #[serde(default)]
    pub division_id: Option<DimensionId>,
    #[serde(default)]
    pub grade_id: Option<DimensionId>,
    #[serde(default)]
    pub rating: Option<u8>,
}

impl EmployeeRecord {
    pub fn meets_rating(&self, min_rating: u8) -> bool {
        self.rating.map(|rating| rating >= min_rating).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: DimensionId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_finite_numbers() {
        assert_eq!(Reading::parse(" 42.5 "), Some(Reading::Numeric(42.5)));
        assert_eq!(
            Reading::parse("INTJ"),
            Some(Reading::Categorical("INTJ".to_string()))
        );
        assert_eq!(
            Reading::parse("NaN"),
            Some(Reading::Categorical("NaN".to_string()))
        );
        assert_eq!(Reading::parse("   "), None);
    }

    #[test]
    fn category_key_ignores_case_and_padding() {
        assert_eq!(Reading::Categorical(" intj ".into()).category_key(), "INTJ");
        assert_eq!(Reading::Numeric(3.0).category_key(), "3");
    }

    #[test]
    fn employee_ids_are_trimmed_when_deserialized() {
        let ids: Vec<EmployeeId> =
            serde_json::from_str(r#"[" E1", "E2 ", "E3"]"#).expect("ids parse");
        assert_eq!(
            ids,
            vec![EmployeeId::new("E1"), EmployeeId::new("E2"), EmployeeId::new("E3")]
        );
        assert_eq!(
            serde_json::to_string(&ids[0]).expect("id serializes"),
            "\"E1\""
        );
    }

    #[test]
    fn unrated_employees_never_meet_threshold() {
        let record = EmployeeRecord {
            employee_id: EmployeeId::new("E1"),
            fullname: "Unrated".to_string(),
            position_id: None,
            department_id: None,
            division_id: None,
            grade_id: None,
            rating: None,
        };
        assert!(!record.meets_rating(1));
    }
}
