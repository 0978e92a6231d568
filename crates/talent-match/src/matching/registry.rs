use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Transformation family applied when converting a raw reading into a match rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableKind {
    Numeric,
    /// Lower raw values are better.
    ReverseNumeric,
    Categorical,
}

impl VariableKind {
    pub fn label(&self) -> &'static str {
        match self {
            VariableKind::Numeric => "numeric",
            VariableKind::ReverseNumeric => "reverse numeric",
            VariableKind::Categorical => "categorical",
        }
    }
}

/// Scoreable talent variable (TV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: VariableKind,
    pub group: String,
    pub weight: f64,
}

impl Variable {
    pub fn new(name: &str, kind: VariableKind, group: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            kind,
            group: group.to_string(),
            weight,
        }
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Talent group (TGV) with its weight relative to the other groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub weight: f64,
}

impl Group {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid weight configuration: {0}")]
    InvalidWeightConfiguration(String),
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validated mapping of variables to groups and weights.
///
/// Variables keep the order they were declared in; aggregation iterates in that order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRegistry {
    groups: Vec<Group>,
    variables: Vec<Variable>,
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    groups: Vec<Group>,
    variables: Vec<Variable>,
}

impl VariableRegistry {
    pub fn new(groups: Vec<Group>, variables: Vec<Variable>) -> Result<Self, RegistryError> {
        let mut group_names = BTreeSet::new();
        for group in &groups {
            check_weight("group", &group.name, group.weight)?;
            if !group_names.insert(group.name.as_str()) {
                return Err(RegistryError::InvalidWeightConfiguration(format!(
                    "group '{}' declared more than once",
                    group.name
                )));
            }
        }

        let mut variable_names = BTreeSet::new();
        for variable in &variables {
            check_weight("variable", &variable.name, variable.weight)?;
            if !variable_names.insert(variable.name.as_str()) {
                return Err(RegistryError::InvalidWeightConfiguration(format!(
                    "variable '{}' declared more than once",
                    variable.name
                )));
            }
            if !group_names.contains(variable.group.as_str()) {
                return Err(RegistryError::InvalidWeightConfiguration(format!(
                    "variable '{}' references undeclared group '{}'",
                    variable.name, variable.group
                )));
            }
        }

        Ok(Self { groups, variables })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = serde_json::from_str(raw)?;
        Self::new(document.groups, document.variables)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn list_variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variables_in_group(&self, group: &str) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|variable| variable.group == group)
            .collect()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// Registry mirroring the production talent model: competency pillars, cognitive
    /// tests, PAPI Kostick work style scales, personality types, and top strength.
    pub fn standard() -> Self {
        let groups = vec![
            Group::new(COMPETENCY, 0.50),
            Group::new(WORK_STYLE, 0.25),
            Group::new(COGNITIVE, 0.10),
            Group::new(STRENGTHS, 0.10),
            Group::new(PERSONALITY, 0.05),
        ];

        let mut variables = Vec::new();
        for (code, label) in COMPETENCY_PILLARS {
            variables.push(Variable::new(code, VariableKind::Numeric, COMPETENCY, 1.0).labelled(label));
        }

        for (name, label, weight) in COGNITIVE_TESTS {
            variables.push(Variable::new(name, VariableKind::Numeric, COGNITIVE, weight).labelled(label));
        }

        for scale in PAPI_SCALES {
            let name = format!("Papi_{scale}");
            let (kind, weight) = match scale {
                "I" | "K" | "Z" | "T" => (VariableKind::ReverseNumeric, 0.10),
                "N" | "L" | "F" => (VariableKind::Numeric, 0.25),
                _ => (VariableKind::Numeric, 0.05),
            };
            variables.push(
                Variable::new(&name, kind, WORK_STYLE, weight).labelled(&format!("PAPI {scale}")),
            );
        }

        variables.push(
            Variable::new("strength_top", VariableKind::Categorical, STRENGTHS, 1.0)
                .labelled("Top Strength Theme"),
        );
        variables.push(
            Variable::new("mbti", VariableKind::Categorical, PERSONALITY, 0.5).labelled("MBTI"),
        );
        variables.push(
            Variable::new("disc", VariableKind::Categorical, PERSONALITY, 0.5).labelled("DISC"),
        );

        Self { groups, variables }
    }
}

const COMPETENCY: &str = "Competency";
const WORK_STYLE: &str = "Work Style";
const COGNITIVE: &str = "Cognitive";
const STRENGTHS: &str = "Strengths";
const PERSONALITY: &str = "Personality";

const COMPETENCY_PILLARS: [(&str, &str); 10] = [
    ("GDR", "Growth Drive & Resilience"),
    ("CEX", "Curiosity & Experimentation"),
    ("IDS", "Insight & Decision Sharpness"),
    ("QDD", "Quality Delivery Discipline"),
    ("STO", "Synergy & Team Orientation"),
    ("SEA", "Social Empathy & Awareness"),
    ("VCU", "Value Creation for Users"),
    ("LIE", "Lead, Inspire & Empower"),
    ("FTC", "Forward Thinking & Clarity"),
    ("CSI", "Commercial Savvy & Impact"),
];

const COGNITIVE_TESTS: [(&str, &str, f64); 5] = [
    ("iq", "IQ Score", 0.25),
    ("gtq", "GTQ Score", 0.25),
    ("tiki", "TIKI Score", 0.20),
    ("pauli", "Pauli Score", 0.15),
    ("faxtor", "Faxtor Score", 0.15),
];

const PAPI_SCALES: [&str; 20] = [
    "N", "G", "A", "L", "P", "I", "T", "V", "X", "S", "B", "O", "R", "D", "C", "Z", "E", "K", "F",
    "W",
];

fn check_weight(scope: &str, name: &str, weight: f64) -> Result<(), RegistryError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(RegistryError::InvalidWeightConfiguration(format!(
            "{scope} '{name}' has weight {weight}; weights must be finite and non-negative"
        )));
    }
    Ok(())
}

/// Shared, swappable registry so administrators can reload weights between requests.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<(u64, Arc<VariableRegistry>)>,
}

impl RegistryHandle {
    pub fn new(registry: VariableRegistry) -> Self {
        Self {
            current: RwLock::new((1, Arc::new(registry))),
        }
    }

    /// Current registry together with its revision number.
    pub fn snapshot(&self) -> (u64, Arc<VariableRegistry>) {
        let guard = self.current.read().expect("registry lock poisoned");
        (guard.0, Arc::clone(&guard.1))
    }

    pub fn replace(&self, registry: VariableRegistry) -> u64 {
        let mut guard = self.current.write().expect("registry lock poisoned");
        guard.0 += 1;
        guard.1 = Arc::new(registry);
        guard.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_is_valid_and_ordered() {
        let registry = VariableRegistry::standard();
        let rebuilt = VariableRegistry::new(
            registry.groups().to_vec(),
            registry.list_variables().to_vec(),
        )
        .expect("standard registry validates");

        assert_eq!(rebuilt, registry);
        assert_eq!(registry.groups().len(), 5);
        let total: f64 = registry.groups().iter().map(|group| group.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(registry.list_variables()[0].name, "GDR");
        assert_eq!(registry.group("Competency").map(|group| group.weight), Some(0.50));
        assert!(registry.group("Leadership").is_none());
    }

    #[test]
    fn standard_registry_reverse_scores_papi_i_k_z_t() {
        let registry = VariableRegistry::standard();
        let reversed: Vec<&str> = registry
            .list_variables()
            .iter()
            .filter(|variable| variable.kind == VariableKind::ReverseNumeric)
            .map(|variable| variable.name.as_str())
            .collect();

        assert_eq!(reversed, vec!["Papi_I", "Papi_T", "Papi_Z", "Papi_K"]);
        assert_eq!(VariableKind::ReverseNumeric.label(), "reverse numeric");
        assert_eq!(registry.variables_in_group("Work Style").len(), 20);
    }

    #[test]
    fn rejects_negative_weights() {
        let err = VariableRegistry::new(
            vec![Group::new("Cognitive", 1.0)],
            vec![Variable::new("iq", VariableKind::Numeric, "Cognitive", -0.5)],
        )
        .expect_err("negative weight rejected");

        assert!(matches!(err, RegistryError::InvalidWeightConfiguration(_)));
        assert!(err.to_string().contains("iq"));
    }

    #[test]
    fn rejects_unknown_groups_and_duplicates() {
        assert!(VariableRegistry::new(
            vec![Group::new("Cognitive", 1.0)],
            vec![Variable::new("iq", VariableKind::Numeric, "Competency", 1.0)],
        )
        .is_err());

        assert!(VariableRegistry::new(
            vec![Group::new("Cognitive", 1.0), Group::new("Cognitive", 0.5)],
            Vec::new(),
        )
        .is_err());
    }

    #[test]
    fn parses_json_documents() {
        let registry = VariableRegistry::from_json_str(
            r#"{
                "groups": [{ "name": "Personality", "weight": 1.0 }],
                "variables": [
                    { "name": "mbti", "kind": "CATEGORICAL", "group": "Personality", "weight": 2.0 },
                    { "name": "Papi_K", "label": "PAPI K", "kind": "REVERSE_NUMERIC", "group": "Personality", "weight": 1.0 }
                ]
            }"#,
        )
        .expect("registry parses");

        assert_eq!(registry.list_variables().len(), 2);
        assert_eq!(
            registry.variable("Papi_K").map(|variable| variable.display_label()),
            Some("PAPI K")
        );
        assert_eq!(registry.variable("mbti").map(|v| v.display_label()), Some("mbti"));
    }

    #[test]
    fn handle_bumps_revision_on_replace() {
        let handle = RegistryHandle::new(VariableRegistry::standard());
        let (first, _) = handle.snapshot();
        let next = handle.replace(
            VariableRegistry::new(vec![Group::new("Cognitive", 1.0)], Vec::new())
                .expect("valid registry"),
        );
        let (current, registry) = handle.snapshot();

        assert_eq!(next, first + 1);
        assert_eq!(current, next);
        assert!(registry.list_variables().is_empty());
    }
}
