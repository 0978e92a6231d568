use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate_groups, final_score, GroupRate};
use super::baseline::{Baseline, BaselineMap};
use super::benchmark::BenchmarkSummary;
use super::domain::{EmployeeId, Reading, ReadingSet};
use super::registry::{VariableKind, VariableRegistry};
use super::transform::compute_match_rates;

/// Per-variable line of a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBreakdown {
    pub variable: String,
    pub label: String,
    pub group: String,
    pub kind: VariableKind,
    pub weight: f64,
    pub baseline: Option<Baseline>,
    pub candidate_value: Option<Reading>,
    pub match_rate: f64,
    pub baseline_defined: bool,
}

/// Non-fatal conditions that lower confidence in a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchWarning {
    UndefinedBaseline { variable: String },
    NoContributingGroups,
}

/// Full scoring result for one candidate against one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub employee_id: EmployeeId,
    pub benchmark: BenchmarkSummary,
    pub final_score: f64,
    pub groups: Vec<GroupRate>,
    pub variables: Vec<VariableBreakdown>,
    pub warnings: Vec<MatchWarning>,
}

impl MatchBreakdown {
    pub fn is_low_confidence(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Variables with the highest match rates; ties resolve by variable name.
    pub fn strongest(&self, count: usize) -> Vec<&VariableBreakdown> {
        let mut rows: Vec<&VariableBreakdown> = self.variables.iter().collect();
        rows.sort_by(|a, b| {
            b.match_rate
                .total_cmp(&a.match_rate)
                .then_with(|| a.variable.cmp(&b.variable))
        });
        rows.truncate(count);
        rows
    }

    /// Largest gaps against the benchmark; ties resolve by variable name.
    pub fn weakest(&self, count: usize) -> Vec<&VariableBreakdown> {
        let mut rows: Vec<&VariableBreakdown> = self.variables.iter().collect();
        rows.sort_by(|a, b| {
            a.match_rate
                .total_cmp(&b.match_rate)
                .then_with(|| a.variable.cmp(&b.variable))
        });
        rows.truncate(count);
        rows
    }

    pub fn group(&self, name: &str) -> Option<&GroupRate> {
        self.groups.iter().find(|group| group.group == name)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableBreakdown> {
        self.variables.iter().find(|row| row.variable == name)
    }
}

/// Transform, aggregate, and package one candidate's readings.
///
/// Pure: identical inputs always produce an identical breakdown.
pub fn score_candidate(
    employee_id: &EmployeeId,
    readings: &ReadingSet,
    baselines: &BaselineMap,
    registry: &VariableRegistry,
) -> MatchBreakdown {
    let rates = compute_match_rates(readings, baselines, registry);
    let groups = aggregate_groups(&rates, registry);

    let mut warnings: Vec<MatchWarning> = baselines
        .undefined()
        .filter(|name| registry.variable(name).is_some())
        .map(|name| MatchWarning::UndefinedBaseline {
            variable: name.to_string(),
        })
        .collect();

    let final_score = match final_score(&groups) {
        Some(score) => score,
        None => {
            warnings.push(MatchWarning::NoContributingGroups);
            0.0
        }
    };

    let variables = registry
        .list_variables()
        .iter()
        .map(|variable| VariableBreakdown {
            variable: variable.name.clone(),
            label: variable.display_label().to_string(),
            group: variable.group.clone(),
            kind: variable.kind,
            weight: variable.weight,
            baseline: baselines.get(&variable.name).cloned(),
            candidate_value: readings.get(&variable.name).cloned(),
            match_rate: rates.get(&variable.name).copied().unwrap_or_default(),
            baseline_defined: !baselines.is_undefined(&variable.name),
        })
        .collect();

    MatchBreakdown {
        employee_id: employee_id.clone(),
        benchmark: baselines.benchmark().clone(),
        final_score,
        groups,
        variables,
        warnings,
    }
}
