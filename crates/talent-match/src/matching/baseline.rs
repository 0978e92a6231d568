use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::benchmark::{BenchmarkPopulation, BenchmarkSummary};
use super::domain::{EmployeeId, ReadingSet};
use super::registry::{VariableKind, VariableRegistry};

/// Reference value a candidate is compared against for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Baseline {
    Numeric(f64),
    Categorical(String),
}

/// Baselines for every registry variable, derived from one benchmark population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineMap {
    benchmark: BenchmarkSummary,
    values: BTreeMap<String, Baseline>,
    undefined: BTreeSet<String>,
}

impl BaselineMap {
    pub fn benchmark(&self) -> &BenchmarkSummary {
        &self.benchmark
    }

    pub fn get(&self, variable: &str) -> Option<&Baseline> {
        self.values.get(variable)
    }

    pub fn is_undefined(&self, variable: &str) -> bool {
        !self.values.contains_key(variable)
    }

    /// Variables with no benchmark readings, in name order.
    pub fn undefined(&self) -> impl Iterator<Item = &str> {
        self.undefined.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute the median (numeric kinds) or mode (categorical) of each variable across the
/// benchmark members. Members are visited in ascending id order.
pub fn compute_baselines(
    population: &BenchmarkPopulation,
    readings: &BTreeMap<EmployeeId, ReadingSet>,
    registry: &VariableRegistry,
) -> BaselineMap {
    let mut values = BTreeMap::new();
    let mut undefined = BTreeSet::new();

    let member_readings: Vec<&ReadingSet> = population
        .members()
        .iter()
        .filter_map(|id| readings.get(id))
        .collect();

    for variable in registry.list_variables() {
        let baseline = match variable.kind {
            VariableKind::Numeric | VariableKind::ReverseNumeric => {
                let mut samples: Vec<f64> = member_readings
                    .iter()
                    .filter_map(|set| set.get(&variable.name))
                    .filter_map(|reading| reading.as_numeric())
                    .collect();
                median(&mut samples).map(Baseline::Numeric)
            }
            VariableKind::Categorical => {
                let samples = member_readings
                    .iter()
                    .filter_map(|set| set.get(&variable.name))
                    .map(|reading| reading.category_key())
                    .filter(|key| !key.is_empty());
                mode(samples).map(Baseline::Categorical)
            }
        };

        match baseline {
            Some(baseline) => {
                values.insert(variable.name.clone(), baseline);
            }
            None => {
                undefined.insert(variable.name.clone());
            }
        }
    }

    if !undefined.is_empty() {
        warn!(
            benchmark_size = population.len(),
            undefined = undefined.len(),
            "benchmark has variables without readings; neutral rates will apply"
        );
    }

    BaselineMap {
        benchmark: population.summary(),
        values,
        undefined,
    }
}

/// 50th percentile; even counts interpolate the two middle order statistics.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(values[mid - 1] + (values[mid] - values[mid - 1]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent value; ties go to the value encountered first.
pub fn mode<I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut tally: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (position, value) in values.into_iter().enumerate() {
        tally
            .entry(value)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    tally
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::benchmark::BenchmarkMode;
    use crate::matching::domain::Reading;
    use crate::matching::registry::{Group, Variable};

    fn registry() -> VariableRegistry {
        VariableRegistry::new(
            vec![Group::new("Cognitive", 1.0), Group::new("Personality", 1.0)],
            vec![
                Variable::new("iq", VariableKind::Numeric, "Cognitive", 1.0),
                Variable::new("Papi_K", VariableKind::ReverseNumeric, "Cognitive", 1.0),
                Variable::new("mbti", VariableKind::Categorical, "Personality", 1.0),
                Variable::new("disc", VariableKind::Categorical, "Personality", 1.0),
            ],
        )
        .expect("valid registry")
    }

    fn population(ids: &[&str]) -> BenchmarkPopulation {
        BenchmarkPopulation::new(
            BenchmarkMode::Manual,
            ids.iter().map(|id| EmployeeId::from(*id)).collect(),
        )
    }

    fn readings(rows: &[(&str, &str, Reading)]) -> BTreeMap<EmployeeId, ReadingSet> {
        let mut map: BTreeMap<EmployeeId, ReadingSet> = BTreeMap::new();
        for (id, variable, reading) in rows {
            map.entry(EmployeeId::from(*id))
                .or_default()
                .insert(variable.to_string(), reading.clone());
        }
        map
    }

    #[test]
    fn median_interpolates_even_counts() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn mode_breaks_ties_by_first_seen() {
        let values = ["ENTP", "INTJ", "INTJ", "ENTP", "ISTJ"].map(String::from);
        assert_eq!(mode(values), Some("ENTP".to_string()));
        assert_eq!(mode(Vec::<String>::new()), None);
    }

    #[test]
    fn computes_per_kind_baselines_and_skips_missing() {
        let data = readings(&[
            ("E1", "iq", Reading::Numeric(100.0)),
            ("E2", "iq", Reading::Numeric(120.0)),
            ("E3", "iq", Reading::Numeric(140.0)),
            ("E1", "Papi_K", Reading::Numeric(4.0)),
            ("E2", "Papi_K", Reading::Numeric(6.0)),
            ("E1", "mbti", Reading::Categorical(" intj".into())),
            ("E2", "mbti", Reading::Categorical("INTJ ".into())),
            ("E3", "mbti", Reading::Categorical("ENFP".into())),
            ("E9", "iq", Reading::Numeric(10.0)),
        ]);

        let baselines = compute_baselines(&population(&["E1", "E2", "E3"]), &data, &registry());

        assert_eq!(baselines.get("iq"), Some(&Baseline::Numeric(120.0)));
        assert_eq!(baselines.get("Papi_K"), Some(&Baseline::Numeric(5.0)));
        assert_eq!(
            baselines.get("mbti"),
            Some(&Baseline::Categorical("INTJ".to_string()))
        );
        assert!(baselines.is_undefined("disc"));
        assert_eq!(baselines.undefined().collect::<Vec<_>>(), vec!["disc"]);
        assert_eq!(baselines.benchmark().size, 3);
        assert_eq!(baselines.len(), 3);
        assert!(!baselines.is_empty());
    }

    #[test]
    fn categorical_ties_follow_member_id_order() {
        let data = readings(&[
            ("E2", "mbti", Reading::Categorical("ENFP".into())),
            ("E1", "mbti", Reading::Categorical("INTJ".into())),
        ]);

        let baselines = compute_baselines(&population(&["E2", "E1"]), &data, &registry());

        assert_eq!(
            baselines.get("mbti"),
            Some(&Baseline::Categorical("INTJ".to_string()))
        );
    }

    #[test]
    fn categorical_readings_do_not_feed_numeric_medians() {
        let data = readings(&[
            ("E1", "iq", Reading::Categorical("n/a".into())),
            ("E2", "iq", Reading::Numeric(90.0)),
        ]);

        let baselines = compute_baselines(&population(&["E1", "E2"]), &data, &registry());

        assert_eq!(baselines.get("iq"), Some(&Baseline::Numeric(90.0)));
    }
}
