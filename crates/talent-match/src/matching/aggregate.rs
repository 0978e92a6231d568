use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::registry::VariableRegistry;
use super::transform::{clamp_rate, MAX_MATCH_RATE};

/// Weighted rate for one talent group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRate {
    pub group: String,
    pub weight: f64,
    pub match_rate: f64,
    pub contributing_variables: usize,
}

/// Weighted average of variable rates within each group, in registry group order.
///
/// Groups without contributing variables (or whose variable weights sum to zero) are
/// left out instead of being scored as zero.
pub fn aggregate_groups(rates: &BTreeMap<String, f64>, registry: &VariableRegistry) -> Vec<GroupRate> {
    registry
        .groups()
        .iter()
        .filter_map(|group| {
            let mut weighted = 0.0;
            let mut weight_sum = 0.0;
            let mut contributing = 0;

            for variable in registry.variables_in_group(&group.name) {
                if let Some(rate) = rates.get(&variable.name) {
                    weighted += rate * variable.weight;
                    weight_sum += variable.weight;
                    contributing += 1;
                }
            }

            if contributing == 0 || weight_sum <= 0.0 {
                return None;
            }

            Some(GroupRate {
                group: group.name.clone(),
                weight: group.weight,
                match_rate: clamp_rate(weighted / weight_sum),
                contributing_variables: contributing,
            })
        })
        .collect()
}

/// Weighted average across groups, renormalised by the weights actually present.
/// Returns `None` when no group carries weight.
pub fn final_score(groups: &[GroupRate]) -> Option<f64> {
    let weight_sum: f64 = groups.iter().map(|group| group.weight).sum();
    if weight_sum <= 0.0 {
        return None;
    }

    let weighted: f64 = groups
        .iter()
        .map(|group| group.match_rate * group.weight)
        .sum();

    Some((weighted / weight_sum).clamp(0.0, MAX_MATCH_RATE))
}
