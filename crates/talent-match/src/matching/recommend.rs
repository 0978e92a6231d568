use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::GroupRate;
use super::baseline::compute_baselines;
use super::benchmark::{resolve_benchmark, BenchmarkFilters, BenchmarkSpec};
use super::breakdown::score_candidate;
use super::domain::{DimensionId, EmployeeId, EmployeeRecord, Position, ReadingSet};
use super::error::MatchError;
use super::registry::VariableRegistry;

/// Fit of one employee against the high performers of one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMatch {
    pub position_id: DimensionId,
    pub position_name: String,
    pub benchmark_size: usize,
    pub final_score: f64,
    pub groups: Vec<GroupRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecommendations {
    pub employee_id: EmployeeId,
    pub min_rating: u8,
    pub matches: Vec<PositionMatch>,
    /// Positions without any employee at or above `min_rating`.
    pub skipped_positions: Vec<DimensionId>,
}

/// Every employee whose readings are needed to recommend positions for `candidate`.
pub fn recommendation_population(
    candidate: &EmployeeId,
    directory: &[EmployeeRecord],
    positions: &[Position],
    min_rating: u8,
) -> BTreeSet<EmployeeId> {
    let known: BTreeSet<DimensionId> = positions.iter().map(|p| p.position_id).collect();
    let mut ids: BTreeSet<EmployeeId> = directory
        .iter()
        .filter(|record| record.meets_rating(min_rating))
        .filter(|record| record.position_id.map(|id| known.contains(&id)).unwrap_or(false))
        .map(|record| record.employee_id.clone())
        .collect();
    ids.insert(candidate.clone());
    ids
}

/// Score `candidate` against each position's benchmark, best fit first.
///
/// `readings` must already hold every id returned by [`recommendation_population`];
/// positions are evaluated from that single batch.
pub fn recommend_positions(
    candidate: &EmployeeId,
    directory: &[EmployeeRecord],
    positions: &[Position],
    readings: &BTreeMap<EmployeeId, ReadingSet>,
    registry: &VariableRegistry,
    min_rating: u8,
) -> Result<PositionRecommendations, MatchError> {
    let candidate_readings = readings
        .get(candidate)
        .ok_or_else(|| MatchError::UnknownEmployee(candidate.clone()))?;

    let mut matches = Vec::new();
    let mut skipped_positions = Vec::new();

    for position in positions {
        let spec = BenchmarkSpec::new(min_rating)
            .with_filters(BenchmarkFilters::for_position(position.position_id));

        let population = match resolve_benchmark(&spec, directory) {
            Ok(population) => population,
            Err(MatchError::EmptyBenchmark { .. }) => {
                skipped_positions.push(position.position_id);
                continue;
            }
            Err(other) => return Err(other),
        };

        let baselines = compute_baselines(&population, readings, registry);
        let breakdown = score_candidate(candidate, candidate_readings, &baselines, registry);

        matches.push(PositionMatch {
            position_id: position.position_id,
            position_name: position.name.clone(),
            benchmark_size: population.len(),
            final_score: breakdown.final_score,
            groups: breakdown.groups,
        });
    }

    matches.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| a.position_id.cmp(&b.position_id))
    });

    debug!(
        employee_id = %candidate,
        evaluated = matches.len(),
        skipped = skipped_positions.len(),
        "position recommendations computed"
    );

    Ok(PositionRecommendations {
        employee_id: candidate.clone(),
        min_rating,
        matches,
        skipped_positions,
    })
}
