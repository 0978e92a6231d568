use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::aggregate::GroupRate;
use super::baseline::BaselineMap;
use super::benchmark::{BenchmarkSpec, BenchmarkSummary};
use super::breakdown::{score_candidate, MatchBreakdown};
use super::domain::{DimensionId, EmployeeId, EmployeeRecord, ReadingSet};
use super::registry::VariableRegistry;

fn default_min_rating() -> u8 {
    1
}

fn default_max_rating() -> u8 {
    5
}

/// Narrows which employees appear in a ranking; does not affect the benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub position_id: Option<DimensionId>,
    #[serde(default)]
    pub department_id: Option<DimensionId>,
    #[serde(default)]
    pub division_id: Option<DimensionId>,
    #[serde(default)]
    pub grade_id: Option<DimensionId>,
    #[serde(default = "default_min_rating")]
    pub min_rating: u8,
    #[serde(default = "default_max_rating")]
    pub max_rating: u8,
    /// Case-insensitive substring of the employee's full name.
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Restrict scoring to these employees.
    #[serde(default)]
    pub candidate_ids: Option<BTreeSet<EmployeeId>>,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            position_id: None,
            department_id: None,
            division_id: None,
            grade_id: None,
            min_rating: default_min_rating(),
            max_rating: default_max_rating(),
            name_contains: None,
            candidate_ids: None,
        }
    }
}

impl ResultFilter {
    pub fn matches(&self, record: &EmployeeRecord) -> bool {
        let dimension = |filter: Option<DimensionId>, value: Option<DimensionId>| {
            filter.map(|expected| value == Some(expected)).unwrap_or(true)
        };

        let rating_ok = record
            .rating
            .map(|rating| (self.min_rating..=self.max_rating).contains(&rating))
            .unwrap_or(false);

        let name_ok = match self.name_contains.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => record
                .fullname
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };

        let candidate_ok = self
            .candidate_ids
            .as_ref()
            .map(|ids| ids.contains(&record.employee_id))
            .unwrap_or(true);

        rating_ok
            && name_ok
            && candidate_ok
            && dimension(self.position_id, record.position_id)
            && dimension(self.department_id, record.department_id)
            && dimension(self.division_id, record.division_id)
            && dimension(self.grade_id, record.grade_id)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }
}

/// Everything needed for one ranking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankQuery {
    pub benchmark: BenchmarkSpec,
    pub filter: ResultFilter,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub employee_id: EmployeeId,
    pub fullname: String,
    pub position_id: Option<DimensionId>,
    pub department_id: Option<DimensionId>,
    pub division_id: Option<DimensionId>,
    pub grade_id: Option<DimensionId>,
    pub rating: Option<u8>,
    pub final_score: f64,
    pub groups: Vec<GroupRate>,
}

/// Explicitly requested candidates that were not found in the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidates {
    pub count: usize,
    pub employee_ids: Vec<EmployeeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPage {
    pub benchmark: BenchmarkSummary,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub items: Vec<RankedCandidate>,
    pub skipped: SkippedCandidates,
    pub undefined_baselines: Vec<String>,
}

/// Score every candidate against fixed baselines using scoped worker threads.
///
/// Output order matches input order; callers sort afterwards.
pub fn score_all(
    candidates: &[(EmployeeId, &ReadingSet)],
    baselines: &BaselineMap,
    registry: &VariableRegistry,
    workers: usize,
) -> Vec<MatchBreakdown> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, candidates.len());
    if workers == 1 {
        return candidates
            .iter()
            .map(|(id, readings)| score_candidate(id, readings, baselines, registry))
            .collect();
    }

    let chunk_size = candidates.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = candidates
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|(id, readings)| score_candidate(id, readings, baselines, registry))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(scored) => scored,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Worker count: the configured value when set, otherwise the available cores.
pub fn worker_count(configured: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    if configured == 0 {
        cores
    } else {
        configured.min(cores.max(1))
    }
}

/// Final score descending, then employee id ascending.
pub fn sort_candidates(items: &mut [RankedCandidate]) {
    items.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
    for (index, item) in items.iter_mut().enumerate() {
        item.rank = index + 1;
    }
}

/// Slice a sorted result; pages past the end fall back to the first page.
pub fn paginate<T: Clone>(items: &[T], pagination: Pagination) -> (usize, usize, Vec<T>) {
    let pagination = Pagination::new(pagination.page, pagination.per_page);
    let total_pages = items.len().div_ceil(pagination.per_page).max(1);
    let page = if pagination.page > total_pages {
        1
    } else {
        pagination.page
    };

    let start = (page - 1) * pagination.per_page;
    let end = (start + pagination.per_page).min(items.len());
    let slice = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
    (page, total_pages, slice)
}

pub(crate) fn ranked_candidate(record: &EmployeeRecord, breakdown: MatchBreakdown) -> RankedCandidate {
    RankedCandidate {
        rank: 0,
        employee_id: record.employee_id.clone(),
        fullname: record.fullname.clone(),
        position_id: record.position_id,
        department_id: record.department_id,
        division_id: record.division_id,
        grade_id: record.grade_id,
        rating: record.rating,
        final_score: breakdown.final_score,
        groups: breakdown.groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f64) -> RankedCandidate {
        RankedCandidate {
            rank: 0,
            employee_id: EmployeeId::new(id),
            fullname: id.to_string(),
            position_id: None,
            department_id: None,
            division_id: None,
            grade_id: None,
            rating: Some(3),
            final_score: score,
            groups: Vec::new(),
        }
    }

    #[test]
    fn ties_sort_by_employee_id() {
        let mut items = vec![
            candidate("E3", 80.0),
            candidate("E2", 90.0),
            candidate("E1", 80.0),
        ];
        sort_candidates(&mut items);

        let order: Vec<&str> = items.iter().map(|item| item.employee_id.as_str()).collect();
        assert_eq!(order, vec!["E2", "E1", "E3"]);
        assert_eq!(items[2].rank, 3);
    }

    #[test]
    fn paginate_clamps_out_of_range_pages() {
        let items: Vec<u32> = (1..=250).collect();

        let (page, total_pages, slice) = paginate(&items, Pagination::new(3, 100));
        assert_eq!((page, total_pages), (3, 3));
        assert_eq!(slice.len(), 50);
        assert_eq!(slice[0], 201);

        let (page, _, slice) = paginate(&items, Pagination::new(9, 100));
        assert_eq!(page, 1);
        assert_eq!(slice[0], 1);

        let (page, total_pages, slice) = paginate::<u32>(&[], Pagination::new(1, 100));
        assert_eq!((page, total_pages), (1, 1));
        assert!(slice.is_empty());
    }

    #[test]
    fn result_filter_matches_name_and_rating_range() {
        let record = EmployeeRecord {
            employee_id: EmployeeId::new("E7"),
            fullname: "Rina Wulandari".to_string(),
            position_id: Some(3),
            department_id: Some(1),
            division_id: None,
            grade_id: Some(2),
            rating: Some(4),
        };

        let mut filter = ResultFilter {
            name_contains: Some("wulan".to_string()),
            position_id: Some(3),
            ..ResultFilter::default()
        };
        assert!(filter.matches(&record));

        filter.max_rating = 3;
        assert!(!filter.matches(&record));

        let by_division = ResultFilter {
            division_id: Some(9),
            ..ResultFilter::default()
        };
        assert!(!by_division.matches(&record));
    }

    #[test]
    fn worker_count_respects_configuration() {
        assert!(worker_count(0) >= 1);
        assert_eq!(worker_count(1), 1);
    }
}
