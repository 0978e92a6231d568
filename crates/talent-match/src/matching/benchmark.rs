use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{DimensionId, EmployeeId, EmployeeRecord};
use super::error::MatchError;

/// Organisational attributes used to pick a benchmark; unset fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkFilters {
    #[serde(default)]
    pub position_id: Option<DimensionId>,
    #[serde(default)]
    pub department_id: Option<DimensionId>,
    #[serde(default)]
    pub division_id: Option<DimensionId>,
    #[serde(default)]
    pub grade_id: Option<DimensionId>,
}

impl BenchmarkFilters {
    pub fn for_position(position_id: DimensionId) -> Self {
        Self {
            position_id: Some(position_id),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.position_id.is_some()
            || self.department_id.is_some()
            || self.division_id.is_some()
            || self.grade_id.is_some()
    }

    pub fn matches(&self, record: &EmployeeRecord) -> bool {
        field_matches(self.position_id, record.position_id)
            && field_matches(self.department_id, record.department_id)
            && field_matches(self.division_id, record.division_id)
            && field_matches(self.grade_id, record.grade_id)
    }
}

fn field_matches(filter: Option<DimensionId>, value: Option<DimensionId>) -> bool {
    match filter {
        Some(expected) => value == Some(expected),
        None => true,
    }
}

/// Request describing how the benchmark population should be selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    #[serde(default)]
    pub manual_ids: BTreeSet<EmployeeId>,
    #[serde(default)]
    pub use_manual_as_benchmark: bool,
    #[serde(default)]
    pub filters: BenchmarkFilters,
    pub min_rating: u8,
}

impl BenchmarkSpec {
    pub fn new(min_rating: u8) -> Self {
        Self {
            manual_ids: BTreeSet::new(),
            use_manual_as_benchmark: false,
            filters: BenchmarkFilters::default(),
            min_rating,
        }
    }

    pub fn with_manual<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EmployeeId>,
    {
        self.manual_ids = ids.into_iter().map(Into::into).collect();
        self.use_manual_as_benchmark = true;
        self
    }

    pub fn with_filters(mut self, filters: BenchmarkFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Which precedence rule produced a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMode {
    Manual,
    Filtered,
    Default,
}

impl BenchmarkMode {
    pub fn label(&self) -> &'static str {
        match self {
            BenchmarkMode::Manual => "manual",
            BenchmarkMode::Filtered => "filtered",
            BenchmarkMode::Default => "default",
        }
    }
}

/// Deduplicated set of employees whose readings define the baselines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkPopulation {
    mode: BenchmarkMode,
    members: BTreeSet<EmployeeId>,
}

impl BenchmarkPopulation {
    pub fn new(mode: BenchmarkMode, members: BTreeSet<EmployeeId>) -> Self {
        Self { mode, members }
    }

    pub fn mode(&self) -> BenchmarkMode {
        self.mode
    }

    pub fn members(&self) -> &BTreeSet<EmployeeId> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &EmployeeId) -> bool {
        self.members.contains(id)
    }

    /// FNV-1a over the sorted member ids. Identical member sets always share a fingerprint.
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0100_0000_01b3;

        let mut hash = OFFSET;
        for member in &self.members {
            for byte in member.as_str().bytes().chain(std::iter::once(0x1f)) {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(PRIME);
            }
        }
        hash
    }

    pub fn summary(&self) -> BenchmarkSummary {
        BenchmarkSummary {
            mode: self.mode,
            size: self.members.len(),
            fingerprint: format!("{:016x}", self.fingerprint()),
        }
    }
}

/// Serializable description of the benchmark used for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub mode: BenchmarkMode,
    pub size: usize,
    pub fingerprint: String,
}

/// Apply the selection precedence: manual list, then filters, then every high performer.
///
/// A filtered selection that matches nobody is reported as empty and never widened to
/// the default population.
pub fn resolve_benchmark(
    spec: &BenchmarkSpec,
    directory: &[EmployeeRecord],
) -> Result<BenchmarkPopulation, MatchError> {
    let (mode, members) = if spec.use_manual_as_benchmark && !spec.manual_ids.is_empty() {
        (BenchmarkMode::Manual, spec.manual_ids.clone())
    } else if spec.filters.is_active() {
        let members = directory
            .iter()
            .filter(|record| record.meets_rating(spec.min_rating) && spec.filters.matches(record))
            .map(|record| record.employee_id.clone())
            .collect();
        (BenchmarkMode::Filtered, members)
    } else {
        let members = directory
            .iter()
            .filter(|record| record.meets_rating(spec.min_rating))
            .map(|record| record.employee_id.clone())
            .collect();
        (BenchmarkMode::Default, members)
    };

    if members.is_empty() {
        return Err(MatchError::EmptyBenchmark { mode });
    }

    let population = BenchmarkPopulation::new(mode, members);
    debug!(
        mode = mode.label(),
        size = population.len(),
        min_rating = spec.min_rating,
        "benchmark resolved"
    );
    Ok(population)
}
