//! Benchmark-driven talent matching.
//!
//! A benchmark population of high performers defines per-variable baselines; candidates
//! are scored per variable against those baselines, aggregated per talent group, and
//! combined into a 0-100 final score.

pub mod aggregate;
pub mod baseline;
pub mod benchmark;
pub mod breakdown;
pub mod dataset;
pub mod domain;
pub mod engine;
pub mod error;
pub mod provider;
pub mod ranking;
pub mod recommend;
pub mod registry;
pub mod router;
pub mod transform;

#[cfg(test)]
mod tests;

pub use aggregate::{aggregate_groups, final_score, GroupRate};
pub use baseline::{compute_baselines, Baseline, BaselineMap};
pub use benchmark::{
    resolve_benchmark, BenchmarkFilters, BenchmarkMode, BenchmarkPopulation, BenchmarkSpec,
    BenchmarkSummary,
};
pub use breakdown::{score_candidate, MatchBreakdown, MatchWarning, VariableBreakdown};
pub use dataset::DatasetError;
pub use domain::{DimensionId, EmployeeId, EmployeeRecord, Position, Reading, ReadingSet};
pub use engine::{EngineSettings, MatchEngine};
pub use error::MatchError;
pub use provider::{InMemoryReadingsProvider, ProviderError, ReadingsProvider};
pub use ranking::{
    Pagination, RankQuery, RankedCandidate, RankedPage, ResultFilter, SkippedCandidates,
};
pub use recommend::{PositionMatch, PositionRecommendations};
pub use registry::{Group, RegistryError, RegistryHandle, Variable, VariableKind, VariableRegistry};
pub use router::{match_error_status, match_router, BenchmarkRequest, RankRequest};
pub use transform::{compute_match_rates, match_rate, NEUTRAL_MATCH_RATE};
