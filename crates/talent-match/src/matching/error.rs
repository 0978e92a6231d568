use super::benchmark::BenchmarkMode;
use super::domain::EmployeeId;
use super::provider::ProviderError;
use super::registry::RegistryError;

/// Errors surfaced by the scoring engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("benchmark population is empty ({} selection)", .mode.label())]
    EmptyBenchmark { mode: BenchmarkMode },
    #[error("unknown employee '{0}'")]
    UnknownEmployee(EmployeeId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("readings provider failed: {0}")]
    Provider(#[from] ProviderError),
}
