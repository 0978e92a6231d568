use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::{MatchingConfig, DEFAULT_MIN_RATING, DEFAULT_PAGE_SIZE};

use super::baseline::{compute_baselines, BaselineMap};
use super::benchmark::{resolve_benchmark, BenchmarkPopulation, BenchmarkSpec};
use super::breakdown::{score_candidate, MatchBreakdown};
use super::domain::{EmployeeId, EmployeeRecord};
use super::error::MatchError;
use super::provider::ReadingsProvider;
use super::ranking::{
    paginate, ranked_candidate, score_all, sort_candidates, worker_count, RankQuery, RankedPage,
    SkippedCandidates,
};
use super::recommend::{recommend_positions, recommendation_population, PositionRecommendations};
use super::registry::{RegistryHandle, VariableRegistry};

/// Runtime knobs for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Rating threshold applied when a request does not name one.
    pub default_min_rating: u8,
    /// Page size applied when a request does not name one.
    pub page_size: usize,
    /// `0` uses every available core.
    pub worker_threads: usize,
    /// Number of benchmark baselines kept between requests.
    pub cache_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_min_rating: DEFAULT_MIN_RATING,
            page_size: DEFAULT_PAGE_SIZE,
            worker_threads: 0,
            cache_capacity: 16,
        }
    }
}

impl From<&MatchingConfig> for EngineSettings {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            default_min_rating: config.min_rating,
            page_size: config.page_size,
            worker_threads: config.worker_threads,
            ..Self::default()
        }
    }
}

struct CachedBaselines {
    revision: u64,
    members: BTreeSet<EmployeeId>,
    baselines: Arc<BaselineMap>,
}

/// Baselines keyed by registry revision, selection mode, and exact benchmark membership.
#[derive(Default)]
struct BaselineCache {
    entries: VecDeque<CachedBaselines>,
}

impl BaselineCache {
    fn get(&self, revision: u64, population: &BenchmarkPopulation) -> Option<Arc<BaselineMap>> {
        self.entries
            .iter()
            .find(|entry| {
                entry.revision == revision
                    && entry.baselines.benchmark().mode == population.mode()
                    && &entry.members == population.members()
            })
            .map(|entry| Arc::clone(&entry.baselines))
    }

    fn insert(
        &mut self,
        revision: u64,
        population: &BenchmarkPopulation,
        baselines: Arc<BaselineMap>,
        capacity: usize,
    ) {
        if capacity == 0 {
            return;
        }
        self.entries.retain(|entry| entry.revision == revision);
        while self.entries.len() >= capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(CachedBaselines {
            revision,
            members: population.members().clone(),
            baselines,
        });
    }
}

/// Entry point composing the readings provider, registry, and scoring pipeline.
pub struct MatchEngine<P> {
    provider: Arc<P>,
    registry: Arc<RegistryHandle>,
    settings: EngineSettings,
    cache: Mutex<BaselineCache>,
}

impl<P> MatchEngine<P>
where
    P: ReadingsProvider + 'static,
{
    pub fn new(provider: Arc<P>, registry: VariableRegistry, settings: EngineSettings) -> Self {
        Self::with_registry_handle(provider, Arc::new(RegistryHandle::new(registry)), settings)
    }

    pub fn with_registry_handle(
        provider: Arc<P>,
        registry: Arc<RegistryHandle>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
            cache: Mutex::new(BaselineCache::default()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> Arc<VariableRegistry> {
        self.registry.snapshot().1
    }

    /// Swap in a new registry; cached baselines from older revisions stop matching.
    pub fn replace_registry(&self, registry: VariableRegistry) -> u64 {
        let revision = self.registry.replace(registry);
        info!(revision, "variable registry replaced");
        revision
    }

    pub fn resolve_benchmark(&self, spec: &BenchmarkSpec) -> Result<BenchmarkPopulation, MatchError> {
        let directory = self.provider.employees()?;
        resolve_benchmark(spec, &directory)
    }

    /// Baselines for `population`, computed once per registry revision and membership.
    pub fn baselines(&self, population: &BenchmarkPopulation) -> Result<Arc<BaselineMap>, MatchError> {
        let (revision, registry) = self.registry.snapshot();
        self.baselines_for(population, revision, &registry)
    }

    fn baselines_for(
        &self,
        population: &BenchmarkPopulation,
        revision: u64,
        registry: &VariableRegistry,
    ) -> Result<Arc<BaselineMap>, MatchError> {
        if let Some(hit) = self.cache_guard().get(revision, population) {
            debug!(size = population.len(), "baseline cache hit");
            return Ok(hit);
        }

        let readings = self.provider.readings_for(population.members())?;
        let baselines = Arc::new(compute_baselines(population, &readings, registry));

        self.cache_guard().insert(
            revision,
            population,
            Arc::clone(&baselines),
            self.settings.cache_capacity,
        );
        Ok(baselines)
    }

    fn cache_guard(&self) -> std::sync::MutexGuard<'_, BaselineCache> {
        self.cache.lock().expect("baseline cache mutex poisoned")
    }

    /// Detailed breakdown of one employee against the benchmark described by `spec`.
    pub fn breakdown_for(
        &self,
        employee_id: &EmployeeId,
        spec: &BenchmarkSpec,
    ) -> Result<MatchBreakdown, MatchError> {
        let (revision, registry) = self.registry.snapshot();
        let population = self.resolve_benchmark(spec)?;
        let baselines = self.baselines_for(&population, revision, &registry)?;

        let ids = BTreeSet::from([employee_id.clone()]);
        let readings = self.provider.readings_for(&ids)?;
        let candidate = readings
            .get(employee_id)
            .ok_or_else(|| MatchError::UnknownEmployee(employee_id.clone()))?;

        Ok(score_candidate(employee_id, candidate, &baselines, &registry))
    }

    /// Score, sort, and paginate every employee passing the result filter.
    pub fn rank_candidates(&self, query: &RankQuery) -> Result<RankedPage, MatchError> {
        let (revision, registry) = self.registry.snapshot();
        let directory = self.provider.employees()?;
        let population = resolve_benchmark(&query.benchmark, &directory)?;
        let baselines = self.baselines_for(&population, revision, &registry)?;

        let skipped = unknown_candidates(query, &directory);
        let selected: Vec<&EmployeeRecord> = directory
            .iter()
            .filter(|record| query.filter.matches(record))
            .collect();

        let ids: BTreeSet<EmployeeId> = selected
            .iter()
            .map(|record| record.employee_id.clone())
            .collect();
        let readings = self.provider.readings_for(&ids)?;

        let empty = Default::default();
        let candidates: Vec<_> = selected
            .iter()
            .map(|record| {
                let set = readings.get(&record.employee_id).unwrap_or(&empty);
                (record.employee_id.clone(), set)
            })
            .collect();

        let workers = worker_count(self.settings.worker_threads);
        let scored = score_all(&candidates, &baselines, &registry, workers);

        let mut items: Vec<_> = selected
            .iter()
            .zip(scored)
            .map(|(record, breakdown)| ranked_candidate(record, breakdown))
            .collect();
        sort_candidates(&mut items);

        let total = items.len();
        let (page, total_pages, items) = paginate(&items, query.pagination);

        info!(
            benchmark = population.mode().label(),
            benchmark_size = population.len(),
            scored = total,
            skipped = skipped.count,
            workers,
            "candidates ranked"
        );

        Ok(RankedPage {
            benchmark: baselines.benchmark().clone(),
            page,
            per_page: query.pagination.per_page.max(1),
            total,
            total_pages,
            items,
            skipped,
            undefined_baselines: baselines.undefined().map(str::to_string).collect(),
        })
    }

    /// Rank every known position by how well `employee_id` fits its high performers.
    pub fn recommend_positions_for(
        &self,
        employee_id: &EmployeeId,
        min_rating: u8,
    ) -> Result<PositionRecommendations, MatchError> {
        let registry = self.registry();
        let directory = self.provider.employees()?;
        let positions = self.provider.positions()?;

        let ids = recommendation_population(employee_id, &directory, &positions, min_rating);
        let readings = self.provider.readings_for(&ids)?;

        recommend_positions(
            employee_id,
            &directory,
            &positions,
            &readings,
            &registry,
            min_rating,
        )
    }
}

fn unknown_candidates(query: &RankQuery, directory: &[EmployeeRecord]) -> SkippedCandidates {
    let Some(requested) = &query.filter.candidate_ids else {
        return SkippedCandidates::default();
    };

    let known: BTreeSet<&EmployeeId> = directory.iter().map(|record| &record.employee_id).collect();
    let employee_ids: Vec<EmployeeId> = requested
        .iter()
        .filter(|id| !known.contains(id))
        .cloned()
        .collect();

    if !employee_ids.is_empty() {
        debug!(count = employee_ids.len(), "skipping unknown candidates");
    }

    SkippedCandidates {
        count: employee_ids.len(),
        employee_ids,
    }
}
