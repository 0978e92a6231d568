use std::sync::Arc;

use super::common::*;
use crate::matching::{
    BenchmarkFilters, BenchmarkMode, BenchmarkSpec, EmployeeId, EngineSettings, MatchEngine,
    MatchError, Pagination, RankQuery, ResultFilter, VariableRegistry,
};

fn query(benchmark: BenchmarkSpec, filter: ResultFilter) -> RankQuery {
    RankQuery {
        benchmark,
        filter,
        pagination: Pagination::new(1, 100),
    }
}

fn ranked_ids(page: &crate::matching::RankedPage) -> Vec<&str> {
    page.items
        .iter()
        .map(|item| item.employee_id.as_str())
        .collect()
}

#[test]
fn ranks_rated_employees_by_score_descending() {
    let page = engine()
        .rank_candidates(&query(BenchmarkSpec::new(5), ResultFilter::default()))
        .expect("ranking succeeds");

    assert_eq!(ranked_ids(&page), vec!["E1", "E2", "E3", "E4", "E5"]);
    assert_eq!(page.items[0].rank, 1);
    assert_close(page.items[0].final_score, 100.0);
    assert_close(page.items[3].final_score, 63.0);
    assert_eq!(page.benchmark.mode, BenchmarkMode::Default);
    assert_eq!(page.benchmark.size, 3);
    assert_eq!(page.total, 5);
    assert!(page.skipped.employee_ids.is_empty());
}

#[test]
fn default_benchmark_matches_an_explicit_high_performer_list() {
    let engine = engine();
    let default = engine
        .rank_candidates(&query(BenchmarkSpec::new(5), ResultFilter::default()))
        .expect("default ranking");
    let manual = engine
        .rank_candidates(&query(
            BenchmarkSpec::new(5).with_manual(["E1", "E2", "E3"]),
            ResultFilter::default(),
        ))
        .expect("manual ranking");

    assert_eq!(default.benchmark.fingerprint, manual.benchmark.fingerprint);
    let scores = |page: &crate::matching::RankedPage| -> Vec<f64> {
        page.items.iter().map(|item| item.final_score).collect()
    };
    assert_eq!(scores(&default), scores(&manual));
}

#[test]
fn ranking_is_stable_across_worker_counts() {
    let single = MatchEngine::new(
        Arc::new(provider()),
        registry(),
        EngineSettings {
            worker_threads: 1,
            ..EngineSettings::default()
        },
    );
    let spec = BenchmarkSpec::new(3);

    let expected = single
        .rank_candidates(&query(spec.clone(), ResultFilter::default()))
        .expect("single-threaded ranking");
    let actual = engine()
        .rank_candidates(&query(spec, ResultFilter::default()))
        .expect("multi-threaded ranking");

    assert_eq!(expected, actual);
}

#[test]
fn unknown_candidates_are_reported_as_skipped() {
    let filter = ResultFilter {
        candidate_ids: Some(ids(&["E1", "E99"])),
        ..ResultFilter::default()
    };

    let page = engine()
        .rank_candidates(&query(BenchmarkSpec::new(5), filter))
        .expect("ranking succeeds");

    assert_eq!(ranked_ids(&page), vec!["E1"]);
    assert_eq!(page.skipped.count, 1);
    assert_eq!(page.skipped.employee_ids, vec![EmployeeId::new("E99")]);
}

#[test]
fn result_filters_and_pagination_narrow_output_only() {
    let engine = engine();

    let page = engine
        .rank_candidates(&RankQuery {
            benchmark: BenchmarkSpec::new(5),
            filter: ResultFilter::default(),
            pagination: Pagination::new(2, 2),
        })
        .expect("second page");
    assert_eq!(ranked_ids(&page), vec!["E3", "E4"]);
    assert_eq!((page.page, page.total_pages, page.total), (2, 3, 5));
    assert_eq!(page.items[0].rank, 3);

    let by_name = engine
        .rank_candidates(&query(
            BenchmarkSpec::new(5),
            ResultFilter {
                name_contains: Some("DEWI".to_string()),
                ..ResultFilter::default()
            },
        ))
        .expect("name search");
    assert_eq!(ranked_ids(&by_name), vec!["E4"]);
    assert_close(by_name.items[0].final_score, 63.0);
    assert_eq!(by_name.benchmark.size, 3);
}

#[test]
fn filtered_benchmark_matching_nobody_is_an_error() {
    let spec = BenchmarkSpec::new(5).with_filters(BenchmarkFilters::for_position(99));

    let err = engine()
        .rank_candidates(&query(spec, ResultFilter::default()))
        .expect_err("empty benchmark");

    assert!(matches!(
        err,
        MatchError::EmptyBenchmark {
            mode: BenchmarkMode::Filtered
        }
    ));
}

#[test]
fn filtered_benchmark_uses_only_matching_high_performers() {
    let spec = BenchmarkSpec::new(5).with_filters(BenchmarkFilters::for_position(20));

    let breakdown = engine()
        .breakdown_for(&EmployeeId::new("E3"), &spec)
        .expect("breakdown");

    assert_eq!(breakdown.benchmark.mode, BenchmarkMode::Filtered);
    assert_eq!(breakdown.benchmark.size, 1);
    assert_close(breakdown.final_score, 100.0);
}

#[test]
fn manual_benchmark_tolerates_unknown_members() {
    let spec = BenchmarkSpec::new(5).with_manual(["E99", "E1"]);

    let breakdown = engine()
        .breakdown_for(&EmployeeId::new("E1"), &spec)
        .expect("breakdown");

    assert_eq!(breakdown.benchmark.mode, BenchmarkMode::Manual);
    assert_eq!(breakdown.benchmark.size, 2);
    assert_close(breakdown.final_score, 100.0);
}

#[test]
fn breakdown_for_unknown_employee_is_an_error() {
    let err = engine()
        .breakdown_for(&EmployeeId::new("E99"), &BenchmarkSpec::new(5))
        .expect_err("unknown employee");

    assert!(matches!(err, MatchError::UnknownEmployee(ref id) if id.as_str() == "E99"));
}

#[test]
fn recommends_positions_best_fit_first() {
    let recommendations = engine()
        .recommend_positions_for(&EmployeeId::new("E4"), 5)
        .expect("recommendations");

    let order: Vec<u32> = recommendations
        .matches
        .iter()
        .map(|entry| entry.position_id)
        .collect();
    assert_eq!(order, vec![10, 20]);
    assert_eq!(recommendations.matches[0].position_name, "Data Analyst");
    assert_eq!(recommendations.matches[0].benchmark_size, 2);
    assert_close(recommendations.matches[0].final_score, 73.75);
    assert!(recommendations.matches[1].final_score < 73.75);
    assert_eq!(recommendations.skipped_positions, vec![30]);
}

#[test]
fn recommendations_fetch_readings_in_one_batch() {
    let provider = Arc::new(CountingProvider::new(provider()));
    let engine = MatchEngine::new(Arc::clone(&provider), registry(), settings());

    engine
        .recommend_positions_for(&EmployeeId::new("E4"), 5)
        .expect("recommendations");

    assert_eq!(provider.reading_fetches(), 1);
}

#[test]
fn recommendations_for_unknown_employee_are_an_error() {
    let err = engine()
        .recommend_positions_for(&EmployeeId::new("E99"), 5)
        .expect_err("unknown employee");

    assert!(matches!(err, MatchError::UnknownEmployee(_)));
}

#[test]
fn baselines_are_cached_per_registry_revision() {
    let provider = Arc::new(CountingProvider::new(provider()));
    let engine = MatchEngine::new(Arc::clone(&provider), registry(), settings());
    let population = engine
        .resolve_benchmark(&BenchmarkSpec::new(5))
        .expect("benchmark");

    let first = engine.baselines(&population).expect("first computation");
    let second = engine.baselines(&population).expect("cached");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.reading_fetches(), 1);

    let revision = engine.replace_registry(VariableRegistry::standard());
    assert_eq!(revision, 2);
    let third = engine.baselines(&population).expect("recomputed");
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(provider.reading_fetches(), 2);
}

#[test]
fn zero_capacity_disables_the_baseline_cache() {
    let provider = Arc::new(CountingProvider::new(provider()));
    let engine = MatchEngine::new(
        Arc::clone(&provider),
        registry(),
        EngineSettings {
            cache_capacity: 0,
            ..EngineSettings::default()
        },
    );
    let population = engine
        .resolve_benchmark(&BenchmarkSpec::new(5))
        .expect("benchmark");

    engine.baselines(&population).expect("first");
    engine.baselines(&population).expect("second");

    assert_eq!(provider.reading_fetches(), 2);
}
