use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::benchmark::{BenchmarkFilters, BenchmarkSpec};
use super::domain::EmployeeId;
use super::engine::MatchEngine;
use super::error::MatchError;
use super::provider::ReadingsProvider;
use super::ranking::{Pagination, RankQuery, ResultFilter};

/// Benchmark selection as submitted over HTTP; `min_rating` falls back to the engine default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchmarkRequest {
    #[serde(default)]
    pub manual_ids: BTreeSet<EmployeeId>,
    #[serde(default)]
    pub use_manual_as_benchmark: bool,
    #[serde(default)]
    pub filters: BenchmarkFilters,
    #[serde(default)]
    pub min_rating: Option<u8>,
}

impl BenchmarkRequest {
    pub fn into_spec(self, default_min_rating: u8) -> BenchmarkSpec {
        BenchmarkSpec {
            manual_ids: self.manual_ids,
            use_manual_as_benchmark: self.use_manual_as_benchmark,
            filters: self.filters,
            min_rating: self.min_rating.unwrap_or(default_min_rating),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub benchmark: BenchmarkRequest,
    #[serde(default)]
    pub filter: ResultFilter,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendParams {
    #[serde(default)]
    pub min_rating: Option<u8>,
}

/// Router builder exposing ranking, breakdown, recommendation, and registry endpoints.
pub fn match_router<P>(engine: Arc<MatchEngine<P>>) -> Router
where
    P: ReadingsProvider + 'static,
{
    Router::new()
        .route("/api/v1/match/rank", post(rank_handler::<P>))
        .route(
            "/api/v1/match/employees/:employee_id/breakdown",
            post(breakdown_handler::<P>),
        )
        .route(
            "/api/v1/match/employees/:employee_id/positions",
            get(positions_handler::<P>),
        )
        .route("/api/v1/match/registry", get(registry_handler::<P>))
        .with_state(engine)
}

pub(crate) async fn rank_handler<P>(
    State(engine): State<Arc<MatchEngine<P>>>,
    axum::Json(request): axum::Json<RankRequest>,
) -> Response
where
    P: ReadingsProvider + 'static,
{
    if let Some(response) = reject_rating(request.benchmark.min_rating) {
        return response;
    }
    let default_min_rating = engine.settings().default_min_rating;
    let page_size = engine.settings().page_size;
    let query = RankQuery {
        benchmark: request.benchmark.into_spec(default_min_rating),
        filter: request.filter,
        pagination: Pagination::new(
            request.page.unwrap_or(1),
            request.per_page.unwrap_or(page_size),
        ),
    };

    let outcome = tokio::task::spawn_blocking(move || engine.rank_candidates(&query)).await;
    respond(outcome)
}

pub(crate) async fn breakdown_handler<P>(
    State(engine): State<Arc<MatchEngine<P>>>,
    Path(employee_id): Path<String>,
    axum::Json(request): axum::Json<BenchmarkRequest>,
) -> Response
where
    P: ReadingsProvider + 'static,
{
    if let Some(response) = reject_rating(request.min_rating) {
        return response;
    }
    let spec = request.into_spec(engine.settings().default_min_rating);
    let id = EmployeeId::from(employee_id.as_str());

    let outcome = tokio::task::spawn_blocking(move || engine.breakdown_for(&id, &spec)).await;
    respond(outcome)
}

pub(crate) async fn positions_handler<P>(
    State(engine): State<Arc<MatchEngine<P>>>,
    Path(employee_id): Path<String>,
    Query(params): Query<RecommendParams>,
) -> Response
where
    P: ReadingsProvider + 'static,
{
    if let Some(response) = reject_rating(params.min_rating) {
        return response;
    }
    let min_rating = params
        .min_rating
        .unwrap_or(engine.settings().default_min_rating);
    let id = EmployeeId::from(employee_id.as_str());

    let outcome =
        tokio::task::spawn_blocking(move || engine.recommend_positions_for(&id, min_rating)).await;
    respond(outcome)
}

pub(crate) async fn registry_handler<P>(State(engine): State<Arc<MatchEngine<P>>>) -> Response
where
    P: ReadingsProvider + 'static,
{
    let registry = engine.registry();
    (StatusCode::OK, axum::Json(registry.as_ref())).into_response()
}

fn reject_rating(min_rating: Option<u8>) -> Option<Response> {
    match min_rating {
        Some(rating) if !(1..=5).contains(&rating) => {
            let payload = json!({
                "error": format!("min_rating {rating} is outside 1..=5"),
            });
            Some((StatusCode::BAD_REQUEST, axum::Json(payload)).into_response())
        }
        _ => None,
    }
}

fn respond<T>(outcome: Result<Result<T, MatchError>, tokio::task::JoinError>) -> Response
where
    T: serde::Serialize,
{
    match outcome {
        Ok(Ok(body)) => (StatusCode::OK, axum::Json(body)).into_response(),
        Ok(Err(err)) => match_error_response(&err),
        Err(join_error) => {
            error!(error = %join_error, "scoring task failed");
            let payload = json!({ "error": "scoring task failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

/// Status code used for each engine error.
pub fn match_error_status(err: &MatchError) -> StatusCode {
    match err {
        MatchError::EmptyBenchmark { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MatchError::UnknownEmployee(_) => StatusCode::NOT_FOUND,
        MatchError::Registry(_) => StatusCode::BAD_REQUEST,
        MatchError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn match_error_response(err: &MatchError) -> Response {
    let payload = match err {
        MatchError::EmptyBenchmark { mode } => json!({
            "error": err.to_string(),
            "benchmark_mode": mode.label(),
        }),
        MatchError::UnknownEmployee(id) => json!({
            "error": err.to_string(),
            "employee_id": id,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (match_error_status(err), axum::Json(payload)).into_response()
}
