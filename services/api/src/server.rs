use crate::cli::ServeArgs;
use crate::infra::{build_engine, AppState};
use crate::routes::with_match_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_match::config::AppConfig;
use talent_match::error::AppError;
use talent_match::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let matching = config.matching.clone();
    let (engine, source) = tokio::task::spawn_blocking(move || build_engine(&matching))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    info!(
        source = source.label(),
        min_rating = config.matching.min_rating,
        variables = engine.registry().list_variables().len(),
        "scoring engine initialised"
    );

    let app = with_match_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent match service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
