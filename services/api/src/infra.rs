use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_match::config::MatchingConfig;
use talent_match::error::AppError;
use talent_match::matching::{
    dataset, EngineSettings, InMemoryReadingsProvider, MatchEngine, VariableRegistry,
};
use tracing::info;

use crate::demo::demo_provider;

pub(crate) type Engine = MatchEngine<InMemoryReadingsProvider>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Where the directory and readings were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataSource {
    Directory,
    Demo,
}

impl DataSource {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            DataSource::Directory => "csv directory",
            DataSource::Demo => "built-in demo dataset",
        }
    }
}

/// Registry from `MATCH_REGISTRY_PATH` when set, otherwise the standard talent model.
pub(crate) fn load_registry(config: &MatchingConfig) -> Result<VariableRegistry, AppError> {
    match &config.registry_path {
        Some(path) => {
            let registry = VariableRegistry::from_path(path)?;
            info!(
                path = %path.display(),
                variables = registry.list_variables().len(),
                "variable registry loaded"
            );
            Ok(registry)
        }
        None => Ok(VariableRegistry::standard()),
    }
}

pub(crate) fn load_provider(
    config: &MatchingConfig,
) -> Result<(InMemoryReadingsProvider, DataSource), AppError> {
    match &config.data_dir {
        Some(dir) => Ok((dataset::load_directory(dir)?, DataSource::Directory)),
        None => Ok((demo_provider()?, DataSource::Demo)),
    }
}

pub(crate) fn build_engine(config: &MatchingConfig) -> Result<(Arc<Engine>, DataSource), AppError> {
    let registry = load_registry(config)?;
    let (provider, source) = load_provider(config)?;
    let engine = MatchEngine::new(
        Arc::new(provider),
        registry,
        EngineSettings::from(config),
    );
    Ok((Arc::new(engine), source))
}

pub(crate) fn parse_rating(raw: &str) -> Result<u8, String> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|rating| (1..=5).contains(rating))
        .ok_or_else(|| format!("'{raw}' is not a rating between 1 and 5"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rating_accepts_only_the_rating_scale() {
        assert_eq!(parse_rating(" 4 "), Ok(4));
        assert!(parse_rating("0").is_err());
        assert!(parse_rating("6").is_err());
        assert!(parse_rating("high").is_err());
    }

    #[test]
    fn build_engine_falls_back_to_demo_dataset() {
        let (engine, source) = build_engine(&MatchingConfig::default()).expect("engine builds");

        assert_eq!(source, DataSource::Demo);
        assert_eq!(engine.registry().groups().len(), 5);
    }

    #[test]
    fn load_registry_reports_missing_files() {
        let config = MatchingConfig {
            registry_path: Some("/definitely/missing/registry.json".into()),
            ..MatchingConfig::default()
        };

        assert!(matches!(load_registry(&config), Err(AppError::Registry(_))));
    }
}
