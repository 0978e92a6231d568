use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::matching::{
    EmployeeId, EmployeeRecord, EngineSettings, Group, InMemoryReadingsProvider, MatchEngine,
    Position, ProviderError, Reading, ReadingSet, ReadingsProvider, Variable, VariableKind,
    VariableRegistry,
};

pub(super) const EPSILON: f64 = 1e-9;

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

/// Competency 0.5, Cognitive 0.3, Personality 0.2.
pub(super) fn registry() -> VariableRegistry {
    VariableRegistry::new(
        vec![
            Group::new("Competency", 0.5),
            Group::new("Cognitive", 0.3),
            Group::new("Personality", 0.2),
        ],
        vec![
            Variable::new("GDR", VariableKind::Numeric, "Competency", 1.0),
            Variable::new("QDD", VariableKind::Numeric, "Competency", 1.0),
            Variable::new("iq", VariableKind::Numeric, "Cognitive", 0.6),
            Variable::new("Papi_K", VariableKind::ReverseNumeric, "Cognitive", 0.4),
            Variable::new("mbti", VariableKind::Categorical, "Personality", 1.0).labelled("MBTI"),
        ],
    )
    .expect("fixture registry is valid")
}

pub(super) fn employee(
    id: &str,
    fullname: &str,
    position_id: Option<u32>,
    department_id: Option<u32>,
    rating: Option<u8>,
) -> EmployeeRecord {
    EmployeeRecord {
        employee_id: EmployeeId::new(id),
        fullname: fullname.to_string(),
        position_id,
        department_id,
        division_id: Some(1),
        grade_id: None,
        rating,
    }
}

fn with_profile(
    provider: InMemoryReadingsProvider,
    id: &str,
    gdr: f64,
    qdd: Option<f64>,
    iq: f64,
    papi_k: f64,
    mbti: &str,
) -> InMemoryReadingsProvider {
    let provider = provider
        .with_reading(id, "GDR", Reading::Numeric(gdr))
        .with_reading(id, "iq", Reading::Numeric(iq))
        .with_reading(id, "Papi_K", Reading::Numeric(papi_k))
        .with_reading(id, "mbti", Reading::Categorical(mbti.to_string()));
    match qdd {
        Some(value) => provider.with_reading(id, "QDD", Reading::Numeric(value)),
        None => provider,
    }
}

/// Three rating-5 employees (E1-E3), two lower-rated (E4, E5), and one unrated
/// employee without readings (E6).
pub(super) fn provider() -> InMemoryReadingsProvider {
    let provider = InMemoryReadingsProvider::new()
        .with_employee(employee("E1", "Ayu Lestari", Some(10), Some(1), Some(5)))
        .with_employee(employee("E2", "Budi Santoso", Some(10), Some(1), Some(5)))
        .with_employee(employee("E3", "Citra Dewanti", Some(20), Some(2), Some(5)))
        .with_employee(employee("E4", "Dewi Anggraini", Some(20), Some(2), Some(3)))
        .with_employee(employee("E5", "Eko Prasetyo", Some(10), Some(1), Some(2)))
        .with_employee(employee("E6", "Fajar Nugroho", Some(30), Some(3), None))
        .with_position(10, "Data Analyst")
        .with_position(20, "Software Engineer")
        .with_position(30, "Product Designer");

    let provider = with_profile(provider, "E1", 4.0, Some(4.0), 120.0, 4.0, "INTJ");
    let provider = with_profile(provider, "E2", 4.0, Some(2.0), 100.0, 6.0, "INTJ");
    let provider = with_profile(provider, "E3", 2.0, Some(4.0), 140.0, 2.0, "ENFP");
    let provider = with_profile(provider, "E4", 3.0, Some(3.0), 110.0, 5.0, "ISTJ");
    with_profile(provider, "E5", 1.0, None, 90.0, 8.0, " intj ")
}

pub(super) fn settings() -> EngineSettings {
    EngineSettings {
        worker_threads: 2,
        ..EngineSettings::default()
    }
}

pub(super) fn engine() -> MatchEngine<InMemoryReadingsProvider> {
    MatchEngine::new(Arc::new(provider()), registry(), settings())
}

pub(super) fn ids(values: &[&str]) -> BTreeSet<EmployeeId> {
    values.iter().map(|value| EmployeeId::from(*value)).collect()
}

/// Wraps the fixture provider and counts batched readings fetches.
pub(super) struct CountingProvider {
    inner: InMemoryReadingsProvider,
    reading_fetches: AtomicUsize,
}

impl CountingProvider {
    pub(super) fn new(inner: InMemoryReadingsProvider) -> Self {
        Self {
            inner,
            reading_fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn reading_fetches(&self) -> usize {
        self.reading_fetches.load(Ordering::SeqCst)
    }
}

impl ReadingsProvider for CountingProvider {
    fn employees(&self) -> Result<Vec<EmployeeRecord>, ProviderError> {
        self.inner.employees()
    }

    fn positions(&self) -> Result<Vec<Position>, ProviderError> {
        self.inner.positions()
    }

    fn readings_for(
        &self,
        ids: &BTreeSet<EmployeeId>,
    ) -> Result<BTreeMap<EmployeeId, ReadingSet>, ProviderError> {
        self.reading_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.readings_for(ids)
    }
}

pub(super) struct UnavailableProvider;

impl ReadingsProvider for UnavailableProvider {
    fn employees(&self) -> Result<Vec<EmployeeRecord>, ProviderError> {
        Err(ProviderError::Unavailable("warehouse offline".to_string()))
    }

    fn positions(&self) -> Result<Vec<Position>, ProviderError> {
        Err(ProviderError::Unavailable("warehouse offline".to_string()))
    }

    fn readings_for(
        &self,
        _ids: &BTreeSet<EmployeeId>,
    ) -> Result<BTreeMap<EmployeeId, ReadingSet>, ProviderError> {
        Err(ProviderError::Unavailable("warehouse offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
