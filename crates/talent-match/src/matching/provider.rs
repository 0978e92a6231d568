use std::collections::{BTreeMap, BTreeSet};

use super::domain::{EmployeeId, EmployeeRecord, Position, Reading, ReadingSet};

/// Storage abstraction feeding the engine with directory data and raw readings.
///
/// Implementations are expected to answer each call with a single batched fetch.
pub trait ReadingsProvider: Send + Sync {
    fn employees(&self) -> Result<Vec<EmployeeRecord>, ProviderError>;
    fn positions(&self) -> Result<Vec<Position>, ProviderError>;
    /// Readings for every requested employee known to the directory. Unknown ids are
    /// omitted; known employees without readings map to an empty set.
    fn readings_for(
        &self,
        ids: &BTreeSet<EmployeeId>,
    ) -> Result<BTreeMap<EmployeeId, ReadingSet>, ProviderError>;
}

/// Error enumeration for provider failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("readings source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only provider backed by in-process maps; used by the CLI, demos, and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadingsProvider {
    employees: BTreeMap<EmployeeId, EmployeeRecord>,
    readings: BTreeMap<EmployeeId, ReadingSet>,
    positions: BTreeMap<u32, Position>,
}

impl InMemoryReadingsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_employee(&mut self, record: EmployeeRecord) {
        self.employees.insert(record.employee_id.clone(), record);
    }

    pub fn insert_reading(&mut self, id: EmployeeId, variable: &str, reading: Reading) {
        self.readings
            .entry(id)
            .or_default()
            .insert(variable.to_string(), reading);
    }

    pub fn insert_position(&mut self, position: Position) {
        self.positions.insert(position.position_id, position);
    }

    pub fn with_employee(mut self, record: EmployeeRecord) -> Self {
        self.insert_employee(record);
        self
    }

    pub fn with_reading(mut self, id: &str, variable: &str, reading: Reading) -> Self {
        self.insert_reading(EmployeeId::from(id), variable, reading);
        self
    }

    pub fn with_position(mut self, position_id: u32, name: &str) -> Self {
        self.insert_position(Position {
            position_id,
            name: name.to_string(),
        });
        self
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }
}

impl ReadingsProvider for InMemoryReadingsProvider {
    fn employees(&self) -> Result<Vec<EmployeeRecord>, ProviderError> {
        Ok(self.employees.values().cloned().collect())
    }

    fn positions(&self) -> Result<Vec<Position>, ProviderError> {
        Ok(self.positions.values().cloned().collect())
    }

    fn readings_for(
        &self,
        ids: &BTreeSet<EmployeeId>,
    ) -> Result<BTreeMap<EmployeeId, ReadingSet>, ProviderError> {
        Ok(ids
            .iter()
            .filter(|id| self.employees.contains_key(*id))
            .map(|id| {
                let readings = self.readings.get(id).cloned().unwrap_or_default();
                (id.clone(), readings)
            })
            .collect())
    }
}
