use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::info;

use super::domain::{DimensionId, EmployeeId, EmployeeRecord, Position, Reading};
use super::provider::InMemoryReadingsProvider;

pub const EMPLOYEES_FILE: &str = "employees.csv";
pub const READINGS_FILE: &str = "readings.csv";
pub const POSITIONS_FILE: &str = "positions.csv";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("{file} line {line}: {reason}")]
    InvalidRow {
        file: String,
        line: u64,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    employee_id: String,
    #[serde(default)]
    fullname: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    position_id: Option<DimensionId>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department_id: Option<DimensionId>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    division_id: Option<DimensionId>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    grade_id: Option<DimensionId>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rating: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ReadingRow {
    employee_id: String,
    variable: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    position_id: DimensionId,
    name: String,
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Load `employees.csv`, `readings.csv`, and (optionally) `positions.csv` from `dir`.
pub fn load_directory<P: AsRef<Path>>(dir: P) -> Result<InMemoryReadingsProvider, DatasetError> {
    let dir = dir.as_ref();
    let open = |name: &str| {
        File::open(dir.join(name)).map_err(|source| DatasetError::Io {
            file: name.to_string(),
            source,
        })
    };

    let employees = open(EMPLOYEES_FILE)?;
    let readings = open(READINGS_FILE)?;
    let positions = if dir.join(POSITIONS_FILE).exists() {
        Some(open(POSITIONS_FILE)?)
    } else {
        None
    };

    let provider = from_readers(employees, readings, positions)?;
    info!(
        dir = %dir.display(),
        employees = provider.employee_count(),
        "dataset loaded"
    );
    Ok(provider)
}

/// Build a provider from CSV sources. Blank reading values are treated as missing.
pub fn from_readers<E, R, P>(
    employees: E,
    readings: R,
    positions: Option<P>,
) -> Result<InMemoryReadingsProvider, DatasetError>
where
    E: Read,
    R: Read,
    P: Read,
{
    let mut provider = InMemoryReadingsProvider::new();

    for row in deserialize_rows::<EmployeeRow, _>(employees, EMPLOYEES_FILE)? {
        let (line, row) = row;
        let employee_id = EmployeeId::from(row.employee_id.as_str());
        if employee_id.as_str().is_empty() {
            return Err(invalid_row(EMPLOYEES_FILE, line, "employee_id is blank"));
        }
        if let Some(rating) = row.rating {
            if !(1..=5).contains(&rating) {
                return Err(invalid_row(
                    EMPLOYEES_FILE,
                    line,
                    &format!("rating {rating} is outside 1..=5"),
                ));
            }
        }

        provider.insert_employee(EmployeeRecord {
            employee_id,
            fullname: row.fullname.trim().to_string(),
            position_id: row.position_id,
            department_id: row.department_id,
            division_id: row.division_id,
            grade_id: row.grade_id,
            rating: row.rating,
        });
    }

    for row in deserialize_rows::<ReadingRow, _>(readings, READINGS_FILE)? {
        let (line, row) = row;
        let variable = row.variable.trim();
        if variable.is_empty() {
            return Err(invalid_row(READINGS_FILE, line, "variable is blank"));
        }
        if let Some(reading) = Reading::parse(&row.value) {
            provider.insert_reading(EmployeeId::from(row.employee_id.as_str()), variable, reading);
        }
    }

    if let Some(positions) = positions {
        for row in deserialize_rows::<PositionRow, _>(positions, POSITIONS_FILE)? {
            let (_, row) = row;
            provider.insert_position(Position {
                position_id: row.position_id,
                name: row.name.trim().to_string(),
            });
        }
    }

    Ok(provider)
}

/// Rewrite a wide readings CSV (one column per variable) into the long
/// `employee_id,variable,value` layout that [`from_readers`] expects. Blank cells are dropped.
pub fn pivot_wide_readings<R, W>(wide: R, long: W) -> Result<(), DatasetError>
where
    R: Read,
    W: Write,
{
    let csv_error = |source: csv::Error| DatasetError::Csv {
        file: READINGS_FILE.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(wide);
    let mut writer = csv::Writer::from_writer(long);
    writer
        .write_record(["employee_id", "variable", "value"])
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let variables: Vec<&str> = headers.iter().skip(1).collect();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();
        let Some(employee_id) = record.get(0).filter(|id| !id.is_empty()) else {
            return Err(invalid_row(READINGS_FILE, line, "employee_id is blank"));
        };
        for (variable, value) in variables.iter().zip(record.iter().skip(1)) {
            if !value.is_empty() {
                writer
                    .write_record([employee_id, *variable, value])
                    .map_err(csv_error)?;
            }
        }
    }

    writer.flush().map_err(|source| DatasetError::Io {
        file: READINGS_FILE.to_string(),
        source,
    })
}

fn deserialize_rows<T, R>(reader: R, file: &str) -> Result<Vec<(u64, T)>, DatasetError>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let csv_error = |source: csv::Error| DatasetError::Csv {
        file: file.to_string(),
        source,
    };

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|position| position.line()).unwrap_or_default();
        let row = record.deserialize::<T>(Some(&headers)).map_err(csv_error)?;
        rows.push((line, row));
    }
    Ok(rows)
}

fn invalid_row(file: &str, line: u64, reason: &str) -> DatasetError {
    DatasetError::InvalidRow {
        file: file.to_string(),
        line,
        reason: reason.to_string(),
    }
}
