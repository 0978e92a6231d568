use std::collections::BTreeMap;

use super::baseline::{Baseline, BaselineMap};
use super::domain::{normalize_category, Reading, ReadingSet};
use super::registry::{VariableKind, VariableRegistry};

/// Rate assigned when a baseline is undefined or zero.
pub const NEUTRAL_MATCH_RATE: f64 = 50.0;

pub const MAX_MATCH_RATE: f64 = 100.0;

/// Clamp into `[0, 100]`; NaN collapses to zero.
pub fn clamp_rate(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, MAX_MATCH_RATE)
}

pub fn numeric_rate(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return NEUTRAL_MATCH_RATE;
    }
    clamp_rate(value / baseline * 100.0)
}

/// Lower-is-better scales: equal to baseline scores 100, twice the baseline scores 0.
pub fn reverse_rate(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return NEUTRAL_MATCH_RATE;
    }
    clamp_rate((2.0 * baseline - value) / baseline * 100.0)
}

pub fn categorical_rate(value: Option<&str>, mode: &str) -> f64 {
    match value {
        Some(value) if normalize_category(value) == normalize_category(mode) => MAX_MATCH_RATE,
        _ => 0.0,
    }
}

/// Rate for one variable.
///
/// Missing numeric readings count as zero, so a missing reverse-scored reading clamps to
/// 100 while a missing direct reading scores 0.
pub fn match_rate(kind: VariableKind, reading: Option<&Reading>, baseline: Option<&Baseline>) -> f64 {
    match (kind, baseline) {
        (_, None) => NEUTRAL_MATCH_RATE,
        (VariableKind::Numeric, Some(Baseline::Numeric(baseline))) => {
            numeric_rate(numeric_value(reading), *baseline)
        }
        (VariableKind::ReverseNumeric, Some(Baseline::Numeric(baseline))) => {
            reverse_rate(numeric_value(reading), *baseline)
        }
        (VariableKind::Categorical, Some(Baseline::Categorical(mode))) => {
            let key = reading.map(Reading::category_key);
            categorical_rate(key.as_deref(), mode)
        }
        _ => NEUTRAL_MATCH_RATE,
    }
}

fn numeric_value(reading: Option<&Reading>) -> f64 {
    reading.and_then(Reading::as_numeric).unwrap_or(0.0)
}

/// Rates for every registry variable, keyed by variable name.
pub fn compute_match_rates(
    readings: &ReadingSet,
    baselines: &BaselineMap,
    registry: &VariableRegistry,
) -> BTreeMap<String, f64> {
    registry
        .list_variables()
        .iter()
        .map(|variable| {
            let rate = match_rate(
                variable.kind,
                readings.get(&variable.name),
                baselines.get(&variable.name),
            );
            (variable.name.clone(), rate)
        })
        .collect()
}
