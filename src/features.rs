//! Inter-press interval derivation
//!
//! For a sequence of length `L` a trial carries the absolute press times
//! `pressTime1..pressTimeL`; this module appends `IPI1..IPI{L-1}`, where
//! `IPI{k} = pressTime{k+1} - pressTime{k}`.

use tracing::debug;

use crate::error::WrangleError;
use crate::table::{ColumnType, Table, Value};

/// Column prefix of the absolute press timestamps
pub const PRESS_TIME_PREFIX: &str = "pressTime";
/// Column prefix of the derived intervals
pub const IPI_PREFIX: &str = "IPI";

pub fn press_time_column(k: usize) -> String {
    format!("{PRESS_TIME_PREFIX}{k}")
}

pub fn ipi_column(k: usize) -> String {
    format!("{IPI_PREFIX}{k}")
}

/// Differences between consecutive press times
///
/// Negative intervals (skipped or corrected presses) are returned as-is;
/// differences that overflow `i64` wrap around.
pub fn interpress_intervals(press_times: &[i64]) -> Vec<i64> {
    press_times.windows(2).map(|w| w[1].wrapping_sub(w[0])).collect()
}

/// Return a copy of `trials` with the `L - 1` IPI columns appended
pub fn add_ipi(trials: &Table, sequence_length: usize) -> Result<Table, WrangleError> {
    let time_columns = (1..=sequence_length)
        .map(|k| trials.require_column(&press_time_column(k)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut per_interval: Vec<Vec<Value>> =
        vec![Vec::with_capacity(trials.len()); sequence_length.saturating_sub(1)];
    let mut negative = 0usize;

    for row in trials.iter() {
        let times = time_columns
            .iter()
            .enumerate()
            .map(|(k, &idx)| {
                row.values()[idx].as_i64().ok_or_else(|| {
                    WrangleError::ColumnMismatch(format!(
                        "{} must hold integer timestamps",
                        press_time_column(k + 1)
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (interval, ipi) in interpress_intervals(&times).into_iter().enumerate() {
            if ipi < 0 {
                negative += 1;
            }
            per_interval[interval].push(Value::Int(ipi));
        }
    }

    if negative > 0 {
        debug!(negative, "negative inter-press intervals kept");
    }

    per_interval
        .into_iter()
        .enumerate()
        .try_fold(trials.clone(), |table, (interval, values)| {
            table.with_column(&ipi_column(interval + 1), ColumnType::Int, values)
        })
}
