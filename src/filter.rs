//! Trial and press filters
//!
//! Each filter keeps the rows whose flag columns are all zero and returns a
//! new table. The plain filters never fail: a table without the flag column
//! simply has no rows that pass. The `try_` variants reject such a table
//! with [`WrangleError::MissingColumn`] instead.

use tracing::{debug, warn};

use crate::error::WrangleError;
use crate::table::Table;

/// Flag marking a trial as erroneous in a trial table
pub const IS_ERROR: &str = "isError";
/// Flag marking a trial as erroneous in a press table
pub const IS_TRIAL_ERROR: &str = "isTrialError";
/// Flag marking a timing violation
pub const TIMING_ERROR: &str = "timingError";
/// Flag marking a wrong key press
pub const IS_PRESS_ERROR: &str = "isPressError";

/// Keep trials with `isError == 0` and `timingError == 0`
///
/// Returns an empty table if either flag column is absent; use
/// [`try_remove_error_trials`] to get an error instead.
pub fn remove_error_trials(trials: &Table) -> Table {
    keep_where_zero(trials, &[IS_ERROR, TIMING_ERROR])
}

/// Press-table variant: keep rows with `isTrialError == 0` and `timingError == 0`
///
/// Returns an empty table if either flag column is absent; use
/// [`try_remove_error_trials_presses`] to get an error instead.
pub fn remove_error_trials_presses(presses: &Table) -> Table {
    keep_where_zero(presses, &[IS_TRIAL_ERROR, TIMING_ERROR])
}

/// Keep rows with `isPressError == 0`
///
/// Reads whichever `isPressError` column the table carries. For a press table
/// that is the recorded flag; for an event table built by
/// [`finger_melt`](crate::reshape::finger_melt) it is the derived
/// press/response mismatch. Returns an empty table if the column is absent;
/// use [`try_remove_error_presses`] to get an error instead.
pub fn remove_error_presses(presses: &Table) -> Table {
    keep_where_zero(presses, &[IS_PRESS_ERROR])
}

/// [`remove_error_trials`], failing when a flag column is missing
pub fn try_remove_error_trials(trials: &Table) -> Result<Table, WrangleError> {
    try_keep_where_zero(trials, &[IS_ERROR, TIMING_ERROR])
}

/// [`remove_error_trials_presses`], failing when a flag column is missing
pub fn try_remove_error_trials_presses(presses: &Table) -> Result<Table, WrangleError> {
    try_keep_where_zero(presses, &[IS_TRIAL_ERROR, TIMING_ERROR])
}

/// [`remove_error_presses`], failing when the flag column is missing
pub fn try_remove_error_presses(presses: &Table) -> Result<Table, WrangleError> {
    try_keep_where_zero(presses, &[IS_PRESS_ERROR])
}

/// [`keep_where_zero`], failing on the first missing flag column
pub fn try_keep_where_zero(table: &Table, flags: &[&str]) -> Result<Table, WrangleError> {
    for flag in flags {
        table.require_column(flag)?;
    }
    Ok(keep_where_zero(table, flags))
}

/// Keep the rows in which every one of `flags` is zero
pub fn keep_where_zero(table: &Table, flags: &[&str]) -> Table {
    let missing: Vec<&str> = flags
        .iter()
        .copied()
        .filter(|flag| !table.has_column(flag))
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "flag columns absent, no rows pass");
        return table.filter(|_| false);
    }

    let filtered = table.filter(|row| {
        flags
            .iter()
            .all(|flag| row.get(flag).is_some_and(|value| value.is_zero()))
    });
    debug!(
        flags = ?flags,
        kept = filtered.len(),
        dropped = table.len() - filtered.len(),
        "filtered rows"
    );
    filtered
}
