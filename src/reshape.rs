//! Trial-to-event reshaping
//!
//! Turns wide trial rows (one column per repeated measurement) into long
//! event rows (one row per measurement), for the three measurement families
//! recorded by the sequence task, and joins the families on a shared index
//! `N`:
//!
//! ```text
//!   IPI{k}       -> N = k + 1   (an interval is indexed by the press that ends it)
//!   press{k}     -> N = k
//!   response{k}  -> N = k
//! ```
//!
//! The join is an inner join, so `N = 1` (no interval ends at the first
//! press) never reaches the event table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WrangleError;
use crate::features::IPI_PREFIX;
use crate::table::{ColumnType, Table, Value};

/// Name of the shared measurement index column
pub const N_COLUMN: &str = "N";
/// Name of the derived press/response mismatch column
pub const PRESS_ERROR_COLUMN: &str = "isPressError";

/// A family of repeated measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Ipi,
    Press,
    Response,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Ipi, Family::Press, Family::Response];

    /// Prefix of the wide columns (`IPI3`, `press3`, `response3`)
    pub fn prefix(&self) -> &'static str {
        match self {
            Family::Ipi => IPI_PREFIX,
            Family::Press => "press",
            Family::Response => "response",
        }
    }

    /// Long-table column holding the source column name
    pub fn number_column(&self) -> &'static str {
        match self {
            Family::Ipi => "IPI_Number",
            Family::Press => "Press_Number",
            Family::Response => "Response_Number",
        }
    }

    /// Long-table column holding the measured value
    pub fn value_column(&self) -> &'static str {
        match self {
            Family::Ipi => "IPI_Value",
            Family::Press => "Press_Value",
            Family::Response => "Response_Value",
        }
    }

    /// Shift from the column suffix `k` to the shared index `N`
    pub fn index_offset(&self) -> usize {
        match self {
            Family::Ipi => 1,
            Family::Press | Family::Response => 0,
        }
    }

    /// Number of wide columns for a sequence of `sequence_length` presses
    pub fn measurement_count(&self, sequence_length: usize) -> usize {
        match self {
            Family::Ipi => sequence_length.saturating_sub(1),
            Family::Press | Family::Response => sequence_length,
        }
    }
}

/// One wide column and the index it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub n: usize,
    pub column: String,
}

/// Declared mapping from measurement index to wide column for one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    family: Family,
    entries: Vec<MappedColumn>,
}

impl ColumnMap {
    pub fn for_family(family: Family, sequence_length: usize) -> Self {
        let entries = (1..=family.measurement_count(sequence_length))
            .map(|k| MappedColumn {
                n: k + family.index_offset(),
                column: format!("{}{}", family.prefix(), k),
            })
            .collect();
        Self { family, entries }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn entries(&self) -> &[MappedColumn] {
        &self.entries
    }

    pub fn column_for(&self, n: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.n == n)
            .map(|e| e.column.as_str())
    }
}

/// One melted measurement
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    /// Identifying values, in `id_columns` order
    pub key: Vec<Value>,
    /// Source column name
    pub label: String,
    pub value: i64,
    pub n: usize,
}

/// Melted table of a single family
#[derive(Debug, Clone, PartialEq)]
pub struct LongTable {
    family: Family,
    id_columns: Vec<String>,
    id_types: Vec<ColumnType>,
    rows: Vec<LongRow>,
}

impl LongTable {
    pub fn family(&self) -> Family {
        self.family
    }

    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    pub fn rows(&self) -> &[LongRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifying columns followed by `<Family>_Number`, `<Family>_Value`, `N`
    pub fn to_table(&self) -> Result<Table, WrangleError> {
        let mut schema: Vec<(String, ColumnType)> = self
            .id_columns
            .iter()
            .cloned()
            .zip(self.id_types.iter().copied())
            .collect();
        schema.push((self.family.number_column().to_string(), ColumnType::Str));
        schema.push((self.family.value_column().to_string(), ColumnType::Int));
        schema.push((N_COLUMN.to_string(), ColumnType::Int));

        let mut table = Table::new(schema);
        for row in &self.rows {
            let mut values = row.key.clone();
            values.push(Value::Str(row.label.clone()));
            values.push(Value::Int(row.value));
            values.push(Value::Int(row.n as i64));
            table.push_row(values)?;
        }
        Ok(table)
    }
}

/// Melt one family out of the wide trial table
///
/// Rows come out column-major: every trial for the first mapped column, then
/// every trial for the second, and so on.
pub fn melt(
    trials: &Table,
    family: Family,
    id_columns: &[String],
    sequence_length: usize,
) -> Result<LongTable, WrangleError> {
    let id_idx = id_columns
        .iter()
        .map(|c| trials.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;
    let id_types = id_idx.iter().map(|&i| trials.column_types()[i]).collect();

    let map = ColumnMap::for_family(family, sequence_length);
    let mut rows = Vec::with_capacity(trials.len() * map.entries().len());

    for entry in map.entries() {
        let col = trials.require_column(&entry.column)?;
        for row in trials.iter() {
            let values = row.values();
            let value = values[col].as_i64().ok_or_else(|| {
                WrangleError::ColumnMismatch(format!(
                    "{} must hold integers, found {}",
                    entry.column,
                    values[col].column_type().as_str()
                ))
            })?;
            rows.push(LongRow {
                key: id_idx.iter().map(|&i| values[i].clone()).collect(),
                label: entry.column.clone(),
                value,
                n: entry.n,
            });
        }
    }

    debug!(?family, rows = rows.len(), "melted measurements");

    Ok(LongTable {
        family,
        id_columns: id_columns.to_vec(),
        id_types,
        rows,
    })
}

pub fn melt_ipis(
    trials: &Table,
    id_columns: &[String],
    sequence_length: usize,
) -> Result<LongTable, WrangleError> {
    melt(trials, Family::Ipi, id_columns, sequence_length)
}

pub fn melt_presses(
    trials: &Table,
    id_columns: &[String],
    sequence_length: usize,
) -> Result<LongTable, WrangleError> {
    melt(trials, Family::Press, id_columns, sequence_length)
}

pub fn melt_responses(
    trials: &Table,
    id_columns: &[String],
    sequence_length: usize,
) -> Result<LongTable, WrangleError> {
    melt(trials, Family::Response, id_columns, sequence_length)
}

/// A press whose recorded key differs from the required one
pub fn is_press_error(press_value: i64, response_value: i64) -> bool {
    press_value != response_value
}

/// One (trial, N) event with all three measurements
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Identifying values, in the event table's `id_columns` order
    pub key: Vec<Value>,
    pub ipi_number: String,
    pub ipi_value: i64,
    pub n: usize,
    pub press_number: String,
    pub press_value: i64,
    pub response_number: String,
    pub response_value: i64,
    pub is_press_error: bool,
}

/// Joined long table of IPIs, presses and responses
#[derive(Debug, Clone, PartialEq)]
pub struct EventTable {
    id_columns: Vec<String>,
    id_types: Vec<ColumnType>,
    records: Vec<EventRecord>,
}

impl EventTable {
    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifying value of `record` for `column`
    pub fn id_value<'a>(&self, record: &'a EventRecord, column: &str) -> Option<&'a Value> {
        self.id_columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| record.key.get(idx))
    }

    /// Flatten into a [`Table`] in merge column order
    pub fn to_table(&self) -> Result<Table, WrangleError> {
        let mut schema: Vec<(String, ColumnType)> = self
            .id_columns
            .iter()
            .cloned()
            .zip(self.id_types.iter().copied())
            .collect();
        for family in Family::ALL {
            schema.push((family.number_column().to_string(), ColumnType::Str));
            schema.push((family.value_column().to_string(), ColumnType::Int));
            if family == Family::Ipi {
                schema.push((N_COLUMN.to_string(), ColumnType::Int));
            }
        }
        schema.push((PRESS_ERROR_COLUMN.to_string(), ColumnType::Bool));

        let mut table = Table::new(schema);
        for record in &self.records {
            let mut values = record.key.clone();
            values.extend([
                Value::Str(record.ipi_number.clone()),
                Value::Int(record.ipi_value),
                Value::Int(record.n as i64),
                Value::Str(record.press_number.clone()),
                Value::Int(record.press_value),
                Value::Str(record.response_number.clone()),
                Value::Int(record.response_value),
                Value::Bool(record.is_press_error),
            ]);
            table.push_row(values)?;
        }
        Ok(table)
    }
}

/// Inner-join the three melted families on the identifying columns plus `N`
///
/// Output follows the order of `ipis`; duplicate keys yield every matching
/// combination.
pub fn join_families(
    ipis: &LongTable,
    presses: &LongTable,
    responses: &LongTable,
) -> Result<EventTable, WrangleError> {
    for (table, expected) in [
        (ipis, Family::Ipi),
        (presses, Family::Press),
        (responses, Family::Response),
    ] {
        if table.family != expected {
            return Err(WrangleError::ColumnMismatch(format!(
                "expected {expected:?} measurements, got {:?}",
                table.family
            )));
        }
    }
    for other in [presses, responses] {
        if other.id_columns != ipis.id_columns || other.id_types != ipis.id_types {
            return Err(WrangleError::ColumnMismatch(format!(
                "{:?} table is keyed on {:?}, {:?} table on {:?}",
                ipis.family, ipis.id_columns, other.family, other.id_columns
            )));
        }
    }

    let press_index = index_by_key(presses);
    let response_index = index_by_key(responses);

    let mut records = Vec::with_capacity(ipis.len());
    for ipi in &ipis.rows {
        let key = (ipi.key.as_slice(), ipi.n);
        let (Some(press_rows), Some(response_rows)) =
            (press_index.get(&key), response_index.get(&key))
        else {
            continue;
        };

        for press in press_rows {
            for response in response_rows {
                records.push(EventRecord {
                    key: ipi.key.clone(),
                    ipi_number: ipi.label.clone(),
                    ipi_value: ipi.value,
                    n: ipi.n,
                    press_number: press.label.clone(),
                    press_value: press.value,
                    response_number: response.label.clone(),
                    response_value: response.value,
                    is_press_error: is_press_error(press.value, response.value),
                });
            }
        }
    }

    debug!(
        ipis = ipis.len(),
        presses = presses.len(),
        responses = responses.len(),
        events = records.len(),
        "joined measurement families"
    );

    Ok(EventTable {
        id_columns: ipis.id_columns.clone(),
        id_types: ipis.id_types.clone(),
        records,
    })
}

fn index_by_key(table: &LongTable) -> HashMap<(&[Value], usize), Vec<&LongRow>> {
    let mut index: HashMap<(&[Value], usize), Vec<&LongRow>> = HashMap::new();
    for row in &table.rows {
        index
            .entry((row.key.as_slice(), row.n))
            .or_default()
            .push(row);
    }
    index
}

/// Melt IPIs, presses and responses and join them into one event table
///
/// `trials` must already carry the IPI columns (see
/// [`add_ipi`](crate::features::add_ipi)). For `T` trials the result holds
/// `T * (sequence_length - 1)` events.
pub fn finger_melt(
    trials: &Table,
    id_columns: &[String],
    sequence_length: usize,
) -> Result<EventTable, WrangleError> {
    let ipis = melt_ipis(trials, id_columns, sequence_length)?;
    let presses = melt_presses(trials, id_columns, sequence_length)?;
    let responses = melt_responses(trials, id_columns, sequence_length)?;
    join_families(&ipis, &presses, &responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::add_ipi;
    use pretty_assertions::assert_eq;

    const L: usize = 7;

    fn ids() -> Vec<String> {
        vec!["TN".to_string(), "cue".to_string()]
    }

    /// Wide trials with press times `100 * k * tn`, presses `k` and the given responses
    fn wide(responses: &[[i64; L]]) -> Table {
        let mut schema = vec![
            ("TN".to_string(), ColumnType::Int),
            ("cue".to_string(), ColumnType::Str),
        ];
        for prefix in ["pressTime", "press", "response"] {
            schema.extend((1..=L).map(|k| (format!("{prefix}{k}"), ColumnType::Int)));
        }
        let mut table = Table::new(schema);

        for (t, resp) in responses.iter().enumerate() {
            let tn = t as i64 + 1;
            let mut row = vec![Value::Int(tn), Value::Str(format!("c{tn}"))];
            row.extend((1..=L as i64).map(|k| Value::Int(100 * k * tn)));
            row.extend((1..=L as i64).map(Value::Int));
            row.extend(resp.iter().map(|&r| Value::Int(r)));
            table.push_row(row).unwrap();
        }
        add_ipi(&table, L).unwrap()
    }

    const CORRECT: [i64; L] = [1, 2, 3, 4, 5, 6, 7];

    #[test]
    fn test_column_maps() {
        let ipi = ColumnMap::for_family(Family::Ipi, L);
        assert_eq!(ipi.entries().len(), 6);
        assert_eq!(ipi.entries()[0], MappedColumn { n: 2, column: "IPI1".to_string() });
        assert_eq!(ipi.column_for(7), Some("IPI6"));
        assert_eq!(ipi.column_for(1), None);

        let press = ColumnMap::for_family(Family::Press, L);
        assert_eq!(press.entries().len(), 7);
        assert_eq!(press.column_for(1), Some("press1"));
        assert_eq!(press.column_for(7), Some("press7"));

        let response = ColumnMap::for_family(Family::Response, L);
        assert_eq!(response.column_for(3), Some("response3"));
    }

    #[test]
    fn test_melt_cardinality_and_order() {
        let trials = wide(&[CORRECT, CORRECT, CORRECT]);

        let presses = melt_presses(&trials, &ids(), L).unwrap();
        assert_eq!(presses.len(), 3 * L);
        let first: Vec<(i64, usize)> = presses.rows()[..4]
            .iter()
            .map(|r| (r.key[0].as_i64().unwrap(), r.n))
            .collect();
        assert_eq!(first, vec![(1, 1), (2, 1), (3, 1), (1, 2)]);

        let ipis = melt_ipis(&trials, &ids(), L).unwrap();
        assert_eq!(ipis.len(), 3 * (L - 1));
        assert!(ipis.rows().iter().all(|r| (2..=L).contains(&r.n)));
        assert_eq!(ipis.rows()[0].label, "IPI1");
    }

    #[test]
    fn test_melt_ignores_press_time_columns() {
        let trials = wide(&[CORRECT]);
        let presses = melt_presses(&trials, &ids(), L).unwrap();
        assert!(presses.rows().iter().all(|r| !r.label.starts_with("pressTime")));
        assert_eq!(
            presses.rows().iter().map(|r| r.value).collect::<Vec<_>>(),
            CORRECT.to_vec()
        );
    }

    #[test]
    fn test_finger_melt_drops_first_index() {
        let trials = wide(&[CORRECT, CORRECT]);
        let events = finger_melt(&trials, &ids(), L).unwrap();

        assert_eq!(events.len(), 2 * (L - 1));
        assert!(events.records().iter().all(|e| e.n >= 2));
        assert!(events.records().iter().all(|e| !e.is_press_error));
    }

    #[test]
    fn test_ipi_aligns_with_terminating_press() {
        let trials = wide(&[CORRECT, CORRECT]);
        let events = finger_melt(&trials, &ids(), L).unwrap();

        // trial 2 presses at 200, 400, ... so every interval is 200
        let trial_two: Vec<&EventRecord> = events
            .records()
            .iter()
            .filter(|e| events.id_value(e, "TN") == Some(&Value::Int(2)))
            .collect();
        assert_eq!(trial_two.len(), L - 1);
        for event in trial_two {
            assert_eq!(event.ipi_value, 200);
            assert_eq!(event.ipi_number, format!("IPI{}", event.n - 1));
            assert_eq!(event.press_number, format!("press{}", event.n));
            assert_eq!(event.response_number, format!("response{}", event.n));
        }
    }

    #[test]
    fn test_press_error_flag() {
        let mut wrong = CORRECT;
        wrong[2] = 5;
        wrong[0] = 4;
        let trials = wide(&[wrong]);
        let events = finger_melt(&trials, &ids(), L).unwrap();

        let flagged: Vec<usize> = events
            .records()
            .iter()
            .filter(|e| e.is_press_error)
            .map(|e| e.n)
            .collect();
        // the mismatch at N = 1 is dropped with the first index
        assert_eq!(flagged, vec![3]);
        assert!(is_press_error(3, 5));
        assert!(!is_press_error(3, 3));
    }

    #[test]
    fn test_event_table_column_order() {
        let trials = wide(&[CORRECT]);
        let table = finger_melt(&trials, &ids(), L).unwrap().to_table().unwrap();
        assert_eq!(
            table.columns(),
            [
                "TN",
                "cue",
                "IPI_Number",
                "IPI_Value",
                "N",
                "Press_Number",
                "Press_Value",
                "Response_Number",
                "Response_Value",
                "isPressError",
            ]
        );
        assert_eq!(table.len(), L - 1);
        assert_eq!(table.get(0, "N"), Some(&Value::Int(2)));
        assert_eq!(table.get(0, "cue"), Some(&Value::from("c1")));
    }

    #[test]
    fn test_long_table_to_table() {
        let trials = wide(&[CORRECT]);
        let table = melt_ipis(&trials, &ids(), L).unwrap().to_table().unwrap();
        assert_eq!(table.columns(), ["TN", "cue", "IPI_Number", "IPI_Value", "N"]);
        assert_eq!(table.get(5, "IPI_Number"), Some(&Value::from("IPI6")));
        assert_eq!(table.get(5, "N"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_duplicate_keys_produce_all_combinations() {
        let trials = wide(&[CORRECT]);
        let mut both = trials.clone();
        both.push_row(trials.rows()[0].clone()).unwrap();

        let events = finger_melt(&both, &ids(), L).unwrap();
        assert_eq!(events.len(), 2 * 2 * 2 * (L - 1));
    }

    #[test]
    fn test_missing_measurement_column() {
        let trials = wide(&[CORRECT]);
        let result = finger_melt(&trials, &ids(), L + 1);
        assert!(matches!(result, Err(WrangleError::MissingColumn(_))));
    }

    #[test]
    fn test_missing_id_column() {
        let trials = wide(&[CORRECT]);
        let ids = vec!["TN".to_string(), "SubNum".to_string()];
        let result = finger_melt(&trials, &ids, L);
        assert!(matches!(result, Err(WrangleError::MissingColumn(c)) if c == "SubNum"));
    }

    #[test]
    fn test_join_rejects_mismatched_keys() {
        let trials = wide(&[CORRECT]);
        let ipis = melt_ipis(&trials, &ids(), L).unwrap();
        let presses = melt_presses(&trials, &["TN".to_string()], L).unwrap();
        let responses = melt_responses(&trials, &ids(), L).unwrap();

        let result = join_families(&ipis, &presses, &responses);
        assert!(matches!(result, Err(WrangleError::ColumnMismatch(_))));
    }

    #[test]
    fn test_join_rejects_swapped_families() {
        let trials = wide(&[CORRECT]);
        let ipis = melt_ipis(&trials, &ids(), L).unwrap();
        let presses = melt_presses(&trials, &ids(), L).unwrap();

        let result = join_families(&presses, &ipis, &presses);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_trials() {
        let trials = wide(&[]);
        let events = finger_melt(&trials, &ids(), L).unwrap();
        assert!(events.is_empty());
        assert_eq!(events.id_columns(), ids().as_slice());
    }
}
