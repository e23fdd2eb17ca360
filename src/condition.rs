//! Experimental condition classification
//!
//! A trial's condition follows from three flags, checked in priority order:
//! untrained sequences are sensory-only, trained-and-masked sequences are
//! memory-only, and trained unmasked sequences combine memory with the
//! sensory cue (with or without a changed digit).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WrangleError;
use crate::table::{ColumnType, Table, Value};

pub const IS_TRAIN: &str = "isTrain";
pub const IS_MASKED: &str = "isMasked";
pub const IS_CHANGED: &str = "isChanged";

/// Default name of the appended label column
pub const CONDITION_COLUMN: &str = "condition";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Sensory")]
    Sensory,
    #[serde(rename = "Memory")]
    Memory,
    #[serde(rename = "Memory+Sensory")]
    MemorySensory,
    #[serde(rename = "Memory+Sensory-changed")]
    MemorySensoryChanged,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Sensory,
        Condition::Memory,
        Condition::MemorySensory,
        Condition::MemorySensoryChanged,
    ];

    pub fn classify(is_train: bool, is_masked: bool, is_changed: bool) -> Self {
        if !is_train {
            Condition::Sensory
        } else if is_masked {
            Condition::Memory
        } else if is_changed {
            Condition::MemorySensoryChanged
        } else {
            Condition::MemorySensory
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Sensory => "Sensory",
            Condition::Memory => "Memory",
            Condition::MemorySensory => "Memory+Sensory",
            Condition::MemorySensoryChanged => "Memory+Sensory-changed",
        }
    }

    /// Compact code used on plot axes
    pub fn short_code(&self) -> &'static str {
        match self {
            Condition::Sensory => "S",
            Condition::Memory => "M",
            Condition::MemorySensory => "M+S",
            Condition::MemorySensoryChanged => "M+S (changed)",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Condition of row `row` of a trial or event table
pub fn seq_condition(table: &Table, row: usize) -> Result<Condition, WrangleError> {
    let flag = |name: &str| -> Result<bool, WrangleError> {
        table.require_column(name)?;
        table
            .get(row, name)
            .map(Value::is_set)
            .ok_or_else(|| WrangleError::ColumnMismatch(format!("no row {row}")))
    };
    Ok(Condition::classify(
        flag(IS_TRAIN)?,
        flag(IS_MASKED)?,
        flag(IS_CHANGED)?,
    ))
}

/// Copy of `table` with a string column `name` holding each row's condition label
pub fn add_condition_column(table: &Table, name: &str) -> Result<Table, WrangleError> {
    let labels = (0..table.len())
        .map(|row| seq_condition(table, row).map(|c| Value::from(c.label())))
        .collect::<Result<Vec<_>, _>>()?;
    if labels.is_empty() {
        for column in [IS_TRAIN, IS_MASKED, IS_CHANGED] {
            table.require_column(column)?;
        }
    }
    table.with_column(name, ColumnType::Str, labels)
}

/// Number of rows in each condition, in [`Condition::ALL`] order
///
/// Fails when a flag column is missing, even for an empty table.
pub fn condition_counts(table: &Table) -> Result<Vec<(Condition, usize)>, WrangleError> {
    for column in [IS_TRAIN, IS_MASKED, IS_CHANGED] {
        table.require_column(column)?;
    }
    let labels = (0..table.len())
        .map(|row| seq_condition(table, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Condition::ALL
        .iter()
        .map(|&c| (c, labels.iter().filter(|&&l| l == c).count()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flags_table(rows: &[(i64, i64, i64)]) -> Table {
        let mut table = Table::new([
            (IS_TRAIN, ColumnType::Int),
            (IS_MASKED, ColumnType::Int),
            (IS_CHANGED, ColumnType::Int),
        ]);
        for &(train, masked, changed) in rows {
            table
                .push_row(vec![Value::Int(train), Value::Int(masked), Value::Int(changed)])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_documented_cases() {
        assert_eq!(Condition::classify(false, true, true), Condition::Sensory);
        assert_eq!(Condition::classify(true, true, false), Condition::Memory);
        assert_eq!(
            Condition::classify(true, false, true),
            Condition::MemorySensoryChanged
        );
        assert_eq!(Condition::classify(true, false, false), Condition::MemorySensory);
    }

    #[test]
    fn test_truth_table_is_total() {
        let mut seen = Vec::new();
        for train in [false, true] {
            for masked in [false, true] {
                for changed in [false, true] {
                    let condition = Condition::classify(train, masked, changed);
                    assert!(Condition::ALL.contains(&condition));
                    if !train {
                        assert_eq!(condition, Condition::Sensory);
                    }
                    seen.push(condition);
                }
            }
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen, Condition::ALL.to_vec());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Condition::MemorySensoryChanged.to_string(), "Memory+Sensory-changed");
        assert_eq!(Condition::MemorySensoryChanged.short_code(), "M+S (changed)");
        assert_eq!(
            serde_json::to_string(&Condition::MemorySensory).unwrap(),
            r#""Memory+Sensory""#
        );
    }

    #[test]
    fn test_seq_condition_reads_flags() {
        let table = flags_table(&[(0, 1, 1), (1, 1, 0), (1, 0, 1), (1, 0, 0)]);
        let conditions: Vec<Condition> = (0..table.len())
            .map(|row| seq_condition(&table, row).unwrap())
            .collect();
        assert_eq!(
            conditions,
            vec![
                Condition::Sensory,
                Condition::Memory,
                Condition::MemorySensoryChanged,
                Condition::MemorySensory,
            ]
        );
    }

    #[test]
    fn test_add_condition_column() {
        let table = flags_table(&[(0, 0, 0), (1, 1, 1)]);
        let labelled = add_condition_column(&table, CONDITION_COLUMN).unwrap();
        assert_eq!(labelled.get(0, CONDITION_COLUMN), Some(&Value::from("Sensory")));
        assert_eq!(labelled.get(1, CONDITION_COLUMN), Some(&Value::from("Memory")));
    }

    #[test]
    fn test_condition_counts() {
        let table = flags_table(&[(0, 0, 0), (1, 1, 0), (0, 1, 1), (1, 0, 0)]);
        assert_eq!(
            condition_counts(&table).unwrap(),
            vec![
                (Condition::Sensory, 2),
                (Condition::Memory, 1),
                (Condition::MemorySensory, 1),
                (Condition::MemorySensoryChanged, 0),
            ]
        );
    }

    #[test]
    fn test_condition_counts_missing_flag() {
        let table = Table::new([(IS_TRAIN, ColumnType::Int), (IS_MASKED, ColumnType::Int)]);
        assert!(matches!(
            condition_counts(&table),
            Err(WrangleError::MissingColumn(c)) if c == IS_CHANGED
        ));
    }

    #[test]
    fn test_missing_flag_column() {
        let table = Table::new([(IS_TRAIN, ColumnType::Int)]);
        assert!(matches!(
            add_condition_column(&table, CONDITION_COLUMN),
            Err(WrangleError::MissingColumn(_))
        ));
    }
}
