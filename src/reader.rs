//! Trial-log reader
//!
//! Parses a subject's tab-delimited `.dat` log into a typed [`Table`].
//! Placeholder index columns are dropped, every column is an integer unless
//! the [`ColumnRules`] say otherwise, and any cell that cannot be coerced
//! aborts the read.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ColumnRules, WrangleConfig};
use crate::error::WrangleError;
use crate::table::{ColumnType, Table, Value};

/// Path of a subject's log: `<base_path>_<subject_id>.dat`
pub fn subject_path(base_path: &Path, subject_id: u32) -> PathBuf {
    let mut name = base_path.as_os_str().to_owned();
    name.push(format!("_{subject_id}.dat"));
    PathBuf::from(name)
}

/// Read and parse one `.dat` file
pub fn read_dat_file(path: &Path, rules: &ColumnRules) -> Result<Table, WrangleError> {
    let text = fs::read_to_string(path).map_err(|source| WrangleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_dat(&text, rules)?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "read trial log"
    );
    Ok(table)
}

/// Read the logs of several subjects, preserving the order of `subject_ids`
pub fn read_subjects(
    config: &WrangleConfig,
    subject_ids: &[u32],
) -> Result<Vec<Table>, WrangleError> {
    subject_ids
        .iter()
        .map(|&id| {
            let path = subject_path(&config.base_path, id);
            info!(subject = id, path = %path.display(), "reading subject");
            read_dat_file(&path, &config.columns)
        })
        .collect()
}

/// Parse the text of a `.dat` log
pub fn parse_dat(text: &str, rules: &ColumnRules) -> Result<Table, WrangleError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(WrangleError::EmptyFile)?;
    let header: Vec<&str> = header_line.split('\t').collect();
    let data: Vec<(usize, Vec<&str>)> = lines
        .map(|(number, line)| (number, line.split('\t').collect()))
        .collect();

    // A header one field short of every data row means the rows carry an
    // unnamed leading index.
    let implicit_index =
        !data.is_empty() && data.iter().all(|(_, fields)| fields.len() == header.len() + 1);
    let offset = usize::from(implicit_index);

    let kept: Vec<(usize, &str, CellRule)> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !is_placeholder(name))
        .map(|(idx, name)| {
            let name = name.trim();
            (idx + offset, name, cell_rule(name, rules))
        })
        .collect();

    let mut table = Table::new(kept.iter().map(|(_, name, rule)| (*name, rule.column_type())));

    for (number, fields) in &data {
        let expected = header.len() + offset;
        if fields.len() != expected {
            return Err(WrangleError::MalformedRow {
                line: *number,
                expected,
                found: fields.len(),
            });
        }

        let row = kept
            .iter()
            .map(|(idx, name, rule)| coerce(fields[*idx], name, *rule, *number))
            .collect::<Result<Vec<_>, _>>()?;
        table.push_row(row)?;
    }

    Ok(table)
}

fn is_placeholder(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with("Unnamed")
}

/// How a raw cell becomes a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellRule {
    Int,
    Float,
    Str,
    /// Parsed as an integer, stored as its decimal text (`"03"` -> `"3"`)
    IntAsText,
}

impl CellRule {
    fn column_type(&self) -> ColumnType {
        match self {
            CellRule::Int => ColumnType::Int,
            CellRule::Float => ColumnType::Float,
            CellRule::Str | CellRule::IntAsText => ColumnType::Str,
        }
    }
}

fn cell_rule(name: &str, rules: &ColumnRules) -> CellRule {
    if rules.is_float(name) {
        CellRule::Float
    } else if rules.is_int_text(name) {
        CellRule::IntAsText
    } else if rules.is_text(name) {
        CellRule::Str
    } else {
        CellRule::Int
    }
}

fn coerce(raw: &str, column: &str, rule: CellRule, line: usize) -> Result<Value, WrangleError> {
    let trimmed = raw.trim();
    let failed = |expected: &'static str| WrangleError::TypeCoercion {
        column: column.to_string(),
        line,
        value: raw.to_string(),
        expected,
    };

    match rule {
        CellRule::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| failed("int")),
        CellRule::IntAsText => trimmed
            .parse::<i64>()
            .map(|n| Value::Str(n.to_string()))
            .map_err(|_| failed("int")),
        CellRule::Float if trimmed.is_empty() => Ok(Value::Float(f64::NAN)),
        CellRule::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| failed("float")),
        CellRule::Str => Ok(Value::Str(trimmed.to_string())),
    }
}
