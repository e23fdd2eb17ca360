//! SMSH Wrangle - trial-log wrangling for the sequence memory / sensory horizon task
//!
//! Subjects type remembered or cued finger sequences; the recorder writes one
//! tab-delimited `.dat` log per subject with one row per trial. This crate
//! turns those logs into long event tables for statistical analysis through
//! a one-way pipeline: reading → trial filtering → inter-press interval
//! derivation → reshaping into (trial, N) events.
//!
//! ## Modules
//!
//! - **reader**: typed parsing of `.dat` logs
//! - **filter**: error-trial and error-press filters
//! - **features**: inter-press intervals
//! - **reshape**: melting of IPIs, presses and responses and their join
//! - **condition**: Sensory / Memory / Memory+Sensory condition labels

pub mod condition;
pub mod config;
pub mod error;
pub mod features;
pub mod filter;
pub mod pipeline;
pub mod reader;
pub mod reshape;
pub mod table;

pub use condition::{add_condition_column, condition_counts, seq_condition, Condition};
pub use config::{ColumnRules, ExperimentParams, WrangleConfig};
pub use error::WrangleError;
pub use features::{add_ipi, interpress_intervals};
pub use filter::{
    remove_error_presses, remove_error_trials, remove_error_trials_presses,
    try_remove_error_presses, try_remove_error_trials, try_remove_error_trials_presses,
};
pub use pipeline::{subject_to_events, SessionProcessor};
pub use reader::{parse_dat, read_dat_file, read_subjects, subject_path};
pub use reshape::{finger_melt, join_families, melt, EventRecord, EventTable, Family};
pub use table::{ColumnType, Table, Value};

/// Crate version
pub const WRANGLE_VERSION: &str = env!("CARGO_PKG_VERSION");
