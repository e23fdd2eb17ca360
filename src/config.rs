//! Pipeline configuration
//!
//! Paths, the sequence length and the column typing rules used by the reader
//! and reshaper. The experiment parameters are carried for downstream
//! analysis code; nothing in this crate changes behaviour based on them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::WrangleError;

/// Number of key presses per trial in the sequence task
pub const DEFAULT_SEQUENCE_LENGTH: usize = 7;

/// Identifying columns carried onto every event row by the reshaper
pub const DEFAULT_ID_COLUMNS: [&str; 16] = [
    "BN",
    "TN",
    "SubNum",
    "hand",
    "isTrain",
    "isChanged",
    "symbol",
    "cue",
    "isMasked",
    "digitChangePos",
    "digitChangeValue",
    "windowSize",
    "isError",
    "timingError",
    "isCross",
    "crossTime",
];

/// Configuration for a wrangling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrangleConfig {
    /// Prefix of the per-subject log files (`<base_path>_<subject>.dat`)
    pub base_path: PathBuf,
    /// Directory holding auxiliary session files
    pub misc_path: PathBuf,
    /// Measurements per trial (presses, responses, press times)
    pub sequence_length: usize,
    /// Columns identifying a trial in the long event table
    pub id_columns: Vec<String>,
    /// Typing rules applied by the reader
    pub columns: ColumnRules,
    /// Task parameters of the recording session
    pub experiment: ExperimentParams,
}

impl Default for WrangleConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./SMSH1_last_session/SequenceMemorySensoryHorizon"),
            misc_path: PathBuf::from("./SMSH1_miscs/"),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            id_columns: DEFAULT_ID_COLUMNS.iter().map(|c| c.to_string()).collect(),
            columns: ColumnRules::default(),
            experiment: ExperimentParams::default(),
        }
    }
}

impl WrangleConfig {
    /// Parse a configuration from JSON; omitted fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, WrangleError> {
        let config: WrangleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self, WrangleError> {
        let json = fs::read_to_string(path).map_err(|source| WrangleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, WrangleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn validate(&self) -> Result<(), WrangleError> {
        if self.sequence_length < 2 {
            return Err(WrangleError::Config(format!(
                "sequence_length must be at least 2, got {}",
                self.sequence_length
            )));
        }
        if self.id_columns.is_empty() {
            return Err(WrangleError::Config("id_columns is empty".to_string()));
        }
        if let Some(col) = self
            .columns
            .float_columns
            .iter()
            .find(|c| self.columns.string_columns.contains(c) || self.columns.text_columns.contains(c))
        {
            return Err(WrangleError::Config(format!(
                "column '{col}' is declared both float and string"
            )));
        }
        Ok(())
    }
}

/// Column typing rules for `.dat` trial logs
///
/// Every column not named here is read as an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    /// Floating-point timing thresholds
    pub float_columns: Vec<String>,
    /// Free-text columns
    pub string_columns: Vec<String>,
    /// Integer columns converted to their decimal text after parsing
    pub text_columns: Vec<String>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            float_columns: vec!["timeThreshold".to_string(), "timeThresholdSuper".to_string()],
            string_columns: vec!["symbol".to_string()],
            text_columns: vec!["cue".to_string()],
        }
    }
}

impl ColumnRules {
    pub fn is_float(&self, column: &str) -> bool {
        self.float_columns.iter().any(|c| c == column)
    }

    /// Integer-valued columns stored as text (`"03"` is read as `"3"`)
    pub fn is_int_text(&self, column: &str) -> bool {
        self.text_columns.iter().any(|c| c == column)
    }

    pub fn is_text(&self, column: &str) -> bool {
        self.string_columns.iter().any(|c| c == column)
            || self.text_columns.iter().any(|c| c == column)
    }
}

/// Parameters of the recorded task session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentParams {
    /// Labels of the response fingers
    pub fingers: Vec<String>,
    /// Sequence positions at which a digit may change
    pub digit_change: Vec<u32>,
    /// Inter-trial interval (ms)
    pub iti_ms: u64,
    /// Maximum execution time per trial (ms)
    pub exec_time_ms: u64,
    /// Planning window before movement onset (ms)
    pub precue_time_interval_ms: (u64, u64),
    /// Hand code (1 = left, 2 = right)
    pub hand: u8,
}

impl Default for ExperimentParams {
    fn default() -> Self {
        Self {
            fingers: ["1", "2", "3", "4", "5"].iter().map(|f| f.to_string()).collect(),
            digit_change: vec![2, 3, 4],
            iti_ms: 3000,
            exec_time_ms: 10000,
            precue_time_interval_ms: (600, 1000),
            hand: 2,
        }
    }
}
