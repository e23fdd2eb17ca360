//! Pipeline orchestration
//!
//! Runs a subject's trial log through every stage:
//! 1. reader - parse the `.dat` file
//! 2. filter - drop erroneous and mistimed trials
//! 3. features - append inter-press intervals
//! 4. reshape - melt and join into one event table

use tracing::info;

use crate::config::WrangleConfig;
use crate::error::WrangleError;
use crate::features::add_ipi;
use crate::filter::try_remove_error_trials;
use crate::reader::{read_dat_file, subject_path};
use crate::reshape::{finger_melt, EventTable};
use crate::table::Table;

/// Read one subject's log and reshape it into events (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let events = subject_to_events(&WrangleConfig::default(), 12)?;
/// ```
pub fn subject_to_events(
    config: &WrangleConfig,
    subject_id: u32,
) -> Result<EventTable, WrangleError> {
    SessionProcessor::new(config.clone())?.process_subject(subject_id)
}

/// Processor bound to one configuration
#[derive(Debug, Clone)]
pub struct SessionProcessor {
    config: WrangleConfig,
}

impl Default for SessionProcessor {
    fn default() -> Self {
        Self {
            config: WrangleConfig::default(),
        }
    }
}

impl SessionProcessor {
    /// Create a processor, rejecting an invalid configuration
    pub fn new(config: WrangleConfig) -> Result<Self, WrangleError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WrangleConfig {
        &self.config
    }

    /// Filter, derive IPIs and reshape an already-loaded trial table
    pub fn process_table(&self, trials: &Table) -> Result<EventTable, WrangleError> {
        let clean = try_remove_error_trials(trials)?;
        let with_ipi = add_ipi(&clean, self.config.sequence_length)?;
        finger_melt(&with_ipi, &self.config.id_columns, self.config.sequence_length)
    }

    pub fn process_subject(&self, subject_id: u32) -> Result<EventTable, WrangleError> {
        let path = subject_path(&self.config.base_path, subject_id);
        let trials = read_dat_file(&path, &self.config.columns)?;
        let events = self.process_table(&trials)?;
        info!(
            subject = subject_id,
            trials = trials.len(),
            events = events.len(),
            "processed subject"
        );
        Ok(events)
    }

    /// Process subjects in order; the first failure aborts the run
    pub fn process_subjects(&self, subject_ids: &[u32]) -> Result<Vec<EventTable>, WrangleError> {
        subject_ids
            .iter()
            .map(|&id| self.process_subject(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ID_COLUMNS;
    use crate::table::Value;
    use std::fs;
    use std::path::PathBuf;

    /// A log in the recorder's layout: unnamed index column first
    fn sample_log(subject: u32, trials: &[(i64, i64, i64)]) -> String {
        let mut header = vec![String::new()];
        header.extend(DEFAULT_ID_COLUMNS.iter().map(|c| c.to_string()));
        header.extend(["timeThreshold", "timeThresholdSuper"].map(String::from));
        for prefix in ["pressTime", "press", "response"] {
            header.extend((1..=7).map(|k| format!("{prefix}{k}")));
        }

        let mut text = header.join("\t");
        text.push('\n');
        for (idx, &(tn, is_error, timing_error)) in trials.iter().enumerate() {
            let mut fields: Vec<String> = vec![
                idx.to_string(),
                "1".into(),             // BN
                tn.to_string(),         // TN
                subject.to_string(),    // SubNum
                "2".into(),             // hand
                "1".into(),             // isTrain
                "0".into(),             // isChanged
                "A".into(),             // symbol
                "3".into(),             // cue
                "0".into(),             // isMasked
                "0".into(),             // digitChangePos
                "0".into(),             // digitChangeValue
                "7".into(),             // windowSize
                is_error.to_string(),   // isError
                timing_error.to_string(), // timingError
                "0".into(),             // isCross
                "0".into(),             // crossTime
                "1.5".into(),
                "2.5".into(),
            ];
            fields.extend((0..7).map(|k| (1000 + 150 * k).to_string()));
            fields.extend((1..=7).map(|k| k.to_string()));
            fields.extend((1..=7).map(|k| k.to_string()));
            text.push_str(&fields.join("\t"));
            text.push('\n');
        }
        text
    }

    fn temp_base() -> PathBuf {
        std::env::temp_dir().join(format!("smsh-pipeline-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_process_subject() {
        let base = temp_base();
        let path = subject_path(&base, 4);
        fs::write(&path, sample_log(4, &[(1, 0, 0), (2, 1, 0), (3, 0, 1), (4, 0, 0)])).unwrap();

        let config = WrangleConfig::default().with_base_path(&base);
        let events = subject_to_events(&config, 4).unwrap();

        // two clean trials, six events each
        assert_eq!(events.len(), 2 * 6);
        assert!(events.records().iter().all(|e| e.ipi_value == 150));
        assert!(events.records().iter().all(|e| !e.is_press_error));
        let first = &events.records()[0];
        assert_eq!(events.id_value(first, "cue"), Some(&Value::from("3")));
        assert_eq!(events.id_value(first, "SubNum"), Some(&Value::Int(4)));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_process_subjects_preserves_order() {
        let base = temp_base();
        for id in [7u32, 2] {
            fs::write(subject_path(&base, id), sample_log(id, &[(1, 0, 0)])).unwrap();
        }

        let processor =
            SessionProcessor::new(WrangleConfig::default().with_base_path(&base)).unwrap();
        let all = processor.process_subjects(&[7, 2]).unwrap();

        let subjects: Vec<&Value> = all
            .iter()
            .map(|events| events.id_value(&events.records()[0], "SubNum").unwrap())
            .collect();
        assert_eq!(subjects, vec![&Value::Int(7), &Value::Int(2)]);

        for id in [7u32, 2] {
            let _ = fs::remove_file(subject_path(&base, id));
        }
    }

    #[test]
    fn test_missing_subject_fails() {
        let processor =
            SessionProcessor::new(WrangleConfig::default().with_base_path(temp_base())).unwrap();
        assert!(matches!(
            processor.process_subject(1),
            Err(WrangleError::Io { .. })
        ));
    }

    #[test]
    fn test_missing_filter_flag_is_an_error() {
        let mut trials = Table::new([("TN", crate::table::ColumnType::Int)]);
        trials.push_row(vec![Value::Int(1)]).unwrap();

        let result = SessionProcessor::default().process_table(&trials);
        assert!(matches!(result, Err(WrangleError::MissingColumn(c)) if c == "isError"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WrangleConfig {
            sequence_length: 0,
            ..WrangleConfig::default()
        };
        assert!(SessionProcessor::new(config).is_err());
    }
}
