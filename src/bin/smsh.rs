//! SMSH CLI - command-line interface for trial-log wrangling
//!
//! Commands:
//! - melt: run subjects through the pipeline and write event tables
//! - inspect: summarize one trial log
//! - config: print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use smsh_wrangle::filter::{remove_error_trials, IS_ERROR, TIMING_ERROR};
use smsh_wrangle::{
    condition_counts, read_dat_file, SessionProcessor, WrangleConfig, WRANGLE_VERSION,
};

/// smsh - reshape sequence-task trial logs into event tables
#[derive(Parser)]
#[command(name = "smsh")]
#[command(version = WRANGLE_VERSION)]
#[command(about = "Reshape sequence-task trial logs into event tables", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, derive IPIs and melt subjects into one event table each
    Melt {
        /// Subject ids, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        subjects: Vec<u32>,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the log file prefix
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "tsv")]
        format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Summarize a single trial log
    Inspect {
        /// Input .dat file
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Tab-delimited with a header row
    Tsv,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

fn run(cli: Cli) -> Result<(), SmshCliError> {
    match cli.command {
        Commands::Melt {
            subjects,
            config,
            base_path,
            format,
            output,
        } => cmd_melt(&subjects, config.as_deref(), base_path, format, &output),

        Commands::Inspect {
            input,
            config,
            json,
        } => cmd_inspect(&input, config.as_deref(), json),

        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<WrangleConfig, SmshCliError> {
    match path {
        Some(path) => Ok(WrangleConfig::from_file(path)?),
        None => Ok(WrangleConfig::default()),
    }
}

fn cmd_melt(
    subjects: &[u32],
    config: Option<&Path>,
    base_path: Option<PathBuf>,
    format: OutputFormat,
    output: &Path,
) -> Result<(), SmshCliError> {
    let mut config = load_config(config)?;
    if let Some(base_path) = base_path {
        config.base_path = base_path;
    }

    let processor = SessionProcessor::new(config)?;
    let per_subject = processor.process_subjects(subjects)?;

    let mut out = String::new();
    for (idx, events) in per_subject.iter().enumerate() {
        let table = events.to_table()?;
        match format {
            OutputFormat::Tsv => {
                let tsv = table.to_tsv();
                // one header for the whole output
                let body = if idx == 0 {
                    tsv.as_str()
                } else {
                    tsv.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
                };
                out.push_str(body);
            }
            OutputFormat::Ndjson => {
                for row in table.iter() {
                    out.push_str(&serde_json::to_string(&row)?);
                    out.push('\n');
                }
            }
        }
    }

    info!(subjects = subjects.len(), "writing events");
    if output.to_string_lossy() == "-" {
        print!("{out}");
    } else {
        fs::write(output, out)?;
    }

    Ok(())
}

fn cmd_inspect(input: &Path, config: Option<&Path>, json: bool) -> Result<(), SmshCliError> {
    let config = load_config(config)?;
    let trials = read_dat_file(input, &config.columns)?;

    let count_set = |column: &str| {
        trials
            .iter()
            .filter(|row| row.get(column).is_some_and(|v| v.is_set()))
            .count()
    };

    // the report stays useful without condition flags
    let conditions = match condition_counts(&trials) {
        Ok(counts) => counts
            .into_iter()
            .map(|(c, n)| ConditionCount {
                condition: c.label().to_string(),
                trials: n,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "cannot classify trial conditions");
            Vec::new()
        }
    };

    let report = InspectReport {
        path: input.display().to_string(),
        columns: trials
            .columns()
            .iter()
            .zip(trials.column_types())
            .map(|(name, ty)| ColumnReport {
                name: name.clone(),
                column_type: ty.as_str().to_string(),
            })
            .collect(),
        trials: trials.len(),
        error_trials: count_set(IS_ERROR),
        timing_errors: count_set(TIMING_ERROR),
        clean_trials: remove_error_trials(&trials).len(),
        conditions,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Trial Log Report");
        println!("================");
        println!("File:          {}", report.path);
        println!("Columns:       {}", report.columns.len());
        println!("Trials:        {}", report.trials);
        println!("Error trials:  {}", report.error_trials);
        println!("Timing errors: {}", report.timing_errors);
        println!("Clean trials:  {}", report.clean_trials);

        if !report.conditions.is_empty() {
            println!("\nConditions:");
            for c in &report.conditions {
                println!("  {:<24} {}", c.condition, c.trials);
            }
        }
    }

    Ok(())
}

fn cmd_config(config: Option<&Path>) -> Result<(), SmshCliError> {
    let config = load_config(config)?;
    println!("{}", config.to_json()?);
    Ok(())
}

// Error types

#[derive(Debug)]
enum SmshCliError {
    Io(std::io::Error),
    Wrangle(smsh_wrangle::WrangleError),
    Json(serde_json::Error),
}

impl From<std::io::Error> for SmshCliError {
    fn from(e: std::io::Error) -> Self {
        SmshCliError::Io(e)
    }
}

impl From<smsh_wrangle::WrangleError> for SmshCliError {
    fn from(e: smsh_wrangle::WrangleError) -> Self {
        SmshCliError::Wrangle(e)
    }
}

impl From<serde_json::Error> for SmshCliError {
    fn from(e: serde_json::Error) -> Self {
        SmshCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SmshCliError> for CliError {
    fn from(e: SmshCliError) -> Self {
        use smsh_wrangle::WrangleError;

        match e {
            SmshCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SmshCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            SmshCliError::Wrangle(e) => {
                let (code, hint) = match &e {
                    WrangleError::Io { .. } => {
                        ("IO_ERROR", Some("Check --base-path and the subject ids"))
                    }
                    WrangleError::EmptyFile
                    | WrangleError::MalformedRow { .. }
                    | WrangleError::TypeCoercion { .. } => {
                        ("PARSE_ERROR", Some("Ensure the log is a tab-delimited .dat file"))
                    }
                    WrangleError::MissingColumn(_) | WrangleError::ColumnMismatch(_) => (
                        "COLUMN_ERROR",
                        Some("Check sequence_length and id_columns against the log header"),
                    ),
                    WrangleError::Config(_) | WrangleError::Json(_) => {
                        ("CONFIG_ERROR", Some("Run 'smsh config' to see a valid configuration"))
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    path: String,
    columns: Vec<ColumnReport>,
    trials: usize,
    error_trials: usize,
    timing_errors: usize,
    clean_trials: usize,
    conditions: Vec<ConditionCount>,
}

#[derive(serde::Serialize)]
struct ColumnReport {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

#[derive(serde::Serialize)]
struct ConditionCount {
    condition: String,
    trials: usize,
}
