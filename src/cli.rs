//! Command line surface: start-up configuration and the non-interactive
//! commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    Time,
};
use tracing::info;

use crate::application::{FormStore, Wizard, WizardEvent};
use crate::domain::{DriveDraft, Sighting, SightingFilter, SightingStatus, ValidationErrors};
use crate::infrastructure::{
    connect, AppConfig, BackendConfig, BackendMode, CsvExporter, ExportError, RepositoryError,
    DEFAULT_API_BASE, DEFAULT_LOG_FILE, DEFAULT_MOCK_LATENCY_MS, DEFAULT_STORE_PATH,
    DEFAULT_TIMEOUT_SECS,
};

#[derive(Debug, Parser)]
#[command(name = "pawhub", version, about = "Plan community animal welfare drives")]
pub struct Cli {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// File that receives the log output
    #[arg(long, env = "PAWHUB_LOG", default_value = DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct BackendArgs {
    /// Where drives are stored
    #[arg(long, env = "PAWHUB_BACKEND", value_enum, default_value_t = BackendMode::Memory, global = true)]
    pub backend: BackendMode,

    /// Base URL of the REST backend
    #[arg(long, env = "PAWHUB_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub api_base: String,

    /// Bearer token sent to the REST backend
    #[arg(long, env = "PAWHUB_API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    /// JSON file used by the file backend
    #[arg(long = "store", env = "PAWHUB_STORE", default_value = DEFAULT_STORE_PATH, global = true)]
    pub store_path: PathBuf,

    /// Simulated latency of the memory backend
    #[arg(long, env = "PAWHUB_MOCK_LATENCY_MS", default_value_t = DEFAULT_MOCK_LATENCY_MS, global = true)]
    pub mock_latency_ms: u64,

    /// Request timeout for the REST backend
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive wizard (the default)
    Wizard,
    /// Create a drive from a draft JSON file
    Create {
        #[arg(long)]
        draft: PathBuf,
    },
    /// Print a stored drive as JSON
    Show {
        id: String,
        /// Print the drive's KPI dashboard instead
        #[arg(long)]
        dashboard: bool,
    },
    /// Export field sightings to CSV
    ExportSightings(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// JSON array of sightings
    #[arg(long)]
    pub input: PathBuf,

    /// Target file; named after today's date when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Keep only these statuses (repeatable)
    #[arg(long = "status", value_parser = parse_status)]
    pub statuses: Vec<SightingStatus>,

    #[arg(long)]
    pub drive_id: Option<String>,

    #[arg(long)]
    pub search: Option<String>,

    /// Start of the time range, YYYY-MM-DD or RFC 3339
    #[arg(long, value_parser = parse_from)]
    pub from: Option<OffsetDateTime>,

    /// End of the time range (inclusive), YYYY-MM-DD or RFC 3339
    #[arg(long, value_parser = parse_to)]
    pub to: Option<OffsetDateTime>,
}

impl Cli {
    pub fn app_config(&self) -> AppConfig {
        let args = &self.backend;
        AppConfig {
            backend: BackendConfig {
                mode: args.backend,
                api_base: args.api_base.clone(),
                api_token: args.api_token.clone().filter(|t| !t.is_empty()),
                store_path: args.store_path.clone(),
                mock_latency: Duration::from_millis(args.mock_latency_ms),
                timeout: Duration::from_secs(args.timeout_secs),
            },
            log_file: self.log_file.clone(),
        }
    }
}

impl ExportArgs {
    pub fn filter(&self) -> SightingFilter {
        SightingFilter {
            from: self.from,
            to: self.to,
            statuses: self.statuses.clone(),
            drive_id: self.drive_id.clone(),
            search_query: self.search.clone(),
        }
    }
}

fn parse_status(value: &str) -> Result<SightingStatus, String> {
    match value.to_ascii_lowercase().as_str() {
        "active" => Ok(SightingStatus::Active),
        "sterilized" => Ok(SightingStatus::Sterilized),
        "resolved" => Ok(SightingStatus::Resolved),
        other => Err(format!(
            "unknown status `{}` (expected active, sterilized or resolved)",
            other
        )),
    }
}

fn parse_bound(value: &str, time_of_day: Time) -> Result<OffsetDateTime, String> {
    if let Ok(at) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(at);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map(|date| date.with_time(time_of_day).assume_utc())
        .map_err(|_| format!("`{}` is neither YYYY-MM-DD nor an RFC 3339 timestamp", value))
}

fn parse_from(value: &str) -> Result<OffsetDateTime, String> {
    parse_bound(value, Time::MIDNIGHT)
}

fn parse_to(value: &str) -> Result<OffsetDateTime, String> {
    let end_of_day = Time::from_hms_nano(23, 59, 59, 999_999_999).map_err(|e| e.to_string())?;
    parse_bound(value, end_of_day)
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Draft is not ready: {0}")]
    Invalid(String),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Drive creation failed: {0}")]
    Failed(String),

    #[error("No answer from the backend within {0:?}")]
    Timeout(Duration),

    #[error("Drive {0} not found")]
    NotFound(String),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn describe(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field.as_str(), message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sends a draft file through every step gate and creates the drive.
/// Returns the route of the new drive.
pub fn create_from_file(config: &BackendConfig, draft_path: &Path) -> Result<String, CliError> {
    let draft: DriveDraft = read_json(draft_path)?;
    let repository = connect(config)?;
    let mut wizard = Wizard::with_form(FormStore::with_draft(draft), repository);

    if !wizard.create() {
        return Err(CliError::Invalid(describe(wizard.form().errors())));
    }

    let timeout = config.timeout + config.mock_latency + Duration::from_secs(5);
    match wizard.wait(timeout) {
        Some(WizardEvent::Created { route, .. }) => Ok(route),
        Some(WizardEvent::Failed(message)) => Err(CliError::Failed(message)),
        None => Err(CliError::Timeout(timeout)),
    }
}

/// Fetches a drive, or its dashboard, and renders it as pretty JSON.
pub fn show_drive(config: &BackendConfig, id: &str, dashboard: bool) -> Result<String, CliError> {
    let repository = connect(config)?;
    let not_found = || CliError::NotFound(id.to_string());
    let json = if dashboard {
        serde_json::to_string_pretty(&repository.dashboard(id)?.ok_or_else(not_found)?)
    } else {
        serde_json::to_string_pretty(&repository.get(id)?.ok_or_else(not_found)?)
    };
    json.map_err(|e| CliError::Repository(e.into()))
}

/// Writes the CSV export and returns `(file name, rows written)`.
pub fn export_sightings(args: &ExportArgs) -> Result<(String, usize), CliError> {
    let sightings: Vec<Sighting> = read_json(&args.input)?;
    let filter = args.filter();
    let count = filter.apply(&sightings).len();
    let filtered = filter != SightingFilter::default();
    let today = OffsetDateTime::now_utc().date();

    let filename = match &args.output {
        Some(path) => path.to_string_lossy().into_owned(),
        None if filtered => CsvExporter::filtered_filename(today)?,
        None => CsvExporter::default_filename(today)?,
    };

    let written = if filtered {
        CsvExporter::export_filtered_to_csv(&sightings, &filter, &filename)?
    } else {
        CsvExporter::export_to_csv(&sightings, &filename)?
    };
    info!(file = %written, count, "sightings exported");
    Ok((written, count))
}
