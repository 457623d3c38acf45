//! Engage CLI - Command-line interface for Synheart Engage
//!
//! Commands:
//! - replay: Replay a recorded interaction trace and print emitted events
//! - score: Compute an engagement score from raw signals
//! - normalize: Normalize a strategy-scoring response into ranked candidates
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_engage::recommend::{RecommendationAdapter, RecommendationQuery, Strategy};
use synheart_engage::tracking::scorer::{
    completed_reading, engagement_score, engagement_score_percent,
};
use synheart_engage::tracking::SessionType;
use synheart_engage::{parse_trace, replay_trace, EngageError, TrackerConfig};
use synheart_engage::{ENGAGE_VERSION, PRODUCER_NAME};

/// Engage - Reading-engagement tracker and recommendation tooling
#[derive(Parser)]
#[command(name = "engage")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGAGE_VERSION)]
#[command(about = "Replay interaction traces and inspect engagement signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded interaction trace
    Replay {
        /// Trace file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Tracker config JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Print the full replay report instead of just the events
        #[arg(long)]
        report: bool,
    },

    /// Compute an engagement score
    Score {
        /// Time spent on the page in milliseconds
        #[arg(long)]
        time_ms: u64,

        /// Maximum scroll depth, 0-100
        #[arg(long)]
        depth: u8,

        /// Reading velocity in samples per second
        #[arg(long, default_value = "0")]
        velocity: f64,
    },

    /// Normalize a strategy-scoring response
    Normalize {
        /// Response file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Strategy that was requested
        #[arg(long, default_value = "hybrid")]
        strategy: String,

        /// Maximum candidates to keep
        #[arg(long, default_value = "5")]
        limit: i32,

        /// Leave reasons empty when the response has none
        #[arg(long)]
        no_explanation: bool,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Tracker config JSON to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EngageCliError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            output_format,
            report,
        } => cmd_replay(&input, config.as_deref(), output_format, report),

        Commands::Score {
            time_ms,
            depth,
            velocity,
        } => cmd_score(time_ms, depth, velocity),

        Commands::Normalize {
            input,
            strategy,
            limit,
            no_explanation,
            output_format,
        } => cmd_normalize(&input, &strategy, limit, !no_explanation, output_format),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, EngageCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(EngageCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig, EngageCliError> {
    match path {
        Some(path) => Ok(TrackerConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(TrackerConfig::default()),
    }
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    output_format: OutputFormat,
    report: bool,
) -> Result<(), EngageCliError> {
    let config = load_config(config)?;
    let trace = parse_trace(&read_input(input)?)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let replay = runtime.block_on(replay_trace(&trace, &config))?;

    if report {
        print!("{}", format_output(std::slice::from_ref(&replay), &output_format)?);
    } else {
        print!("{}", format_output(&replay.events, &output_format)?);
    }
    Ok(())
}

fn cmd_score(time_ms: u64, depth: u8, velocity: f64) -> Result<(), EngageCliError> {
    if depth > 100 {
        return Err(EngageCliError::InvalidArgument(format!(
            "depth must be 0-100, got {}",
            depth
        )));
    }

    let score = engagement_score(time_ms, depth, velocity);
    let report = ScoreReport {
        engagement_score: score,
        engagement_percent: engagement_score_percent(score),
        completed_reading: completed_reading(time_ms, depth),
        session_type: SessionType::from_elapsed(time_ms),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_normalize(
    input: &Path,
    strategy: &str,
    limit: i32,
    include_explanation: bool,
    output_format: OutputFormat,
) -> Result<(), EngageCliError> {
    let strategy: Strategy = strategy.parse()?;
    let raw = RecommendationAdapter::parse_response(&read_input(input)?)?;
    if raw.is_empty() {
        return Err(EngageCliError::NoRecommendations);
    }

    let query = RecommendationQuery::general_feed(strategy)
        .with_limit(limit)
        .with_explanation(include_explanation);
    let candidates = RecommendationAdapter::normalize(raw, &query);
    print!("{}", format_output(&candidates, &output_format)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), EngageCliError> {
    let mut checks = Vec::new();

    let config_check = match config {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        },
        Some(path) => match load_config(Some(path)) {
            Ok(cfg) if cfg.heartbeat_interval_ms == 0 => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Heartbeat disabled; reading time is only reported on hide and teardown"
                    .to_string(),
            },
            Ok(cfg) if !cfg.enabled => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Tracking is disabled".to_string(),
            },
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} is valid", path.display()),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            },
        },
    };
    checks.push(config_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is piped (trace input available)".to_string(),
        }
    };
    checks.push(stdin_check);

    let has_errors = checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGAGE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Engage Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "✓",
                CheckStatus::Warning => "⚠",
                CheckStatus::Error => "✗",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if has_errors {
        return Err(EngageCliError::DoctorFailed);
    }
    Ok(())
}

fn format_output<T: serde::Serialize>(
    records: &[T],
    format: &OutputFormat,
) -> Result<String, EngageCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)? + "\n"),
    }
}

#[derive(Debug)]
enum EngageCliError {
    Io(io::Error),
    Engage(EngageError),
    Json(serde_json::Error),
    NoInput,
    NoRecommendations,
    InvalidArgument(String),
    DoctorFailed,
}

impl From<io::Error> for EngageCliError {
    fn from(e: io::Error) -> Self {
        EngageCliError::Io(e)
    }
}

impl From<EngageError> for EngageCliError {
    fn from(e: EngageError) -> Self {
        EngageCliError::Engage(e)
    }
}

impl From<serde_json::Error> for EngageCliError {
    fn from(e: serde_json::Error) -> Self {
        EngageCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EngageCliError> for CliError {
    fn from(e: EngageCliError) -> Self {
        match e {
            EngageCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EngageCliError::Engage(EngageError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'engage doctor --config <file>' for details".to_string()),
            },
            EngageCliError::Engage(EngageError::UnknownStrategy(name)) => CliError {
                code: "UNKNOWN_STRATEGY".to_string(),
                message: format!("Unknown strategy: {}", name),
                hint: Some(
                    "Use content_based, collaborative, personalized, trending or hybrid".to_string(),
                ),
            },
            EngageCliError::Engage(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the expected trace or response shape".to_string()),
            },
            EngageCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EngageCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "Refusing to read from an interactive terminal".to_string(),
                hint: Some("Pipe a file into stdin or pass --input <file>".to_string()),
            },
            EngageCliError::NoRecommendations => CliError {
                code: "NO_RECOMMENDATIONS".to_string(),
                message: "Response contains no recommendations".to_string(),
                hint: None,
            },
            EngageCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
            EngageCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ScoreReport {
    engagement_score: f64,
    engagement_percent: u8,
    completed_reading: bool,
    session_type: SessionType,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
