//! lab-roster: weekly lab shift scheduling from staff availability.
//!
//! Commands:
//! - `generate` — build the schedule for a date range and write it out
//! - `web`      — serve the schedule over HTTP and accept new uploads

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use lab_roster::calendar::resolve_range;
use lab_roster::config::{AppConfig, DEFAULT_CONFIG_FILE};
use lab_roster::display::{
    print_schedule, write_schedule_csv, write_schedule_json, write_schedule_xlsx,
};
use lab_roster::logging;
use lab_roster::parser::{discover_source, load_roster};
use lab_roster::schedule::{generate_schedule, GeneratedSchedule, Roster};
use lab_roster::web::{start_server, AppState};

#[derive(Parser)]
#[command(name = "lab-roster", about = "Lab shift roster generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to roster.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the schedule and write it to a file
    Generate {
        /// Availability CSV; discovered in the current directory if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// First date to schedule (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last date to schedule (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Output file, overriding the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "xlsx")]
        format: OutputFormat,

        /// Don't print the schedule to stdout
        #[arg(short, long)]
        quiet: bool,
    },

    /// Start the HTTP server
    Web {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Availability CSV to schedule at startup
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    AppConfig::load(path, required).with_context(|| format!("loading {}", path.display()))
}

fn load_staff(config: &AppConfig, input: Option<&Path>) -> anyhow::Result<Roster> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let source = discover_source(&cwd, input, &config.input.candidates, &config.output.path)?;
    let (mut roster, _report) = load_roster(&source, config.input.strict_labels)?;
    config.apply_overrides(&mut roster)?;
    Ok(roster)
}

fn run_generate(
    config: &AppConfig,
    input: Option<&Path>,
    start: Option<&str>,
    end: Option<&str>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<GeneratedSchedule> {
    let roster = load_staff(config, input)?;
    let (start, end) = resolve_range(start, end, Local::now().date_naive())?;
    let schedule = generate_schedule(&roster, start, end, &config.balance);

    let output = output.unwrap_or_else(|| config.output.path.with_extension(format.extension()));
    match format {
        OutputFormat::Xlsx => write_schedule_xlsx(&output, &schedule.days)?,
        OutputFormat::Csv => write_schedule_csv(&output, &schedule.days)?,
        OutputFormat::Json => write_schedule_json(&output, &schedule)?,
    }
    info!(path = %output.display(), "schedule written");
    Ok(schedule)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            input,
            start,
            end,
            output,
            format,
            quiet,
        } => {
            let schedule = run_generate(
                &config,
                input.as_deref(),
                start.as_deref(),
                end.as_deref(),
                output,
                format,
            )?;
            if !quiet {
                print_schedule(&schedule);
            }
        }
        Commands::Web { port, input } => {
            if let Some(port) = port {
                config.web.port = port;
            }
            let initial = match load_staff(&config, input.as_deref()) {
                Ok(roster) => {
                    let (start, end) = resolve_range(None, None, Local::now().date_naive())?;
                    Some(generate_schedule(&roster, start, end, &config.balance))
                }
                Err(e) if input.is_some() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "starting without a schedule, waiting for an upload");
                    None
                }
            };
            info!(port = config.web.port, "starting web server");
            start_server(AppState::new(config, initial)).await?;
        }
    }

    Ok(())
}
