//! wbsgrid CLI - WBS progress grid renderer
//!
//! Renders a schedule file as a text grid, a gantt bar overlay, an S-curve
//! overlay, or the cumulative series behind the curve.

mod config;
mod export;
mod schedule;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wbsgrid_core::{InputMode, ProgressMode, ViewMode};
use wbsgrid_render::CurveGranularity;

use crate::config::ViewConfig;
use crate::export::TableOptions;
use crate::schedule::Schedule;

#[derive(Parser)]
#[command(name = "wbsgrid")]
#[command(author, version, about = "WBS progress grid renderer", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// View configuration (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schedule file
    Check {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the progress grid as a text table
    Grid {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Progress mode (planned, actual)
        #[arg(short, long, default_value = "planned")]
        mode: ProgressMode,

        /// Cell display (percentage, volume, cost)
        #[arg(short, long, default_value = "percentage")]
        input: InputMode,

        /// Expand parent rows down to this level
        #[arg(short, long)]
        level: Option<u32>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render planned/actual bars and dependency arrows as SVG
    Gantt {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render the cumulative S-curve as SVG
    Kurva {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Curve granularity (weekly, monthly)
        #[arg(short, long)]
        granularity: Option<CurveGranularity>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the cumulative planned/actual series
    Summary {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Curve granularity (weekly, monthly)
        #[arg(short, long)]
        granularity: Option<CurveGranularity>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "output written");
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ViewConfig::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Check { file }) => {
            let schedule = Schedule::load(&file)?;
            let issues = schedule.validate();
            if issues.is_empty() {
                println!("{}: ok", file.display());
                return Ok(ExitCode::SUCCESS);
            }
            for issue in &issues {
                eprintln!("{}: {issue}", file.display());
            }
            eprintln!("{} problem(s) found", issues.len());
            return Ok(ExitCode::FAILURE);
        }
        Some(Commands::Grid {
            file,
            mode,
            input,
            level,
            output,
        }) => {
            let schedule = Schedule::load(&file)?;
            let options = TableOptions { mode, input, level };
            let table = export::render_table(&schedule, &config, options)?;
            write_output(output.as_deref(), &table)?;
        }
        Some(Commands::Gantt { file, output }) => {
            let schedule = Schedule::load(&file)?;
            let svg = export::overlay_svg(&schedule, &config, ViewMode::Gantt)?;
            write_output(output.as_deref(), &svg)?;
        }
        Some(Commands::Kurva {
            file,
            granularity,
            output,
        }) => {
            let schedule = Schedule::load(&file)?;
            let mut config = config;
            if let Some(granularity) = granularity {
                config.view.granularity = granularity;
            }
            let svg = export::overlay_svg(&schedule, &config, ViewMode::Kurva)?;
            write_output(output.as_deref(), &svg)?;
        }
        Some(Commands::Summary {
            file,
            granularity,
            format,
            output,
        }) => {
            let schedule = Schedule::load(&file)?;
            let granularity = granularity.unwrap_or(config.view.granularity);
            let report = export::curve_report(&schedule, &config, granularity)?;
            let text = match format.as_str() {
                "text" => report.to_text(),
                "json" => {
                    let mut json = serde_json::to_string_pretty(&report)?;
                    json.push('\n');
                    json
                }
                other => anyhow::bail!("Unknown format: {other} (expected text or json)"),
            };
            write_output(output.as_deref(), &text)?;
        }
        None => {
            println!("wbsgrid - WBS progress grid renderer");
            println!("Run with --help for usage information");
        }
    }

    Ok(ExitCode::SUCCESS)
}
