// Country insights CLI - builds the country reference dataset and its QA artifacts

mod exit_codes;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use insights_io::WriteError;
use insights_pipeline::{Pipeline, PipelineConfig, PipelineError};

use exit_codes::{EXIT_IO, EXIT_NO_MASTER_DATA, EXIT_QA_FAILED, EXIT_SUCCESS, EXIT_USAGE};

const CONFIG_DIR_NAME: &str = "country-insights";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Parser)]
#[command(name = "insights")]
#[command(about = "Build a country reference dataset from public registries and indicator series")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/country-insights/config.toml when present)
    #[arg(long, short = 'c', global = true, env = "INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge, check and write every artifact
    #[command(after_help = "\
Examples:
  insights run
  insights run --out-dir ./data --start-year 2015
  insights run --config insights.toml --strict --quiet")]
    Run {
        /// Output directory (processed/ and raw/ are created inside)
        #[arg(long, short = 'o', default_value = "data")]
        out_dir: PathBuf,

        /// First year of indicator history (overrides config)
        #[arg(long)]
        start_year: Option<i32>,

        /// Last year of indicator history (overrides config)
        #[arg(long)]
        end_year: Option<i32>,

        /// Fetch indicators one at a time
        #[arg(long)]
        sequential: bool,

        /// Exit non-zero when the quality gate fails
        #[arg(long)]
        strict: bool,

        /// Suppress the progress narrative on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also print which file it was loaded from
        #[arg(long)]
        show_path: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { out_dir, start_year, end_year, sequential, strict, quiet } => cmd_run(
            cli.config.as_deref(),
            RunArgs { out_dir, start_year, end_year, sequential, strict, quiet },
        ),
        Commands::Config { show_path } => cmd_config(cli.config.as_deref(), show_path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(e) => CliError::usage(e.to_string()),
            PipelineError::NoMasterData(e) => Self {
                code: EXIT_NO_MASTER_DATA,
                message: e.to_string(),
                hint: Some("check network access and [sources] in the config".to_string()),
            },
        }
    }
}

impl From<WriteError> for CliError {
    fn from(err: WriteError) -> Self {
        CliError::io(err.to_string())
    }
}

// ── Config resolution ───────────────────────────────────────────────

fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Explicit path, else the per-user file if it exists, else built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<(PipelineConfig, Option<PathBuf>), CliError> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.is_file()),
    };

    let Some(path) = path else {
        log::debug!("no config file, using defaults");
        return Ok((PipelineConfig::default(), None));
    };

    let text = fs::read_to_string(&path)
        .map_err(|e| CliError::usage(format!("cannot read config {}: {}", path.display(), e)))?;
    let config = PipelineConfig::from_toml(&text).map_err(|e| {
        CliError::usage(format!("{}: {}", path.display(), e))
            .with_hint("run `insights config` to see every setting with its default")
    })?;
    log::info!("loaded config from {}", path.display());
    Ok((config, Some(path)))
}

// ── config ──────────────────────────────────────────────────────────

fn cmd_config(explicit: Option<&Path>, show_path: bool) -> Result<(), CliError> {
    let (config, path) = load_config(explicit)?;
    let text = config.to_toml().map_err(|e| CliError::usage(e.to_string()))?;
    if show_path {
        match &path {
            Some(p) => println!("# loaded from {}", p.display()),
            None => println!("# built-in defaults"),
        }
    }
    print!("{text}");
    Ok(())
}

// ── run ─────────────────────────────────────────────────────────────

struct RunArgs {
    out_dir: PathBuf,
    start_year: Option<i32>,
    end_year: Option<i32>,
    sequential: bool,
    strict: bool,
    quiet: bool,
}

fn cmd_run(explicit: Option<&Path>, args: RunArgs) -> Result<(), CliError> {
    let (mut config, _) = load_config(explicit)?;
    if let Some(start) = args.start_year {
        config.years.start = start;
    }
    if let Some(end) = args.end_year {
        config.years.end = Some(end);
    }
    if args.sequential {
        config.run.parallel = false;
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    if !args.quiet {
        pipeline = pipeline.on_progress(|line| eprintln!("{line}"));
    }

    let run = pipeline.run()?;
    let paths = insights_io::write_artifacts(&args.out_dir, &run)?;

    let status = &run.status;
    if !args.quiet {
        eprintln!("wrote {} rows to {}", status.row_count, paths.dataset.display());
        eprintln!("QA status: {}", paths.status.display());
        if !status.failed_indicators.is_empty() {
            eprintln!("warning: indicators without data: {}", status.failed_indicators.join(", "));
        }
    }

    if args.strict && !status.passed {
        return Err(CliError {
            code: EXIT_QA_FAILED,
            message: format!("quality gate failed: {}", status.failed_checks.join(", ")),
            hint: Some(format!("see {}", paths.checks.display())),
        });
    }

    Ok(())
}
