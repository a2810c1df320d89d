//! The command line interface for the planner.
use crate::log;
use crate::model::Model;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir, write_plan};
use crate::planner::{PlanOutcome, plan_fleet};
use crate::settings::Settings;
use crate::solver::HighsSolver;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write the costed voyage patterns to a CSV file
    #[arg(long)]
    pub debug_model: bool,
    /// Wall-clock limit for the solver in seconds (overrides model.toml)
    #[arg(long)]
    pub max_solve_time: Option<f64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Plan voyages for a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ fleetplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Initialise the logger, unless this has already been done in this process
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(&settings.log_level, log_file_path).context("Failed to initialise logging.")
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if opts.debug_model {
        settings.debug_model = true;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(output_path))?;

    let mut model = Model::from_path(model_path).context("Failed to load model.")?;
    if let Some(max_solve_time) = opts.max_solve_time {
        model.parameters.solver.max_solve_time_seconds = max_solve_time;
        model
            .parameters
            .validate()
            .context("Invalid --max-solve-time")?;
    }
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    write_metadata(output_path, model_path, &model.parameters)
        .context("Failed to save metadata.")?;

    let plan = plan_fleet(&model, &HighsSolver)?;
    write_plan(output_path, &model, &plan, settings.debug_model)
        .context("Failed to save results.")?;

    if let PlanOutcome::Solved(result) = &plan.outcome {
        info!(
            "Planning complete: {} trips, total cost {}",
            result.summary.total_trips, result.summary.total_cost
        );
        for recommendation in &result.summary.recommendations {
            info!("Recommendation: {recommendation}");
        }
    }

    // No plan is reported as an error, after the explanation has been written
    plan.outcome.into_result()?;

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // We don't save log files when running the validate command
    init_logger(&settings, None)?;

    Model::from_path(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}
