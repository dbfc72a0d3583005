use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use rozelle::assemble::MangleCache;
use rozelle::config::Config;
use rozelle::render::{render_exercise, render_outcome};
use rozelle::{workspace, Evaluator, Exercise};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "rozelle",
    about = "Check Python exercise attempts against structural and output constraints",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); falls back to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an attempt against an exercise
    Run {
        /// Exercise file (TOML)
        #[arg(short, long)]
        exercise: PathBuf,

        /// Attempt file (Python)
        #[arg(short, long)]
        attempt: PathBuf,
    },

    /// Manage a scaffold folder of exercises and an attempt file
    #[command(group(
        ArgGroup::new("action")
            .required(true)
            .args(["init", "list", "random", "exercise"])
    ))]
    Scaffold {
        /// Create a new scaffold folder
        #[arg(long)]
        init: bool,

        /// List the exercises in the scaffold folder
        #[arg(long)]
        list: bool,

        /// Evaluate the scaffold's attempt against a random exercise
        #[arg(short, long)]
        random: bool,

        /// Evaluate the scaffold's attempt against the named exercise
        #[arg(long, value_name = "NAME")]
        exercise: Option<String>,

        /// Scaffold folder
        #[arg(short, long, default_value = workspace::DEFAULT_ROOT)]
        output: PathBuf,
    },

    /// Show the active configuration
    Config {
        /// Write the active configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Run { exercise, attempt } => evaluate(&exercise, &attempt).await,
        Commands::Scaffold {
            init,
            list,
            random,
            exercise,
            output,
        } => {
            if init {
                workspace::init(&output)?;
                println!("Created scaffold folder '{}'.", output.display());
                println!(
                    "Write your attempt in '{}' and run `rozelle scaffold --exercise example`.",
                    workspace::attempt_path(&output).display()
                );
                Ok(ExitCode::SUCCESS)
            } else if list {
                for path in workspace::exercises(&output)? {
                    println!("{}", workspace::exercise_name(&output, &path));
                }
                Ok(ExitCode::SUCCESS)
            } else if random {
                let exercise = workspace::random_exercise(&output)?;
                evaluate(&exercise, &workspace::attempt_path(&output)).await
            } else if let Some(name) = exercise {
                let exercise = workspace::exercise_path(&output, &name);
                evaluate(&exercise, &workspace::attempt_path(&output)).await
            } else {
                bail!("Nothing to do")
            }
        }
        Commands::Config { save } => {
            let config = Config::load();
            println!("Config file: {}", Config::config_location());
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save().map_err(|e| anyhow!(e))?;
                println!("Saved.");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn evaluate(exercise_path: &Path, attempt_path: &Path) -> Result<ExitCode> {
    let config = Config::load();
    ensure_engine_available(&config.engine_program)?;

    let exercise = Exercise::load(exercise_path)?;
    let attempt = std::fs::read_to_string(attempt_path)
        .with_context(|| format!("Failed to read attempt '{}'", attempt_path.display()))?;

    let name = exercise_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| exercise_path.display().to_string());
    println!("{}", render_exercise(&name, &exercise));

    info!(
        exercise = %exercise_path.display(),
        attempt = %attempt_path.display(),
        engine = %config.engine_program,
        "evaluating attempt"
    );
    let evaluator = Evaluator::new(
        config.engine(),
        Arc::new(MangleCache::new()),
        config.timeout(),
    );
    let outcome = evaluator
        .evaluate(&exercise, &attempt)
        .await
        .with_context(|| format!("Exercise '{}' is broken", exercise_path.display()))?;

    print!("{}", render_outcome(&outcome));
    Ok(if outcome.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Fail early with a readable message when the interpreter cannot be found.
fn ensure_engine_available(program: &str) -> Result<()> {
    let path = Path::new(program);
    let found = if path.components().count() > 1 {
        path.is_file()
    } else {
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    };
    debug!(program, found, "checked engine program");
    if !found {
        bail!(
            "'{}' was not found; install Python 3 or set ROZELLE_ENGINE",
            program
        );
    }
    Ok(())
}
