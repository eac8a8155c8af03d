//! `modelrank` command-line interface.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modelrank_core::{RunConfig, RunFile};
use modelrank_runtime::{BackendSupervisor, SupervisorOutcome, TaskOrchestrator};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "modelrank", version, about = "Rank LLM answers with an evaluator model")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every task in a run file and append the reports
    Run {
        /// YAML or JSON run file
        run_file: PathBuf,

        /// Do not check or start the local backend server
        #[arg(long)]
        skip_supervisor: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate a run file and print the resolved tasks
    Check {
        run_file: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Run-level endpoint overrides. Task-level values still take precedence.
#[derive(Args, Debug)]
struct Overrides {
    /// Inference backend base URL
    #[arg(long, env = "MODELRANK_BACKEND_URL")]
    backend_url: Option<String>,

    /// Retrieval service base URL
    #[arg(long, env = "MODELRANK_RETRIEVAL_URL")]
    retrieval_url: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut RunConfig) {
        if let Some(url) = self.backend_url {
            config.backend_endpoint = url;
        }
        if let Some(url) = self.retrieval_url {
            config.retrieval_endpoint = url;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "modelrank=debug,modelrank_core=debug,modelrank_runtime=debug"
    } else {
        "modelrank=info,modelrank_core=info,modelrank_runtime=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn load(run_file: &Path, overrides: Overrides) -> Result<RunFile> {
    let mut run = RunFile::from_path(run_file)
        .with_context(|| format!("failed to load run file {}", run_file.display()))?;
    overrides.apply(&mut run.defaults);
    Ok(run)
}

async fn run(run_file: PathBuf, skip_supervisor: bool, overrides: Overrides) -> Result<()> {
    let run = load(&run_file, overrides)?;
    tracing::info!(tasks = run.tasks.len(), "Run file loaded");

    if !skip_supervisor {
        let supervisor =
            BackendSupervisor::ollama(&run.defaults.backend_endpoint, &run.defaults.probe)?;
        match supervisor
            .ensure_running()
            .await
            .context("backend server is not available")?
        {
            SupervisorOutcome::AlreadyRunning => {}
            SupervisorOutcome::Launched { attempts } => {
                tracing::info!(attempts, "Backend server started");
            }
        }
    }

    let mut orchestrator = TaskOrchestrator::ollama(run.defaults.clone());
    let summary = orchestrator.run(&run.tasks).await?;

    for task in &summary.tasks {
        println!(
            "{} entries -> {}{}",
            task.entries(),
            task.report_path.display(),
            if task.retrieval_enabled { " (retrieval)" } else { "" }
        );
    }
    Ok(())
}

fn check(run_file: PathBuf, overrides: Overrides) -> Result<()> {
    let run = load(&run_file, overrides)?;

    let tasks: Vec<serde_json::Value> = run
        .tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let resolved = run.defaults.resolve(task);
            serde_json::json!({
                "index": index,
                "question": task.question,
                "candidate_models": task.candidate_models,
                "evaluator_model": resolved.evaluator_model,
                "backend_endpoint": resolved.backend_endpoint,
                "retrieval": task.wants_registration(),
                "retrieval_endpoint": resolved.retrieval_endpoint,
                "source_files": task.source_files,
                "report_path": task.report_path,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&tasks)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            run_file,
            skip_supervisor,
            overrides,
        } => run(run_file, skip_supervisor, overrides).await,
        Command::Check {
            run_file,
            overrides,
        } => check(run_file, overrides),
    }
}
