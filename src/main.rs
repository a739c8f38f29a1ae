use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use docflow::config::DocflowConfig;
use docflow::pipeline::retry::RetryPolicy;
use docflow::pipeline::DocumentProcessor;
use docflow::pipeline::types::RAW_TEXT_INPUT_ID;
use docflow::store::{LibSqlResultLog, MemoryResultLog, ResultLog};
use docflow::summary::render_summary;

#[derive(Parser)]
#[command(name = "docflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rule-based document triage and action routing", long_about = None)]
struct Cli {
    /// Result log database path (overrides DOCFLOW_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Keep the result log in memory for this run only
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one or more documents
    Run {
        /// Input file; repeat to process several files concurrently
        #[arg(long = "input-file")]
        input_files: Vec<PathBuf>,

        /// Raw email text, processed as an Email without format detection
        #[arg(long, conflicts_with = "input_files")]
        email_text: Option<String>,
    },

    /// Copy a file into the upload directory and process the copy
    Upload { path: PathBuf },

    /// Print the whole result log as JSON
    Log,
}

#[derive(Clone)]
enum Input {
    File(PathBuf),
    Text(String),
}

impl Input {
    fn id(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Text(_) => RAW_TEXT_INPUT_ID.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DocflowConfig::from_env().context("Failed to load configuration")?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }

    let _guard = init_tracing(config.log_dir.as_deref())?;

    let log: Arc<dyn ResultLog> = if cli.memory {
        Arc::new(MemoryResultLog::new())
    } else {
        Arc::new(
            LibSqlResultLog::new_local(&config.db_path)
                .await
                .with_context(|| {
                    format!("Failed to open result log at {}", config.db_path.display())
                })?,
        )
    };

    match cli.command {
        Commands::Run {
            input_files,
            email_text,
        } => {
            let mut inputs: Vec<Input> = input_files.into_iter().map(Input::File).collect();
            inputs.extend(email_text.map(Input::Text));
            if inputs.is_empty() {
                bail!("Nothing to process: pass --input-file or --email-text");
            }
            run_inputs(&config, log, inputs).await
        }
        Commands::Upload { path } => {
            let copy = upload(&path, &config.upload_dir)?;
            run_inputs(&config, log, vec![Input::File(copy)]).await
        }
        Commands::Log => {
            let snapshot = log.load_all().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

/// Log to stderr, plus a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "docflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Copy `path` into `upload_dir`, keeping its file name.
fn upload(path: &Path, upload_dir: &Path) -> anyhow::Result<PathBuf> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    std::fs::create_dir_all(upload_dir)
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;
    let target = upload_dir.join(file_name);
    std::fs::copy(path, &target)
        .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
    info!(from = %path.display(), to = %target.display(), "File uploaded");
    Ok(target)
}

/// Process every input as its own task, then print a summary per input in
/// the order they were given.
async fn run_inputs(
    config: &DocflowConfig,
    log: Arc<dyn ResultLog>,
    inputs: Vec<Input>,
) -> anyhow::Result<()> {
    let processor = Arc::new(
        DocumentProcessor::new(Arc::clone(&log)).with_retry(RetryPolicy::from_config(config)),
    );
    let sniff_bytes = config.sniff_bytes;

    let mut tasks = JoinSet::new();
    for (index, input) in inputs.iter().enumerate() {
        let processor = Arc::clone(&processor);
        let input = input.clone();
        tasks.spawn(async move {
            let result = match &input {
                Input::File(path) => processor.process_path(path, sniff_bytes).await,
                Input::Text(text) => processor.process_text(text).await,
            };
            (index, result)
        });
    }

    let mut failures = vec![None; inputs.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.context("Processing task panicked")?;
        if let Err(e) = result {
            error!(input = %inputs[index].id(), error = %e, "Processing failed");
            failures[index] = Some(e.to_string());
        }
    }

    for (input, failure) in inputs.iter().zip(&failures) {
        let id = input.id();
        if let Some(reason) = failure {
            eprintln!("Error processing {id}: {reason}");
        }
        let latest = log.latest_for(&id).await?;
        println!("{}\n", render_summary(latest.as_ref()));
    }

    let failed = failures.iter().filter(|f| f.is_some()).count();
    if failed > 0 {
        bail!("{failed} of {} input(s) failed", inputs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_text_conflicts_with_input_file() {
        let err = Cli::try_parse_from([
            "docflow",
            "run",
            "--input-file",
            "a.txt",
            "--email-text",
            "hi",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn input_file_repeats() {
        let cli = Cli::try_parse_from([
            "docflow",
            "run",
            "--input-file",
            "a.txt",
            "--input-file",
            "b.pdf",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                input_files,
                email_text,
            } => {
                assert_eq!(input_files, vec![PathBuf::from("a.txt"), PathBuf::from("b.pdf")]);
                assert!(email_text.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn email_text_alone() {
        let cli = Cli::try_parse_from(["docflow", "--memory", "run", "--email-text", "hi"]).unwrap();
        assert!(cli.memory);
        assert!(matches!(
            cli.command,
            Commands::Run { ref input_files, email_text: Some(ref text) }
                if input_files.is_empty() && text == "hi"
        ));
    }
}
