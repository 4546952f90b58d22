use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eventflow_config::Config;
use eventflow_rag::{RagServices, fields, rag_workflow};
use eventflow_runtime::WorkflowEngine;

/// Eventflow - event-driven workflows, shipped with a retrieval pipeline
#[derive(Parser)]
#[command(name = "eventflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON configuration file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build an index from the documents in a directory
  Ingest {
    /// Directory of text documents
    dir: PathBuf,

    /// Where to write the index (default: stdout)
    #[arg(long)]
    out: Option<PathBuf>,
  },

  /// Answer a question against a previously built index
  Query {
    /// The question to answer
    question: String,

    /// Index file written by `ingest`
    #[arg(long)]
    index: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eventflow=info,warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => Config::load(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => Config::default(),
  };

  match cli.command {
    Some(Commands::Ingest { dir, out }) => ingest(config, &dir, out.as_deref()).await,
    Some(Commands::Query { question, index }) => query(config, question, &index).await,
    None => {
      println!("eventflow - use --help to see available commands");
      Ok(())
    }
  }
}

fn engine(config: Config) -> Result<WorkflowEngine> {
  let services = RagServices::keyword(&config.rag);
  let workflow = rag_workflow(services, config.rag).context("failed to build workflow")?;
  Ok(WorkflowEngine::new(workflow, config.engine))
}

/// Cancel the returned token on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
  let cancel = CancellationToken::new();
  let token = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling run");
      token.cancel();
    }
  });
  cancel
}

fn payload<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
  entries
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

async fn ingest(config: Config, dir: &Path, out: Option<&Path>) -> Result<()> {
  let dirname = dir
    .to_str()
    .with_context(|| format!("directory path is not valid UTF-8: {}", dir.display()))?;

  let engine = engine(config)?;
  let result = engine
    .run_with_cancel(payload([(fields::DIRNAME, json!(dirname))]), cancel_on_interrupt())
    .await
    .context("ingest failed")?;

  let index = result
    .output
    .get(fields::INDEX)
    .context("ingest finished without an index")?;
  let rendered = serde_json::to_string_pretty(index)?;

  match out {
    Some(path) => {
      tokio::fs::write(path, rendered)
        .await
        .with_context(|| format!("failed to write index: {}", path.display()))?;
      info!(path = %path.display(), "index written");
    }
    None => writeln!(io::stdout(), "{rendered}").context("failed to write index to stdout")?,
  }
  Ok(())
}

async fn query(config: Config, question: String, index_file: &Path) -> Result<()> {
  let content = tokio::fs::read_to_string(index_file)
    .await
    .with_context(|| format!("failed to read index file: {}", index_file.display()))?;
  let index: Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse index file: {}", index_file.display()))?;

  let engine = engine(config)?;
  let mut run = engine.start(
    payload([(fields::QUERY, json!(question)), (fields::INDEX, index)]),
    cancel_on_interrupt(),
  );
  let mut stream = run.events().context("event stream already taken")?;

  // Stop echoing (but keep the run going) once stdout is gone, e.g. `| head`
  let print_deltas = async {
    let mut stdout = io::stdout();
    while let Some(event) = stream.recv().await {
      let Some(delta) = event.get_str(fields::DELTA) else {
        continue;
      };
      if let Err(e) = write!(stdout, "{delta}").and_then(|()| stdout.flush()) {
        warn!(error = %e, "stdout closed, no longer printing the answer");
        return Err(e);
      }
    }
    writeln!(stdout)
  };
  let (result, printed) = tokio::join!(run.wait(), print_deltas);

  let result = result.context("query failed")?;
  if printed.is_err() {
    return Ok(());
  }
  if let Some(sources) = result.output.get(fields::SOURCES).and_then(Value::as_array) {
    for source in sources {
      eprintln!(
        "source: {} ({})",
        source["id"].as_str().unwrap_or_default(),
        source["score"]
      );
    }
  }
  Ok(())
}
