//! Trialmatch command-line entrypoint.
//!
//! ```text
//! trialmatch [run]          match patients, write the report
//! trialmatch ground-truth   label the report's pairs
//! trialmatch evaluate       score the report against ground truth
//! trialmatch --health-check check the trial index (exit code 0/1)
//! ```

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use trialmatch::cache::{JsonFileStore, MemoizedStore};
use trialmatch::config::Config;
use trialmatch::constants::{DEFAULT_CONFLICT_LIMIT, validate_embedding_dim};
use trialmatch::eligibility::Patient;
use trialmatch::embedding::{Embedder, EmbedderBackend};
use trialmatch::evaluation::{
    PatientGroundTruth, evaluate_predictions, find_conflicts, label_ground_truth,
};
use trialmatch::pipeline::{CommittedResult, MatchPipeline};
use trialmatch::vectordb::{QdrantTrialIndex, TrialIndex};
use trialmatch::verifier;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: trialmatch [run | ground-truth | evaluate | --health-check]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    GroundTruth,
    Evaluate,
    HealthCheck,
}

fn parse_command() -> anyhow::Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--health-check") {
        return Ok(Command::HealthCheck);
    }

    match args.first().map(String::as_str) {
        None | Some("run") => Ok(Command::Run),
        Some("ground-truth") => Ok(Command::GroundTruth),
        Some("evaluate") => Ok(Command::Evaluate),
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = parse_command()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    match command {
        Command::HealthCheck => std::process::exit(run_health_check(&config).await),
        Command::Run => run(&config).await,
        Command::GroundTruth => ground_truth(&config),
        Command::Evaluate => evaluate(&config),
    }
}

fn open_store(config: &Config) -> Arc<MemoizedStore<JsonFileStore>> {
    Arc::new(MemoizedStore::with_capacity(
        JsonFileStore::new(&config.cache_dir),
        config.memory_capacity,
    ))
}

async fn run(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        qdrant_url = %config.qdrant_url,
        collection = %config.collection,
        embedder = %config.embedder,
        critic = %config.critic,
        top_k = config.top_k,
        "Trialmatch starting"
    );

    let mut patients = load_patients(&config.patients_path)?;
    patients.truncate(config.max_patients);

    let embedder = EmbedderBackend::from_config(config)?;
    if embedder.is_stub() {
        tracing::warn!("Running with the stub embedder; scores are not semantic");
    }
    validate_embedding_dim(embedder.dimension(), config.embedding_dim)?;

    let index = QdrantTrialIndex::new(&config.qdrant_url, config.collection.clone())?;
    let store = open_store(config);
    let verifier = verifier::from_config(config, Arc::clone(&store));

    let pipeline = MatchPipeline::new(embedder, index, store, verifier).configured(config);
    let report = pipeline.run_batch(&patients, config.top_k).await;

    write_json_atomic(&config.report_path, &report.committed)?;

    tracing::info!(
        committed = report.committed.len(),
        failed = report.failures.len(),
        path = %config.report_path.display(),
        "Report written"
    );
    Ok(())
}

fn ground_truth(config: &Config) -> anyhow::Result<()> {
    let patients = load_patients(&config.patients_path)?;
    let results: Vec<CommittedResult> = read_json(&config.report_path)
        .context("run the pipeline first to produce a report")?;

    let store = open_store(config);
    let labelled = label_ground_truth(store.as_ref(), &patients, &results)?;
    write_json_atomic(&config.ground_truth_path, &labelled)?;

    tracing::info!(
        patients = labelled.len(),
        path = %config.ground_truth_path.display(),
        "Ground truth written"
    );
    Ok(())
}

fn evaluate(config: &Config) -> anyhow::Result<()> {
    let ground_truth: Vec<PatientGroundTruth> = read_json(&config.ground_truth_path)?;
    let results: Vec<CommittedResult> = read_json(&config.report_path)?;

    let store = open_store(config);
    let metrics = evaluate_predictions(store.as_ref(), &ground_truth, &results)?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    let conflicts = find_conflicts(&ground_truth, &results, DEFAULT_CONFLICT_LIMIT);
    if conflicts.is_empty() {
        println!("No conflicts between predictions and ground truth.");
    } else {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
    }
    Ok(())
}

async fn run_health_check(config: &Config) -> i32 {
    let index = match QdrantTrialIndex::new(&config.qdrant_url, config.collection.clone()) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            return 1;
        }
    };

    match tokio::time::timeout(config.call_timeout, index.health_check()).await {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Health check failed");
            1
        }
        Err(_) => {
            tracing::error!(timeout = ?config.call_timeout, "Health check timed out");
            1
        }
    }
}

/// Loads patient records, skipping entries that do not decode.
fn load_patients(path: &Path) -> anyhow::Result<Vec<Patient>> {
    let raw: Vec<Value> = read_json(path)?;
    let total = raw.len();

    let patients: Vec<Patient> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value::<Patient>(value) {
            Ok(patient) => Some(patient),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Malformed patient record, skipping");
                None
            }
        })
        .collect();

    tracing::info!(loaded = patients.len(), total, path = %path.display(), "Patients loaded");
    Ok(patients)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes pretty JSON through a temp file in the target directory and an atomic rename.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };

    let temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create a temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
