//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `TRIALMATCH_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_COLLECTION_NAME, DEFAULT_CRITIC_MODEL,
    DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_PATIENTS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_TOP_K,
};
use crate::reliability::RetryPolicy;

/// Default Qdrant URL used when `TRIALMATCH_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default OpenAI-compatible embeddings endpoint.
pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key for the embeddings endpoint.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Which embedder backs the retrieval stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedderKind {
    /// Deterministic hash-seeded vectors; no network.
    #[default]
    Stub,
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
}

impl FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown embedder '{other}' (expected stub|openai)")),
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stub => f.write_str("stub"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

/// Which verifier the critic stage escalates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CriticKind {
    /// Cached deterministic evaluator.
    #[default]
    Rule,
    /// Chat-model auditor.
    Model,
}

impl FromStr for CriticKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" => Ok(Self::Rule),
            "model" => Ok(Self::Model),
            other => Err(format!("unknown critic '{other}' (expected rule|model)")),
        }
    }
}

impl fmt::Display for CriticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => f.write_str("rule"),
            Self::Model => f.write_str("model"),
        }
    }
}

/// Pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `TRIALMATCH_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one JSON file per cache namespace. Default: `./data/cache`.
    pub cache_dir: PathBuf,

    /// Patient records (JSON array). Default: `./data/patients/synthetic_patients.json`.
    pub patients_path: PathBuf,

    /// Where `run` writes committed results. Default: `./data/matches/final_workflow_report.json`.
    pub report_path: PathBuf,

    /// Where `ground-truth` writes labels. Default: `./data/ground_truth/ground_truth.json`.
    pub ground_truth_path: PathBuf,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Trial collection name. Default: `clinical-trials`.
    pub collection: String,

    /// Candidates retrieved per patient. Default: `10`.
    pub top_k: usize,

    /// Patients processed by one `run`. Default: `5`.
    pub max_patients: usize,

    pub embedder: EmbedderKind,
    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,

    pub critic: CriticKind,
    pub critic_model: String,
    /// Ask the model auditor to reject on any doubt. Default: `false`.
    pub critic_strict: bool,

    /// Per-attempt timeout for collaborator calls. Default: 30s.
    pub call_timeout: Duration,
    /// Attempts per collaborator call, including the first. Default: `3`.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles each attempt. Default: 500ms.
    pub retry_backoff: Duration,

    /// Patients in flight at once. Default: `1`.
    pub concurrency: usize,

    /// Max entries in the in-memory cache front. Default: `10_000`.
    pub memory_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/cache"),
            patients_path: PathBuf::from("./data/patients/synthetic_patients.json"),
            report_path: PathBuf::from("./data/matches/final_workflow_report.json"),
            ground_truth_path: PathBuf::from("./data/ground_truth/ground_truth.json"),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            top_k: DEFAULT_TOP_K,
            max_patients: DEFAULT_MAX_PATIENTS,
            embedder: EmbedderKind::default(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            critic: CriticKind::default(),
            critic_model: DEFAULT_CRITIC_MODEL.to_string(),
            critic_strict: false,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            concurrency: 1,
            memory_capacity: 10_000,
        }
    }
}

impl Config {
    const ENV_CACHE_DIR: &'static str = "TRIALMATCH_CACHE_DIR";
    const ENV_PATIENTS_PATH: &'static str = "TRIALMATCH_PATIENTS_PATH";
    const ENV_REPORT_PATH: &'static str = "TRIALMATCH_REPORT_PATH";
    const ENV_GROUND_TRUTH_PATH: &'static str = "TRIALMATCH_GROUND_TRUTH_PATH";
    const ENV_QDRANT_URL: &'static str = "TRIALMATCH_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "TRIALMATCH_COLLECTION";
    const ENV_TOP_K: &'static str = "TRIALMATCH_TOP_K";
    const ENV_MAX_PATIENTS: &'static str = "TRIALMATCH_MAX_PATIENTS";
    const ENV_EMBEDDER: &'static str = "TRIALMATCH_EMBEDDER";
    const ENV_EMBEDDING_URL: &'static str = "TRIALMATCH_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "TRIALMATCH_EMBEDDING_MODEL";
    const ENV_EMBEDDING_DIM: &'static str = "TRIALMATCH_EMBEDDING_DIM";
    const ENV_CRITIC: &'static str = "TRIALMATCH_CRITIC";
    const ENV_CRITIC_MODEL: &'static str = "TRIALMATCH_CRITIC_MODEL";
    const ENV_CRITIC_STRICT: &'static str = "TRIALMATCH_CRITIC_STRICT";
    const ENV_CALL_TIMEOUT_MS: &'static str = "TRIALMATCH_CALL_TIMEOUT_MS";
    const ENV_RETRY_ATTEMPTS: &'static str = "TRIALMATCH_RETRY_ATTEMPTS";
    const ENV_RETRY_BACKOFF_MS: &'static str = "TRIALMATCH_RETRY_BACKOFF_MS";
    const ENV_CONCURRENCY: &'static str = "TRIALMATCH_CONCURRENCY";
    const ENV_MEMORY_CAPACITY: &'static str = "TRIALMATCH_MEMORY_CAPACITY";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            cache_dir: Self::parse_path_from_env(Self::ENV_CACHE_DIR, defaults.cache_dir),
            patients_path: Self::parse_path_from_env(
                Self::ENV_PATIENTS_PATH,
                defaults.patients_path,
            ),
            report_path: Self::parse_path_from_env(Self::ENV_REPORT_PATH, defaults.report_path),
            ground_truth_path: Self::parse_path_from_env(
                Self::ENV_GROUND_TRUTH_PATH,
                defaults.ground_truth_path,
            ),
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            collection: Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection),
            top_k: Self::parse_from_env(Self::ENV_TOP_K, defaults.top_k)?,
            max_patients: Self::parse_from_env(Self::ENV_MAX_PATIENTS, defaults.max_patients)?,
            embedder: Self::parse_from_env(Self::ENV_EMBEDDER, defaults.embedder)?,
            embedding_url: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_URL,
                defaults.embedding_url,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_dim: Self::parse_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?,
            critic: Self::parse_from_env(Self::ENV_CRITIC, defaults.critic)?,
            critic_model: Self::parse_string_from_env(
                Self::ENV_CRITIC_MODEL,
                defaults.critic_model,
            ),
            critic_strict: Self::parse_bool_from_env(
                Self::ENV_CRITIC_STRICT,
                defaults.critic_strict,
            )?,
            call_timeout: Self::parse_millis_from_env(
                Self::ENV_CALL_TIMEOUT_MS,
                defaults.call_timeout,
            )?,
            retry_attempts: Self::parse_from_env(
                Self::ENV_RETRY_ATTEMPTS,
                defaults.retry_attempts,
            )?,
            retry_backoff: Self::parse_millis_from_env(
                Self::ENV_RETRY_BACKOFF_MS,
                defaults.retry_backoff,
            )?,
            concurrency: Self::parse_from_env(Self::ENV_CONCURRENCY, defaults.concurrency)?,
            memory_capacity: Self::parse_from_env(
                Self::ENV_MEMORY_CAPACITY,
                defaults.memory_capacity,
            )?,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.cache_dir.clone(),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_TOP_K,
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_CONCURRENCY,
            });
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_RETRY_ATTEMPTS,
            });
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_EMBEDDING_DIM,
            });
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_CALL_TIMEOUT_MS,
            });
        }

        Ok(())
    }

    /// Retry policy applied to every collaborator call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff: self.retry_backoff,
            call_timeout: self.call_timeout,
        }
    }

    /// Reads the embeddings API key. Never stored on [`Config`] so it cannot leak through `Debug`.
    pub fn api_key() -> Result<String, ConfigError> {
        env::var(ENV_API_KEY)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEnvVar { name: ENV_API_KEY })
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_millis_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        Self::parse_from_env(var_name, default_ms).map(Duration::from_millis)
    }

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(var_name) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
            Err(_) => Ok(default),
        }
    }
}
