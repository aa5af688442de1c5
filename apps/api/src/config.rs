use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::safety::triage::TriageFallback;

/// Where interactions, feedback and policies are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    JsonFiles { data_dir: PathBuf },
    /// Process memory only. For local development.
    Memory,
}

/// How the one-submission-per-session rule is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardBackend {
    Memory,
    Redis { redis_url: String },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_timeout: Duration,
    pub storage: StorageBackend,
    pub guard: GuardBackend,
    pub submission_ttl: Duration,
    pub triage_fallback: TriageFallback,
    pub safety_lexicon_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage = match env_or("STORAGE_BACKEND", "json").as_str() {
            "postgres" => StorageBackend::Postgres {
                database_url: require_env("DATABASE_URL")?,
            },
            "json" => StorageBackend::JsonFiles {
                data_dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            },
            "memory" => StorageBackend::Memory,
            other => bail!("STORAGE_BACKEND must be postgres, json or memory (got '{other}')"),
        };

        let guard = match env_or("GUARD_BACKEND", "memory").as_str() {
            "memory" => GuardBackend::Memory,
            "redis" => GuardBackend::Redis {
                redis_url: require_env("REDIS_URL")?,
            },
            other => bail!("GUARD_BACKEND must be memory or redis (got '{other}')"),
        };

        let fallback = env_or("TRIAGE_FALLBACK", "require");
        let triage_fallback = TriageFallback::parse(&fallback).with_context(|| {
            format!("TRIAGE_FALLBACK must be require or assume_unsafe (got '{fallback}')")
        })?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            storage,
            guard,
            submission_ttl: Duration::from_secs(parse_env("SUBMISSION_TTL_SECS", 180)?),
            triage_fallback,
            safety_lexicon_path: std::env::var("SAFETY_LEXICON_PATH").ok().map(PathBuf::from),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number (got '{raw}')")),
        Err(_) => Ok(default),
    }
}
