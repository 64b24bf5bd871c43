//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all, via
//! [`Config::default`]) yields a working configuration with the documented
//! retrieval constants.
//!
//! ```toml
//! [retrieval]
//! default_top_k = 20
//! max_top_k = 100
//! rerank_weight = 0.3
//! boost_factor = 1.2
//!
//! [cache]
//! ttl_secs = 300
//! capacity = 100
//!
//! [related]
//! max_items = 50
//! results_per_modified_file = 5
//! commit_boost = 0.3
//! summary_commits = 5
//! reference_limit = 20
//!
//! [git]
//! repo_path = "."
//! max_commits = 1000
//! timeout_secs = 30
//!
//! [embedding]
//! provider = "openai"          # disabled | openai | ollama
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [store]
//! corpus_path = "./data/corpus.json"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
    pub related: RelatedConfig,
    pub git: GitConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Weight of cosine similarity in the rerank blend.
    pub rerank_weight: f64,
    pub boost_factor: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 20,
            max_top_k: 100,
            rerank_weight: 0.3,
            boost_factor: 1.2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            capacity: 100,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelatedConfig {
    /// Cap on related items in the file-path flow.
    pub max_items: usize,
    /// Vector-store hits kept per file modified by a ticket's commits.
    pub results_per_modified_file: usize,
    /// Flat score bonus for items found through commit history.
    pub commit_boost: f64,
    /// Commits listed in the ticket summary.
    pub summary_commits: usize,
    /// Limit of the broad ticket-ID query for PRs, issues and discussions.
    pub reference_limit: usize,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            max_items: 50,
            results_per_modified_file: 5,
            commit_boost: 0.3,
            summary_commits: 5,
            reference_limit: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitConfig {
    /// Where repository-root discovery starts for ticket lookups.
    pub repo_path: PathBuf,
    pub max_commits: usize,
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            max_commits: 1000,
            timeout_secs: 30,
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: Option<String>,
    /// Requested output dimensions (OpenAI `dimensions`).
    pub dims: Option<usize>,
    /// Base URL override (Ollama host, OpenAI-compatible gateway).
    pub url: Option<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON array of documents loaded into the in-memory store.
    pub corpus_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7341".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    // Relative corpus paths resolve against the config file's directory.
    if let (Some(corpus), Some(base)) = (&config.store.corpus_path, path.parent()) {
        if corpus.is_relative() {
            config.store.corpus_path = Some(base.join(corpus));
        }
    }

    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let retrieval = &config.retrieval;
    if retrieval.max_top_k < 1 {
        bail!("retrieval.max_top_k must be >= 1");
    }
    if retrieval.default_top_k < 1 || retrieval.default_top_k > retrieval.max_top_k {
        bail!("retrieval.default_top_k must be in [1, max_top_k]");
    }
    if !(0.0..=1.0).contains(&retrieval.rerank_weight) {
        bail!("retrieval.rerank_weight must be in [0.0, 1.0]");
    }
    if retrieval.boost_factor < 1.0 {
        bail!("retrieval.boost_factor must be >= 1.0");
    }

    if config.cache.capacity < 1 {
        bail!("cache.capacity must be >= 1");
    }
    if config.cache.ttl_secs < 1 {
        bail!("cache.ttl_secs must be >= 1");
    }

    if config.git.max_commits < 1 {
        bail!("git.max_commits must be >= 1");
    }
    if config.git.timeout_secs < 1 {
        bail!("git.timeout_secs must be >= 1");
    }

    if config.related.max_items < 1 {
        bail!("related.max_items must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
