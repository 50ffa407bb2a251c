//! Configuration: store connection, text generation, ingestion and query settings.
//!
//! Loaded from an optional YAML file, then overlaid from environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `TG_STORE_BACKEND` | `store.backend` (`neo4j` or `embedded`) |
//! | `TG_NEO4J_URI` / `TG_NEO4J_USER` / `TG_NEO4J_PASSWORD` / `TG_NEO4J_DATABASE` | Neo4j connection |
//! | `TG_DB_PATH` | `store.path` (embedded backend) |
//! | `TG_LLM_MODEL` / `TG_LLM_ENDPOINT` | text generation service |
//! | `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `CEREBRAS_API_KEY` | API key, chosen by model |
//! | `TG_REBUILD` | `ingest.rebuild` |
//! | `TG_RESULT_CAP` | `query.result_cap` |

use crate::ingest::columns::{ColumnMapping, SourceFiles};
use crate::llm::LlmProvider;
use crate::types::{GraphRagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Graph store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Neo4j server over Bolt
    Neo4j,
    /// Local RocksDB directory
    Embedded,
}

/// Graph store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Bolt URI, e.g. `neo4j://localhost:7687`
    pub uri: Option<String>,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Neo4j database name (server default if unset)
    pub database: Option<String>,
    pub max_connections: usize,
    /// Embedded store directory
    pub path: PathBuf,
    /// Per-statement timeout
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Embedded,
            uri: None,
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            max_connections: 16,
            path: PathBuf::from("~/.travel-graph/db"),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name; also selects the provider (`claude-*`, `cerebras:*`, otherwise OpenAI)
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the provider's chat endpoint
    pub endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Translation attempts before giving up (first try plus re-prompts)
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            api_key: None,
            endpoint: None,
            temperature: 0.2,
            max_tokens: 2000,
            timeout_secs: 60,
            max_attempts: 2,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Environment variable holding the API key for the configured model.
    pub fn api_key_var(&self) -> &'static str {
        LlmProvider::for_model(&self.model).api_key_var()
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Wipe the whole graph before loading
    pub rebuild: bool,
    /// Directory holding the four source files
    pub data_dir: Option<PathBuf>,
    pub files: SourceFiles,
    pub columns: ColumnMapping,
    /// Row errors kept per record set in the load summary
    pub max_reported_errors: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            rebuild: false,
            data_dir: None,
            files: SourceFiles::default(),
            columns: ColumnMapping::default(),
            max_reported_errors: 10,
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum rows a pattern returns
    pub result_cap: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { result_cap: 10 }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub ingest: IngestConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from an optional YAML file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::ConfigError` if the file cannot be parsed or
    /// the resulting configuration is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GraphRagError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse YAML text. Missing sections and fields take their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| GraphRagError::ConfigError(format!("invalid config: {}", e)))
    }

    /// Overlay values from an environment lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Variable lookup (`std::env::var` in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("TG_STORE_BACKEND") {
            self.store.backend = match backend.to_ascii_lowercase().as_str() {
                "neo4j" => StoreBackend::Neo4j,
                "embedded" | "rocksdb" => StoreBackend::Embedded,
                other => {
                    return Err(GraphRagError::ConfigError(format!(
                        "TG_STORE_BACKEND must be 'neo4j' or 'embedded', got '{}'",
                        other
                    )))
                }
            };
        }
        if let Some(uri) = lookup("TG_NEO4J_URI") {
            self.store.uri = Some(uri);
        }
        if let Some(user) = lookup("TG_NEO4J_USER") {
            self.store.user = user;
        }
        if let Some(password) = lookup("TG_NEO4J_PASSWORD") {
            self.store.password = password;
        }
        if let Some(database) = lookup("TG_NEO4J_DATABASE") {
            self.store.database = Some(database);
        }
        if let Some(path) = lookup("TG_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(model) = lookup("TG_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = lookup("TG_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup(self.llm.api_key_var());
        }
        if let Some(rebuild) = lookup("TG_REBUILD") {
            self.ingest.rebuild = parse_flag(&rebuild).ok_or_else(|| {
                GraphRagError::ConfigError(format!("TG_REBUILD must be a boolean, got '{}'", rebuild))
            })?;
        }
        if let Some(cap) = lookup("TG_RESULT_CAP") {
            self.query.result_cap = cap.parse().map_err(|_| {
                GraphRagError::ConfigError(format!("TG_RESULT_CAP must be a number, got '{}'", cap))
            })?;
        }
        Ok(())
    }

    /// Expand `~` and environment variables in configured paths.
    pub fn expand_paths(&mut self) -> Result<()> {
        self.store.path = expand(&self.store.path)?;
        if let Some(dir) = &self.ingest.data_dir {
            self.ingest.data_dir = Some(expand(dir)?);
        }
        Ok(())
    }

    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns `GraphRagError::ConfigError` describing the first violation
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Neo4j && self.store.uri.is_none() {
            return Err(GraphRagError::ConfigError(
                "neo4j backend requires store.uri (or TG_NEO4J_URI)".to_string(),
            ));
        }
        if self.store.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(GraphRagError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        if self.store.max_connections == 0 {
            return Err(GraphRagError::ConfigError("store.max_connections must be at least 1".to_string()));
        }
        if self.llm.max_attempts == 0 {
            return Err(GraphRagError::ConfigError("llm.max_attempts must be at least 1".to_string()));
        }
        if self.query.result_cap == 0 {
            return Err(GraphRagError::ConfigError("query.result_cap must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| GraphRagError::ConfigError(format!("cannot expand path '{}': {}", raw, e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Parse a boolean flag leniently (`true`, `1`, `yes`, `on`).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.max_tokens, 2000);
        assert!(!config.ingest.rebuild);
        assert_eq!(config.query.result_cap, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_sections() {
        let config = Config::from_yaml(
            "store:\n  backend: neo4j\n  uri: neo4j://graph:7687\nquery:\n  result_cap: 25\n",
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Neo4j);
        assert_eq!(config.store.user, "neo4j");
        assert_eq!(config.query.result_cap, 25);
        assert_eq!(config.llm.temperature, 0.2);
    }

    #[test]
    fn test_env_overlay_picks_key_by_model() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("TG_LLM_MODEL", "claude-3-5-sonnet-20241022"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
                ("OPENAI_API_KEY", "sk-openai"),
                ("TG_REBUILD", "yes"),
            ]))
            .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-ant"));
        assert!(config.ingest.rebuild);
    }

    #[test]
    fn test_key_variable_follows_provider() {
        for (model, var) in [
            ("gpt-4", "OPENAI_API_KEY"),
            ("claude-3-5-sonnet-20241022", "ANTHROPIC_API_KEY"),
            ("llama3.1-70b", "CEREBRAS_API_KEY"),
            ("qwen-3-32b", "CEREBRAS_API_KEY"),
        ] {
            let llm = LlmConfig {
                model: model.to_string(),
                ..LlmConfig::default()
            };
            assert_eq!(llm.api_key_var(), var, "{}", model);
            assert_eq!(llm.api_key_var(), LlmProvider::for_model(model).api_key_var());
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("TG_STORE_BACKEND", "sqlite")])).is_err());

        let mut config = Config::default();
        config.apply_env(env(&[("TG_STORE_BACKEND", "neo4j")])).unwrap();
        assert!(matches!(config.validate(), Err(GraphRagError::ConfigError(_))));

        let mut config = Config::default();
        config.query.result_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = Config::default();
        config.store.password = "hunter2".to_string();
        config.llm.api_key = Some("sk-secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("hunter2"));
        assert!(!yaml.contains("sk-secret"));
    }
}
