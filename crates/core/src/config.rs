//! Configuration management for Catalyst.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.catalyst/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is resolved once at process startup and then shared
//! read-only by every query.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Supported completion providers.
const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Supported embedding providers.
const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["http", "mock"];

/// How semantic-search scores are ranked when results are merged.
///
/// The SQLite store reports cosine similarity, so the default is
/// `HigherIsBetter`. Backends reporting a distance need `LowerIsBetter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreOrder {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

impl ScoreOrder {
    /// Parse a score order from its config spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "higher-is-better" | "similarity" | "desc" => Some(Self::HigherIsBetter),
            "lower-is-better" | "distance" | "asc" => Some(Self::LowerIsBetter),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .catalyst/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("openai" or "ollama")
    pub provider: String,

    /// Model identifier used for both planning and synthesis
    pub model: String,

    /// Optional provider endpoint override
    pub llm_endpoint: Option<String>,

    /// Sampling temperature sent with every model call (provider default if unset)
    pub temperature: Option<f32>,

    /// Completion token cap sent with every model call
    pub max_tokens: Option<u32>,

    /// Name of the environment variable holding the provider API key
    pub api_key_env: String,

    /// Resolved API key for the provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Embedding provider ("http" or "mock")
    pub embedding_provider: String,

    /// Embedding service URL
    pub embedding_url: String,

    /// Vector size produced by the mock embedding provider
    pub embedding_dimensions: usize,

    /// Per-call timeout for every outbound request, in seconds
    pub request_timeout_secs: u64,

    /// Maximum number of narrative passages handed to synthesis
    pub max_passages: usize,

    /// Number of hits requested from each semantic-search backend
    pub search_top_n: usize,

    /// Ranking direction for merged search hits
    pub score_order: ScoreOrder,

    /// SQLite evidence store path (defaults to .catalyst/catalyst.db)
    pub database: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    retrieval: Option<RetrievalSection>,
    database: Option<DatabaseSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    temperature: Option<f32>,
    #[serde(rename = "maxTokens")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    url: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalSection {
    #[serde(rename = "maxPassages")]
    max_passages: Option<usize>,
    #[serde(rename = "searchTopN")]
    search_top_n: Option<usize>,
    #[serde(rename = "scoreOrder")]
    score_order: Option<ScoreOrder>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            llm_endpoint: None,
            temperature: None,
            max_tokens: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            embedding_provider: "http".to_string(),
            embedding_url: "http://localhost:5001/embed".to_string(),
            embedding_dimensions: 384,
            request_timeout_secs: 30,
            max_passages: 5,
            search_top_n: 5,
            score_order: ScoreOrder::HigherIsBetter,
            database: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `CATALYST_WORKSPACE`: Override workspace path
    /// - `CATALYST_CONFIG`: Path to config file
    /// - `CATALYST_PROVIDER`: Completion provider
    /// - `CATALYST_MODEL`: Model identifier
    /// - `CATALYST_API_KEY`: API key (otherwise read from `llm.apiKeyEnv`)
    /// - `CATALYST_EMBEDDING_URL`: Embedding service URL
    /// - `CATALYST_DATABASE`: Evidence store path
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use catalyst_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    ///
    /// Explicit arguments win over `CATALYST_WORKSPACE` / `CATALYST_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("CATALYST_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("CATALYST_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.catalyst_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CATALYST_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CATALYST_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("CATALYST_EMBEDDING_URL") {
            config.embedding_url = url;
        }

        if let Some(database) = env_path("CATALYST_DATABASE") {
            config.database = Some(database);
        }

        config.api_key = std::env::var("CATALYST_API_KEY")
            .ok()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .filter(|key| !key.is_empty());

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.llm_endpoint = llm.endpoint;
            }
            if let Some(api_key_env) = llm.api_key_env {
                self.api_key_env = api_key_env;
            }
            if llm.temperature.is_some() {
                self.temperature = llm.temperature;
            }
            if llm.max_tokens.is_some() {
                self.max_tokens = llm.max_tokens;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding_provider = provider;
            }
            if let Some(url) = embedding.url {
                self.embedding_url = url;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding_dimensions = dimensions;
            }
        }

        if let Some(retrieval) = file.retrieval {
            if let Some(max_passages) = retrieval.max_passages {
                self.max_passages = max_passages;
            }
            if let Some(top_n) = retrieval.search_top_n {
                self.search_top_n = top_n;
            }
            if let Some(order) = retrieval.score_order {
                self.score_order = order;
            }
            if let Some(timeout) = retrieval.timeout_secs {
                self.request_timeout_secs = timeout;
            }
        }

        if let Some(database) = file.database {
            if let Some(path) = database.path {
                self.database = Some(PathBuf::from(path));
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the YAML file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        database: Option<PathBuf>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(database) = database {
            self.database = Some(database);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .catalyst directory.
    pub fn catalyst_dir(&self) -> PathBuf {
        self.workspace.join(".catalyst")
    }

    /// Directory holding workspace prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.catalyst_dir().join("prompts")
    }

    /// Effective evidence store path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.catalyst_dir().join("catalyst.db"))
    }

    /// Ensure the .catalyst directory exists.
    pub fn ensure_catalyst_dir(&self) -> AppResult<()> {
        let dir = self.catalyst_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .catalyst directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Per-call timeout as a `Duration`.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.api_key.is_none() {
            return Err(AppError::Config(format!(
                "{} environment variable not set",
                self.api_key_env
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AppError::Config(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(AppError::Config(
                "llm.maxTokens must be at least 1".to_string(),
            ));
        }

        if self.max_passages == 0 {
            return Err(AppError::Config(
                "retrieval.maxPassages must be at least 1".to_string(),
            ));
        }

        if self.search_top_n == 0 {
            return Err(AppError::Config(
                "retrieval.searchTopN must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "retrieval.timeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
