//! Configuration management for the multiquery CLI.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - The workspace config file (`.multiquery/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Once a pipeline is built from an `AppConfig` the values are never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Expansion modes accepted in `retrieval.mode`.
pub const KNOWN_MODES: [&str; 2] = ["decompose", "paraphrase"];

/// Environment variable holding the Gemini API key when none is configured.
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .multiquery/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("gemini" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Explicit API key override
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Vector index connection
    pub index: IndexConfig,

    /// Retrieval pipeline tuning
    pub retrieval: RetrievalConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Gemini {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Chat model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Custom endpoint, if one is configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Gemini { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Embedding model configured for this provider.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::Gemini {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }
}

/// Vector index connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the Qdrant HTTP API
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Collection holding the pre-built passages
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Environment variable holding the index API key, if any
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Payload field holding the passage text
    #[serde(rename = "contentKey", default = "default_content_key")]
    pub content_key: String,

    /// Payload field holding the source metadata
    #[serde(rename = "metadataKey", default = "default_metadata_key")]
    pub metadata_key: String,
}

fn default_index_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "pdf-rag-new".to_string()
}

fn default_content_key() -> String {
    "content".to_string()
}

fn default_metadata_key() -> String {
    "metadata".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            collection: default_collection(),
            api_key_env: None,
            content_key: default_content_key(),
            metadata_key: default_metadata_key(),
        }
    }
}

impl IndexConfig {
    /// Resolve the index API key from its environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
    }
}

/// Retrieval pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Expansion mode ("decompose" or "paraphrase")
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Documents requested per search call
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Upper bound on concurrent search calls per question
    #[serde(rename = "maxConcurrency", default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Whole-request deadline in seconds (0 disables it)
    #[serde(rename = "requestTimeoutSecs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_mode() -> String {
    "decompose".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            top_k: default_top_k(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    index: Option<IndexConfig>,
    retrieval: Option<RetrievalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and environment variables.
    ///
    /// Environment variables:
    /// - `MULTIQUERY_WORKSPACE`: Override workspace path
    /// - `MULTIQUERY_CONFIG`: Path to config file
    /// - `MULTIQUERY_PROVIDER`: LLM provider
    /// - `MULTIQUERY_MODEL`: Chat model identifier
    /// - `MULTIQUERY_API_KEY`: API key
    /// - `QDRANT_URL`: Vector index base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, reading the YAML file from the given workspace or
    /// config path.
    ///
    /// Explicit paths take precedence over `MULTIQUERY_WORKSPACE` and
    /// `MULTIQUERY_CONFIG`. The remaining environment variables are applied
    /// after the file, as in [`AppConfig::load`].
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("MULTIQUERY_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        match config_file {
            Some(config_file) => config.config_file = Some(config_file),
            None => {
                if let Ok(config_file) = std::env::var("MULTIQUERY_CONFIG") {
                    config.config_file = Some(PathBuf::from(config_file));
                }
            }
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.config_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("MULTIQUERY_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("MULTIQUERY_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.index.url = url;
        }

        config.api_key = std::env::var("MULTIQUERY_API_KEY").ok();
        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(index) = config_file.index {
            result.index = index;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .multiquery directory.
    pub fn config_dir(&self) -> PathBuf {
        self.workspace.join(".multiquery")
    }

    /// Get the configuration for a named provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Provider used for query embeddings.
    pub fn embedding_provider(&self) -> &str {
        self.llm
            .as_ref()
            .map(|llm| llm.active_embedding_provider.as_str())
            .unwrap_or(&self.provider)
    }

    /// Resolve the API key for a provider.
    ///
    /// `MULTIQUERY_API_KEY` wins; otherwise the provider's `apiKeyEnv` is read,
    /// falling back to `GOOGLE_API_KEY` for Gemini.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Gemini { api_key_env, .. }) => api_key_env.as_str(),
            Some(ProviderConfig::Ollama { .. }) => return None,
            None if provider == "gemini" => DEFAULT_API_KEY_ENV,
            None => return None,
        };

        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider and pipeline settings.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();
        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "gemini" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::Gemini { api_key_env, .. }) => api_key_env.as_str(),
                _ => DEFAULT_API_KEY_ENV,
            };
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        if !KNOWN_MODES.contains(&self.retrieval.mode.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown retrieval mode: {}. Supported: {}",
                self.retrieval.mode,
                KNOWN_MODES.join(", ")
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if self.retrieval.max_concurrency == 0 {
            return Err(AppError::Config(
                "retrieval.maxConcurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
