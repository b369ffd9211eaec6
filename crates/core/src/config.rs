//! Configuration management for the QA Agent.
//!
//! Configuration is read once at process start and never mutated afterwards.
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - An optional YAML file (`QA_CONFIG`, or `qa-agent.yaml` in the working directory)
//! - Environment variables (a `.env` file is loaded into the environment first)
//! - Command-line flags (applied by the binaries through [`AppConfig::with_overrides`])
//!
//! API keys are only ever read from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default YAML config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "qa-agent.yaml";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Supported chat-completion providers. Both speak the OpenAI-compatible API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Alibaba Cloud DashScope (compatible mode)
    DashScope,
    /// Moonshot Kimi
    Kimi,
}

impl ProviderKind {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dashscope" => Some(Self::DashScope),
            "kimi" | "moonshot" => Some(Self::Kimi),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DashScope => "dashscope",
            Self::Kimi => "kimi",
        }
    }

    /// Chat model used when `MODEL` is not set.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::DashScope => "qwen2.5-7b-instruct",
            Self::Kimi => "kimi-k2-instruct",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::DashScope => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Self::Kimi => "https://api.moonshot.cn/v1",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::DashScope => "DASHSCOPE_API_KEY",
            Self::Kimi => "KIMI_API_KEY",
        }
    }

    /// Environment variable overriding the API base URL.
    pub fn api_base_var(&self) -> &'static str {
        match self {
            Self::DashScope => "DASHSCOPE_API_BASE",
            Self::Kimi => "KIMI_API_BASE",
        }
    }
}

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_base: String,
}

/// Cross-origin settings for the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Exact origins allowed; `["*"]` allows any origin
    pub allow_origins: Vec<String>,

    /// Optional regex matched against the request origin
    pub allow_origin_regex: Option<String>,

    /// Whether cookies/authorization headers are allowed
    pub allow_credentials: bool,
}

impl CorsConfig {
    /// Build from the raw comma-separated list and flags.
    ///
    /// Credentials are disabled when the only origin is `*`, since browsers
    /// reject credentialed wildcard responses.
    pub fn new(origins: &str, regex: Option<String>, allow_credentials: bool) -> Self {
        let allow_origins: Vec<String> = origins
            .split(',')
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        let wildcard = allow_origins.len() == 1 && allow_origins[0] == "*";

        Self {
            allow_origins,
            allow_origin_regex: regex.filter(|r| !r.trim().is_empty()),
            allow_credentials: allow_credentials && !wildcard,
        }
    }

    /// Whether any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.allow_origins.len() == 1 && self.allow_origins[0] == "*"
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CORS_ORIGINS, None, true)
    }
}

/// Retrieval-augmentation and vector store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagConfig {
    /// Enables the vector store, the vector endpoints and augmentation
    pub enabled: bool,

    /// Directory holding the persistent collection
    pub persist_dir: PathBuf,

    /// Collection (table) name
    pub collection: String,

    /// Embedding backend: "dashscope" or "mock"
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Number of snippets retrieved for an in-domain question
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            persist_dir: PathBuf::from("./data/vector_store"),
            collection: "qa_docs".to_string(),
            embedding_provider: "dashscope".to_string(),
            embedding_model: "text-embedding-v3".to_string(),
            top_k: 5,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Active chat provider
    pub provider: ProviderKind,

    /// Chat model identifier
    pub model: String,

    /// Listen address
    pub host: String,
    pub port: u16,

    pub dashscope: ProviderSettings,
    pub kimi: ProviderSettings,

    pub cors: CorsConfig,
    pub rag: RagConfig,

    /// Log level override
    pub log_level: Option<String>,
    pub log_format: LogFormat,

    /// Disable colored output
    pub no_color: bool,

    /// `.env` file applied to the environment, if one was found
    pub env_file: Option<PathBuf>,
}

/// YAML configuration file structure. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub server: Option<ServerSection>,
    pub providers: Option<ProvidersSection>,
    pub cors: Option<CorsSection>,
    pub rag: Option<RagSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersSection {
    pub dashscope: Option<ProviderSection>,
    pub kimi: Option<ProviderSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(rename = "apiBase")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsSection {
    #[serde(rename = "allowOrigins")]
    pub allow_origins: Option<Vec<String>>,
    #[serde(rename = "allowOriginRegex")]
    pub allow_origin_regex: Option<String>,
    #[serde(rename = "allowCredentials")]
    pub allow_credentials: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagSection {
    pub enabled: Option<bool>,
    #[serde(rename = "persistDir")]
    pub persist_dir: Option<PathBuf>,
    pub collection: Option<String>,
    #[serde(rename = "embeddingProvider")]
    pub embedding_provider: Option<String>,
    #[serde(rename = "embeddingModel")]
    pub embedding_model: Option<String>,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
    pub color: Option<bool>,
}

impl ConfigFile {
    /// Read and parse a YAML config file.
    pub fn read(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }
}

/// Truthy values accepted for boolean environment flags.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl AppConfig {
    /// Load configuration from `.env`, the optional YAML file and the
    /// process environment, then validate it.
    ///
    /// An explicit `config_path` takes precedence over `QA_CONFIG`. A
    /// validation failure is fatal: the server must not start serving
    /// traffic with a missing credential.
    pub fn load_from(config_path: Option<PathBuf>) -> AppResult<Self> {
        let env_file = match dotenvy::dotenv() {
            Ok(path) => Some(path),
            Err(e) if e.not_found() => None,
            Err(e) => return Err(AppError::Config(format!("Failed to load .env: {}", e))),
        };

        let file_path = config_path
            .or_else(|| std::env::var("QA_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let file = match file_path {
            Some(path) => Some(ConfigFile::read(&path)?),
            None => None,
        };

        let mut config = Self::from_sources(file, |key| std::env::var(key).ok())?;
        config.validate()?;
        config.env_file = env_file;
        Ok(config)
    }

    /// Build a configuration from an optional file and a variable lookup.
    ///
    /// Values returned by `lookup` take precedence over the file. This does
    /// not validate credentials; call [`AppConfig::validate`] for that.
    pub fn from_sources<F>(file: Option<ConfigFile>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_name = var("PROVIDER")
            .or(file.provider.clone())
            .unwrap_or_else(|| "dashscope".to_string());
        let provider = ProviderKind::parse(&provider_name).ok_or_else(|| {
            AppError::Config(format!(
                "Unsupported provider: {}. Supported: dashscope, kimi",
                provider_name
            ))
        })?;

        let model = var("MODEL")
            .or(file.model.clone())
            .unwrap_or_else(|| provider.default_model().to_string());

        let server = file.server.clone().unwrap_or_default();
        let host = var("HOST")
            .or(server.host)
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => server.port.unwrap_or(8000),
        };

        let providers = file.providers.clone().unwrap_or_default();
        let settings = |kind: ProviderKind, section: Option<ProviderSection>| ProviderSettings {
            api_key: var(kind.api_key_var()),
            api_base: var(kind.api_base_var())
                .or(section.and_then(|s| s.api_base))
                .unwrap_or_else(|| kind.default_api_base().to_string())
                .trim_end_matches('/')
                .to_string(),
        };
        let dashscope = settings(ProviderKind::DashScope, providers.dashscope);
        let kimi = settings(ProviderKind::Kimi, providers.kimi);

        let cors_file = file.cors.clone().unwrap_or_default();
        let origins = var("CORS_ALLOW_ORIGINS")
            .or(cors_file.allow_origins.map(|o| o.join(",")))
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string());
        let credentials = var("CORS_ALLOW_CREDENTIALS")
            .map(|v| parse_flag(&v))
            .or(cors_file.allow_credentials)
            .unwrap_or(true);
        let cors = CorsConfig::new(
            &origins,
            var("CORS_ALLOW_ORIGIN_REGEX").or(cors_file.allow_origin_regex),
            credentials,
        );

        let rag_file = file.rag.clone().unwrap_or_default();
        let defaults = RagConfig::default();
        let top_k = match var("RAG_TOP_K") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| AppError::Config(format!("Invalid RAG_TOP_K '{}': {}", raw, e)))?,
            None => rag_file.top_k.unwrap_or(defaults.top_k),
        };
        let rag = RagConfig {
            enabled: var("RAG_ENABLED")
                .map(|v| parse_flag(&v))
                .or(rag_file.enabled)
                .unwrap_or(defaults.enabled),
            persist_dir: var("VECTOR_STORE_DIR")
                .map(PathBuf::from)
                .or(rag_file.persist_dir)
                .unwrap_or(defaults.persist_dir),
            collection: var("VECTOR_COLLECTION")
                .or(rag_file.collection)
                .unwrap_or(defaults.collection),
            embedding_provider: var("EMBEDDING_PROVIDER")
                .or(rag_file.embedding_provider)
                .unwrap_or(defaults.embedding_provider)
                .to_lowercase(),
            embedding_model: var("EMBEDDING_MODEL")
                .or(rag_file.embedding_model)
                .unwrap_or(defaults.embedding_model),
            top_k,
        };

        let logging = file.logging.clone().unwrap_or_default();
        let log_format = var("LOG_FORMAT")
            .or(logging.format)
            .map(|f| LogFormat::parse(&f))
            .unwrap_or_default();
        let no_color = var("NO_COLOR").is_some() || logging.color == Some(false);

        Ok(Self {
            provider,
            model,
            host,
            port,
            dashscope,
            kimi,
            cors,
            rag,
            log_level: var("RUST_LOG").or(logging.level),
            log_format,
            no_color,
            env_file: None,
        })
    }

    /// Apply command-line overrides. Flags take precedence over everything else.
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        log_level: Option<String>,
        no_color: bool,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }

        if let Some(port) = port {
            self.port = port;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Settings of the active chat provider.
    pub fn active_provider(&self) -> &ProviderSettings {
        self.provider_settings(self.provider)
    }

    /// Settings of a given provider.
    pub fn provider_settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::DashScope => &self.dashscope,
            ProviderKind::Kimi => &self.kimi,
        }
    }

    /// Validate startup-fatal requirements.
    pub fn validate(&self) -> AppResult<()> {
        if self.active_provider().api_key.is_none() {
            return Err(AppError::Config(format!(
                "{} is not set. It is required for the {} provider",
                self.provider.api_key_var(),
                self.provider.as_str()
            )));
        }

        if let Some(ref pattern) = self.cors.allow_origin_regex {
            regex::Regex::new(pattern).map_err(|e| {
                AppError::Config(format!("Invalid CORS_ALLOW_ORIGIN_REGEX: {}", e))
            })?;
        }

        if self.rag.enabled {
            match self.rag.embedding_provider.as_str() {
                "dashscope" => {
                    if self.dashscope.api_key.is_none() {
                        return Err(AppError::Config(
                            "RAG_ENABLED requires DASHSCOPE_API_KEY for the dashscope embedding provider"
                                .to_string(),
                        ));
                    }
                }
                "mock" => {}
                other => {
                    return Err(AppError::Config(format!(
                        "Unknown embedding provider: {}. Supported: dashscope, mock",
                        other
                    )));
                }
            }

            if self.rag.top_k == 0 {
                return Err(AppError::Config("RAG_TOP_K must be at least 1".to_string()));
            }
        }

        Ok(())
    }
}
