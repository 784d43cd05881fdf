//! Entox Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{CausalVerbs, EntityLabel};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Relation extraction settings
    pub extraction: ExtractionSettings,

    /// NLP pipeline source
    pub pipeline: PipelineConfig,

    /// Bibliographic fetch settings
    pub fetch: FetchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("ENTOX_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("ENTOX_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ENTOX_PORT".to_string(),
                value: port,
            })?;
        }

        // Extraction
        if let Ok(cause) = std::env::var("ENTOX_CAUSE") {
            self.extraction.cause = parse_label("ENTOX_CAUSE", &cause)?;
        }
        if let Ok(effect) = std::env::var("ENTOX_EFFECT") {
            self.extraction.effect = parse_label("ENTOX_EFFECT", &effect)?;
        }
        if let Ok(verbs) = std::env::var("ENTOX_CAUSAL_VERBS") {
            self.extraction.causal_verbs =
                CausalVerbs::parse_list(&verbs).map_err(|_| ConfigError::InvalidValue {
                    key: "ENTOX_CAUSAL_VERBS".to_string(),
                    value: verbs,
                })?;
        }
        if let Ok(prefilter) = std::env::var("ENTOX_PREFILTER") {
            self.extraction.prefilter =
                prefilter.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "ENTOX_PREFILTER".to_string(),
                    value: prefilter,
                })?;
        }

        // Pipeline
        if let Ok(path) = std::env::var("ENTOX_TREEBANK") {
            self.pipeline.treebank = Some(PathBuf::from(path));
        }

        // Fetch
        if let Ok(email) = std::env::var("NCBI_EMAIL") {
            self.fetch.email = Some(email);
        }
        if let Ok(key) = std::env::var("NCBI_API_KEY") {
            self.fetch.api_key = Some(key);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}

fn parse_label(key: &str, value: &str) -> Result<EntityLabel, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_enabled: true,
        }
    }
}

/// Relation extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Entity type of the cause end of a relation
    pub cause: EntityLabel,

    /// Entity type of the effect end of a relation
    pub effect: EntityLabel,

    /// Lemmas of verbs accepted as causal links
    pub causal_verbs: CausalVerbs,

    /// Skip sentences lacking both entity types before matching
    pub prefilter: bool,

    /// Cause types accepted at the service boundary
    pub allowed_causes: Vec<EntityLabel>,

    /// Effect types accepted at the service boundary
    pub allowed_effects: Vec<EntityLabel>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            cause: EntityLabel::Compound,
            effect: EntityLabel::Phenotype,
            causal_verbs: CausalVerbs::default(),
            prefilter: true,
            allowed_causes: vec![EntityLabel::Compound, EntityLabel::Phenotype],
            allowed_effects: vec![EntityLabel::Phenotype],
        }
    }
}

/// NLP pipeline source
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// CoNLL-U treebank holding pre-computed parses
    pub treebank: Option<PathBuf>,
}

/// Bibliographic fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// E-utilities efetch endpoint
    pub efetch_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Contact email sent to NCBI
    pub email: Option<String>,

    /// NCBI API key
    pub api_key: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            efetch_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string(),
            timeout_secs: 30,
            email: None,
            api_key: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
