//! Runtime configuration.
//!
//! Values are layered, later layers winning:
//! 1. built-in defaults
//! 2. an optional YAML file (`--config`)
//! 3. command-line flags and their environment variables
//!
//! ```yaml
//! completion:
//!   api_base: https://api.openai.com/v1
//!   model: gpt-3.5-turbo
//! fetch:
//!   timeout_secs: 10
//!   max_attempts: 3
//!   delay_ms: 1000
//! keywords:
//!   prompt: company-tech
//!   delimiter: ","
//!   dedup: exact
//! ```

use crate::api::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::cli::Cli;
use crate::fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, RetryPolicy};
use crate::models::DedupPolicy;
use crate::pipeline::PipelineOptions;
use crate::prompts::PromptTemplate;
use crate::scrapers::listing::DEFAULT_BASE_URL;
use scraper::Selector;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no API key configured (set OPENAI_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("invalid content selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub completion: CompletionConfig,
    pub fetch: FetchConfig,
    pub keywords: KeywordConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    /// CSS selector for article bodies split over several containers.
    pub content_selector: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            content_selector: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_attempts: 3,
            delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub prompt: PromptTemplate,
    pub delimiter: String,
    pub dedup: DedupPolicy,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            prompt: PromptTemplate::default(),
            delimiter: ",".to_string(),
            dedup: DedupPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load a YAML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Let command-line values override the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.completion.model = model.clone();
        }
        if let Some(api_base) = &cli.api_base {
            self.completion.api_base = api_base.clone();
        }
        if let Some(api_key) = &cli.api_key {
            self.completion.api_key = Some(api_key.clone());
        }
        if let Some(prompt) = cli.prompt {
            self.keywords.prompt = prompt;
        }
        if let Some(delimiter) = &cli.delimiter {
            self.keywords.delimiter = delimiter.clone();
        }
        if let Some(dedup) = cli.dedup {
            self.keywords.dedup = dedup;
        }
        if let Some(selector) = &cli.content_selector {
            self.portal.content_selector = Some(selector.clone());
        }
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.completion
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn pipeline_options(&self, limit: Option<usize>) -> Result<PipelineOptions, ConfigError> {
        let content_selector = match &self.portal.content_selector {
            Some(selector) => Some(Selector::parse(selector).map_err(|e| ConfigError::Selector {
                selector: selector.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(PipelineOptions {
            base_url: self.portal.base_url.clone(),
            delimiter: self.keywords.delimiter.clone(),
            dedup: self.keywords.dedup,
            limit,
            content_selector,
        })
    }
}
