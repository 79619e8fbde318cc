//! Configuration loading for pubmed-mcp.
//! Reads pubmed-mcp.toml from the current directory or the path given by
//! `--config` / PUBMED_MCP_CONFIG. Every field has a default, so a missing
//! default file is not an error.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use pubmed_mcp_entrez::client::{DEFAULT_BASE_URL, DEFAULT_TOOL};
use pubmed_mcp_entrez::EntrezConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "pubmed-mcp.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ncbi: NcbiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    pub email: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Unset means 3 per second, or 10 with an API key.
    pub requests_per_second: Option<u32>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tool()         -> String { DEFAULT_TOOL.to_string() }
fn default_base_url()     -> String { DEFAULT_BASE_URL.to_string() }
fn default_batch_size()   -> usize  { 100 }
fn default_max_retries()  -> u32    { 2 }
fn default_timeout_secs() -> u64    { 30 }

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            tool: default_tool(),
            base_url: default_base_url(),
            requests_per_second: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for NcbiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NcbiConfig")
            .field("email", &self.email)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("tool", &self.tool)
            .field("base_url", &self.base_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_tfidf_features")]
    pub max_tfidf_features: usize,
    #[serde(default = "default_wordcloud_width")]
    pub wordcloud_width: u32,
    #[serde(default = "default_wordcloud_height")]
    pub wordcloud_height: u32,
}

fn default_max_tfidf_features() -> usize { 1000 }
fn default_wordcloud_width()    -> u32   { 800 }
fn default_wordcloud_height()   -> u32   { 400 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_tfidf_features: default_max_tfidf_features(),
            wordcloud_width: default_wordcloud_width(),
            wordcloud_height: default_wordcloud_height(),
        }
    }
}


impl Config {
    /// Load configuration.
    /// An explicit path must exist; otherwise pubmed-mcp.toml is read when
    /// present and defaults are used when it is not.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Command-line and environment values take precedence over the file.
    pub fn apply_overrides(&mut self, email: Option<String>, api_key: Option<String>) {
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            self.ncbi.email = Some(email);
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.ncbi.api_key = Some(key);
        }
    }

    /// Client settings; NCBI requires a contact email.
    pub fn entrez_config(&self) -> anyhow::Result<EntrezConfig> {
        let email = self
            .ncbi
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .context("an NCBI contact email is required (--email, NCBI_EMAIL or [ncbi].email)")?;

        let mut config = EntrezConfig::new(email)
            .with_api_key(self.ncbi.api_key.clone().map(SecretString::from));
        config.tool = self.ncbi.tool.clone();
        config.base_url = self.ncbi.base_url.clone();
        config.requests_per_second = self.ncbi.requests_per_second;
        config.batch_size = self.ncbi.batch_size;
        config.max_retries = self.ncbi.max_retries;
        config.timeout = Duration::from_secs(self.ncbi.timeout_secs);
        Ok(config)
    }
}
