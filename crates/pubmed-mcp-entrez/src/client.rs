//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (ids and hit counts, JSON)
//!   efetch:  {base}/efetch.fcgi   (article records, XML)
//!   elink:   {base}/elink.fcgi    (PMC links and cited-by links, JSON)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pubmed_mcp_common::{Error, Result, SandboxClient, SandboxOptions};
use reqwest::header::RETRY_AFTER;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::models::{ArticleRecord, SearchRequest, SearchResult, SortOrder};
use crate::parse::parse_pubmed_xml;
use crate::rate_limit::{RateLimiter, API_KEY_RPS, DEFAULT_RPS};
use crate::responses::{parse_elink, parse_esearch};
use crate::EntrezApi;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_TOOL: &str = "pubmed-mcp";

/// Upper bound on a server-supplied `Retry-After` wait.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

const CITED_IN: &str = "pubmed_pubmed_citedin";
const PUBMED_PMC: &str = "pubmed_pmc";

/// Connection settings for [`EntrezClient`].
#[derive(Debug)]
pub struct EntrezConfig {
    /// Contact address NCBI requires on every request.
    pub email: String,
    pub tool: String,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Defaults to 3, or 10 when an API key is set.
    pub requests_per_second: Option<u32>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// `Retry-After` values above this are clamped to it.
    pub max_retry_after: Duration,
    pub timeout: Duration,
}

impl EntrezConfig {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tool: DEFAULT_TOOL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: None,
            batch_size: 100,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            max_retry_after: MAX_RETRY_AFTER,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn effective_rps(&self) -> u32 {
        self.requests_per_second.unwrap_or(if self.api_key.is_some() {
            API_KEY_RPS
        } else {
            DEFAULT_RPS
        })
    }
}

pub struct EntrezClient {
    client: SandboxClient,
    config: EntrezConfig,
    limiter: RateLimiter,
}

impl EntrezClient {
    pub fn new(config: EntrezConfig) -> Result<Self> {
        if !config.email.contains('@') {
            return Err(Error::Config(format!(
                "NCBI requires a contact email address, got '{}'",
                config.email
            )));
        }
        if config.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }

        let base = reqwest::Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url '{}': {}", config.base_url, e)))?;

        let mut client = SandboxClient::with_options(SandboxOptions {
            timeout: config.timeout,
            user_agent: format!("{}/{} ({})", config.tool, env!("CARGO_PKG_VERSION"), config.email),
        })?;
        if let Some(host) = base.host_str() {
            client.allow_domain(host);
        }

        let limiter = RateLimiter::per_second(config.effective_rps());
        info!(
            tool = %config.tool,
            rps = config.effective_rps(),
            api_key = config.api_key.is_some(),
            "Entrez client ready"
        );

        Ok(Self { client, config, limiter })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}.fcgi", self.config.base_url.trim_end_matches('/'), name)
    }

    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("tool", self.config.tool.clone()),
            ("email", self.config.email.clone()),
        ];
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        params
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_base_delay * 2u32.saturating_pow(attempt)
    }

    /// Server hint when present (capped), exponential backoff otherwise.
    fn retry_delay(&self, retry_after: Option<Duration>, attempt: u32) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.config.max_retry_after),
            None => self.backoff(attempt),
        }
    }

    /// Paced GET with retries on 429, 5xx and transport timeouts.
    async fn get_text(&self, name: &str, mut params: Vec<(&'static str, String)>) -> Result<String> {
        let url = self.endpoint(name);
        params.extend(self.identity_params());

        let mut attempt = 0u32;
        loop {
            self.limiter.acquire().await;

            let (err, retry_after) = match self.client.get(&url)?.query(&params).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text().await?);
                }
                Ok(response) => {
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .map(Duration::from_secs);
                    let err = Error::Status { status: response.status().as_u16(), url: url.clone() };
                    (err, retry_after)
                }
                Err(e) => (Error::Http(e), None),
            };

            if !err.is_transient() || attempt >= self.config.max_retries {
                return Err(err);
            }
            let delay = self.retry_delay(retry_after, attempt);
            warn!(endpoint = name, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying E-utilities request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Search PubMed and return matching PMIDs plus the server-side hit count.
    #[instrument(skip(self))]
    async fn esearch(&self, term: &str, retmax: usize, sort: Option<SortOrder>) -> Result<SearchResult> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", term.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(sort) = sort {
            params.push(("sort", sort.as_param().to_string()));
        }

        let body = self.get_text("esearch", params).await?;
        let (ids, total) = parse_esearch(&body)?;
        debug!(returned = ids.len(), total, "PubMed esearch returned PMIDs");
        Ok(SearchResult { ids, total })
    }

    /// One elink call per batch; each PMID gets its own `id` parameter so NCBI answers with one linkset per id.
    async fn elink(&self, ids: &[String], db: &str, linkname: &str) -> Result<HashMap<String, Vec<String>>> {
        let mut links = HashMap::new();
        for batch in ids.chunks(self.config.batch_size) {
            let mut params = vec![
                ("dbfrom", "pubmed".to_string()),
                ("db", db.to_string()),
                ("linkname", linkname.to_string()),
                ("retmode", "json".to_string()),
            ];
            params.extend(batch.iter().map(|id| ("id", id.clone())));

            let body = self.get_text("elink", params).await?;
            links.extend(parse_elink(&body, linkname)?);
        }
        Ok(links)
    }
}

#[async_trait]
impl EntrezApi for EntrezClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let mut result = self.esearch(&request.term, request.max_results, Some(request.sort)).await?;
        result.ids.truncate(request.max_results);
        Ok(result)
    }

    async fn count(&self, term: &str) -> Result<u64> {
        Ok(self.esearch(term, 0, None).await?.total)
    }

    /// Fetch records in batches of `batch_size`; any failing batch fails the call.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<ArticleRecord>> {
        let mut articles = Vec::with_capacity(ids.len());
        for batch in ids.chunks(self.config.batch_size) {
            let params = vec![
                ("db", "pubmed".to_string()),
                ("id", batch.join(",")),
                ("retmode", "xml".to_string()),
            ];
            let xml = self.get_text("efetch", params).await?;
            articles.extend(parse_pubmed_xml(&xml)?);
        }
        debug!(fetched = articles.len(), "PubMed efetch complete");
        Ok(articles)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn citation_counts(&self, ids: &[String]) -> Result<HashMap<String, usize>> {
        let links = self.elink(ids, "pubmed", CITED_IN).await?;
        Ok(ids
            .iter()
            .map(|id| (id.clone(), links.get(id).map_or(0, Vec::len)))
            .collect())
    }

    #[instrument(skip(self))]
    async fn pmc_links(&self, pmid: &str) -> Result<Vec<String>> {
        let mut links = self.elink(&[pmid.to_string()], "pmc", PUBMED_PMC).await?;
        Ok(links.remove(pmid).unwrap_or_default())
    }
}
