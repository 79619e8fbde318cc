//! pubmed-mcp-entrez: NCBI Entrez access for the PubMed MCP service.
//! - esearch term construction (date ranges, field-tagged advanced queries)
//! - esearch / efetch / elink over HTTPS with courtesy pacing and retries
//! - efetch XML and elink/esearch JSON parsing
//! - full-text link resolution (PMC first, DOI fallback)

pub mod client;
pub mod full_text;
pub mod models;
pub mod parse;
pub mod query;
pub mod rate_limit;
mod responses;

use std::collections::HashMap;

use async_trait::async_trait;
use pubmed_mcp_common::Result;

pub use client::{EntrezClient, EntrezConfig};
pub use full_text::resolve_full_text;
pub use models::{ArticleRecord, Author, FullTextLinks, SearchRequest, SearchResult, SortOrder};

/// Operations the dispatcher needs from the Entrez service.
#[async_trait]
pub trait EntrezApi: Send + Sync {
    /// Run an esearch; at most `max_results` ids are returned.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult>;

    /// Number of records matching `term`.
    async fn count(&self, term: &str) -> Result<u64>;

    /// Full article records for the given PMIDs.
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<ArticleRecord>>;

    /// Cited-by counts from PubMed Central, one entry per requested PMID.
    async fn citation_counts(&self, ids: &[String]) -> Result<HashMap<String, usize>>;

    /// PMC ids linked to a PMID (free full text).
    async fn pmc_links(&self, pmid: &str) -> Result<Vec<String>>;
}
