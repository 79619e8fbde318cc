//! pubmed-mcp-analysis: Tabulation over fetched PubMed records.
//! - publication trends (per-year counts, zero filled)
//! - journal distribution
//! - co-author network
//! - keyword frequencies
//! - TF-IDF + k-means article clustering
//! - citation reports
//! - word clouds rendered as SVG

pub mod citations;
pub mod cluster;
pub mod error;
pub mod journals;
pub mod keywords;
pub mod network;
pub mod text;
pub mod trends;
pub mod wordcloud;

pub use error::AnalysisError;
