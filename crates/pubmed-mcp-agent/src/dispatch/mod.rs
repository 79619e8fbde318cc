//! Request dispatch.
//!
//! `Dispatcher::handle` routes an action name to its handler and folds every
//! outcome into a [`Response`] envelope. Handlers live in `handlers` as free
//! functions so the dispatcher itself stays a thin router.

mod action;
mod error;
mod handlers;
mod params;

use std::sync::Arc;

use pubmed_mcp_entrez::EntrezApi;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::AnalysisConfig;

pub use action::Action;
pub use error::DispatchError;
pub use params::Params;

/// Wire form of a request: `{"action": ..., "params": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

/// `{"status": "success", "data": ...}` or `{"status": "error", "kind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success { data: Value },
    Error { kind: String, message: String },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// Envelope for input that is not a well-formed request.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Response::Error { kind: "invalid_request".to_string(), message: message.into() }
    }
}

impl From<&DispatchError> for Response {
    fn from(err: &DispatchError) -> Self {
        Response::Error { kind: err.kind().to_string(), message: err.to_string() }
    }
}

pub struct Dispatcher {
    api: Arc<dyn EntrezApi>,
    analysis: AnalysisConfig,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn EntrezApi>, analysis: AnalysisConfig) -> Self {
        Self { api, analysis }
    }

    /// Run one action. Never fails: errors come back as error envelopes.
    #[instrument(skip(self, params))]
    pub async fn handle(&self, action: &str, params: &Value) -> Response {
        match self.try_handle(action, params).await {
            Ok(data) => {
                info!(action, "Action completed");
                Response::Success { data }
            }
            Err(err) => {
                warn!(action, kind = err.kind(), error = %err, "Action failed");
                Response::from(&err)
            }
        }
    }

    /// Parse a raw request value and run it.
    pub async fn handle_value(&self, request: Value) -> Response {
        match serde_json::from_value::<Request>(request) {
            Ok(request) => self.handle(&request.action, &request.params).await,
            Err(e) => Response::invalid_request(format!("expected {{\"action\": string, \"params\": object}}: {e}")),
        }
    }

    async fn try_handle(&self, action: &str, params: &Value) -> Result<Value, DispatchError> {
        let action: Action = action.parse()?;
        let params = Params::from_value(params, "params")?;
        let api = self.api.as_ref();

        match action {
            Action::Search              => handlers::search(api, &params).await,
            Action::FetchDetails        => handlers::fetch_details(api, &params).await,
            Action::AdvancedSearch      => handlers::advanced_search(api, &params).await,
            Action::PublicationTrends   => handlers::publication_trends(api, &params).await,
            Action::JournalDistribution => handlers::journal_distribution(api, &params).await,
            Action::AuthorNetwork       => handlers::author_network(api, &params).await,
            Action::KeywordAnalysis     => handlers::keyword_analysis(api, &params).await,
            Action::ClusterArticles     => handlers::cluster(api, &params, &self.analysis).await,
            Action::CitationAnalysis    => handlers::citation_analysis(api, &params).await,
            Action::DownloadFullText    => handlers::download_full_text(api, &params).await,
            Action::GenerateWordcloud   => handlers::generate_wordcloud(&params, &self.analysis),
        }
    }

    /// Every action with its description and parameter schema.
    pub fn manifest() -> Value {
        let actions: Vec<Value> = Action::ALL
            .iter()
            .map(|a| {
                json!({
                    "name": a.as_str(),
                    "description": a.description(),
                    "parameters": a.parameters_schema(),
                })
            })
            .collect();
        json!({ "actions": actions })
    }
}
