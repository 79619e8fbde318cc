use pubmed_mcp_analysis::AnalysisError;
use thiserror::Error;

/// Failures surfaced to callers as error envelopes.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("external API error: {0}")]
    Entrez(#[from] pubmed_mcp_common::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl DispatchError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField { field, reason: reason.into() }
    }

    /// Stable machine-readable kind carried in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedAction(_) => "unsupported_action",
            Self::MissingField(_) => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
            Self::Entrez(_) => "external_api",
            Self::Analysis(_) => "invalid_parameter",
        }
    }
}
