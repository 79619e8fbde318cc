use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
