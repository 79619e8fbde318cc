//! pubmed-mcp-agent: request dispatcher for the PubMed MCP service.
//! - `dispatch`: action routing, parameter validation, response envelopes
//! - `config`: pubmed-mcp.toml loading with CLI/env overrides
//! - `serve`: line-delimited JSON request loop

pub mod config;
pub mod dispatch;
pub mod serve;

pub use config::Config;
pub use dispatch::{Action, DispatchError, Dispatcher, Request, Response};
