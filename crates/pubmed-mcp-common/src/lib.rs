//! pubmed-mcp-common: Shared error type and the sandboxed HTTP client used by
//! every PubMed MCP crate.

pub mod error;
pub mod sandbox;

pub use error::{Error, Result};
pub use sandbox::{SandboxClient, SandboxOptions};
