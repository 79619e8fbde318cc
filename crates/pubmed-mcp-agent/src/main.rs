//! pubmed-mcp: PubMed search and literature analysis over JSON requests.
//! Entry point for the dispatcher binary.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pubmed_mcp_agent::dispatch::{Dispatcher, Response};
use pubmed_mcp_agent::{serve, Config};
use pubmed_mcp_entrez::EntrezClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pubmed-mcp", version, about = "PubMed search and literature analysis dispatcher")]
struct Cli {
    /// Contact email sent to NCBI with every request
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// NCBI API key (raises the rate limit to 10 requests per second)
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file (defaults to ./pubmed-mcp.toml when present)
    #[arg(long, env = "PUBMED_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Read the request from this file instead of stdin
    #[arg(long, conflicts_with = "serve")]
    input: Option<PathBuf>,

    /// Write the response to this file instead of stdout
    #[arg(long, conflicts_with = "serve")]
    output: Option<PathBuf>,

    /// Answer line-delimited requests on stdin until EOF
    #[arg(long)]
    serve: bool,

    /// Print the action manifest and exit
    #[arg(long)]
    list_actions: bool,
}

fn write_output(path: Option<&PathBuf>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{text}\n"))
            .with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pubmed_mcp=info,warn")),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_actions {
        write_output(cli.output.as_ref(), &serde_json::to_string_pretty(&Dispatcher::manifest())?)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.email.clone(), cli.api_key.clone());
    let client = EntrezClient::new(config.entrez_config()?)?;
    let dispatcher = Dispatcher::new(Arc::new(client), config.analysis.clone());
    info!(version = env!("CARGO_PKG_VERSION"), "pubmed-mcp ready");

    if cli.serve {
        serve::serve_lines(&dispatcher, tokio::io::stdin(), tokio::io::stdout()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let raw = read_input(cli.input.as_ref())?;
    let response = serve::respond(&dispatcher, raw.trim()).await;
    let exit = match &response {
        Response::Error { kind, message } if kind == "invalid_request" => {
            error!(%message, "Rejected request");
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    };

    write_output(cli.output.as_ref(), &serde_json::to_string_pretty(&response)?)?;
    Ok(exit)
}
