//! JSON payloads returned by esearch and elink (`retmode=json`).

use std::collections::HashMap;

use pubmed_mcp_common::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ESearchResponse {
    #[serde(default)]
    pub esearchresult: Option<ESearchResult>,
    /// Top-level error, e.g. "API rate limit exceeded".
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ESearchResult {
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ELinkResponse {
    #[serde(default)]
    pub linksets: Vec<LinkSet>,
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkSet {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub linksetdbs: Vec<LinkSetDb>,
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LinkSetDb {
    #[serde(default)]
    pub linkname: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// `(ids, total)` from an esearch body.
pub(crate) fn parse_esearch(body: &str) -> Result<(Vec<String>, u64)> {
    let resp: ESearchResponse = serde_json::from_str(body)?;
    if let Some(message) = resp.error {
        return Err(Error::Api(message));
    }
    let result = resp
        .esearchresult
        .ok_or_else(|| Error::Api("esearch response missing esearchresult".to_string()))?;
    if let Some(message) = result.error {
        return Err(Error::Api(message));
    }
    let total = result
        .count
        .as_deref()
        .map(|c| c.trim().parse::<u64>())
        .transpose()
        .map_err(|e| Error::Api(format!("invalid esearch count: {}", e)))?
        .unwrap_or(result.idlist.len() as u64);
    Ok((result.idlist, total))
}

/// Link targets per source id for `linkname`.
///
/// Source ids without any link for `linkname` map to an empty list.
pub(crate) fn parse_elink(body: &str, linkname: &str) -> Result<HashMap<String, Vec<String>>> {
    let resp: ELinkResponse = serde_json::from_str(body)?;
    if let Some(message) = resp.error {
        return Err(Error::Api(message));
    }

    let mut links: HashMap<String, Vec<String>> = HashMap::new();
    for set in resp.linksets {
        if let Some(message) = set.error {
            return Err(Error::Api(message));
        }
        let targets: Vec<String> = set
            .linksetdbs
            .into_iter()
            .filter(|db| db.linkname == linkname)
            .flat_map(|db| db.links)
            .collect();
        for id in set.ids {
            links.entry(id).or_default().extend(targets.iter().cloned());
        }
    }
    Ok(links)
}
