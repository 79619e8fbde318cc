use pubmed_mcp_common::Result;
use tracing::debug;

use crate::models::{doi_url, pmc_url, FullTextLink, FullTextLinks, LinkKind};
use crate::EntrezApi;

/// Resolve full-text links for a PMID.
///
/// PMC links come first and mark the article as free full text. Without
/// any, the record's DOI is offered as a publisher link.
pub async fn resolve_full_text<A: EntrezApi + ?Sized>(api: &A, pmid: &str) -> Result<FullTextLinks> {
    let mut links: Vec<FullTextLink> = api
        .pmc_links(pmid)
        .await?
        .iter()
        .map(|id| FullTextLink { kind: LinkKind::Pmc, url: pmc_url(id) })
        .collect();
    let has_free_full_text = !links.is_empty();

    if !has_free_full_text {
        let records = api.fetch_details(&[pmid.to_string()]).await?;
        let doi = records
            .into_iter()
            .find(|r| r.pmid == pmid)
            .and_then(|r| r.doi);
        if let Some(doi) = doi {
            links.push(FullTextLink { kind: LinkKind::Doi, url: doi_url(&doi) });
        }
    }

    debug!(pmid, links = links.len(), has_free_full_text, "Resolved full-text links");
    Ok(FullTextLinks {
        pmid: pmid.to_string(),
        has_free_full_text,
        available: !links.is_empty(),
        full_text_links: links,
    })
}
