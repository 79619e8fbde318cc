//! Citation report built from cited-by counts.

use std::collections::HashMap;

use pubmed_mcp_entrez::ArticleRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationRow {
    pub pmid: String,
    pub title: String,
    pub year: Option<i32>,
    pub citations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationSummary {
    pub articles: usize,
    pub total_citations: usize,
    pub mean_citations: f64,
    pub max_citations: usize,
    pub uncited: usize,
    pub h_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationReport {
    pub citation_data: Vec<CitationRow>,
    pub summary: CitationSummary,
}

/// Join records with their counts; PMIDs missing from `counts` have zero citations.
/// Rows are ordered most cited first, keeping input order among equals.
pub fn citation_report(articles: &[ArticleRecord], counts: &HashMap<String, usize>) -> CitationReport {
    let mut rows: Vec<CitationRow> = articles
        .iter()
        .map(|a| CitationRow {
            pmid: a.pmid.clone(),
            title: a.title.clone(),
            year: a.year(),
            citations: counts.get(&a.pmid).copied().unwrap_or(0),
        })
        .collect();
    rows.sort_by(|a, b| b.citations.cmp(&a.citations));

    let total_citations: usize = rows.iter().map(|r| r.citations).sum();
    let summary = CitationSummary {
        articles: rows.len(),
        total_citations,
        mean_citations: if rows.is_empty() { 0.0 } else { total_citations as f64 / rows.len() as f64 },
        max_citations: rows.first().map_or(0, |r| r.citations),
        uncited: rows.iter().filter(|r| r.citations == 0).count(),
        h_index: rows
            .iter()
            .enumerate()
            .take_while(|(i, r)| r.citations > *i)
            .count(),
    };

    CitationReport { citation_data: rows, summary }
}
