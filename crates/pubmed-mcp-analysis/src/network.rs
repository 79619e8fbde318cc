//! Co-author collaboration network.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use pubmed_mcp_entrez::ArticleRecord;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorNode {
    pub name: String,
    pub degree: usize,
    /// degree / (node count - 1)
    pub centrality: f64,
    pub articles: usize,
}

/// Undirected edge; `source < target` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaborationEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorNetwork {
    pub nodes: Vec<AuthorNode>,
    pub edges: Vec<CollaborationEdge>,
    pub min_collaborations: u32,
}

/// Count co-authorships across `articles` and keep pairs with at least
/// `min_collaborations` shared articles. Authors left without an edge are dropped.
pub fn author_network(articles: &[ArticleRecord], min_collaborations: u32) -> AuthorNetwork {
    let mut weights: BTreeMap<(String, String), u32> = BTreeMap::new();
    let mut article_counts: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let names: BTreeSet<String> = article.author_names().into_iter().collect();
        for name in &names {
            *article_counts.entry(name.clone()).or_insert(0) += 1;
        }
        let names: Vec<&String> = names.iter().collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                *weights.entry(((*a).clone(), (*b).clone())).or_insert(0) += 1;
            }
        }
    }

    let mut edges: Vec<CollaborationEdge> = weights
        .into_iter()
        .filter(|(_, w)| *w >= min_collaborations)
        .map(|((source, target), weight)| CollaborationEdge { source, target, weight })
        .collect();
    edges.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });

    let mut degrees: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &edges {
        *degrees.entry(edge.source.as_str()).or_insert(0) += 1;
        *degrees.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    let denominator = degrees.len().saturating_sub(1) as f64;
    let mut nodes: Vec<AuthorNode> = degrees
        .iter()
        .map(|(name, degree)| AuthorNode {
            name: name.to_string(),
            degree: *degree,
            centrality: if denominator > 0.0 { *degree as f64 / denominator } else { 0.0 },
            articles: article_counts.get(*name).copied().unwrap_or(0),
        })
        .collect();
    nodes.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.name.cmp(&b.name)));

    debug!(nodes = nodes.len(), edges = edges.len(), min_collaborations, "Built author network");
    AuthorNetwork { nodes, edges, min_collaborations }
}
