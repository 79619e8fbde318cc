//! TF-IDF vectorisation and k-means clustering of article text.

use std::collections::HashMap;

use pubmed_mcp_entrez::ArticleRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::text::{english_stop_words, word_tokens};

const CONVERGENCE_TOLERANCE: f64 = 1e-4;

/// Which part of a record is clustered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Abstract,
    TitleAbstract,
}

impl TextField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "title" => Some(Self::Title),
            "abstract" => Some(Self::Abstract),
            "title_abstract" => Some(Self::TitleAbstract),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
            Self::TitleAbstract => "title_abstract",
        }
    }

    pub fn extract(&self, article: &ArticleRecord) -> String {
        match self {
            Self::Title => article.title.clone(),
            Self::Abstract => article.abstract_text.clone(),
            Self::TitleAbstract => format!("{} {}", article.title, article.abstract_text)
                .trim()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub n_clusters: usize,
    pub text_field: TextField,
    pub max_features: usize,
    pub max_iterations: usize,
    pub seed: u64,
    pub top_terms: usize,
}

impl ClusterOptions {
    pub fn new(n_clusters: usize, text_field: TextField) -> Self {
        Self {
            n_clusters,
            text_field,
            max_features: 1000,
            max_iterations: 300,
            seed: 42,
            top_terms: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteredArticle {
    pub pmid: String,
    pub title: String,
    /// `None` when the article had no usable text or clustering was skipped.
    pub cluster: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub top_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    /// False when there were fewer usable documents than requested clusters.
    pub clustered: bool,
    pub n_clusters: usize,
    pub text_column: &'static str,
    pub clustered_articles: Vec<ClusteredArticle>,
    /// Non-empty clusters only; identical documents can leave some labels unused.
    pub clusters: Vec<ClusterSummary>,
}

/// L2-normalised TF-IDF rows over a vocabulary capped at `max_features` terms.
struct TfIdf {
    vocabulary: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TfIdf {
    fn fit(documents: &[Vec<String>], max_features: usize) -> Self {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let mut seen: Vec<&str> = Vec::new();
            for token in doc {
                let token = token.as_str();
                *totals.entry(token).or_insert(0) += 1;
                if !seen.contains(&token) {
                    seen.push(token);
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);
        let mut vocabulary: Vec<String> = ranked.iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();

        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();
        let n = documents.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let df = doc_freq.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows = documents
            .iter()
            .map(|doc| {
                let mut row = vec![0.0; vocabulary.len()];
                for token in doc {
                    if let Some(&i) = index.get(token.as_str()) {
                        row[i] += 1.0;
                    }
                }
                for (value, weight) in row.iter_mut().zip(&idf) {
                    *value *= weight;
                }
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|v| *v /= norm);
                }
                row
            })
            .collect();

        Self { vocabulary, rows }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding.
fn initial_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut chosen: Vec<usize> = vec![rng.gen_range(0..points.len())];
    while chosen.len() < k {
        let centroids: Vec<Vec<f64>> = chosen.iter().map(|&i| points[i].clone()).collect();
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let next = if total <= 0.0 {
            (0..points.len()).find(|i| !chosen.contains(i)).unwrap_or(0)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = points.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        };
        chosen.push(next);
    }
    chosen.iter().map(|&i| points[i].clone()).collect()
}

/// Lloyd iterations; returns one label per point.
fn kmeans(points: &[Vec<f64>], k: usize, max_iterations: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = initial_centroids(points, k, &mut rng);
    let dims = points.first().map_or(0, Vec::len);
    let mut labels = vec![0usize; points.len()];

    for iteration in 0..max_iterations {
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centroids).0;
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut sizes = vec![0usize; k];
        for (point, &label) in points.iter().zip(&labels) {
            sizes[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            let updated = if sizes[c] == 0 {
                // reseed with the point farthest from its centroid
                let far = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, squared_distance(p, &centroids[labels[i]])))
                    .fold((0, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best })
                    .0;
                labels[far] = c;
                points[far].clone()
            } else {
                sums[c].iter().map(|s| s / sizes[c] as f64).collect()
            };
            shift += squared_distance(&centroids[c], &updated);
            centroids[c] = updated;
        }

        if shift <= CONVERGENCE_TOLERANCE {
            debug!(iteration, "k-means converged");
            break;
        }
    }

    for (label, point) in labels.iter_mut().zip(points) {
        *label = nearest(point, &centroids).0;
    }
    labels
}

/// Cluster articles by the text in `options.text_field`.
///
/// Articles whose text yields no tokens are reported with `cluster: None`.
/// With fewer usable articles than clusters nothing is clustered and
/// `clustered` is false.
pub fn cluster_articles(
    articles: &[ArticleRecord],
    options: &ClusterOptions,
) -> Result<ClusterReport, AnalysisError> {
    if options.n_clusters == 0 {
        return Err(AnalysisError::InvalidParameter {
            name: "n_clusters",
            reason: "must be at least 1".to_string(),
        });
    }

    let stop_words = english_stop_words();
    let documents: Vec<Vec<String>> = articles
        .iter()
        .map(|a| {
            word_tokens(&options.text_field.extract(a))
                .into_iter()
                .filter(|t| !stop_words.contains(t.as_str()))
                .collect()
        })
        .collect();
    let usable: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut clustered_articles: Vec<ClusteredArticle> = articles
        .iter()
        .map(|a| ClusteredArticle { pmid: a.pmid.clone(), title: a.title.clone(), cluster: None })
        .collect();

    if usable.len() < options.n_clusters {
        info!(
            usable = usable.len(),
            n_clusters = options.n_clusters,
            "Too few documents with text to cluster"
        );
        return Ok(ClusterReport {
            clustered: false,
            n_clusters: options.n_clusters,
            text_column: options.text_field.as_str(),
            clustered_articles,
            clusters: vec![],
        });
    }

    let docs: Vec<Vec<String>> = usable.iter().map(|&i| documents[i].clone()).collect();
    let tfidf = TfIdf::fit(&docs, options.max_features);
    let labels = kmeans(&tfidf.rows, options.n_clusters, options.max_iterations, options.seed);

    for (&doc_index, &label) in usable.iter().zip(&labels) {
        clustered_articles[doc_index].cluster = Some(label);
    }

    let clusters = (0..options.n_clusters)
        .map(|cluster| {
            let members: Vec<&Vec<f64>> = tfidf
                .rows
                .iter()
                .zip(&labels)
                .filter(|(_, l)| **l == cluster)
                .map(|(row, _)| row)
                .collect();
            let mut mean = vec![0.0; tfidf.vocabulary.len()];
            for row in &members {
                for (m, v) in mean.iter_mut().zip(row.iter()) {
                    *m += v;
                }
            }
            let mut ranked: Vec<(usize, f64)> = mean.into_iter().enumerate().filter(|(_, w)| *w > 0.0).collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ClusterSummary {
                cluster,
                size: members.len(),
                top_terms: ranked
                    .into_iter()
                    .take(options.top_terms)
                    .map(|(i, _)| tfidf.vocabulary[i].clone())
                    .collect(),
            }
        })
        .filter(|summary| summary.size > 0)
        .collect();

    debug!(documents = usable.len(), vocabulary = tfidf.vocabulary.len(), "Clustered articles");
    Ok(ClusterReport {
        clustered: true,
        n_clusters: options.n_clusters,
        text_column: options.text_field.as_str(),
        clustered_articles,
        clusters,
    })
}
