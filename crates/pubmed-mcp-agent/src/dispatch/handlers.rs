//! One function per action. Each validates its params, calls PubMed and
//! tabulates the result into the `data` payload.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Datelike;
use pubmed_mcp_analysis::cluster::{cluster_articles, ClusterOptions, TextField};
use pubmed_mcp_analysis::wordcloud::{self, Colormap, WordCloudOptions};
use pubmed_mcp_analysis::{citations, journals, keywords, network, trends, AnalysisError};
use pubmed_mcp_entrez::query::{advanced_query, search_term, year_query, FieldTerms};
use pubmed_mcp_entrez::{resolve_full_text, EntrezApi, SearchRequest, SortOrder};
use serde_json::{json, Value};
use tracing::debug;

use super::params::Params;
use super::DispatchError;
use crate::config::AnalysisConfig;

type Result<T> = std::result::Result<T, DispatchError>;

const MAX_RESULTS_LIMIT: i64 = 10_000;
const TOP_N_LIMIT: i64 = 10_000;
const EARLIEST_YEAR: i64 = 1800;
/// Query mode issues one esearch per year.
const MAX_QUERY_YEARS: i32 = 100;

// ─────────────────────────────────────────────
//  Search
// ─────────────────────────────────────────────

struct SearchOptions {
    max_results: usize,
    sort: SortOrder,
    min_date: Option<String>,
    max_date: Option<String>,
}

impl SearchOptions {
    fn from_params(params: &Params) -> Result<Self> {
        let sort = match params.text("sort")? {
            None => SortOrder::Relevance,
            Some(s) => SortOrder::parse(&s).ok_or_else(|| {
                DispatchError::invalid("sort", format!("'{}' is not one of relevance, pub_date, author, journal", s))
            })?,
        };
        Ok(Self {
            max_results: params.integer("max_results", 100, 1..=MAX_RESULTS_LIMIT)? as usize,
            sort,
            min_date: params.date("min_date")?,
            max_date: params.date("max_date")?,
        })
    }
}

async fn run_search(api: &dyn EntrezApi, query: &str, options: SearchOptions) -> Result<Value> {
    let term = search_term(query, options.min_date.as_deref(), options.max_date.as_deref());
    let request = SearchRequest { term, max_results: options.max_results, sort: options.sort };
    let result = api.search(&request).await?;

    let mut ids = result.ids;
    ids.truncate(request.max_results);
    Ok(json!({
        "id_list": ids,
        "count": ids.len(),
        "total_available": result.total,
        "query": request.term,
    }))
}

pub(crate) async fn search(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let query = params.required_text("query")?;
    let options = SearchOptions::from_params(params)?;
    run_search(api, &query, options).await
}

pub(crate) async fn advanced_search(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let fields = params.object("search_params")?;
    let terms = FieldTerms {
        author: fields.text("author")?,
        title: fields.text("title")?,
        journal: fields.text("journal")?,
        year: fields.text("year")?,
        abstract_text: fields.text("abstract")?,
        mesh_terms: fields.text("mesh_terms")?,
    };
    if terms.is_empty() {
        return Err(DispatchError::invalid(
            "search_params",
            "at least one of author, title, journal, year, abstract, mesh_terms is required",
        ));
    }
    let options = SearchOptions::from_params(&fields)?;
    run_search(api, &advanced_query(&terms), options).await
}

// ─────────────────────────────────────────────
//  Record-based analyses
// ─────────────────────────────────────────────

pub(crate) async fn fetch_details(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let articles = api.fetch_details(&ids).await?;
    Ok(json!({ "articles": articles, "count": articles.len() }))
}

pub(crate) async fn publication_trends(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let current_year = chrono::Local::now().year() as i64;
    let start_year = params.integer("start_year", 2000, EARLIEST_YEAR..=current_year + 1)? as i32;
    let end_year = params.integer("end_year", current_year, EARLIEST_YEAR..=current_year + 1)? as i32;
    if start_year > end_year {
        return Err(DispatchError::invalid("start_year", format!("{} is after end_year {}", start_year, end_year)));
    }

    let (trend, mode) = if let Some(query) = params.text("query")? {
        if end_year - start_year >= MAX_QUERY_YEARS {
            return Err(DispatchError::invalid(
                "start_year",
                format!("query mode covers at most {} years, got {}..={}", MAX_QUERY_YEARS, start_year, end_year),
            ));
        }
        let mut counts = BTreeMap::new();
        for year in start_year..=end_year {
            counts.insert(year, api.count(&year_query(&query, year)).await?);
        }
        (trends::fill_years(&counts, start_year, end_year), "query")
    } else if params.has("id_list") {
        let articles = api.fetch_details(&params.id_list("id_list")?).await?;
        (trends::count_by_year(&articles, start_year, end_year), "id_list")
    } else {
        return Err(DispatchError::MissingField("query or id_list"));
    };

    Ok(json!({
        "trend_data": trend,
        "total": trends::total(&trend),
        "start_year": start_year,
        "end_year": end_year,
        "mode": mode,
    }))
}

pub(crate) async fn journal_distribution(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let top_n = params.integer("top_n", 10, 1..=TOP_N_LIMIT)? as usize;
    let articles = api.fetch_details(&ids).await?;
    let rows = journals::distribution(&articles, top_n);
    Ok(json!({ "journal_data": rows, "total_articles": articles.len() }))
}

pub(crate) async fn author_network(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let min_collaborations = params.integer("min_collaborations", 2, 1..=i64::from(u32::MAX))? as u32;
    let articles = api.fetch_details(&ids).await?;
    let graph = network::author_network(&articles, min_collaborations);
    Ok(json!(graph))
}

pub(crate) async fn keyword_analysis(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let top_n = params.integer("top_n", 20, 1..=TOP_N_LIMIT)? as usize;
    let include_mesh = params.boolean("include_mesh", false)?;
    let articles = api.fetch_details(&ids).await?;

    let mut rows = keywords::keyword_frequencies(&articles, usize::MAX, include_mesh);
    let total_keywords = rows.len();
    rows.truncate(top_n);
    Ok(json!({ "keyword_data": rows, "total_keywords": total_keywords, "include_mesh": include_mesh }))
}

pub(crate) async fn cluster(
    api: &dyn EntrezApi,
    params: &Params,
    config: &AnalysisConfig,
) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let n_clusters = params.integer("n_clusters", 5, 1..=100)? as usize;
    let column = params.text_or("text_column", "abstract")?;
    let field = TextField::parse(&column).ok_or_else(|| {
        DispatchError::invalid("text_column", format!("'{}' is not one of abstract, title, title_abstract", column))
    })?;

    let articles = api.fetch_details(&ids).await?;
    let mut options = ClusterOptions::new(n_clusters, field);
    options.max_features = config.max_tfidf_features;
    let report = cluster_articles(&articles, &options)?;
    Ok(json!(report))
}

pub(crate) async fn citation_analysis(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let ids = params.id_list("id_list")?;
    let articles = api.fetch_details(&ids).await?;
    let counts = api.citation_counts(&ids).await?;
    debug!(articles = articles.len(), counted = counts.len(), "Citation counts fetched");
    Ok(json!(citations::citation_report(&articles, &counts)))
}

pub(crate) async fn download_full_text(api: &dyn EntrezApi, params: &Params) -> Result<Value> {
    let pmid = params.pmid("pmid")?;
    let links = resolve_full_text(api, &pmid).await?;
    Ok(json!(links))
}

// ─────────────────────────────────────────────
//  Word cloud (no PubMed access)
// ─────────────────────────────────────────────

pub(crate) fn generate_wordcloud(params: &Params, config: &AnalysisConfig) -> Result<Value> {
    let text = params.required_text("text")?;
    let colormap_name = params.text_or("colormap", "viridis")?;
    let colormap = Colormap::parse(&colormap_name).ok_or_else(|| AnalysisError::InvalidParameter {
        name: "colormap",
        reason: format!("unknown colormap '{}'", colormap_name),
    })?;

    let options = WordCloudOptions {
        title: params.text_or("title", "Word Cloud")?,
        max_words: params.integer("max_words", 100, 1..=2000)? as usize,
        background_color: params.text_or("background_color", "white")?,
        colormap,
        chinese: params.boolean("chinese", false)?,
        stopwords: params.string_list("stopwords")?,
        width: config.wordcloud_width,
        height: config.wordcloud_height,
    };

    let cloud = wordcloud::generate(&text, &options)?;
    Ok(json!({
        "title": cloud.title,
        "image_format": "svg",
        "chart": BASE64.encode(cloud.svg.as_bytes()),
        "word_count": cloud.words.len(),
        "words": cloud.words,
    }))
}
