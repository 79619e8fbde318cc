//! Dispatcher behaviour against an in-memory Entrez mock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pubmed_mcp_agent::config::AnalysisConfig;
use pubmed_mcp_agent::{serve, Dispatcher, Response};
use pubmed_mcp_common::{Error, Result};
use pubmed_mcp_entrez::models::{JournalInfo, PublicationDate};
use pubmed_mcp_entrez::{ArticleRecord, Author, EntrezApi, SearchRequest, SearchResult};
use serde_json::{json, Value};

#[derive(Default)]
struct MockApi {
    records: Vec<ArticleRecord>,
    hits: Vec<String>,
    citations: HashMap<String, usize>,
    pmc: HashMap<String, Vec<String>>,
    fail: bool,
    terms: Mutex<Vec<String>>,
}

impl MockApi {
    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Status { status: 429, url: "https://eutils.ncbi.nlm.nih.gov".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl EntrezApi for MockApi {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.check()?;
        self.terms.lock().unwrap().push(request.term.clone());
        Ok(SearchResult {
            ids: self.hits.iter().take(request.max_results).cloned().collect(),
            total: self.hits.len() as u64,
        })
    }

    async fn count(&self, term: &str) -> Result<u64> {
        self.check()?;
        self.terms.lock().unwrap().push(term.to_string());
        // "... AND 2021[Publication Date]" -> counts derived from the year
        let year: u64 = term
            .rsplit(" AND ")
            .next()
            .and_then(|t| t.strip_suffix("[Publication Date]"))
            .and_then(|y| y.parse().ok())
            .unwrap_or(0);
        Ok(year % 10)
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<ArticleRecord>> {
        self.check()?;
        Ok(self.records.iter().filter(|r| ids.contains(&r.pmid)).cloned().collect())
    }

    async fn citation_counts(&self, ids: &[String]) -> Result<HashMap<String, usize>> {
        self.check()?;
        Ok(ids.iter().map(|id| (id.clone(), self.citations.get(id).copied().unwrap_or(0))).collect())
    }

    async fn pmc_links(&self, pmid: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.pmc.get(pmid).cloned().unwrap_or_default())
    }
}

fn record(pmid: &str, journal: &str, year: i32, authors: &[&str], keywords: &[&str], abstract_text: &str) -> ArticleRecord {
    ArticleRecord {
        pmid: pmid.into(),
        title: format!("Article {pmid}"),
        journal: JournalInfo { name: journal.into(), ..Default::default() },
        publication_date: PublicationDate { year: Some(year), ..Default::default() },
        authors: authors
            .iter()
            .map(|last| Author { last_name: last.to_string(), fore_name: "A".into(), ..Default::default() })
            .collect(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        abstract_text: abstract_text.into(),
        doi: Some(format!("10.1000/{pmid}")),
        ..Default::default()
    }
}

fn corpus() -> MockApi {
    MockApi {
        records: vec![
            record("1", "Nature", 2020, &["Smith", "Doe"], &["CRISPR", "cancer"], "tumor immune checkpoint therapy"),
            record("2", "Nature", 2021, &["Smith", "Doe", "Lee"], &["crispr"], "checkpoint tumor immune response"),
            record("3", "Cell", 2021, &["Lee", "Park"], &["microbiome"], "gut microbiome bacteria diet"),
            record("4", "Science", 2023, &["Park"], &["CRISPR", "microbiome"], "bacteria diet gut flora"),
        ],
        hits: (1..=250).map(|i| i.to_string()).collect(),
        citations: HashMap::from([("1".to_string(), 12), ("2".to_string(), 3)]),
        pmc: HashMap::from([("1".to_string(), vec!["7000001".to_string()])]),
        ..Default::default()
    }
}

fn dispatcher(api: MockApi) -> Dispatcher {
    Dispatcher::new(Arc::new(api), AnalysisConfig::default())
}

fn data(response: Response) -> Value {
    match response {
        Response::Success { data } => data,
        Response::Error { kind, message } => panic!("expected success, got {kind}: {message}"),
    }
}

fn error_kind(response: &Response) -> (&str, &str) {
    match response {
        Response::Error { kind, message } => (kind.as_str(), message.as_str()),
        Response::Success { data } => panic!("expected error, got {data}"),
    }
}

const ALL_IDS: [&str; 4] = ["1", "2", "3", "4"];

#[tokio::test]
async fn test_search_respects_max_results() {
    let d = dispatcher(corpus());
    for n in [1, 10, 100, 250] {
        let out = data(d.handle("search", &json!({"query": "cancer", "max_results": n})).await);
        let ids = out["id_list"].as_array().unwrap();
        assert!(ids.len() <= n as usize);
        assert_eq!(out["count"], ids.len());
        assert_eq!(out["total_available"], 250);
    }
}

#[tokio::test]
async fn test_search_builds_date_filter() {
    let api = Arc::new(corpus());
    let d = Dispatcher::new(api.clone(), AnalysisConfig::default());
    let out = data(
        d.handle("search", &json!({"query": "KRAS", "min_date": "2020/01/01", "max_date": "2021/12/31"}))
            .await,
    );
    assert_eq!(out["query"], "KRAS AND 2020/01/01:2021/12/31[Date - Publication]");
    assert_eq!(api.terms.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_validation() {
    let d = dispatcher(corpus());

    let r = d.handle("search", &json!({})).await;
    assert_eq!(error_kind(&r), ("missing_field", "missing required field: query"));

    let r = d.handle("search", &json!({"query": "x", "max_results": 0})).await;
    assert_eq!(error_kind(&r).0, "invalid_field");

    let r = d.handle("search", &json!({"query": "x", "sort": "citations"})).await;
    assert_eq!(error_kind(&r).0, "invalid_field");

    let r = d.handle("search", &json!({"query": "x", "min_date": "last year"})).await;
    assert_eq!(error_kind(&r).0, "invalid_field");

    let r = d.handle("search", &json!("cancer")).await;
    assert_eq!(error_kind(&r).0, "invalid_field");
}

#[tokio::test]
async fn test_advanced_search_combines_fields() {
    let d = dispatcher(corpus());
    let out = data(
        d.handle(
            "advanced_search",
            &json!({"search_params": {"author": "Smith J", "journal": "Nature", "year": 2021, "max_results": 5}}),
        )
        .await,
    );
    assert_eq!(out["query"], "Smith J[Author] AND Nature[Journal] AND 2021[Publication Date]");
    assert!(out["id_list"].as_array().unwrap().len() <= 5);

    let r = d.handle("advanced_search", &json!({"search_params": {"max_results": 5}})).await;
    assert_eq!(error_kind(&r).0, "invalid_field");

    let r = d.handle("advanced_search", &json!({})).await;
    assert_eq!(error_kind(&r), ("missing_field", "missing required field: search_params"));
}

#[tokio::test]
async fn test_fetch_details_round_trip() {
    let mut api = corpus();
    api.records.push(record("34567890", "Lancet", 2021, &["Roe"], &[], ""));
    let d = dispatcher(api);

    let out = data(d.handle("fetch_details", &json!({"id_list": ["34567890"]})).await);
    assert_eq!(out["count"], 1);
    assert_eq!(out["articles"][0]["pmid"], "34567890");
    assert_eq!(out["articles"][0]["journal"]["name"], "Lancet");
}

#[tokio::test]
async fn test_empty_id_list_is_missing_field_for_every_id_action() {
    let d = dispatcher(corpus());
    for action in [
        "fetch_details",
        "journal_distribution",
        "author_network",
        "keyword_analysis",
        "cluster_articles",
        "citation_analysis",
        "publication_trends",
    ] {
        let r = d.handle(action, &json!({"id_list": []})).await;
        assert_eq!(error_kind(&r), ("missing_field", "missing required field: id_list"), "{action}");
    }
}

#[tokio::test]
async fn test_unsupported_action() {
    let d = dispatcher(corpus());
    let r = d.handle("bogus", &json!({})).await;
    assert_eq!(error_kind(&r), ("unsupported_action", "unsupported action: bogus"));
}

#[tokio::test]
async fn test_publication_trends_by_query_fills_every_year() {
    let api = Arc::new(corpus());
    let d = Dispatcher::new(api.clone(), AnalysisConfig::default());
    let out = data(
        d.handle("publication_trends", &json!({"query": "cancer", "start_year": 2015, "end_year": 2022}))
            .await,
    );

    let trend = out["trend_data"].as_array().unwrap();
    assert_eq!(trend.len(), 8);
    for (i, entry) in trend.iter().enumerate() {
        let year = 2015 + i as u64;
        assert_eq!(entry["year"], year);
        assert_eq!(entry["publication_count"], year % 10);
    }
    let sum: u64 = trend.iter().map(|e| e["publication_count"].as_u64().unwrap()).sum();
    assert_eq!(out["total"], sum);
    assert_eq!(out["mode"], "query");
    assert_eq!(api.terms.lock().unwrap()[0], "(cancer) AND 2015[Publication Date]");
}

#[tokio::test]
async fn test_publication_trends_query_span_is_capped() {
    let api = Arc::new(corpus());
    let d = Dispatcher::new(api.clone(), AnalysisConfig::default());

    let r = d
        .handle("publication_trends", &json!({"query": "cancer", "start_year": 1850, "end_year": 2020}))
        .await;
    let (kind, message) = error_kind(&r);
    assert_eq!(kind, "invalid_field");
    assert!(message.contains("100 years"), "{message}");
    assert!(api.terms.lock().unwrap().is_empty());

    let out = data(
        d.handle("publication_trends", &json!({"query": "cancer", "start_year": 1921, "end_year": 2020}))
            .await,
    );
    assert_eq!(out["trend_data"].as_array().unwrap().len(), 100);
    assert_eq!(api.terms.lock().unwrap().len(), 100);

    let out = data(
        d.handle("publication_trends", &json!({"id_list": ALL_IDS, "start_year": 1850, "end_year": 2020}))
            .await,
    );
    assert_eq!(out["mode"], "id_list");
}

#[tokio::test]
async fn test_publication_trends_from_ids() {
    let d = dispatcher(corpus());
    let out = data(
        d.handle("publication_trends", &json!({"id_list": ALL_IDS, "start_year": 2020, "end_year": 2022}))
            .await,
    );
    let counts: Vec<u64> = out["trend_data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["publication_count"].as_u64().unwrap())
        .collect();
    assert_eq!(counts, vec![1, 2, 0]);
    assert!(out["total"].as_u64().unwrap() <= 4);

    let r = d.handle("publication_trends", &json!({})).await;
    assert_eq!(error_kind(&r).0, "missing_field");

    let r = d
        .handle("publication_trends", &json!({"query": "x", "start_year": 2022, "end_year": 2020}))
        .await;
    assert_eq!(error_kind(&r).0, "invalid_field");
}

#[tokio::test]
async fn test_journal_distribution_sorted_and_truncated() {
    let d = dispatcher(corpus());
    let out = data(d.handle("journal_distribution", &json!({"id_list": ALL_IDS, "top_n": 2})).await);
    let rows = out["journal_data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["journal"], "Nature");
    assert_eq!(rows[0]["article_count"], 2);
    assert!(rows[0]["article_count"].as_u64() >= rows[1]["article_count"].as_u64());
    assert_eq!(out["total_articles"], 4);
}

#[tokio::test]
async fn test_author_network_threshold() {
    let d = dispatcher(corpus());
    let out = data(d.handle("author_network", &json!({"id_list": ALL_IDS, "min_collaborations": 2})).await);
    let edges = out["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["source"], "Doe A");
    assert_eq!(edges[0]["target"], "Smith A");
    assert!(edges.iter().all(|e| e["weight"].as_u64().unwrap() >= 2));
    let nodes = out["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|n| n["articles"] == 2 && n["degree"] == 1));
    assert_eq!(out["min_collaborations"], 2);
}

#[tokio::test]
async fn test_keyword_analysis() {
    let d = dispatcher(corpus());
    let out = data(d.handle("keyword_analysis", &json!({"id_list": ALL_IDS, "top_n": "2"})).await);
    let rows = out["keyword_data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["keyword"], "CRISPR");
    assert_eq!(rows[0]["frequency"], 3);
    assert_eq!(rows[1]["keyword"], "microbiome");
    assert_eq!(out["total_keywords"], 3);
    assert_eq!(out["include_mesh"], false);
}

#[tokio::test]
async fn test_cluster_articles() {
    let d = dispatcher(corpus());
    let out = data(d.handle("cluster_articles", &json!({"id_list": ALL_IDS, "n_clusters": 2})).await);
    assert_eq!(out["clustered"], true);
    assert_eq!(out["text_column"], "abstract");
    let articles = out["clustered_articles"].as_array().unwrap();
    assert_eq!(articles.len(), 4);
    assert!(articles.iter().all(|a| a["cluster"].as_u64().unwrap() < 2));
    assert!(out["clusters"].as_array().unwrap().iter().all(|c| c["size"].as_u64().unwrap() > 0));

    let out = data(d.handle("cluster_articles", &json!({"id_list": ["1"], "n_clusters": 3})).await);
    assert_eq!(out["clustered"], false);
    assert!(out["clustered_articles"][0]["cluster"].is_null());

    let r = d.handle("cluster_articles", &json!({"id_list": ["1"], "text_column": "body"})).await;
    assert_eq!(error_kind(&r).0, "invalid_field");
}

#[tokio::test]
async fn test_citation_analysis() {
    let d = dispatcher(corpus());
    let out = data(d.handle("citation_analysis", &json!({"id_list": ALL_IDS})).await);
    let rows = out["citation_data"].as_array().unwrap();
    assert_eq!(rows[0]["pmid"], "1");
    assert_eq!(rows[0]["citations"], 12);
    assert_eq!(out["summary"]["total_citations"], 15);
    assert_eq!(out["summary"]["max_citations"], 12);
    assert_eq!(out["summary"]["uncited"], 2);
    assert_eq!(out["summary"]["articles"], 4);
    assert_eq!(out["summary"]["h_index"], 2);
}

#[tokio::test]
async fn test_download_full_text() {
    let d = dispatcher(corpus());

    let out = data(d.handle("download_full_text", &json!({"pmid": "1"})).await);
    assert_eq!(out["has_free_full_text"], true);
    assert_eq!(out["full_text_links"][0]["type"], "PMC");

    let out = data(d.handle("download_full_text", &json!({"pmid": 2})).await);
    assert_eq!(out["has_free_full_text"], false);
    assert_eq!(out["available"], true);
    assert_eq!(out["full_text_links"][0]["url"], "https://doi.org/10.1000/2");

    let r = d.handle("download_full_text", &json!({})).await;
    assert_eq!(error_kind(&r), ("missing_field", "missing required field: pmid"));
}

#[tokio::test]
async fn test_generate_wordcloud() {
    let d = dispatcher(MockApi { fail: true, ..Default::default() });
    let out = data(
        d.handle(
            "generate_wordcloud",
            &json!({"text": "gene therapy gene editing gene <b>", "max_words": 3, "colormap": "plasma"}),
        )
        .await,
    );
    assert_eq!(out["image_format"], "svg");
    assert_eq!(out["title"], "Word Cloud");
    assert!(out["word_count"].as_u64().unwrap() <= 3);
    assert_eq!(out["words"][0]["word"], "gene");

    let svg = String::from_utf8(BASE64.decode(out["chart"].as_str().unwrap()).unwrap()).unwrap();
    assert!(svg.starts_with("<svg"));

    let r = d.handle("generate_wordcloud", &json!({"text": "x y", "colormap": "rainbow"})).await;
    assert_eq!(error_kind(&r).0, "invalid_parameter");

    let r = d.handle("generate_wordcloud", &json!({"text": "x y", "background_color": "red;}"})).await;
    assert_eq!(error_kind(&r).0, "invalid_parameter");
}

#[tokio::test]
async fn test_external_failure_fails_whole_action() {
    let d = dispatcher(MockApi { fail: true, ..Default::default() });
    let r = d.handle("journal_distribution", &json!({"id_list": ["1"]})).await;
    let (kind, message) = error_kind(&r);
    assert_eq!(kind, "external_api");
    assert!(message.contains("429"));
}

#[tokio::test]
async fn test_handle_value_rejects_malformed_requests() {
    let d = dispatcher(corpus());
    let r = d.handle_value(json!({"params": {}})).await;
    assert_eq!(error_kind(&r).0, "invalid_request");

    let r = d.handle_value(json!({"action": "search"})).await;
    assert_eq!(error_kind(&r).0, "missing_field");
}

#[tokio::test]
async fn test_serve_answers_each_line() {
    let d = dispatcher(corpus());
    let input = concat!(
        r#"{"action": "search", "params": {"query": "x", "max_results": 2}}"#, "\n",
        "\n",
        "not json\n",
        r#"{"action": "bogus", "params": {}}"#, "\n",
    );
    let mut output: Vec<u8> = Vec::new();

    let answered = tokio_test::assert_ok!(serve::serve_lines(&d, input.as_bytes(), &mut output).await);
    assert_eq!(answered, 3);

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["status"], "success");
    assert_eq!(lines[0]["data"]["count"], 2);
    assert_eq!(lines[1]["kind"], "invalid_request");
    assert_eq!(lines[2]["kind"], "unsupported_action");
}
