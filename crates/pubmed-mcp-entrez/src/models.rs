//! Data models for Entrez results.

use serde::{Deserialize, Serialize};

/// A PubMed article as returned by efetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub pmid: String,
    pub title: String,
    pub journal: JournalInfo,
    pub publication_date: PublicationDate,
    pub authors: Vec<Author>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub mesh_terms: Vec<String>,
    pub doi: Option<String>,
    pub pmcid: Option<String>,
    pub pubmed_url: String,
}

impl ArticleRecord {
    pub fn year(&self) -> Option<i32> {
        self.publication_date.year
    }

    /// Display names of all authors, in document order.
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().filter_map(Author::display_name).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalInfo {
    pub name: String,
    pub iso_abbreviation: String,
    pub issn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationDate {
    pub year: Option<i32>,
    pub month: Option<String>,
    pub day: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: String,
    pub fore_name: String,
    pub initials: String,
    pub collective_name: Option<String>,
    pub affiliations: Vec<String>,
}

impl Author {
    /// "LastName ForeName", the bare last name, or the collective name.
    pub fn display_name(&self) -> Option<String> {
        if let Some(collective) = &self.collective_name {
            if !collective.is_empty() {
                return Some(collective.clone());
            }
        }
        match (self.last_name.is_empty(), self.fore_name.is_empty()) {
            (true, _) => None,
            (false, true) => Some(self.last_name.clone()),
            (false, false) => Some(format!("{} {}", self.last_name, self.fore_name)),
        }
    }
}

/// Sort orders accepted by esearch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PubDate,
    Author,
    Journal,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortOrder::Relevance),
            "pub_date" | "pub+date" | "date" => Some(SortOrder::PubDate),
            "author" => Some(SortOrder::Author),
            "journal" => Some(SortOrder::Journal),
            _ => None,
        }
    }

    /// Value of the esearch `sort` parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::PubDate   => "pub_date",
            SortOrder::Author    => "Author",
            SortOrder::Journal   => "JournalName",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Complete esearch term, date filter included.
    pub term: String,
    pub max_results: usize,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub ids: Vec<String>,
    /// Number of matching records on the server, independent of `max_results`.
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTextLink {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    #[serde(rename = "PMC")]
    Pmc,
    #[serde(rename = "DOI")]
    Doi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullTextLinks {
    pub pmid: String,
    pub has_free_full_text: bool,
    pub available: bool,
    pub full_text_links: Vec<FullTextLink>,
}

pub fn pubmed_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
}

pub fn pmc_url(pmc_id: &str) -> String {
    let id = pmc_id.trim_start_matches("PMC");
    format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{}/", id)
}

pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_display_name_variants() {
        let full = Author { last_name: "Smith".into(), fore_name: "John".into(), ..Default::default() };
        let bare = Author { last_name: "Smith".into(), ..Default::default() };
        let group = Author { collective_name: Some("TCGA Consortium".into()), ..Default::default() };
        assert_eq!(full.display_name().as_deref(), Some("Smith John"));
        assert_eq!(bare.display_name().as_deref(), Some("Smith"));
        assert_eq!(group.display_name().as_deref(), Some("TCGA Consortium"));
        assert_eq!(Author::default().display_name(), None);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("relevance"), Some(SortOrder::Relevance));
        assert_eq!(SortOrder::parse("PUB_DATE"), Some(SortOrder::PubDate));
        assert_eq!(SortOrder::parse("journal").map(|s| s.as_param()), Some("JournalName"));
        assert_eq!(SortOrder::parse("citations"), None);
    }

    #[test]
    fn test_link_urls() {
        assert_eq!(pmc_url("7654321"), "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC7654321/");
        assert_eq!(pmc_url("PMC7654321"), "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC7654321/");
        assert_eq!(doi_url("10.1000/xyz"), "https://doi.org/10.1000/xyz");
        assert_eq!(pubmed_url("34567890"), "https://pubmed.ncbi.nlm.nih.gov/34567890/");
    }

    #[test]
    fn test_article_serializes_abstract_key() {
        let article = ArticleRecord { pmid: "1".into(), abstract_text: "Text".into(), ..Default::default() };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["abstract"], "Text");
        assert_eq!(value["pmid"], "1");
    }
}
