//! The fixed set of dispatcher actions and their parameter schemas.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use super::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Search,
    FetchDetails,
    AdvancedSearch,
    PublicationTrends,
    JournalDistribution,
    AuthorNetwork,
    KeywordAnalysis,
    ClusterArticles,
    CitationAnalysis,
    DownloadFullText,
    GenerateWordcloud,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::Search,
        Action::FetchDetails,
        Action::AdvancedSearch,
        Action::PublicationTrends,
        Action::JournalDistribution,
        Action::AuthorNetwork,
        Action::KeywordAnalysis,
        Action::ClusterArticles,
        Action::CitationAnalysis,
        Action::DownloadFullText,
        Action::GenerateWordcloud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Search              => "search",
            Action::FetchDetails        => "fetch_details",
            Action::AdvancedSearch      => "advanced_search",
            Action::PublicationTrends   => "publication_trends",
            Action::JournalDistribution => "journal_distribution",
            Action::AuthorNetwork       => "author_network",
            Action::KeywordAnalysis     => "keyword_analysis",
            Action::ClusterArticles     => "cluster_articles",
            Action::CitationAnalysis    => "citation_analysis",
            Action::DownloadFullText    => "download_full_text",
            Action::GenerateWordcloud   => "generate_wordcloud",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Action::Search => "Search PubMed and return matching PMIDs.",
            Action::FetchDetails => {
                "Fetch full article records (title, journal, authors, abstract, keywords, MeSH, DOI) for PMIDs."
            }
            Action::AdvancedSearch => {
                "Search PubMed with field-scoped terms (author, title, journal, year, abstract, MeSH)."
            }
            Action::PublicationTrends => {
                "Publication counts per year, either for a query on PubMed (one request per year, at most 100 years) or tabulated from a PMID list."
            }
            Action::JournalDistribution => "Count articles per journal, most frequent first.",
            Action::AuthorNetwork => "Co-author network with collaboration counts and degree centrality.",
            Action::KeywordAnalysis => "Keyword frequencies, optionally including MeSH descriptors.",
            Action::ClusterArticles => "Group articles by TF-IDF similarity of their text using k-means.",
            Action::CitationAnalysis => "Cited-by counts from PubMed Central with summary statistics.",
            Action::DownloadFullText => "Free full-text (PMC) or publisher (DOI) links for a PMID.",
            Action::GenerateWordcloud => "Render a word cloud of free text as an SVG image.",
        }
    }

    /// JSON Schema of the action's `params`.
    pub fn parameters_schema(&self) -> Value {
        let id_list = json!({
            "type": "array",
            "items": { "type": "string", "pattern": "^[0-9]+$" },
            "minItems": 1,
            "description": "PubMed IDs"
        });
        let search_props = json!({
            "max_results": { "type": "integer", "default": 100, "minimum": 1, "maximum": 10000 },
            "sort":        { "type": "string", "enum": ["relevance", "pub_date", "author", "journal"], "default": "relevance" },
            "min_date":    { "type": "string", "description": "YYYY/MM/DD" },
            "max_date":    { "type": "string", "description": "YYYY/MM/DD" }
        });

        match self {
            Action::Search => {
                let mut props = search_props;
                props["query"] = json!({ "type": "string", "description": "PubMed query" });
                json!({ "type": "object", "properties": props, "required": ["query"] })
            }
            Action::FetchDetails | Action::CitationAnalysis => json!({
                "type": "object",
                "properties": { "id_list": id_list },
                "required": ["id_list"]
            }),
            Action::AdvancedSearch => {
                let mut props = search_props;
                for field in ["author", "title", "journal", "year", "abstract", "mesh_terms"] {
                    props[field] = json!({ "type": "string" });
                }
                json!({
                    "type": "object",
                    "properties": {
                        "search_params": {
                            "type": "object",
                            "properties": props,
                            "description": "At least one of author, title, journal, year, abstract, mesh_terms"
                        }
                    },
                    "required": ["search_params"]
                })
            }
            Action::PublicationTrends => json!({
                "type": "object",
                "properties": {
                    "query":      { "type": "string", "description": "Counted per year on PubMed" },
                    "id_list":    id_list,
                    "start_year": { "type": "integer", "default": 2000 },
                    "end_year":   { "type": "integer", "description": "Defaults to the current year" }
                }
            }),
            Action::JournalDistribution => json!({
                "type": "object",
                "properties": {
                    "id_list": id_list,
                    "top_n":   { "type": "integer", "default": 10, "minimum": 1 }
                },
                "required": ["id_list"]
            }),
            Action::AuthorNetwork => json!({
                "type": "object",
                "properties": {
                    "id_list":            id_list,
                    "min_collaborations": { "type": "integer", "default": 2, "minimum": 1 }
                },
                "required": ["id_list"]
            }),
            Action::KeywordAnalysis => json!({
                "type": "object",
                "properties": {
                    "id_list":      id_list,
                    "top_n":        { "type": "integer", "default": 20, "minimum": 1 },
                    "include_mesh": { "type": "boolean", "default": false }
                },
                "required": ["id_list"]
            }),
            Action::ClusterArticles => json!({
                "type": "object",
                "properties": {
                    "id_list":     id_list,
                    "n_clusters":  { "type": "integer", "default": 5, "minimum": 1 },
                    "text_column": { "type": "string", "enum": ["abstract", "title", "title_abstract"], "default": "abstract" }
                },
                "required": ["id_list"]
            }),
            Action::DownloadFullText => json!({
                "type": "object",
                "properties": { "pmid": { "type": "string", "pattern": "^[0-9]+$" } },
                "required": ["pmid"]
            }),
            Action::GenerateWordcloud => json!({
                "type": "object",
                "properties": {
                    "text":             { "type": "string" },
                    "title":            { "type": "string", "default": "Word Cloud" },
                    "max_words":        { "type": "integer", "default": 100, "minimum": 1 },
                    "background_color": { "type": "string", "default": "white" },
                    "colormap":         { "type": "string", "default": "viridis",
                                          "enum": ["viridis", "plasma", "inferno", "magma", "cividis", "blues", "greens", "reds", "greys"] },
                    "chinese":          { "type": "boolean", "default": false },
                    "stopwords":        { "type": "array", "items": { "type": "string" } }
                },
                "required": ["text"]
            }),
        }
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnsupportedAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_and_case_sensitive() {
        let err = "bogus".parse::<Action>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported action: bogus");
        assert!("Search".parse::<Action>().is_err());
    }

    #[test]
    fn test_schemas_are_objects_with_declared_required_fields() {
        for action in Action::ALL {
            let schema = action.parameters_schema();
            assert_eq!(schema["type"], "object", "{action}");
            if let Some(required) = schema["required"].as_array() {
                for field in required {
                    let name = field.as_str().unwrap();
                    assert!(schema["properties"].get(name).is_some(), "{action}: {name}");
                }
            }
        }
    }
}
