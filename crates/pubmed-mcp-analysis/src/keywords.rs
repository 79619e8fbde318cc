use std::collections::{BTreeMap, HashMap};

use pubmed_mcp_entrez::ArticleRecord;
use serde::Serialize;

use crate::text::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub frequency: usize,
}

#[derive(Default)]
struct Tally {
    total: usize,
    forms: BTreeMap<String, usize>,
}

impl Tally {
    /// Most frequent surface form; ties go to the lexicographically smallest.
    fn display(&self) -> String {
        let mut best: Option<(&String, usize)> = None;
        for (form, count) in &self.forms {
            if best.map_or(true, |(_, c)| *count > c) {
                best = Some((form, *count));
            }
        }
        best.map(|(f, _)| f.clone()).unwrap_or_default()
    }
}

/// Author keywords (and optionally MeSH descriptors) counted case-insensitively.
///
/// Entries holding several keywords separated by `;` are split. Each term
/// counts once per occurrence, so an article listing the same keyword as a
/// keyword and a MeSH term contributes two.
pub fn keyword_frequencies(
    articles: &[ArticleRecord],
    top_n: usize,
    include_mesh: bool,
) -> Vec<KeywordCount> {
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for article in articles {
        let mesh: &[String] = if include_mesh { &article.mesh_terms } else { &[] };
        for raw in article.keywords.iter().chain(mesh) {
            for part in raw.split(';') {
                let term = collapse_whitespace(part);
                if term.is_empty() {
                    continue;
                }
                let tally = tallies.entry(term.to_lowercase()).or_default();
                tally.total += 1;
                *tally.forms.entry(term).or_insert(0) += 1;
            }
        }
    }

    let mut rows: Vec<KeywordCount> = tallies
        .values()
        .map(|t| KeywordCount { keyword: t.display(), frequency: t.total })
        .collect();
    rows.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.keyword.cmp(&b.keyword)));
    rows.truncate(top_n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(keywords: &[&str], mesh: &[&str]) -> ArticleRecord {
        ArticleRecord {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            mesh_terms: mesh.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_case_insensitive_counting_with_majority_form() {
        let articles = vec![
            record(&["CRISPR", "gene editing"], &[]),
            record(&["crispr"], &[]),
            record(&["CRISPR", "Gene  Editing"], &[]),
        ];
        let rows = keyword_frequencies(&articles, 10, false);
        assert_eq!(rows[0], KeywordCount { keyword: "CRISPR".into(), frequency: 3 });
        assert_eq!(rows[1].frequency, 2);
        // tie between "Gene Editing" and "gene editing": smallest wins
        assert_eq!(rows[1].keyword, "Gene Editing");
    }

    #[test]
    fn test_semicolon_split_and_mesh_toggle() {
        let articles = vec![record(&["apoptosis; autophagy"], &["Apoptosis", "Humans"])];

        let without = keyword_frequencies(&articles, 10, false);
        assert_eq!(without.len(), 2);
        assert!(without.iter().all(|k| k.frequency == 1));

        let with = keyword_frequencies(&articles, 10, true);
        assert_eq!(with[0].frequency, 2);
        assert_eq!(with[0].keyword.to_lowercase(), "apoptosis");
        assert!(with.iter().any(|k| k.keyword == "Humans"));
    }

    #[test]
    fn test_top_n_and_ordering() {
        let articles = vec![record(&["b", "a", "c", "a"], &[])];
        let rows = keyword_frequencies(&articles, 2, false);
        let names: Vec<&str> = rows.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_no_keywords() {
        assert!(keyword_frequencies(&[record(&[], &[])], 20, true).is_empty());
    }
}
