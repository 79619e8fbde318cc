use std::collections::HashMap;

use pubmed_mcp_entrez::ArticleRecord;
use serde::Serialize;

const UNKNOWN_JOURNAL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalCount {
    pub journal: String,
    pub article_count: usize,
}

/// Articles per journal, most frequent first (ties by name), at most `top_n` entries.
pub fn distribution(articles: &[ArticleRecord], top_n: usize) -> Vec<JournalCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for article in articles {
        let name = article.journal.name.trim();
        let name = if name.is_empty() { UNKNOWN_JOURNAL } else { name };
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut rows: Vec<JournalCount> = counts
        .into_iter()
        .map(|(journal, article_count)| JournalCount { journal: journal.to_string(), article_count })
        .collect();
    rows.sort_by(|a, b| b.article_count.cmp(&a.article_count).then_with(|| a.journal.cmp(&b.journal)));
    rows.truncate(top_n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmed_mcp_entrez::models::JournalInfo;

    fn in_journal(name: &str) -> ArticleRecord {
        ArticleRecord {
            journal: JournalInfo { name: name.to_string(), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let articles: Vec<ArticleRecord> = ["Nature", "Cell", "Nature", "Science", "Nature", "Cell"]
            .iter()
            .map(|j| in_journal(j))
            .collect();

        let rows = distribution(&articles, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], JournalCount { journal: "Nature".into(), article_count: 3 });
        assert_eq!(rows[1], JournalCount { journal: "Cell".into(), article_count: 2 });
    }

    #[test]
    fn test_ties_break_by_name_and_unknown_bucket() {
        let articles = vec![in_journal("Lancet"), in_journal(""), in_journal("BMJ")];
        let rows = distribution(&articles, 10);
        let names: Vec<&str> = rows.iter().map(|r| r.journal.as_str()).collect();
        assert_eq!(names, vec!["BMJ", "Lancet", "Unknown"]);
        assert!(rows.windows(2).all(|w| w[0].article_count >= w[1].article_count));
    }

    #[test]
    fn test_empty_input() {
        assert!(distribution(&[], 5).is_empty());
    }
}
