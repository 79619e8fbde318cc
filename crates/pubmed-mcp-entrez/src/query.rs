//! esearch term construction.
//!
//! Field tags follow the PubMed search syntax, e.g. `KRAS[Title]` or
//! `2020/01/01:2021/12/31[Date - Publication]`.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

const EARLIEST_DATE: &str = "1900/01/01";

/// Field-scoped terms combined by [`advanced_query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTerms {
    pub author: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub year: Option<String>,
    pub abstract_text: Option<String>,
    pub mesh_terms: Option<String>,
}

impl FieldTerms {
    pub fn is_empty(&self) -> bool {
        advanced_query(self).is_empty()
    }
}

/// True for `YYYY`, `YYYY/MM` and `YYYY/MM/DD`.
pub fn is_valid_date(value: &str) -> bool {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_RE.get_or_init(|| {
        Regex::new(r"^\d{4}(/(0[1-9]|1[0-2])(/(0[1-9]|[12]\d|3[01]))?)?$").expect("valid regex")
    });
    re.is_match(value.trim())
}

/// Publication date filter appended to a term; empty when neither bound is set.
pub fn date_filter(min_date: Option<&str>, max_date: Option<&str>, today: NaiveDate) -> String {
    if min_date.is_none() && max_date.is_none() {
        return String::new();
    }
    let min = min_date.unwrap_or(EARLIEST_DATE);
    let max = max_date
        .map(str::to_string)
        .unwrap_or_else(|| today.format("%Y/%m/%d").to_string());
    format!(" AND {}:{}[Date - Publication]", min.trim(), max.trim())
}

/// `query` with an optional publication date range, using today's date for an open upper bound.
pub fn search_term(query: &str, min_date: Option<&str>, max_date: Option<&str>) -> String {
    let today = chrono::Local::now().date_naive();
    format!("{}{}", query.trim(), date_filter(min_date, max_date, today))
}

/// Joins the non-empty field terms with `AND`.
pub fn advanced_query(fields: &FieldTerms) -> String {
    let tagged = [
        (&fields.author, "Author"),
        (&fields.title, "Title"),
        (&fields.journal, "Journal"),
        (&fields.year, "Publication Date"),
        (&fields.abstract_text, "Abstract"),
        (&fields.mesh_terms, "MeSH Terms"),
    ];

    tagged
        .iter()
        .filter_map(|(value, tag)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}[{}]", v, tag))
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Term counting the records of `query` published in `year`.
pub fn year_query(query: &str, year: i32) -> String {
    format!("({}) AND {}[Publication Date]", query.trim(), year)
}
