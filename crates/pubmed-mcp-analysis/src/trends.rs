//! Publication counts per year.

use std::collections::BTreeMap;

use pubmed_mcp_entrez::ArticleRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub publication_count: u64,
}

/// One entry per year in `[start, end]`; years missing from `counts` are zero.
/// Counts outside the range are ignored.
pub fn fill_years(counts: &BTreeMap<i32, u64>, start: i32, end: i32) -> Vec<YearCount> {
    if start > end {
        return vec![];
    }
    (start..=end)
        .map(|year| YearCount {
            year,
            publication_count: counts.get(&year).copied().unwrap_or(0),
        })
        .collect()
}

/// Tabulate locally fetched records; records without a year are ignored.
pub fn count_by_year(articles: &[ArticleRecord], start: i32, end: i32) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for year in articles.iter().filter_map(ArticleRecord::year) {
        *counts.entry(year).or_insert(0) += 1;
    }
    fill_years(&counts, start, end)
}

pub fn total(trend: &[YearCount]) -> u64 {
    trend.iter().map(|y| y.publication_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmed_mcp_entrez::models::PublicationDate;

    fn article(year: Option<i32>) -> ArticleRecord {
        ArticleRecord {
            publication_date: PublicationDate { year, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn test_fill_years_zero_fills_gaps() {
        let counts = BTreeMap::from([(2019, 4), (2021, 7), (2030, 1)]);
        let trend = fill_years(&counts, 2018, 2022);
        let years: Vec<i32> = trend.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2018, 2019, 2020, 2021, 2022]);
        let values: Vec<u64> = trend.iter().map(|y| y.publication_count).collect();
        assert_eq!(values, vec![0, 4, 0, 7, 0]);
        assert_eq!(total(&trend), 11);
    }

    #[test]
    fn test_single_year_and_inverted_range() {
        assert_eq!(fill_years(&BTreeMap::new(), 2020, 2020).len(), 1);
        assert!(fill_years(&BTreeMap::new(), 2021, 2020).is_empty());
    }

    #[test]
    fn test_count_by_year_ignores_out_of_range_and_missing() {
        let articles = vec![
            article(Some(2020)),
            article(Some(2020)),
            article(Some(2022)),
            article(Some(1999)),
            article(None),
        ];
        let trend = count_by_year(&articles, 2020, 2022);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0], YearCount { year: 2020, publication_count: 2 });
        assert_eq!(trend[1].publication_count, 0);
        assert_eq!(trend[2].publication_count, 1);
        assert!(total(&trend) <= articles.len() as u64);
    }
}
