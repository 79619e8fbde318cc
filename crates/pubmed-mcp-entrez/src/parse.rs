//! efetch XML parsing.
//! Handles the `<PubmedArticleSet><PubmedArticle>` structure, including
//! inline markup (`<i>`, `<sup>`) inside titles, abstracts and keywords.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use pubmed_mcp_common::{Error, Result};
use tracing::{debug, warn};

use crate::models::{pubmed_url, ArticleRecord, Author};

/// Parse an efetch response into article records.
///
/// Articles without a PMID are skipped. An `<ERROR>` element with no
/// accompanying articles becomes [`Error::Api`].
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<ArticleRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut articles = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleBuilder> = None;
    let mut leaf = String::new();
    let mut api_error: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "PubmedArticle" {
                    current = Some(ArticleBuilder::default());
                }
                if let Some(builder) = current.as_mut() {
                    builder.on_start(&name, e);
                }
                stack.push(name);
                leaf.clear();
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| Error::Xml(err.to_string()))?;
                leaf.push_str(&text);
                if let Some(builder) = current.as_mut() {
                    builder.on_text(&stack, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                leaf.push_str(&text);
                if let Some(builder) = current.as_mut() {
                    builder.on_text(&stack, &text);
                }
            }
            Ok(Event::End(_)) if !stack.is_empty() => {
                let name = stack[stack.len() - 1].clone();
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());
                let grandparent = stack.len().checked_sub(3).map(|i| stack[i].as_str());

                if name == "ERROR" {
                    api_error = Some(collapse_whitespace(&leaf));
                }
                if let Some(builder) = current.as_mut() {
                    builder.on_end(&name, parent, grandparent, &leaf);
                }
                if name == "PubmedArticle" {
                    if let Some(record) = current.take().and_then(ArticleBuilder::finish) {
                        articles.push(record);
                    } else {
                        warn!("Skipping PubMed article without PMID");
                    }
                }
                stack.pop();
                leaf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if articles.is_empty() {
        if let Some(message) = api_error {
            return Err(Error::Api(message));
        }
    }

    debug!(count = articles.len(), "Parsed efetch articles");
    Ok(articles)
}

#[derive(Default)]
struct ArticleBuilder {
    record: ArticleRecord,
    author: Option<Author>,
    abstract_parts: Vec<String>,
    abstract_label: Option<String>,
    abstract_buf: String,
    keyword_buf: String,
    affiliation_buf: String,
    article_id_type: Option<String>,
    location_id_type: Option<String>,
    location_doi: Option<String>,
}

impl ArticleBuilder {
    fn on_start(&mut self, name: &str, e: &BytesStart<'_>) {
        match name {
            "Author" => self.author = Some(Author::default()),
            "AbstractText" => {
                self.abstract_buf.clear();
                self.abstract_label = attribute(e, "Label");
            }
            "Keyword" => self.keyword_buf.clear(),
            "Affiliation" => self.affiliation_buf.clear(),
            "ArticleId" => self.article_id_type = attribute(e, "IdType"),
            "ELocationID" => self.location_id_type = attribute(e, "EIdType"),
            _ => {}
        }
    }

    /// Mixed-content elements collect text from every descendant.
    fn on_text(&mut self, stack: &[String], text: &str) {
        let inside = |tag: &str| stack.iter().any(|s| s == tag);
        if inside("OtherAbstract") {
            return;
        }
        if inside("ArticleTitle") {
            self.record.title.push_str(text);
        } else if inside("AbstractText") {
            self.abstract_buf.push_str(text);
        } else if inside("Keyword") {
            self.keyword_buf.push_str(text);
        } else if inside("Affiliation") && self.author.is_some() {
            self.affiliation_buf.push_str(text);
        }
    }

    fn on_end(&mut self, name: &str, parent: Option<&str>, grandparent: Option<&str>, leaf: &str) {
        let value = leaf.trim();
        match (name, parent) {
            ("PMID", Some("MedlineCitation")) if self.record.pmid.is_empty() => {
                self.record.pmid = value.to_string();
            }
            ("Title", Some("Journal")) => self.record.journal.name = collapse_whitespace(value),
            ("ISOAbbreviation", Some("Journal")) => self.record.journal.iso_abbreviation = value.to_string(),
            ("ISSN", Some("Journal")) => self.record.journal.issn = value.to_string(),
            ("Year", Some("PubDate")) => self.record.publication_date.year = value.parse().ok(),
            ("Month", Some("PubDate")) => self.record.publication_date.month = Some(value.to_string()),
            ("Day", Some("PubDate")) => self.record.publication_date.day = Some(value.to_string()),
            ("MedlineDate", Some("PubDate")) => {
                if self.record.publication_date.year.is_none() {
                    self.record.publication_date.year = leading_year(value);
                }
            }
            ("LastName", Some("Author")) => self.with_author(|a| a.last_name = value.to_string()),
            ("ForeName", Some("Author")) => self.with_author(|a| a.fore_name = value.to_string()),
            ("Initials", Some("Author")) => self.with_author(|a| a.initials = value.to_string()),
            ("CollectiveName", Some("Author")) => {
                let collective = collapse_whitespace(value);
                self.with_author(|a| a.collective_name = Some(collective));
            }
            ("Affiliation", _) => {
                let affiliation = collapse_whitespace(&self.affiliation_buf);
                if !affiliation.is_empty() {
                    self.with_author(|a| a.affiliations.push(affiliation));
                }
            }
            ("Author", Some("AuthorList")) => {
                if let Some(author) = self.author.take() {
                    if author.display_name().is_some() {
                        self.record.authors.push(author);
                    }
                }
            }
            ("AbstractText", _) => {
                let text = collapse_whitespace(&self.abstract_buf);
                if !text.is_empty() {
                    let part = match self.abstract_label.take() {
                        Some(label) if !label.is_empty() => format!("{}: {}", label, text),
                        _ => text,
                    };
                    self.abstract_parts.push(part);
                }
                self.abstract_buf.clear();
            }
            ("Keyword", _) => {
                let keyword = collapse_whitespace(&self.keyword_buf);
                if !keyword.is_empty() && !self.record.keywords.contains(&keyword) {
                    self.record.keywords.push(keyword);
                }
            }
            ("DescriptorName", Some("MeshHeading")) => {
                let term = collapse_whitespace(value);
                if !term.is_empty() {
                    self.record.mesh_terms.push(term);
                }
            }
            ("ArticleId", Some("ArticleIdList")) if grandparent == Some("PubmedData") => {
                match self.article_id_type.take().as_deref() {
                    Some("doi") if !value.is_empty() => self.record.doi = Some(value.to_string()),
                    Some("pmc") if !value.is_empty() => self.record.pmcid = Some(value.to_string()),
                    _ => {}
                }
            }
            ("ELocationID", Some("Article")) => {
                if self.location_id_type.take().as_deref() == Some("doi") && !value.is_empty() {
                    self.location_doi = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    fn with_author(&mut self, f: impl FnOnce(&mut Author)) {
        if let Some(author) = self.author.as_mut() {
            f(author);
        }
    }

    fn finish(mut self) -> Option<ArticleRecord> {
        if self.record.pmid.is_empty() {
            return None;
        }
        self.record.title = collapse_whitespace(&self.record.title);
        self.record.abstract_text = self.abstract_parts.join(" ");
        if self.record.doi.is_none() {
            self.record.doi = self.location_doi;
        }
        self.record.pubmed_url = pubmed_url(&self.record.pmid);
        Some(self.record)
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// First four-digit run, e.g. `1998 Dec-1999 Jan` gives 1998.
fn leading_year(value: &str) -> Option<i32> {
    value
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 4)
        .and_then(|run| run.parse().ok())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
