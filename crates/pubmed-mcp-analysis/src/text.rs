//! Tokenisation and stop-word lists shared by the text analyses.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// English stop words removed before TF-IDF weighting.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "although",
    "always", "am", "among", "an", "and", "another", "any", "are", "around", "as", "at", "be",
    "became", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "cannot", "could", "did", "do", "does", "doing", "done", "down", "due", "during",
    "each", "either", "else", "enough", "etc", "even", "ever", "every", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "itself",
    "just", "least", "less", "may", "me", "might", "more", "most", "mostly", "much", "must",
    "my", "myself", "neither", "no", "nor", "not", "now", "of", "off", "often", "on", "once",
    "only", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
    "own", "per", "perhaps", "rather", "same", "seem", "seemed", "seems", "several", "she",
    "should", "since", "so", "some", "still", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "therefore", "these", "they", "this", "those",
    "though", "through", "thus", "to", "too", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "well", "were", "what", "when", "where", "whether", "which", "while",
    "who", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Words dropped from word clouds when the caller supplies no list.
pub const DEFAULT_CLOUD_STOPWORDS: &[&str] = &[
    "the", "and", "of", "to", "in", "a", "is", "that", "for", "with", "as", "by", "on", "are",
    "be", "this", "was", "we", "were", "from",
];

/// Function words skipped in segmented Chinese text.
pub const CHINESE_STOPWORDS: &[&str] = &[
    "的", "了", "和", "是", "在", "我们", "他们", "一个", "这个", "那个", "以及", "或者", "但是",
    "因为", "所以", "如果", "通过", "对于", "进行", "可以", "没有", "已经", "研究", "结果",
];

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
}

fn cloud_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w[\w']+").expect("valid regex"))
}

/// Lowercased tokens of two or more word characters.
pub fn word_tokens(text: &str) -> Vec<String> {
    word_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Word-cloud tokens: apostrophes are kept inside words, case is preserved.
pub fn cloud_tokens(text: &str) -> Vec<&str> {
    cloud_regex().find_iter(text).map(|m| m.as_str()).collect()
}

pub fn english_stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True for CJK unified ideographs and the common CJK punctuation/kana blocks.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0xFF00..=0xFFEF)
}
