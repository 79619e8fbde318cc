//! Word clouds: tokenisation, frequency ranking, centre-out layout and SVG output.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::OnceLock;

use jieba_rs::Jieba;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::AnalysisError;
use crate::text::{cloud_tokens, is_cjk, CHINESE_STOPWORDS, DEFAULT_CLOUD_STOPWORDS};

const MIN_FONT_SIZE: f64 = 10.0;
const MARGIN: f64 = 2.0;
/// Font sizes shrink by this factor when a word does not fit.
const SHRINK: f64 = 0.8;
/// Share of the canvas the words may cover before all sizes are scaled down.
const CANVAS_FILL: f64 = 0.4;
const MIN_CELL: f64 = 2.0;
const MAX_GRID_CELLS: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Cividis,
    Blues,
    Greens,
    Reds,
    Greys,
}

impl Colormap {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "viridis" => Some(Self::Viridis),
            "plasma" => Some(Self::Plasma),
            "inferno" => Some(Self::Inferno),
            "magma" => Some(Self::Magma),
            "cividis" => Some(Self::Cividis),
            "blues" => Some(Self::Blues),
            "greens" => Some(Self::Greens),
            "reds" => Some(Self::Reds),
            "greys" | "grays" => Some(Self::Greys),
            _ => None,
        }
    }

    fn anchors(&self) -> [&'static str; 5] {
        match self {
            Self::Viridis => ["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"],
            Self::Plasma => ["#0d0887", "#7e03a8", "#cc4778", "#f89540", "#f0f921"],
            Self::Inferno => ["#000004", "#420a68", "#932667", "#dd513a", "#fcffa4"],
            Self::Magma => ["#000004", "#3b0f70", "#8c2981", "#de4968", "#fcfdbf"],
            Self::Cividis => ["#00224e", "#3d4d6a", "#7d7c78", "#bcaf6f", "#fee838"],
            Self::Blues => ["#c6dbef", "#9ecae1", "#6baed6", "#3182bd", "#08519c"],
            Self::Greens => ["#c7e9c0", "#a1d99b", "#74c476", "#31a354", "#006d2c"],
            Self::Reds => ["#fcbba1", "#fc9272", "#fb6a4a", "#de2d26", "#a50f15"],
            Self::Greys => ["#d9d9d9", "#bdbdbd", "#969696", "#636363", "#252525"],
        }
    }

    /// Colour at position `t` in `[0, 1]`, linearly interpolated between anchors.
    pub fn sample(&self, t: f64) -> String {
        let anchors = self.anchors();
        let scaled = t.clamp(0.0, 1.0) * (anchors.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(anchors.len() - 2);
        let frac = scaled - lower as f64;
        let (a, b) = (hex_rgb(anchors[lower]), hex_rgb(anchors[lower + 1]));
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        format!("#{:02x}{:02x}{:02x}", mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    (channel(1), channel(3), channel(5))
}

/// A CSS colour name or `#rgb`, `#rrggbb`, `#rrggbbaa`.
pub fn is_safe_color(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z]{1,30}|#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8}))$")
            .expect("valid regex")
    })
    .is_match(value)
}

#[derive(Debug, Clone)]
pub struct WordCloudOptions {
    pub title: String,
    pub max_words: usize,
    pub background_color: String,
    pub colormap: Colormap,
    pub chinese: bool,
    /// Added to the built-in stopword lists.
    pub stopwords: Vec<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for WordCloudOptions {
    fn default() -> Self {
        Self {
            title: "Word Cloud".to_string(),
            max_words: 100,
            background_color: "white".to_string(),
            colormap: Colormap::Viridis,
            chinese: false,
            stopwords: vec![],
            width: 800,
            height: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFrequency {
    pub word: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub word: String,
    pub frequency: usize,
    pub font_size: f64,
    /// Centre of the word on the canvas.
    pub x: f64,
    pub y: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCloud {
    pub title: String,
    pub words: Vec<PlacedWord>,
    pub svg: String,
}

fn jieba() -> &'static Jieba {
    static JIEBA: OnceLock<Jieba> = OnceLock::new();
    JIEBA.get_or_init(Jieba::new)
}

/// Split `text` into cloud tokens and drop stopwords (case-insensitive).
pub fn tokenize(text: &str, chinese: bool, stopwords: &[String]) -> Vec<String> {
    let stop: HashSet<String> = DEFAULT_CLOUD_STOPWORDS
        .iter()
        .chain(CHINESE_STOPWORDS)
        .map(|s| s.to_string())
        .chain(stopwords.iter().map(|s| s.trim().to_lowercase()))
        .collect();

    let segmented;
    let source = if chinese {
        segmented = jieba().cut(text, false).join(" ");
        segmented.as_str()
    } else {
        text
    };

    cloud_tokens(source)
        .into_iter()
        .map(|t| t.strip_suffix("'s").unwrap_or(t))
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !t.chars().all(|c| c.is_numeric()))
        .filter(|t| !stop.contains(&t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Top `max_words` tokens by count, grouped case-insensitively and shown in
/// their most common form.
pub fn frequencies(tokens: &[String], max_words: usize) -> Vec<WordFrequency> {
    let mut groups: HashMap<String, BTreeMap<&str, usize>> = HashMap::new();
    for token in tokens {
        *groups
            .entry(token.to_lowercase())
            .or_default()
            .entry(token.as_str())
            .or_insert(0) += 1;
    }

    let mut rows: Vec<WordFrequency> = groups
        .values()
        .map(|forms| {
            let frequency = forms.values().sum();
            let word = forms
                .iter()
                .fold(None::<(&str, usize)>, |best, (form, count)| match best {
                    Some((_, c)) if c >= *count => best,
                    _ => Some((*form, *count)),
                })
                .map(|(w, _)| w.to_string())
                .unwrap_or_default();
            WordFrequency { word, frequency }
        })
        .collect();
    rows.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
    rows.truncate(max_words);
    rows
}

fn text_width(word: &str, font_size: f64) -> f64 {
    word.chars()
        .map(|c| if is_cjk(c) { 1.0 } else { 0.6 })
        .sum::<f64>()
        * font_size
}

/// Canvas occupancy on a coarse cell grid, with a summed-area table so any
/// box can be tested for overlap in constant time.
struct Occupancy {
    cell: f64,
    cols: usize,
    rows: usize,
    filled: Vec<bool>,
    integral: Vec<u32>,
    /// Cell centres ordered from the canvas centre outwards.
    order: Vec<(usize, usize)>,
}

impl Occupancy {
    fn new(width: f64, height: f64) -> Self {
        let cell = (width.max(height) / MAX_GRID_CELLS).max(MIN_CELL);
        let cols = (width / cell).floor().max(1.0) as usize;
        let rows = (height / cell).floor().max(1.0) as usize;

        let (cx, cy) = (cols as f64 / 2.0, rows as f64 / 2.0);
        let distance = |&(c, r): &(usize, usize)| {
            let dx = (c as f64 + 0.5 - cx) / cols as f64;
            let dy = (r as f64 + 0.5 - cy) / rows as f64;
            dx * dx + dy * dy
        };
        let mut order: Vec<(usize, usize)> = (0..rows).flat_map(|r| (0..cols).map(move |c| (c, r))).collect();
        order.sort_by(|a, b| distance(a).total_cmp(&distance(b)).then_with(|| (a.1, a.0).cmp(&(b.1, b.0))));

        Self {
            cell,
            cols,
            rows,
            filled: vec![false; cols * rows],
            integral: vec![0; (cols + 1) * (rows + 1)],
            order,
        }
    }

    /// Occupied cells in the half-open box `[c0, c1) x [r0, r1)`.
    fn occupied(&self, c0: usize, r0: usize, c1: usize, r1: usize) -> u32 {
        let at = |c: usize, r: usize| self.integral[r * (self.cols + 1) + c];
        at(c1, r1) + at(c0, r0) - at(c0, r1) - at(c1, r0)
    }

    fn mark(&mut self, c0: usize, r0: usize, c1: usize, r1: usize) {
        for r in r0..r1 {
            for c in c0..c1 {
                self.filled[r * self.cols + c] = true;
            }
        }
        let stride = self.cols + 1;
        for r in 0..self.rows {
            let mut row_sum = 0;
            for c in 0..self.cols {
                row_sum += u32::from(self.filled[r * self.cols + c]);
                self.integral[(r + 1) * stride + c + 1] = self.integral[r * stride + c + 1] + row_sum;
            }
        }
    }

    /// Claim the free box of `size` pixels nearest the centre; returns its centre in pixels.
    fn place(&mut self, size: (f64, f64)) -> Option<(f64, f64)> {
        let wc = ((size.0 + 2.0 * MARGIN) / self.cell).ceil() as usize;
        let hc = ((size.1 + 2.0 * MARGIN) / self.cell).ceil() as usize;
        if wc > self.cols || hc > self.rows {
            return None;
        }

        let (c0, r0) = self.order.iter().find_map(|&(c, r)| {
            let c0 = c.checked_sub(wc / 2)?;
            let r0 = r.checked_sub(hc / 2)?;
            let fits = c0 + wc <= self.cols && r0 + hc <= self.rows && self.occupied(c0, r0, c0 + wc, r0 + hc) == 0;
            fits.then_some((c0, r0))
        })?;

        self.mark(c0, r0, c0 + wc, r0 + hc);
        Some(((c0 as f64 + wc as f64 / 2.0) * self.cell, (r0 as f64 + hc as f64 / 2.0) * self.cell))
    }
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Font size per word, linear in frequency between the minimum and
/// `max_font`, then scaled down together until the estimated ink covers at
/// most `CANVAS_FILL` of the canvas.
fn fit_font_sizes(words: &[&WordFrequency], canvas: (f64, f64), max_font: f64) -> Vec<f64> {
    let (lo, hi) = words.iter().fold((usize::MAX, 0), |(lo, hi), w| (lo.min(w.frequency), hi.max(w.frequency)));
    let mut sizes: Vec<f64> = words
        .iter()
        .map(|w| {
            if hi > lo {
                MIN_FONT_SIZE + (max_font - MIN_FONT_SIZE) * (w.frequency - lo) as f64 / (hi - lo) as f64
            } else {
                max_font
            }
        })
        .collect();

    let budget = CANVAS_FILL * canvas.0 * canvas.1;
    let area: f64 = words.iter().zip(&sizes).map(|(w, &s)| text_width(&w.word, s) * s).sum();
    if area > budget {
        let scale = (budget / area).sqrt();
        for size in &mut sizes {
            *size = (*size * scale).max(MIN_FONT_SIZE);
        }
    }
    sizes
}

/// Lay out `words` (already ranked) and render the SVG document.
pub fn render(words: &[WordFrequency], options: &WordCloudOptions) -> Result<WordCloud, AnalysisError> {
    if !is_safe_color(&options.background_color) {
        return Err(AnalysisError::InvalidParameter {
            name: "background_color",
            reason: format!("unsupported colour {:?}", options.background_color),
        });
    }
    if options.width == 0 || options.height == 0 {
        return Err(AnalysisError::InvalidParameter {
            name: "canvas",
            reason: "width and height must be positive".to_string(),
        });
    }

    let canvas = (options.width as f64, options.height as f64);
    let max_font = (canvas.1 * 0.2).max(MIN_FONT_SIZE);

    let ranked: Vec<&WordFrequency> = words.iter().take(options.max_words).collect();
    let sizes = fit_font_sizes(&ranked, canvas, max_font);

    let mut grid = Occupancy::new(canvas.0, canvas.1);
    let mut placed: Vec<PlacedWord> = Vec::new();
    // Sizes never grow again once a word had to shrink to fit.
    let mut last_size = max_font;
    'words: for (word, scaled) in ranked.into_iter().zip(sizes) {
        let mut font_size = scaled.min(last_size);

        loop {
            if font_size < MIN_FONT_SIZE {
                // Canvas is full at the smallest size
                break 'words;
            }
            let size = (text_width(&word.word, font_size), font_size);
            if let Some((x, y)) = grid.place(size) {
                last_size = font_size;
                placed.push(PlacedWord {
                    word: word.word.clone(),
                    frequency: word.frequency,
                    font_size: round1(font_size),
                    x: round1(x),
                    y: round1(y),
                    color: String::new(),
                });
                break;
            }
            font_size *= SHRINK;
        }
    }

    let last = placed.len().saturating_sub(1).max(1) as f64;
    for (rank, word) in placed.iter_mut().enumerate() {
        word.color = options.colormap.sample(rank as f64 / last);
    }

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = options.width,
        h = options.height
    );
    let _ = write!(svg, "<title>{}</title>", escape_xml(&options.title));
    let _ = write!(svg, r#"<rect width="100%" height="100%" fill="{}"/>"#, options.background_color);
    for word in &placed {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="middle" dominant-baseline="central" font-family="sans-serif">{}</text>"#,
            word.x,
            word.y,
            word.font_size,
            word.color,
            escape_xml(&word.word)
        );
    }
    svg.push_str("</svg>");

    debug!(requested = words.len(), placed = placed.len(), "Rendered word cloud");
    Ok(WordCloud { title: options.title.clone(), words: placed, svg })
}

/// Tokenise, rank and render `text`.
pub fn generate(text: &str, options: &WordCloudOptions) -> Result<WordCloud, AnalysisError> {
    let tokens = tokenize(text, options.chinese, &options.stopwords);
    let ranked = frequencies(&tokens, options.max_words);
    render(&ranked, options)
}
