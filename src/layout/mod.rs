pub mod metrics;

pub use metrics::{FixedAdvanceMetrics, FontBook, FontFace, FontMetrics, LoadedFont};

use tracing::debug;

/// Rendered pixel width of a string in some font at some size.
pub trait GlyphMetrics {
    fn measure(&self, text: &str) -> f32;
}

impl<F> GlyphMetrics for F
where
    F: Fn(&str) -> f32,
{
    fn measure(&self, text: &str) -> f32 {
        self(text)
    }
}

/// One display line of a verse: an inclusive word-index range and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub word_start: usize,
    pub word_end: usize,
    pub text: String,
}

impl Line {
    pub fn word_count(&self) -> usize {
        self.word_end + 1 - self.word_start
    }
}

fn measure_char<M: GlyphMetrics + ?Sized>(metrics: &M, c: char) -> f32 {
    let mut buf = [0u8; 4];
    metrics.measure(c.encode_utf8(&mut buf))
}

/// Group characters into words. A word is one glyph followed by any spaces
/// and any glyphs narrower than `small_glyph_max` (marks that cannot stand alone).
pub fn split_words<M: GlyphMetrics + ?Sized>(
    text: &str,
    metrics: &M,
    small_glyph_max: f32,
) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut idx = 0;

    while idx < chars.len() {
        let mut word = String::new();
        word.push(chars[idx]);
        idx += 1;

        while idx < chars.len()
            && (chars[idx] == ' ' || measure_char(metrics, chars[idx]) < small_glyph_max)
        {
            word.push(chars[idx]);
            idx += 1;
        }

        words.push(word);
    }

    words
}

/// Break verse text into display lines no wider than `max_width`.
///
/// Lines are packed greedily, word by word. After each word the line is
/// closed immediately if its last visible glyph is narrower than
/// `small_glyph_max` (an end-of-verse marker always ends its line); only
/// otherwise is the width budget checked, and an overflowing word is moved
/// to a fresh line. A word wider than `max_width` still gets its own line.
///
/// A trailing line consisting of a single character is folded into the
/// line before it.
pub fn layout<M: GlyphMetrics + ?Sized>(
    text: &str,
    metrics: &M,
    max_width: f32,
    small_glyph_max: f32,
) -> Vec<Line> {
    let words = split_words(text, metrics, small_glyph_max);
    if words.is_empty() {
        debug!("Empty verse text, no lines to lay out");
        return Vec::new();
    }

    let mut packed: Vec<Vec<&str>> = Vec::new();
    let mut line: Vec<&str> = Vec::new();

    for word in &words {
        line.push(word);
        let joined = line.concat();
        let width = metrics.measure(&joined);
        let trailing_width = joined
            .trim()
            .chars()
            .last()
            .map(|c| measure_char(metrics, c))
            .unwrap_or(0.0);

        if trailing_width < small_glyph_max {
            packed.push(std::mem::take(&mut line));
        } else if width > max_width {
            line.pop();
            if !line.is_empty() {
                packed.push(std::mem::take(&mut line));
            }
            line.push(word);
        }
    }

    if !line.is_empty() {
        packed.push(line);
    }

    let mut lines: Vec<Line> = Vec::with_capacity(packed.len());
    let mut next_word = 0;
    for group in packed {
        let word_start = next_word;
        next_word += group.len();
        lines.push(Line {
            word_start,
            word_end: next_word - 1,
            text: group.concat(),
        });
    }

    if lines.len() > 1 && lines.last().is_some_and(|l| l.text.chars().count() == 1) {
        if let Some(marker) = lines.pop() {
            if let Some(prev) = lines.last_mut() {
                prev.text.push_str(&marker.text);
                prev.word_end = marker.word_end;
            }
        }
    }

    debug!("Laid out {} words into {} lines", words.len(), lines.len());
    lines
}

/// Greedy word wrap for a translation paragraph. A word joins the current
/// line while the result stays strictly narrower than `max_width`.
pub fn wrap_paragraph<M: GlyphMetrics + ?Sized>(
    text: &str,
    metrics: &M,
    max_width: f32,
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut words = text.split(' ');
    let mut current = words.next().unwrap_or_default().to_string();
    let mut lines = Vec::new();

    for word in words {
        let candidate = format!("{current} {word}");
        if metrics.measure(&candidate) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);

    lines
}
