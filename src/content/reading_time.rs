//! Reading time estimation

use serde::Serialize;

use crate::helpers::strip_html;

/// Estimated reading time of a body of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: f64,
    pub text: String,
}

impl ReadingTime {
    /// Estimate reading time at `words_per_minute`. Markup tags are not
    /// counted. Any text is at least a one-minute read, so `text` is never empty.
    pub fn estimate(content: &str, words_per_minute: usize) -> Self {
        let words = count_words(&strip_html(content));
        let minutes = words as f64 / words_per_minute.max(1) as f64;
        // Round to two decimals before ceiling so 2.001 reads as 2 min
        let displayed = ((minutes * 100.0).round() / 100.0).ceil().max(1.0) as u64;

        Self {
            words,
            minutes,
            text: format!("{} min read", displayed),
        }
    }
}

/// Count words. CJK ideographs count as one word each.
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                in_word = true;
                count += 1;
            }
        } else if in_word && (c == '\'' || c == '\u{2019}') {
            // apostrophe inside a word
        } else {
            in_word = false;
        }
    }

    count
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}')
}
