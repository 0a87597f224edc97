//! Input Normalizer
//!
//! Screens raw text before it becomes a conversational turn. Speech recognition
//! tends to turn background noise into short garbage tokens, so anything too
//! short or without a single character of the target script is rejected.

use std::collections::HashSet;

/// Phrases that end the conversation instead of producing a generated reply.
pub const KOREAN_STOP_PHRASES: [&str; 4] = ["종료", "그만", "끝내", "끝내자"];

/// Matches a precomposed Hangul syllable (`가`..=`힣`).
pub fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Trimmed text that may be treated as a turn.
    Accepted(String),
    /// The trimmed text that was refused.
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct InputNormalizer {
    min_chars: usize,
    script: fn(char) -> bool,
    stop_phrases: HashSet<String>,
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::korean()
    }
}

impl InputNormalizer {
    pub fn new<I, S>(min_chars: usize, script: fn(char) -> bool, stop_phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            min_chars,
            script,
            stop_phrases: stop_phrases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn korean() -> Self {
        Self::new(2, is_hangul_syllable, KOREAN_STOP_PHRASES)
    }

    pub fn normalize(&self, raw: &str) -> Verdict {
        let text = raw.trim();
        let accepted = !text.is_empty()
            && text.chars().count() >= self.min_chars
            && text.chars().any(self.script);
        if accepted {
            Verdict::Accepted(text.to_string())
        } else {
            Verdict::Rejected(text.to_string())
        }
    }

    /// Exact membership, no substring or case folding.
    pub fn is_stop_phrase(&self, text: &str) -> bool {
        self.stop_phrases.contains(text)
    }
}
