//! Review content moderation.
//!
//! DESIGN
//! ======
//! A word-list filter. `is_clean` and `censor` match whole words,
//! case-insensitively, against a small built-in list plus any words from
//! `BAD_WORDS`. `violations` reports configured words found as substrings so
//! error messages can name what tripped the check.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::ModerationConfig;

const BUILTIN_WORDS: &[&str] = &[
    "arse", "asshole", "bastard", "bitch", "bollocks", "bullshit", "crap", "cunt", "damn", "dick", "fuck",
    "fucker", "fucking", "motherfucker", "piss", "prick", "pussy", "shit", "slut", "twat", "wanker", "whore",
];

const MAX_REPORTED_VIOLATIONS: usize = 3;
const SPAM_MIN_DISTINCT_CHARS: usize = 3;
const SPAM_MIN_LENGTH: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReviewValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub cleaned_text: String,
}

#[derive(Debug, Clone)]
pub struct Moderator {
    enabled: bool,
    spam_detection: bool,
    max_length: usize,
    words: HashSet<String>,
    custom_words: Vec<String>,
}

impl Moderator {
    #[must_use]
    pub fn from_config(config: &ModerationConfig) -> Self {
        let mut words: HashSet<String> = BUILTIN_WORDS.iter().map(|w| (*w).to_owned()).collect();
        words.extend(config.bad_words.iter().cloned());
        Self {
            enabled: config.enabled,
            spam_detection: config.spam_detection,
            max_length: config.max_review_length,
            words,
            custom_words: config.bad_words.clone(),
        }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[must_use]
    pub fn is_clean(&self, text: &str) -> bool {
        if !self.enabled {
            return true;
        }
        word_spans(text).all(|(start, end)| !self.is_bad(&text[start..end]))
    }

    /// Replace each flagged word with asterisks of the same length.
    #[must_use]
    pub fn censor(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_owned();
        }
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in word_spans(text) {
            let word = &text[start..end];
            if self.is_bad(word) {
                out.push_str(&text[cursor..start]);
                out.extend(std::iter::repeat_n('*', word.chars().count()));
                cursor = end;
            }
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// Configured words that appear anywhere in `text`, in list order.
    #[must_use]
    pub fn violations(&self, text: &str) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        let lower = text.to_lowercase();
        self.custom_words
            .iter()
            .filter(|w| lower.contains(w.as_str()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn validate_review(&self, text: &str) -> ReviewValidation {
        let mut result = ReviewValidation {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            cleaned_text: text.to_owned(),
        };

        if text.trim().is_empty() {
            result.is_valid = false;
            result.errors.push("Review content cannot be empty".to_owned());
            return result;
        }

        let length = text.chars().count();
        if length > self.max_length {
            result.is_valid = false;
            result
                .errors
                .push(format!("Review content exceeds maximum length of {} characters", self.max_length));
        }

        if !self.is_clean(text) {
            result.is_valid = false;
            result
                .errors
                .push("Review content contains inappropriate language".to_owned());
            let found = self.violations(text);
            if !found.is_empty() {
                let shown = found
                    .iter()
                    .take(MAX_REPORTED_VIOLATIONS)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                result.warnings.push(format!("Detected inappropriate words: {shown}..."));
            }
            result.cleaned_text = self.censor(text);
        }

        if self.spam_detection && looks_like_spam(text) {
            result
                .warnings
                .push("Review content appears to be spam (repeated characters)".to_owned());
        }

        result
    }

    fn is_bad(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

fn looks_like_spam(text: &str) -> bool {
    let distinct: HashSet<char> = text.chars().filter(|c| *c != ' ').collect();
    distinct.len() < SPAM_MIN_DISTINCT_CHARS && text.chars().count() > SPAM_MIN_LENGTH
}

/// Byte ranges of alphanumeric runs in `text`.
fn word_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut chars = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some(&(_, c)) = chars.peek() {
            if c.is_alphanumeric() {
                break;
            }
            chars.next();
        }
        let (start, _) = *chars.peek()?;
        let mut end = start;
        while let Some(&(idx, c)) = chars.peek() {
            if !c.is_alphanumeric() {
                break;
            }
            end = idx + c.len_utf8();
            chars.next();
        }
        Some((start, end))
    })
}

#[cfg(test)]
#[path = "moderation_test.rs"]
mod tests;
