//! Free-text normalisation.
//!
//! `TextNormaliser` tokenises a string and drops English stop words,
//! returning the surviving tokens joined by single spaces. It is built
//! once at startup and shared as `Arc<TextNormaliser>`; it is never
//! mutated afterwards.

pub mod stopwords;

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

pub use stopwords::ENGLISH_STOP_WORDS;

lazy_static! {
    /// Word tokens; inner hyphens and apostrophes stay part of the word ("don't", "COVID-19").
    static ref TOKEN_RE: Regex = Regex::new(r"\w+(?:['’-]\w+)*").unwrap();
}

#[derive(Debug, Clone)]
pub struct TextNormaliser {
    stop_words: HashSet<String>,
    lowercase: bool,
}

impl Default for TextNormaliser {
    fn default() -> Self {
        Self::english()
    }
}

impl TextNormaliser {
    /// English stop words, lowercased output.
    pub fn english() -> Self {
        Self::new(true, std::iter::empty::<String>())
    }

    /// English stop words plus `extra_stop_words`.
    pub fn new<I, S>(lowercase: bool, extra_stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop_words: HashSet<String> =
            ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect();
        stop_words.extend(
            extra_stop_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        Self { stop_words, lowercase }
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(&token.to_lowercase())
    }

    /// Raw word tokens in document order (punctuation dropped).
    pub fn tokenize<'a>(&self, text: &'a str) -> impl Iterator<Item = &'a str> {
        TOKEN_RE.find_iter(text).map(|m| m.as_str())
    }

    /// Tokenise, drop stop words, join with single spaces.
    /// Idempotent: `normalise(normalise(s)) == normalise(s)`.
    pub fn normalise(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for token in self.tokenize(text) {
            if self.is_stop_word(token) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            if self.lowercase {
                out.push_str(&token.to_lowercase());
            } else {
                out.push_str(token);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_stop_words_and_punctuation() {
        let n = TextNormaliser::english();
        assert_eq!(
            n.normalise("The KRAS G12D mutation drives, in most cases, pancreatic cancer."),
            "kras g12d mutation drives cases pancreatic cancer"
        );
    }

    #[test]
    fn test_keeps_hyphenated_words_whole() {
        let n = TextNormaliser::english();
        assert_eq!(n.normalise("Anti-PD-1 therapy for COVID-19"), "anti-pd-1 therapy covid-19");
    }

    #[test]
    fn test_case_preserved_when_configured() {
        let n = TextNormaliser::new(false, std::iter::empty::<&str>());
        assert_eq!(n.normalise("The EGFR pathway"), "EGFR pathway");
    }

    #[test]
    fn test_extra_stop_words() {
        let n = TextNormaliser::new(true, ["Patients", " study "]);
        assert_eq!(n.normalise("Patients in this study improved"), "improved");
    }

    #[test]
    fn test_normalise_is_idempotent() {
        let n = TextNormaliser::english();
        let samples = [
            "Background: We didn't observe O'Brien's effect (p < 0.05).",
            "  multiple   spaces\tand\nnewlines ",
            "İstanbul ÉCOLE naïve café",
            "",
            "the of and",
        ];
        for s in samples {
            let once = n.normalise(s);
            assert_eq!(n.normalise(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_only_stop_words_yields_empty() {
        assert_eq!(TextNormaliser::english().normalise("The and of it"), "");
    }
}
