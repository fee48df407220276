use crate::error::{PipelineError, Result};
use crate::tokenizer::Token;
use rust_stemmers::Algorithm;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Words with fewer characters are returned unchanged.
pub const MIN_STEM_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    French,
    German,
    Italian,
    Portuguese,
    Spanish,
    Dutch,
    Swedish,
}

impl Language {
    fn algorithm(self) -> Algorithm {
        match self {
            Language::English => Algorithm::English,
            Language::French => Algorithm::French,
            Language::German => Algorithm::German,
            Language::Italian => Algorithm::Italian,
            Language::Portuguese => Algorithm::Portuguese,
            Language::Spanish => Algorithm::Spanish,
            Language::Dutch => Algorithm::Dutch,
            Language::Swedish => Algorithm::Swedish,
        }
    }
}

impl FromStr for Language {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "english" | "en" => Language::English,
            "french" | "fr" => Language::French,
            "german" | "de" => Language::German,
            "italian" | "it" => Language::Italian,
            "portuguese" | "pt" => Language::Portuguese,
            "spanish" | "es" => Language::Spanish,
            "dutch" | "nl" => Language::Dutch,
            "swedish" | "sv" => Language::Swedish,
            other => return Err(PipelineError::configuration(format!("unsupported stemmer language: {other}"))),
        })
    }
}

/// Rule-based suffix stripper (Snowball; English is the Porter2 algorithm).
///
/// Pure function of the term: document and position are never consulted.
/// Build once and reuse across runs; clones share the underlying stemmer.
#[derive(Clone)]
pub struct Stemmer {
    language: Language,
    inner: Arc<rust_stemmers::Stemmer>,
}

impl Stemmer {
    pub fn new(language: Language) -> Self {
        Self { language, inner: Arc::new(rust_stemmers::Stemmer::create(language.algorithm())) }
    }

    pub fn english() -> Self {
        Self::new(Language::English)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn stem_term(&self, term: &str) -> String {
        if term.chars().count() < MIN_STEM_LEN {
            return term.to_string();
        }
        self.inner.stem(term).into_owned()
    }

    /// Rewrites the token's term in place.
    pub fn stem_token(&self, mut token: Token) -> Token {
        token.term = self.stem_term(&token.term);
        token
    }
}

impl fmt::Debug for Stemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stemmer").field("language", &self.language).finish()
    }
}

pub struct Stemmed<'a, I> {
    inner: I,
    stemmer: &'a Stemmer,
}

impl<I: Iterator<Item = Token>> Iterator for Stemmed<'_, I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.inner.next().map(|t| self.stemmer.stem_token(t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub fn stem<I>(tokens: I, stemmer: &Stemmer) -> Stemmed<'_, I::IntoIter>
where
    I: IntoIterator<Item = Token>,
{
    Stemmed { inner: tokens.into_iter(), stemmer }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn reduces_inflections() {
        let s = Stemmer::english();
        assert_eq!(s.stem_term("running"), "run");
        assert_eq!(s.stem_term("cats"), "cat");
        assert_eq!(s.stem_term("connection"), "connect");
        assert_eq!(s.stem_term("connected"), "connect");
    }

    #[test]
    fn short_words_unchanged() {
        let s = Stemmer::english();
        assert_eq!(s.stem_term(""), "");
        assert_eq!(s.stem_term("a"), "a");
        assert_eq!(s.stem_term("is"), "is");
        assert_eq!(s.stem_term("as"), "as");
    }

    #[test]
    fn deterministic_and_position_independent() {
        let s = Stemmer::english();
        let out: Vec<Token> = stem(tokenize("jumping jumping jumping", "d1"), &s).collect();
        assert!(out.iter().all(|t| t.term == out[0].term));
        let other: Vec<Token> = stem(tokenize("jumping", "d2"), &s).collect();
        assert_eq!(other[0].term, out[0].term);
        assert_eq!(out.iter().map(|t| t.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn parses_language_names() {
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!("de".parse::<Language>().unwrap(), Language::German);
        assert!("klingon".parse::<Language>().is_err());
    }
}
