use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    // Unicode-aware: any run of non-whitespace is a word.
    static ref WORD: Regex = Regex::new(r"\S+").expect("valid regex");
}

pub type DocId = Arc<str>;

/// One word of a document. `doc_id` and `position` never change once assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub doc_id: DocId,
    /// Zero-based ordinal in the document's token stream as produced by the tokenizer.
    pub position: usize,
}

/// Lazy token stream over one document's normalized text.
///
/// Owns the text and scans forward from a byte cursor, so nothing beyond the
/// current document is held. Re-tokenize to restart.
#[derive(Debug, Clone)]
pub struct Tokens {
    text: String,
    cursor: usize,
    position: usize,
    doc_id: DocId,
}

impl Iterator for Tokens {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.cursor >= self.text.len() {
            return None;
        }
        let mat = WORD.find_at(&self.text, self.cursor)?;
        self.cursor = mat.end();
        let token = Token { term: mat.as_str().to_string(), doc_id: Arc::clone(&self.doc_id), position: self.position };
        self.position += 1;
        Some(token)
    }
}

/// Splits normalized text on whitespace runs. No empty tokens are produced.
pub fn tokenize<T: Into<String>, D: Into<DocId>>(normalized: T, doc_id: D) -> Tokens {
    Tokens { text: normalized.into(), cursor: 0, position: 0, doc_id: doc_id.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        tokenize(text, "d").map(|t| t.term).collect()
    }

    #[test]
    fn whitespace_runs_and_edges() {
        assert_eq!(terms("  the \t\n cat   sat  "), vec!["the", "cat", "sat"]);
        assert!(terms("").is_empty());
        assert!(terms(" \u{3000}\t\n").is_empty());
        assert_eq!(terms("one\u{00a0}two\u{2003}three"), vec!["one", "two", "three"]);
    }

    #[test]
    fn positions_increase_from_zero() {
        let toks: Vec<Token> = tokenize("a b  c", "doc-1").collect();
        let positions: Vec<usize> = toks.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(toks.iter().all(|t| &*t.doc_id == "doc-1"));
    }

    #[test]
    fn restartable_by_reinvoking() {
        let text = "dog dog cat";
        let first: Vec<Token> = tokenize(text, "d1").collect();
        let second: Vec<Token> = tokenize(text, "d1").collect();
        assert_eq!(first, second);
    }
}
