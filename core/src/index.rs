use crate::tokenizer::Token;
use std::collections::HashMap;

pub type Count = u32;
pub type Postings = HashMap<String, Count>;

/// term -> {doc_id -> occurrences}. Every stored count is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, Postings>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn postings(&self, term: &str) -> Option<&Postings> {
        self.postings.get(term)
    }

    /// Occurrences of `term` in `doc_id`; zero when either is absent.
    pub fn count(&self, term: &str, doc_id: &str) -> Count {
        self.postings.get(term).and_then(|p| p.get(doc_id)).copied().unwrap_or(0)
    }

    /// Number of documents containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, |p| p.len())
    }

    /// Total occurrences of `term` across all documents.
    pub fn collection_frequency(&self, term: &str) -> u64 {
        self.postings.get(term).map_or(0, |p| p.values().map(|&c| c as u64).sum())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Postings)> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p))
    }

    /// Adds `count` occurrences of `term` in `doc_id`. A zero count stores nothing.
    pub fn add(&mut self, term: &str, doc_id: &str, count: Count) {
        if count == 0 {
            return;
        }
        // Look up by &str first so a repeated (term, doc) pair allocates nothing.
        if let Some(docs) = self.postings.get_mut(term) {
            match docs.get_mut(doc_id) {
                Some(c) => *c += count,
                None => {
                    docs.insert(doc_id.to_string(), count);
                }
            }
        } else {
            let mut docs = Postings::new();
            docs.insert(doc_id.to_string(), count);
            self.postings.insert(term.to_string(), docs);
        }
    }

    /// Sums `other` into `self`. Commutative and associative.
    pub fn merge(&mut self, other: InvertedIndex) {
        if self.postings.is_empty() {
            self.postings = other.postings;
            return;
        }
        for (term, docs) in other.postings {
            let into = self.postings.entry(term).or_default();
            for (doc_id, count) in docs {
                *into.entry(doc_id).or_insert(0) += count;
            }
        }
    }

    pub fn merged(mut self, other: InvertedIndex) -> Self {
        self.merge(other);
        self
    }
}

impl FromIterator<(String, String, Count)> for InvertedIndex {
    fn from_iter<T: IntoIterator<Item = (String, String, Count)>>(iter: T) -> Self {
        let mut index = InvertedIndex::new();
        for (term, doc_id, count) in iter {
            index.add(&term, &doc_id, count);
        }
        index
    }
}

/// Streaming builder: one increment per token.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: InvertedIndex,
    tokens: u64,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, token: &Token) {
        self.index.add(&token.term, &token.doc_id, 1);
        self.tokens += 1;
    }

    pub fn extend<I: IntoIterator<Item = Token>>(&mut self, tokens: I) {
        for token in tokens {
            self.add(&token);
        }
    }

    /// Tokens folded in so far.
    pub fn tokens(&self) -> u64 { self.tokens }

    /// Snapshot of the index built so far.
    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn finish(self) -> InvertedIndex { self.index }
}

/// Consumes the whole stream. An empty stream gives an empty index.
pub fn build<I: IntoIterator<Item = Token>>(tokens: I) -> InvertedIndex {
    let mut builder = IndexBuilder::new();
    builder.extend(tokens);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn idx(triples: &[(&str, &str, Count)]) -> InvertedIndex {
        triples.iter().map(|(t, d, c)| (t.to_string(), d.to_string(), *c)).collect()
    }

    #[test]
    fn counts_per_term_and_document() {
        let tokens = tokenize("dog dog cat", "d1").chain(tokenize("dog bird", "d2"));
        let index = build(tokens);
        assert_eq!(index, idx(&[("dog", "d1", 2), ("dog", "d2", 1), ("cat", "d1", 1), ("bird", "d2", 1)]));
        assert_eq!(index.document_frequency("dog"), 2);
        assert_eq!(index.collection_frequency("dog"), 3);
        assert_eq!(index.count("cat", "d2"), 0);
        assert_eq!(index.count("fish", "d1"), 0);
    }

    #[test]
    fn empty_stream_gives_empty_index() {
        let index = build(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index, InvertedIndex::new());
    }

    #[test]
    fn interleaving_documents_does_not_change_result() {
        let a: Vec<Token> = tokenize("x y x", "d1").collect();
        let b: Vec<Token> = tokenize("y z", "d2").collect();
        let sequential = build(a.iter().cloned().chain(b.iter().cloned()));
        let interleaved = build(vec![b[0].clone(), a[0].clone(), a[1].clone(), b[1].clone(), a[2].clone()]);
        assert_eq!(sequential, interleaved);
    }

    #[test]
    fn merge_sums_and_is_order_independent() {
        let left = idx(&[("a", "d1", 1)]);
        let right = idx(&[("a", "d1", 1), ("b", "d2", 1)]);
        let expected = idx(&[("a", "d1", 2), ("b", "d2", 1)]);
        assert_eq!(left.clone().merged(right.clone()), expected);
        assert_eq!(right.merged(left), expected);
    }

    #[test]
    fn merge_is_associative() {
        let a = idx(&[("a", "d1", 1)]);
        let b = idx(&[("a", "d1", 3), ("c", "d3", 2)]);
        let c = idx(&[("b", "d2", 1), ("c", "d3", 1)]);
        let left = a.clone().merged(b.clone()).merged(c.clone());
        let right = a.merged(b.merged(c));
        assert_eq!(left, right);
    }

    #[test]
    fn zero_counts_are_not_stored() {
        let mut index = InvertedIndex::new();
        index.add("a", "d1", 0);
        assert!(index.is_empty());
    }

    #[test]
    fn builder_snapshot_is_valid_mid_stream() {
        let mut builder = IndexBuilder::new();
        builder.extend(tokenize("one two", "d1"));
        assert_eq!(builder.index().len(), 2);
        assert_eq!(builder.tokens(), 2);
        builder.extend(tokenize("two", "d2"));
        assert_eq!(builder.finish().document_frequency("two"), 2);
    }
}
