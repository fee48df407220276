//! Corpus-wide term counts for rank/frequency (Zipf) reporting.

use crate::tokenizer::Token;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyDistribution {
    counts: HashMap<String, u64>,
    total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZipfRow {
    pub rank: usize,
    pub term: String,
    pub count: u64,
    /// count / total tokens observed
    pub relative: f64,
    /// Roughly constant across ranks when the corpus follows Zipf's law.
    pub rank_x_count: u64,
}

impl FrequencyDistribution {
    pub fn new() -> Self { Self::default() }

    pub fn observe(&mut self, token: &Token) {
        self.observe_term(&token.term);
    }

    pub fn observe_term(&mut self, term: &str) {
        match self.counts.get_mut(term) {
            Some(c) => *c += 1,
            None => {
                self.counts.insert(term.to_string(), 1);
            }
        }
        self.total += 1;
    }

    pub fn count(&self, term: &str) -> u64 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    /// Tokens observed.
    pub fn total(&self) -> u64 { self.total }

    /// Distinct terms observed.
    pub fn len(&self) -> usize { self.counts.len() }

    pub fn is_empty(&self) -> bool { self.counts.is_empty() }

    pub fn merge(&mut self, other: FrequencyDistribution) {
        for (term, count) in other.counts {
            *self.counts.entry(term).or_insert(0) += count;
        }
        self.total += other.total;
    }

    /// The `n` most frequent terms, count descending, ties by term ascending.
    pub fn top_n(&self, n: usize) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.counts.iter().map(|(t, &c)| (t.as_str(), c)).collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn zipf_table(&self, n: usize) -> Vec<ZipfRow> {
        let total = self.total.max(1) as f64;
        self.top_n(n)
            .into_iter()
            .enumerate()
            .map(|(i, (term, count))| ZipfRow {
                rank: i + 1,
                term: term.to_string(),
                count,
                relative: count as f64 / total,
                rank_x_count: (i as u64 + 1) * count,
            })
            .collect()
    }
}

/// Counts every term in the stream.
pub fn analyze<I: IntoIterator<Item = Token>>(tokens: I) -> FrequencyDistribution {
    let mut dist = FrequencyDistribution::new();
    for token in tokens {
        dist.observe(&token);
    }
    dist
}

pub fn top_n(distribution: &FrequencyDistribution, n: usize) -> Vec<(&str, u64)> {
    distribution.top_n(n)
}
