use crate::error::{PipelineError, Result};
use crate::normalizer::Normalizer;
use crate::tokenizer::Token;
use lazy_static::lazy_static;
use std::collections::HashSet;
use std::io::BufRead;
use std::sync::Arc;

lazy_static! {
    static ref ENGLISH: Vec<&'static str> = vec![
        "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
        "be","because","been","before","being","below","between","both","but","by",
        "can","cannot","could",
        "did","do","does","doing","don","down","during",
        "each","few","for","from","further",
        "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
        "i","if","in","into","is","it","its","itself",
        "just","me","more","most","my","myself",
        "no","nor","not","now","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
        "s","same","she","should","so","some","such",
        "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
        "under","until","up","very",
        "was","we","were","what","when","where","which","while","who","whom","why","will","with","would",
        "you","your","yours","yourself","yourselves"
    ];
}

/// Immutable set of words removed by the stopword filter.
///
/// Words are normalized on construction with the same rules as document text,
/// so membership can be tested directly against token terms. Clones share storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordSet {
    words: Arc<HashSet<String>>,
}

impl StopwordSet {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_normalizer(words, &Normalizer::default())
    }

    /// Builds the set using `normalizer`, which should match the pipeline's.
    pub fn with_normalizer<I, S>(words: I, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| normalizer.normalize(w.as_ref().trim()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words: Arc::new(words) }
    }

    pub fn english() -> Self {
        Self::new(ENGLISH.iter())
    }

    /// Reads one word per line. Blank lines and lines starting with `#` are skipped.
    pub fn from_reader<R: BufRead>(reader: R, normalizer: &Normalizer) -> Result<Self> {
        let mut words = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            words.push(word.to_string());
        }
        Ok(Self::with_normalizer(words, normalizer))
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(term)
    }

    /// Whether `token` survives the filter.
    #[inline]
    pub fn keeps(&self, token: &Token) -> bool {
        !self.contains(&token.term)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Drops stopword tokens. Positions of the survivors are left as they were.
pub struct StopwordFilter<'a, I> {
    inner: I,
    stopwords: &'a StopwordSet,
}

impl<I: Iterator<Item = Token>> Iterator for StopwordFilter<'_, I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let stopwords = self.stopwords;
        self.inner.find(|t| stopwords.keeps(t))
    }
}

/// Wraps `tokens` in a stopword filter. An empty set is a configuration error.
pub fn filter<I>(tokens: I, stopwords: &StopwordSet) -> Result<StopwordFilter<'_, I::IntoIter>>
where
    I: IntoIterator<Item = Token>,
{
    if stopwords.is_empty() {
        return Err(PipelineError::configuration("stopword filter enabled with an empty stopword set"));
    }
    Ok(StopwordFilter { inner: tokens.into_iter(), stopwords })
}
