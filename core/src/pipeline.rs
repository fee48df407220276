//! Stage wiring: Source -> Normalizer -> Tokenizer -> [Stopwords] -> [Stemmer] -> Index.

use crate::error::{PipelineError, Result, SourceError};
use crate::frequency::FrequencyDistribution;
use crate::index::{IndexBuilder, InvertedIndex};
use crate::normalizer::Normalizer;
use crate::persist::TokenWriter;
use crate::source::Document;
use crate::stemmer::Stemmer;
use crate::stopwords::StopwordSet;
use crate::tokenizer::{tokenize, DocId, Token};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Points in the token stream where the frequency analyzer or an artifact sink can tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Tokenized,
    StopwordFiltered,
    Stemmed,
}

impl Stage {
    /// Pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Tokenized, Stage::StopwordFiltered, Stage::Stemmed];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Tokenized => "tokenized",
            Stage::StopwordFiltered => "stopword",
            Stage::Stemmed => "stemmed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tokenized" | "tokens" => Ok(Stage::Tokenized),
            "stopword" | "filtered" => Ok(Stage::StopwordFiltered),
            "stemmed" | "stem" => Ok(Stage::Stemmed),
            other => Err(PipelineError::configuration(format!("unknown stage: {other}"))),
        }
    }
}

/// What to do when the source fails to supply a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceErrorPolicy {
    #[default]
    Abort,
    /// Log the failure and continue with the next document.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub stopwords: bool,
    pub stem: bool,
    /// Stage whose output feeds the frequency analyzer; `None` disables it.
    pub frequency: Option<Stage>,
    pub on_source_error: SourceErrorPolicy,
    pub normalizer: Normalizer,
}

/// Explicitly constructed language resources. Build once, reuse across runs.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub stopwords: Option<StopwordSet>,
    pub stemmer: Option<Stemmer>,
}

/// Optional per-stage outputs, one term per line.
#[derive(Default)]
pub struct ArtifactSinks {
    pub tokens: Option<TokenWriter>,
    pub stopword_filtered: Option<TokenWriter>,
    pub stemmed: Option<TokenWriter>,
}

impl ArtifactSinks {
    fn get_mut(&mut self, stage: Stage) -> Option<&mut TokenWriter> {
        match stage {
            Stage::Tokenized => self.tokens.as_mut(),
            Stage::StopwordFiltered => self.stopword_filtered.as_mut(),
            Stage::Stemmed => self.stemmed.as_mut(),
        }
    }

    fn flush(&mut self) -> Result<()> {
        for sink in [&mut self.tokens, &mut self.stopword_filtered, &mut self.stemmed].into_iter().flatten() {
            sink.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub documents: u64,
    pub skipped: u64,
    pub characters: u64,
    /// Tokens produced by the tokenizer.
    pub tokens: u64,
    /// Tokens that reached the index builder.
    pub indexed_tokens: u64,
}

impl RunStats {
    fn merge(&mut self, other: &RunStats) {
        self.documents += other.documents;
        self.skipped += other.skipped;
        self.characters += other.characters;
        self.tokens += other.tokens;
        self.indexed_tokens += other.indexed_tokens;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub index: InvertedIndex,
    pub frequency: Option<FrequencyDistribution>,
    pub stats: RunStats,
}

impl PipelineOutput {
    fn empty(frequency: bool) -> Self {
        Self { frequency: frequency.then(FrequencyDistribution::new), ..Self::default() }
    }

    /// Sums two partial outputs. Order of merging does not affect the result.
    pub fn merge(&mut self, other: PipelineOutput) {
        self.index.merge(other.index);
        if let Some(theirs) = other.frequency {
            match self.frequency.as_mut() {
                Some(mine) => mine.merge(theirs),
                None => self.frequency = Some(theirs),
            }
        }
        self.stats.merge(&other.stats);
    }

    fn merged(mut self, other: PipelineOutput) -> Self {
        self.merge(other);
        self
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    stopwords: Option<StopwordSet>,
    stemmer: Option<Stemmer>,
}

impl Pipeline {
    /// Validates `config` against `resources`. Enabled stages without their data fail here.
    pub fn new(config: PipelineConfig, resources: Resources) -> Result<Self> {
        let stopwords = if config.stopwords {
            match resources.stopwords {
                Some(set) if !set.is_empty() => Some(set),
                Some(_) => return Err(PipelineError::configuration("stopword stage enabled with an empty stopword set")),
                None => return Err(PipelineError::configuration("stopword stage enabled without a stopword set")),
            }
        } else {
            None
        };
        let stemmer = if config.stem {
            Some(resources.stemmer.ok_or_else(|| PipelineError::configuration("stem stage enabled without a stemmer"))?)
        } else {
            None
        };
        Ok(Self { config, stopwords, stemmer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the optional stages that run, in order.
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.stopwords.is_some() {
            stages.push("stopword");
        }
        if self.stemmer.is_some() {
            stages.push("stem");
        }
        if self.config.frequency.is_some() {
            stages.push("frequency-report");
        }
        stages
    }

    /// Lazy token stream for one document with every enabled stage applied.
    pub fn document_tokens<'a>(&'a self, doc: &Document) -> impl Iterator<Item = Token> + Send + 'a {
        tokenize(self.config.normalizer.normalize(&doc.text), doc.id.as_str())
            .filter_map(move |token| Stage::ALL.into_iter().try_fold(token, |t, stage| self.apply(stage, t)))
    }

    /// The rule for one stage. A disabled stage passes the token through unchanged.
    fn apply(&self, stage: Stage, token: Token) -> Option<Token> {
        match stage {
            Stage::Tokenized => Some(token),
            Stage::StopwordFiltered => match &self.stopwords {
                Some(set) if !set.keeps(&token) => None,
                _ => Some(token),
            },
            Stage::Stemmed => Some(match &self.stemmer {
                Some(s) => s.stem_token(token),
                None => token,
            }),
        }
    }

    /// Pushes one token through the stages, reporting it at each tap point.
    fn stage_token(&self, token: Token, observe: &mut dyn FnMut(Stage, &Token) -> Result<()>) -> Result<Option<Token>> {
        let mut token = token;
        for stage in Stage::ALL {
            match self.apply(stage, token) {
                Some(t) => token = t,
                None => return Ok(None),
            }
            observe(stage, &token)?;
        }
        Ok(Some(token))
    }

    /// Builds the partial output for a single document. Nothing is shared, so
    /// a failure here leaves any caller-held index untouched.
    fn index_document(&self, doc: &Document, mut sinks: Option<&mut ArtifactSinks>) -> Result<PipelineOutput> {
        let tap = self.config.frequency;
        let mut frequency = tap.map(|_| FrequencyDistribution::new());
        let mut builder = IndexBuilder::new();
        let mut tokens = 0u64;
        let doc_id: DocId = Arc::from(doc.id.as_str());

        for token in tokenize(self.config.normalizer.normalize(&doc.text), doc_id) {
            tokens += 1;
            let mut observe = |stage: Stage, t: &Token| -> Result<()> {
                if tap == Some(stage) {
                    if let Some(f) = frequency.as_mut() {
                        f.observe(t);
                    }
                }
                if let Some(sink) = sinks.as_deref_mut().and_then(|s| s.get_mut(stage)) {
                    sink.write(t)?;
                }
                Ok(())
            };
            if let Some(token) = self.stage_token(token, &mut observe)? {
                builder.add(&token);
            }
        }

        let stats = RunStats {
            documents: 1,
            skipped: 0,
            characters: doc.text.chars().count() as u64,
            tokens,
            indexed_tokens: builder.tokens(),
        };
        debug!(doc_id = %doc.id, tokens = stats.tokens, indexed = stats.indexed_tokens, "indexed document");
        Ok(PipelineOutput { index: builder.finish(), frequency, stats })
    }

    /// Applies the source error policy and rejects duplicate ids.
    /// `Ok(None)` means the item was skipped.
    fn admit(
        &self,
        item: std::result::Result<Document, SourceError>,
        seen: &mut HashSet<String>,
    ) -> Result<Option<Document>> {
        let err = match item {
            Ok(doc) if seen.insert(doc.id.clone()) => return Ok(Some(doc)),
            Ok(doc) => SourceError::new("document stream", "duplicate document id").with_doc_id(doc.id),
            Err(e) => e,
        };
        match self.config.on_source_error {
            SourceErrorPolicy::Abort => Err(err.into()),
            SourceErrorPolicy::Skip => {
                warn!(error = %err, "skipping document");
                Ok(None)
            }
        }
    }

    /// Starts an incremental run. Sinks for stages that are not enabled are rejected.
    pub fn start(&self, sinks: ArtifactSinks) -> Result<PipelineRun<'_>> {
        if sinks.stopword_filtered.is_some() && self.stopwords.is_none() {
            return Err(PipelineError::configuration("stopword token output requested but the stopword stage is disabled"));
        }
        if sinks.stemmed.is_some() && self.stemmer.is_none() {
            return Err(PipelineError::configuration("stemmed token output requested but the stem stage is disabled"));
        }
        Ok(PipelineRun {
            pipeline: self,
            output: PipelineOutput::empty(self.config.frequency.is_some()),
            sinks,
            seen: HashSet::new(),
        })
    }

    pub fn run<S>(&self, source: S) -> Result<PipelineOutput>
    where
        S: IntoIterator<Item = std::result::Result<Document, SourceError>>,
    {
        self.run_with_sinks(source, ArtifactSinks::default())
    }

    pub fn run_with_sinks<S>(&self, source: S, sinks: ArtifactSinks) -> Result<PipelineOutput>
    where
        S: IntoIterator<Item = std::result::Result<Document, SourceError>>,
    {
        let mut run = self.start(sinks)?;
        for item in source {
            run.push(item)?;
        }
        run.finish()
    }

    /// Pulls `batch_size` documents at a time from the source and indexes each
    /// batch across the rayon pool, merging per-document partials by summing counts.
    pub fn run_parallel<S>(&self, source: S, batch_size: usize) -> Result<PipelineOutput>
    where
        S: IntoIterator<Item = std::result::Result<Document, SourceError>>,
    {
        let batch_size = batch_size.max(1);
        let with_frequency = self.config.frequency.is_some();
        let mut total = PipelineOutput::empty(with_frequency);
        let mut seen = HashSet::new();
        let mut source = source.into_iter();
        let mut batch: Vec<Document> = Vec::with_capacity(batch_size);

        loop {
            batch.clear();
            for item in source.by_ref() {
                match self.admit(item, &mut seen)? {
                    Some(doc) => batch.push(doc),
                    None => total.stats.skipped += 1,
                }
                if batch.len() == batch_size {
                    break;
                }
            }
            if batch.is_empty() {
                break;
            }
            let partial = batch
                .par_iter()
                .map(|doc| self.index_document(doc, None))
                .try_reduce(|| PipelineOutput::empty(with_frequency), |a, b| Ok(a.merged(b)))?;
            debug!(documents = partial.stats.documents, "merged batch");
            total.merge(partial);
        }

        log_summary(&total);
        Ok(total)
    }
}

fn log_summary(output: &PipelineOutput) {
    info!(
        documents = output.stats.documents,
        skipped = output.stats.skipped,
        characters = output.stats.characters,
        tokens = output.stats.tokens,
        indexed_tokens = output.stats.indexed_tokens,
        terms = output.index.len(),
        "pipeline run complete"
    );
}

/// An in-progress sequential run. Stopping early and calling [`PipelineRun::finish`]
/// yields a valid index over the documents pushed so far.
pub struct PipelineRun<'p> {
    pipeline: &'p Pipeline,
    output: PipelineOutput,
    sinks: ArtifactSinks,
    seen: HashSet<String>,
}

impl PipelineRun<'_> {
    /// Feeds one item from the source, applying the configured error policy.
    pub fn push(&mut self, item: std::result::Result<Document, SourceError>) -> Result<()> {
        match self.pipeline.admit(item, &mut self.seen)? {
            Some(doc) => {
                let partial = self.pipeline.index_document(&doc, Some(&mut self.sinks))?;
                self.output.merge(partial);
            }
            None => self.output.stats.skipped += 1,
        }
        Ok(())
    }

    pub fn ingest(&mut self, doc: Document) -> Result<()> {
        self.push(Ok(doc))
    }

    pub fn stats(&self) -> &RunStats {
        &self.output.stats
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.output.index
    }

    pub fn finish(mut self) -> Result<PipelineOutput> {
        self.sinks.flush()?;
        log_summary(&self.output);
        Ok(self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::from_documents;

    fn docs(pairs: &[(&str, &str)]) -> Vec<Document> {
        pairs.iter().map(|(id, text)| Document::new(*id, *text)).collect()
    }

    #[test]
    fn rejects_enabled_stages_without_data() {
        let cfg = PipelineConfig { stopwords: true, ..Default::default() };
        assert!(matches!(Pipeline::new(cfg.clone(), Resources::default()), Err(PipelineError::Configuration(_))));
        let empty = Resources { stopwords: Some(StopwordSet::new(Vec::<&str>::new())), stemmer: None };
        assert!(matches!(Pipeline::new(cfg, empty), Err(PipelineError::Configuration(_))));

        let cfg = PipelineConfig { stem: true, ..Default::default() };
        assert!(matches!(Pipeline::new(cfg, Resources::default()), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn unused_resources_are_ignored() {
        let resources = Resources { stopwords: Some(StopwordSet::new(["the"])), stemmer: Some(Stemmer::english()) };
        let pipeline = Pipeline::new(PipelineConfig::default(), resources).unwrap();
        assert!(pipeline.stages().is_empty());
        let out = pipeline.run(from_documents(docs(&[("d1", "The cats")]))).unwrap();
        assert_eq!(out.index.count("the", "d1"), 1);
        assert_eq!(out.index.count("cats", "d1"), 1);
    }

    #[test]
    fn document_tokens_matches_staged_run() {
        let resources = Resources { stopwords: Some(StopwordSet::new(["the"])), stemmer: Some(Stemmer::english()) };
        let cfg = PipelineConfig { stopwords: true, stem: true, ..Default::default() };
        let pipeline = Pipeline::new(cfg, resources).unwrap();
        let doc = Document::new("d1", "The running cats ran.");
        let lazy = crate::index::build(pipeline.document_tokens(&doc));
        let run = pipeline.run(from_documents([doc])).unwrap();
        assert_eq!(lazy, run.index);
        assert_eq!(run.stats.tokens, 4);
        assert_eq!(run.stats.indexed_tokens, 3);
    }

    #[test]
    fn lazy_adapters_and_staged_run_agree_for_every_stage_combination() {
        use crate::stemmer::stem;
        use crate::stopwords::filter;

        let set = StopwordSet::new(["the", "on"]);
        let stemmer = Stemmer::english();
        let doc = Document::new("d1", "The cats were running on the mats, jumping.");
        for stopwords in [false, true] {
            for stem_stage in [false, true] {
                let cfg = PipelineConfig { stopwords, stem: stem_stage, ..Default::default() };
                let resources = Resources { stopwords: Some(set.clone()), stemmer: Some(stemmer.clone()) };
                let pipeline = Pipeline::new(cfg, resources).unwrap();

                let lazy: Vec<Token> = pipeline.document_tokens(&doc).collect();
                let staged = pipeline.run(from_documents([doc.clone()])).unwrap().index;
                assert_eq!(crate::index::build(lazy.clone()), staged);

                let tokens = tokenize(crate::normalizer::normalize(&doc.text), "d1");
                let filtered: Vec<Token> = if stopwords { filter(tokens, &set).unwrap().collect() } else { tokens.collect() };
                let adapted: Vec<Token> = if stem_stage { stem(filtered, &stemmer).collect() } else { filtered };
                assert_eq!(lazy, adapted, "stopwords={stopwords} stem={stem_stage}");
            }
        }
    }

    #[test]
    fn skip_policy_counts_and_continues() {
        let cfg = PipelineConfig { on_source_error: SourceErrorPolicy::Skip, ..Default::default() };
        let pipeline = Pipeline::new(cfg, Resources::default()).unwrap();
        let source = vec![
            Ok(Document::new("d1", "a b")),
            Err(SourceError::new("x.jsonl:2", "bad record")),
            Ok(Document::new("d1", "duplicate")),
            Ok(Document::new("d2", "b")),
        ];
        let out = pipeline.run(source).unwrap();
        assert_eq!(out.stats.documents, 2);
        assert_eq!(out.stats.skipped, 2);
        assert_eq!(out.index.document_frequency("b"), 2);
        assert_eq!(out.index.count("duplicate", "d1"), 0);
    }

    #[test]
    fn abort_policy_surfaces_source_error() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Resources::default()).unwrap();
        let source = vec![Ok(Document::new("d1", "a")), Err(SourceError::new("x.json", "broken").with_doc_id("d2"))];
        let err = pipeline.run(source).unwrap_err();
        match err {
            PipelineError::Source(e) => assert_eq!(e.doc_id.as_deref(), Some("d2")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stopping_early_leaves_a_valid_index() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Resources::default()).unwrap();
        let mut run = pipeline.start(ArtifactSinks::default()).unwrap();
        run.ingest(Document::new("d1", "x y")).unwrap();
        assert_eq!(run.index().len(), 2);
        let out = run.finish().unwrap();
        assert_eq!(out.stats.documents, 1);
        assert_eq!(out.index.count("x", "d1"), 1);
    }

    #[test]
    fn sinks_for_disabled_stages_are_rejected() {
        let pipeline = Pipeline::new(PipelineConfig::default(), Resources::default()).unwrap();
        let sinks = ArtifactSinks { stemmed: Some(TokenWriter::new(Vec::new())), ..Default::default() };
        assert!(matches!(pipeline.start(sinks), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn frequency_tap_sees_its_stage() {
        let resources = Resources { stopwords: Some(StopwordSet::new(["the"])), stemmer: None };
        let tapped = |stage| {
            let cfg = PipelineConfig { stopwords: true, frequency: Some(stage), ..Default::default() };
            let pipeline = Pipeline::new(cfg, resources.clone()).unwrap();
            pipeline.run(from_documents(docs(&[("d1", "the cat the")]))).unwrap().frequency.unwrap()
        };
        assert_eq!(tapped(Stage::Tokenized).count("the"), 2);
        assert_eq!(tapped(Stage::StopwordFiltered).count("the"), 0);
        assert_eq!(tapped(Stage::Stemmed).total(), 1);
    }

    #[test]
    fn parse_stage_names() {
        assert_eq!("stemmed".parse::<Stage>().unwrap(), Stage::Stemmed);
        assert!("bogus".parse::<Stage>().is_err());
    }
}
