//! Turns a document collection into a per-term, per-document frequency index.
//!
//! Each stage is usable on its own as a lazy iterator transformer
//! ([`tokenizer::tokenize`], [`stopwords::filter`], [`stemmer::stem`],
//! [`index::build`], [`frequency::analyze`]); [`pipeline::Pipeline`] wires the
//! enabled ones together.

pub mod error;
pub mod frequency;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod pipeline;
pub mod source;
pub mod stemmer;
pub mod stopwords;
pub mod tokenizer;

pub use error::{PipelineError, Result, SourceError};
pub use frequency::FrequencyDistribution;
pub use index::{InvertedIndex, IndexBuilder};
pub use normalizer::Normalizer;
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput, Resources, SourceErrorPolicy, Stage};
pub use source::Document;
pub use stemmer::Stemmer;
pub use stopwords::StopwordSet;
pub use tokenizer::Token;
