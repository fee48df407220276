//! Textual encodings for the index and the intermediate artifacts.
//!
//! The index is a JSON object `{"term": {"doc_id": count}}`. Terms and doc ids are
//! written in sorted order and counts as integers, so two logically equal indexes
//! always encode to the same bytes regardless of how they were built.

use crate::error::{PipelineError, Result};
use crate::frequency::FrequencyDistribution;
use crate::index::{Count, InvertedIndex};
use crate::tokenizer::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u64,
    pub num_terms: u64,
    pub num_tokens: u64,
    /// Optional stages that ran, in pipeline order.
    pub stages: Vec<String>,
    /// Stemmer language, when the stem stage ran.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub nfkc: bool,
    pub created_at: String,
    pub version: u32,
}

fn canonical(index: &InvertedIndex) -> BTreeMap<&str, BTreeMap<&str, Count>> {
    index
        .iter()
        .map(|(term, docs)| (term, docs.iter().map(|(d, &c)| (d.as_str(), c)).collect()))
        .collect()
}

fn json_error(e: serde_json::Error) -> PipelineError {
    if e.is_io() {
        PipelineError::Io(e.into())
    } else {
        PipelineError::encoding(e.to_string())
    }
}

pub fn serialize(index: &InvertedIndex) -> Result<String> {
    serde_json::to_string(&canonical(index)).map_err(json_error)
}

pub fn deserialize(text: &str) -> Result<InvertedIndex> {
    let raw: BTreeMap<String, BTreeMap<String, Count>> = serde_json::from_str(text).map_err(json_error)?;
    from_raw(raw)
}

fn from_raw(raw: BTreeMap<String, BTreeMap<String, Count>>) -> Result<InvertedIndex> {
    let mut index = InvertedIndex::new();
    for (term, docs) in raw {
        if docs.is_empty() {
            return Err(PipelineError::encoding(format!("term {term:?} has no documents")));
        }
        for (doc_id, count) in docs {
            if count == 0 {
                return Err(PipelineError::encoding(format!("term {term:?} has a zero count for document {doc_id:?}")));
            }
            index.add(&term, &doc_id, count);
        }
    }
    Ok(index)
}

pub fn write_index<W: Write>(writer: W, index: &InvertedIndex) -> Result<()> {
    let mut w = BufWriter::new(writer);
    serde_json::to_writer(&mut w, &canonical(index)).map_err(json_error)?;
    w.flush()?;
    Ok(())
}

pub fn read_index<R: Read>(reader: R) -> Result<InvertedIndex> {
    let raw = serde_json::from_reader(BufReader::new(reader)).map_err(json_error)?;
    from_raw(raw)
}

pub fn save_index<P: AsRef<Path>>(path: P, index: &InvertedIndex) -> Result<()> {
    ensure_parent(path.as_ref())?;
    write_index(File::create(path)?, index)
}

pub fn load_index<P: AsRef<Path>>(path: P) -> Result<InvertedIndex> {
    read_index(File::open(path)?)
}

pub fn save_meta<P: AsRef<Path>>(path: P, meta: &MetaFile) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut f = File::create(path)?;
    let json = serde_json::to_string_pretty(meta).map_err(json_error)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta<P: AsRef<Path>>(path: P) -> Result<MetaFile> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    serde_json::from_str(&buf).map_err(json_error)
}

/// Writes the top `n` terms as TSV: rank, term, count, relative frequency, rank × count.
pub fn write_frequency_report<W: Write>(writer: W, dist: &FrequencyDistribution, n: usize) -> Result<()> {
    let mut w = BufWriter::new(writer);
    writeln!(w, "rank\tterm\tcount\trelative\trank_x_count")?;
    for row in dist.zipf_table(n) {
        writeln!(w, "{}\t{}\t{}\t{:.6}\t{}", row.rank, row.term, row.count, row.relative, row.rank_x_count)?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_frequency_report<P: AsRef<Path>>(path: P, dist: &FrequencyDistribution, n: usize) -> Result<()> {
    ensure_parent(path.as_ref())?;
    write_frequency_report(File::create(path)?, dist, n)
}

/// Token stream sink: one term per line.
pub struct TokenWriter {
    out: BufWriter<Box<dyn Write + Send>>,
    written: u64,
}

impl TokenWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self { out: BufWriter::new(Box::new(writer)), written: 0 }
    }

    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        ensure_parent(path.as_ref())?;
        Ok(Self::new(File::create(path)?))
    }

    pub fn write(&mut self, token: &Token) -> Result<()> {
        self.out.write_all(token.term.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 { self.written }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    Ok(())
}
