use crate::error::SourceError;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// A document as handed to the pipeline. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, text: T) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// Anything yielding documents lazily, one pass per invocation.
pub trait DocumentSource: Iterator<Item = Result<Document, SourceError>> {}

impl<I: Iterator<Item = Result<Document, SourceError>>> DocumentSource for I {}

/// Wraps already-loaded documents as an infallible source.
pub fn from_documents<I>(docs: I) -> impl Iterator<Item = Result<Document, SourceError>>
where
    I: IntoIterator<Item = Document>,
{
    docs.into_iter().map(Ok)
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: serde_json::Value,
    #[serde(alias = "body")]
    text: String,
}

impl InputDoc {
    fn into_document(self, location: &str) -> Result<Document, SourceError> {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(SourceError::new(location, format!("document id must be a string or number, got {other}")));
            }
        };
        Ok(Document { id, text: self.text })
    }
}

enum Pending {
    Lines { path: PathBuf, lines: Lines<BufReader<File>>, line_no: usize },
    Array { path: PathBuf, items: std::vec::IntoIter<serde_json::Value>, idx: usize },
}

/// Reads `.json`, `.jsonl` and `.txt` files one at a time.
///
/// A `.json` file holds an array of `{id, text}` objects or a single object, a
/// `.jsonl` file one object per line, and a `.txt` file is one document whose id
/// is its path. Only the current file is held open.
pub struct JsonSource {
    files: VecDeque<PathBuf>,
    pending: Option<Pending>,
}

impl JsonSource {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            files: files.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            pending: None,
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "jsonl" | "txt"))
    }

    /// Opens the next file. Returns a document directly for single-document files.
    fn open(&mut self, path: PathBuf) -> Option<Result<Document, SourceError>> {
        let location = path.display().to_string();
        match path.extension().and_then(|s| s.to_str()) {
            Some("jsonl") => match File::open(&path) {
                Ok(f) => {
                    self.pending = Some(Pending::Lines { path, lines: BufReader::new(f).lines(), line_no: 0 });
                    None
                }
                Err(e) => Some(Err(SourceError::new(location, e))),
            },
            Some("txt") => Some(
                fs::read_to_string(&path)
                    .map(|text| Document { id: location.clone(), text })
                    .map_err(|e| SourceError::new(location.clone(), e).with_doc_id(location)),
            ),
            _ => {
                let parsed = File::open(&path)
                    .map_err(|e| SourceError::new(location.clone(), e))
                    .and_then(|f| {
                        serde_json::from_reader::<_, serde_json::Value>(BufReader::new(f))
                            .map_err(|e| SourceError::new(location.clone(), e))
                    });
                match parsed {
                    Ok(serde_json::Value::Array(items)) => {
                        self.pending = Some(Pending::Array { path, items: items.into_iter(), idx: 0 });
                        None
                    }
                    Ok(value) => Some(parse_value(value, &location)),
                    Err(e) => Some(Err(e)),
                }
            }
        }
    }

    fn next_pending(&mut self) -> Option<Result<Document, SourceError>> {
        loop {
            let pending = self.pending.as_mut()?;
            let item = match pending {
                Pending::Lines { path, lines, line_no } => {
                    let Some(line) = lines.next() else { break };
                    *line_no += 1;
                    let location = format!("{}:{}", path.display(), line_no);
                    match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => match serde_json::from_str::<serde_json::Value>(&line) {
                            Ok(value) => parse_value(value, &location),
                            Err(e) => Err(SourceError::new(location, e)),
                        },
                        Err(e) => Err(SourceError::new(location, e)),
                    }
                }
                Pending::Array { path, items, idx } => {
                    let Some(value) = items.next() else { break };
                    let location = format!("{}[{}]", path.display(), idx);
                    *idx += 1;
                    parse_value(value, &location)
                }
            };
            return Some(item);
        }
        self.pending = None;
        None
    }
}

fn parse_value(value: serde_json::Value, location: &str) -> Result<Document, SourceError> {
    let doc_id = value.get("id").map(|v| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let parsed = serde_json::from_value::<InputDoc>(value)
        .map_err(|e| SourceError::new(location, e))
        .and_then(|d| d.into_document(location));
    match (parsed, doc_id) {
        (Err(e), Some(id)) => Err(e.with_doc_id(id)),
        (other, _) => other,
    }
}

impl Iterator for JsonSource {
    type Item = Result<Document, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.next_pending() {
                return Some(item);
            }
            let path = self.files.pop_front()?;
            if let Some(item) = self.open(path) {
                return Some(item);
            }
        }
    }
}
