use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;
use wikindex_core::normalizer::Normalizer;
use wikindex_core::persist::{
    load_index, load_meta, save_frequency_report, save_index, save_meta, MetaFile, TokenWriter, FORMAT_VERSION,
};
use wikindex_core::pipeline::ArtifactSinks;
use wikindex_core::source::JsonSource;
use wikindex_core::stemmer::Language;
use wikindex_core::{Pipeline, PipelineConfig, Resources, SourceErrorPolicy, Stage, Stemmer, StopwordSet};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Tokenize a document collection and build a term-frequency inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over JSON/JSONL/TXT files or a directory of them
    Process(ProcessArgs),
    /// Load a saved index and print a summary or one term's postings
    Inspect {
        /// Index file written by `process --build-index`
        #[arg(long)]
        index: PathBuf,
        /// Print postings for this term (normalized before lookup)
        #[arg(long)]
        term: Option<String>,
        /// Metadata written by `process --meta`; the term is stemmed and NFKC-folded to match
        #[arg(long)]
        meta: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Input path (file or directory)
    #[arg(long)]
    input: PathBuf,
    /// Remove stopwords
    #[arg(long, default_value_t = false)]
    stopword: bool,
    /// Stopword list, one word per line (defaults to the built-in English list)
    #[arg(long)]
    stopwords_file: Option<PathBuf>,
    /// Stem tokens
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Stemmer language
    #[arg(long, default_value = "english")]
    language: String,
    /// Apply NFKC Unicode normalization before lower-casing
    #[arg(long, default_value_t = false)]
    nfkc: bool,
    /// Write the inverted index to this path
    #[arg(long)]
    build_index: Option<PathBuf>,
    /// Write a rank/frequency (Zipf) report to this path
    #[arg(long)]
    frequency_report: Option<PathBuf>,
    /// Rows in the frequency report
    #[arg(long, default_value_t = 50)]
    top: usize,
    /// Stage the frequency report reads from: tokenized, stopword or stemmed
    #[arg(long, default_value = "stemmed")]
    frequency_stage: String,
    /// Write the raw token stream, one term per line
    #[arg(long)]
    tokens: Option<PathBuf>,
    /// Write the stopword-filtered token stream
    #[arg(long)]
    stopword_tokens: Option<PathBuf>,
    /// Write the stemmed token stream
    #[arg(long)]
    stemmed_tokens: Option<PathBuf>,
    /// Write run metadata as JSON
    #[arg(long)]
    meta: Option<PathBuf>,
    /// Log and skip unreadable documents instead of aborting
    #[arg(long, default_value_t = false)]
    skip_bad_documents: bool,
    /// Worker threads; 1 runs sequentially. Token outputs require 1.
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Documents pulled from the input per parallel batch
    #[arg(long, default_value_t = 1024)]
    batch_size: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => process(args),
        Commands::Inspect { index, term, meta } => inspect(&index, term.as_deref(), meta.as_deref()),
    }
}

fn process(args: ProcessArgs) -> Result<()> {
    let files = collect_inputs(&args.input)?;
    if files.is_empty() {
        tracing::warn!(input = %args.input.display(), "no .json, .jsonl or .txt files found");
    }

    let normalizer = Normalizer::default().with_nfkc(args.nfkc);
    let config = PipelineConfig {
        stopwords: args.stopword,
        stem: args.stem,
        frequency: match &args.frequency_report {
            Some(_) => Some(args.frequency_stage.parse::<Stage>()?),
            None => None,
        },
        on_source_error: if args.skip_bad_documents { SourceErrorPolicy::Skip } else { SourceErrorPolicy::Abort },
        normalizer: normalizer.clone(),
    };
    let resources = load_resources(&args, &normalizer)?;
    let pipeline = Pipeline::new(config, resources)?;
    tracing::info!(files = files.len(), stages = ?pipeline.stages(), "processing corpus");

    let source = JsonSource::new(&files);
    let wants_tokens = args.tokens.is_some() || args.stopword_tokens.is_some() || args.stemmed_tokens.is_some();
    let output = if args.threads > 1 {
        if wants_tokens {
            bail!("token stream outputs are written in document order and need --threads 1");
        }
        let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build()?;
        pool.install(|| pipeline.run_parallel(source, args.batch_size))?
    } else {
        let sinks = ArtifactSinks {
            tokens: args.tokens.as_ref().map(TokenWriter::create).transpose()?,
            stopword_filtered: args.stopword_tokens.as_ref().map(TokenWriter::create).transpose()?,
            stemmed: args.stemmed_tokens.as_ref().map(TokenWriter::create).transpose()?,
        };
        pipeline.run_with_sinks(source, sinks)?
    };

    if let (Some(path), Some(dist)) = (&args.frequency_report, &output.frequency) {
        save_frequency_report(path, dist, args.top)?;
        tracing::info!(path = %path.display(), distinct = dist.len(), total = dist.total(), "wrote frequency report");
    }
    if let Some(path) = &args.build_index {
        save_index(path, &output.index)?;
        tracing::info!(path = %path.display(), terms = output.index.len(), "wrote index");
    }
    if let Some(path) = &args.meta {
        let meta = MetaFile {
            num_docs: output.stats.documents,
            num_terms: output.index.len() as u64,
            num_tokens: output.stats.indexed_tokens,
            stages: pipeline.stages().into_iter().map(String::from).collect(),
            language: args.stem.then(|| args.language.clone()),
            nfkc: args.nfkc,
            created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
            version: FORMAT_VERSION,
        };
        save_meta(path, &meta)?;
    }

    println!(
        "documents: {}  skipped: {}  characters: {}  tokens: {}  indexed: {}  terms: {}",
        output.stats.documents,
        output.stats.skipped,
        output.stats.characters,
        output.stats.tokens,
        output.stats.indexed_tokens,
        output.index.len()
    );
    Ok(())
}

fn load_resources(args: &ProcessArgs, normalizer: &Normalizer) -> Result<Resources> {
    let stopwords = if args.stopword {
        Some(match &args.stopwords_file {
            Some(path) => {
                let f = File::open(path).with_context(|| format!("opening stopword list {}", path.display()))?;
                StopwordSet::from_reader(BufReader::new(f), normalizer)?
            }
            None => StopwordSet::english(),
        })
    } else {
        None
    };
    let stemmer = if args.stem { Some(Stemmer::new(args.language.parse::<Language>()?)) } else { None };
    Ok(Resources { stopwords, stemmer })
}

/// Files under `input` the source can read, in a stable order.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && JsonSource::is_supported(p) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

/// Puts a query term through the normalization and stemming the index was built with.
fn query_term(raw: &str, meta: Option<&MetaFile>) -> Result<String> {
    let Some(meta) = meta else {
        return Ok(Normalizer::default().normalize(raw));
    };
    let normalized = Normalizer::default().with_nfkc(meta.nfkc).normalize(raw.trim());
    if meta.stages.iter().any(|s| s == "stem") {
        let language = meta.language.as_deref().unwrap_or("english").parse::<Language>()?;
        return Ok(Stemmer::new(language).stem_term(&normalized));
    }
    Ok(normalized)
}

fn inspect(path: &Path, term: Option<&str>, meta_path: Option<&Path>) -> Result<()> {
    let index = load_index(path).with_context(|| format!("loading index {}", path.display()))?;
    let meta = match meta_path {
        Some(p) => Some(load_meta(p).with_context(|| format!("loading metadata {}", p.display()))?),
        None => None,
    };
    match term {
        Some(raw) => {
            let term = query_term(raw, meta.as_ref())?;
            match index.postings(&term) {
                Some(postings) => {
                    let mut docs: Vec<_> = postings.iter().collect();
                    docs.sort();
                    println!("{term}: {} documents, {} occurrences", docs.len(), index.collection_frequency(&term));
                    for (doc_id, count) in docs {
                        println!("  {doc_id}\t{count}");
                    }
                }
                None => println!("{term}: not indexed"),
            }
        }
        None => {
            let docs: std::collections::HashSet<&str> = index.iter().flat_map(|(_, p)| p.keys().map(String::as_str)).collect();
            println!("terms: {}  documents: {}", index.len(), docs.len());
        }
    }
    Ok(())
}
