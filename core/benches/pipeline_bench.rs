use criterion::{criterion_group, criterion_main, Criterion};
use wikindex_core::source::from_documents;
use wikindex_core::{Document, Pipeline, PipelineConfig, Resources, Stemmer, StopwordSet};

const TEXT: &str = "Anarchism is a political philosophy and movement that is skeptical of all \
justifications for authority and seeks to abolish the institutions it claims maintain unnecessary \
coercion and hierarchy, typically including the state and capitalism. Anarchism advocates for the \
replacement of the state with stateless societies and voluntary free associations.";

fn bench_pipeline(c: &mut Criterion) {
    let docs: Vec<Document> = (0..200).map(|i| Document::new(i.to_string(), TEXT)).collect();
    let cfg = PipelineConfig { stopwords: true, stem: true, ..Default::default() };
    let resources = Resources { stopwords: Some(StopwordSet::english()), stemmer: Some(Stemmer::english()) };
    let pipeline = Pipeline::new(cfg, resources).unwrap();

    c.bench_function("pipeline_sequential", |b| b.iter(|| pipeline.run(from_documents(docs.clone())).unwrap()));
    c.bench_function("pipeline_parallel", |b| b.iter(|| pipeline.run_parallel(from_documents(docs.clone()), 64).unwrap()));
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
