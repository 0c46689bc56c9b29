//! HippoGraph search benchmarks.
//!
//! Benchmarks the cosine similarity kernel, entity extraction, embedding,
//! and the full spreading-activation search end to end.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hippograph::{
    cosine_similarity, DeterministicEmbeddingProvider, EmbeddingProvider, EntityExtractor,
    MemoryEngine, NoteInput, RegexEntityExtractor, SearchFilters,
};

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..256).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..256).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_256d", |bench| {
        bench.iter(|| {
            black_box(cosine_similarity(&a, &b));
        })
    });
}

fn bench_entity_extraction(c: &mut Criterion) {
    let extractor = RegexEntityExtractor;
    let text = "Met with Sarah at Google to discuss the new Rust and Docker \
                deployment pipeline, budgeted at $50,000 for the quarter";

    c.bench_function("entity_extraction", |bench| {
        bench.iter(|| {
            black_box(extractor.extract(text));
        })
    });
}

fn bench_deterministic_embedding(c: &mut Criterion) {
    let provider = DeterministicEmbeddingProvider::new(256);
    let text = "a fairly typical note about rust ownership and borrowing rules";

    c.bench_function("deterministic_embed_256d", |bench| {
        bench.iter(|| {
            black_box(provider.embed(text).unwrap());
        })
    });
}

fn seeded_engine(note_count: usize) -> MemoryEngine {
    let engine = MemoryEngine::in_memory_for_tests().unwrap();
    for i in 0..note_count {
        engine
            .add_note(NoteInput {
                content: format!(
                    "note {i} about rust memory systems, graph activation, and vector search topic {}",
                    i % 17
                ),
                ..Default::default()
            })
            .unwrap();
    }
    engine
}

fn bench_search_100_notes(c: &mut Criterion) {
    let engine = seeded_engine(100);

    c.bench_function("search_100_notes", |bench| {
        bench.iter(|| {
            black_box(
                engine
                    .search("rust memory systems and graph activation", 10, &SearchFilters::none())
                    .unwrap(),
            );
        })
    });
}

fn bench_find_similar_100_notes(c: &mut Criterion) {
    let engine = seeded_engine(100);

    c.bench_function("find_similar_100_notes", |bench| {
        bench.iter(|| {
            black_box(
                engine
                    .find_similar("note about rust memory systems and vector search", 0.5, 10)
                    .unwrap(),
            );
        })
    });
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_entity_extraction,
    bench_deterministic_embedding,
    bench_search_100_notes,
    bench_find_similar_100_notes,
);
criterion_main!(benches);
