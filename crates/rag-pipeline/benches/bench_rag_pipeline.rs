use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rag_core::{MetadataRecord, RetrievalResult, RetrievedChunk};
use rag_pipeline::PromptAssembler;

fn retrieval(n: usize) -> RetrievalResult {
    RetrievalResult::new(
        (0..n)
            .map(|row| RetrievedChunk {
                row,
                distance: row as f32 * 0.1,
                record: MetadataRecord::new("Register your address at the town hall within two weeks. ".repeat(8)),
            })
            .collect(),
    )
}

fn bench_assemble(c: &mut Criterion) {
    let assembler = PromptAssembler::new();
    let small = retrieval(3);
    let large = retrieval(50);

    c.bench_function("assemble_top3", |b| {
        b.iter(|| black_box(assembler.assemble("How do I register?", &small)))
    });
    c.bench_function("assemble_top50", |b| {
        b.iter(|| black_box(assembler.assemble("How do I register?", &large)))
    });

    let capped = PromptAssembler::new().with_max_context_chars(Some(4000));
    c.bench_function("assemble_top50_capped", |b| {
        b.iter(|| black_box(capped.assemble("How do I register?", &large)))
    });
}

criterion_group!(benches, bench_assemble);
criterion_main!(benches);
