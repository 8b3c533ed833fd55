use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rag_vectordb::distance::DistanceMetric;
use rag_vectordb::index::{FlatIndex, VectorIndex};
use rand::Rng;

fn random_vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect()).collect()
}

fn bench_flat_search(c: &mut Criterion) {
    let dim = 384;
    let idx = FlatIndex::from_vectors(dim, DistanceMetric::L2, &random_vectors(10_000, dim)).unwrap();
    let query = random_vectors(1, dim).remove(0);

    c.bench_function("flat_search_top3_from_10k_384d", |b| {
        b.iter(|| black_box(idx.search(&query, 3).unwrap()))
    });
}

fn bench_index_parse(c: &mut Criterion) {
    let dim = 384;
    let idx = FlatIndex::from_vectors(dim, DistanceMetric::Cosine, &random_vectors(5_000, dim)).unwrap();
    let bytes = idx.to_bytes().unwrap();

    c.bench_function("flat_index_parse_5k_384d", |b| {
        b.iter(|| black_box(FlatIndex::from_bytes(&bytes).unwrap()))
    });
}

criterion_group!(benches, bench_flat_search, bench_index_parse);
criterion_main!(benches);
