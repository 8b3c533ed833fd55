use criterion::{black_box, criterion_group, criterion_main, Criterion};
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;
use rag_server::{app_with_state, state::AppState};
use tokio::runtime::Runtime;

fn bench_http_health(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    c.bench_function("http_health_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let state = AppState::new();
                for _ in 0..1000 {
                    let app = app_with_state(state.clone());
                    let req = Request::builder()
                        .uri("/health")
                        .body(Body::empty())
                        .unwrap();
                    let resp = app.oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

fn bench_http_ask_not_ready(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    c.bench_function("http_ask_not_ready_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let state = AppState::new();
                for _ in 0..1000 {
                    let app = app_with_state(state.clone());
                    let req = Request::builder()
                        .method("POST")
                        .uri("/ask")
                        .header("content-type", "application/json")
                        .body(Body::from(r#"{"question": "visa?"}"#))
                        .unwrap();
                    let resp = app.oneshot(req).await.unwrap();
                    black_box(resp.status());
                }
            })
        })
    });
}

criterion_group!(benches, bench_http_health, bench_http_ask_not_ready);
criterion_main!(benches);
