//! Retriever → Prompt Assembler → Answer Generator, with a fixture embedder
//! and in-process generators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rag_core::config::{EmbeddingConfig, RetrievalConfig};
use rag_core::{AnswerResult, GenerationRequest, MetadataRecord, QueryRequest, RagError, Result};
use rag_pipeline::{connect_embedder, AnswerGenerator, Embedder, RagService, SYSTEM_INSTRUCTION};
use rag_vectordb::{DistanceMetric, FlatIndex, IndexStore};

// ============================================================
// Fixtures
// ============================================================

/// Keyword embedder over three axes: visa, housing, banking.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let t = text.to_lowercase();
        Ok(if t.contains("visa") {
            vec![1.0, 0.0, 0.0]
        } else if t.contains("housing") || t.contains("room") {
            vec![0.0, 1.0, 0.0]
        } else if t.contains("bank") {
            vec![0.0, 0.0, 1.0]
        } else {
            vec![0.4, 0.3, 0.3]
        })
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "keyword-fixture"
    }
}

/// Records the prompt it was given and answers with a fixed string.
#[derive(Default)]
struct RecordingGenerator {
    seen: Mutex<Vec<GenerationRequest>>,
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<AnswerResult> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(AnswerResult::new("Apply at the consulate."))
    }

    fn model(&self) -> &str {
        "recording"
    }
}

struct SlowGenerator;

#[async_trait]
impl AnswerGenerator for SlowGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<AnswerResult> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(AnswerResult::new("too late"))
    }

    fn model(&self) -> &str {
        "slow"
    }
}

const VISA: &str = "Student visas require an acceptance letter and proof of funds.";
const HOUSING: &str = "Most universities offer dormitory rooms for first-year students.";
const BANKING: &str = "A local bank account needs your passport and residence permit.";

fn store() -> Arc<IndexStore> {
    let index = FlatIndex::from_vectors(3, DistanceMetric::L2, &[
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ])
    .unwrap();
    let metadata = vec![
        MetadataRecord::new(VISA),
        MetadataRecord::new(HOUSING),
        MetadataRecord::new(BANKING),
    ];
    Arc::new(IndexStore::new(Arc::new(index), metadata).unwrap())
}

fn service(generator: Option<Arc<dyn AnswerGenerator>>) -> RagService {
    RagService::new(
        store(),
        Arc::new(KeywordEmbedder),
        generator,
        &RetrievalConfig::default(),
        Duration::from_secs(60),
    )
    .unwrap()
}

// ============================================================
// Retrieval
// ============================================================

#[tokio::test]
async fn test_nearest_is_exact_match() {
    let svc = service(None);
    let res = svc.retrieve("How do I get a visa?", 1).await.unwrap();
    assert_eq!(res.rows(), vec![0]);
    assert!(res.chunks[0].distance.abs() < 1e-6);
    assert_eq!(res.chunks[0].record.text_snippet, VISA);
}

#[tokio::test]
async fn test_results_are_nearest_first() {
    let svc = service(None);
    let res = svc.retrieve("Where is housing?", 3).await.unwrap();
    assert_eq!(res.chunks[0].row, 1);
    assert!(res.chunks.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn test_k_larger_than_index_returns_index_size() {
    let svc = service(None);
    let res = svc.retrieve("anything", 10).await.unwrap();
    assert_eq!(res.len(), svc.store().len());
}

#[tokio::test]
async fn test_invalid_k() {
    let svc = service(None);
    for k in [0, -1] {
        let err = svc.retrieve("visa", k).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)), "k={k}");
    }
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let svc = service(None);
    assert!(matches!(svc.retrieve("  ", 3).await, Err(RagError::InvalidArgument(_))));
}

// ============================================================
// Startup checks
// ============================================================

#[test]
fn test_dimension_mismatch_refuses_to_start() {
    struct Wide;
    #[async_trait]
    impl Embedder for Wide {
        async fn encode(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 384])
        }
        fn dimension(&self) -> usize {
            384
        }
        fn model_name(&self) -> &str {
            "wide"
        }
    }

    let err = RagService::new(store(), Arc::new(Wide), None, &RetrievalConfig::default(), Duration::from_secs(1))
        .err()
        .unwrap();
    assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
}

// ============================================================
// Generation
// ============================================================

#[tokio::test]
async fn test_generate_without_generator_is_unconfigured() {
    let svc = service(None);
    let req = GenerationRequest { system: "s".into(), user: "u".into() };
    assert!(matches!(svc.generate(&req).await, Err(RagError::GeneratorUnconfigured)));
    assert!(!svc.generator_configured());
}

#[tokio::test]
async fn test_ask_without_generator_is_unconfigured() {
    let svc = service(None);
    let err = svc.ask(&QueryRequest::new("visa?")).await.unwrap_err();
    assert!(matches!(err, RagError::GeneratorUnconfigured));
}

#[tokio::test]
async fn test_ask_invalid_k_wins_over_unconfigured() {
    let svc = service(None);
    let err = svc.ask(&QueryRequest::new("visa?").with_top_k(0)).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidArgument(_)));
}

#[tokio::test(start_paused = true)]
async fn test_generator_timeout_is_unavailable() {
    let svc = service(Some(Arc::new(SlowGenerator) as Arc<dyn AnswerGenerator>));
    let err = svc.ask(&QueryRequest::new("visa?")).await.unwrap_err();
    assert!(matches!(err, RagError::GeneratorUnavailable { timed_out: true, .. }));
    assert!(err.is_retryable());
}

// ============================================================
// End to end
// ============================================================

#[tokio::test]
async fn test_ask_top_1_grounds_prompt_on_visa_snippet_only() {
    let recorder = Arc::new(RecordingGenerator::default());
    let svc = service(Some(recorder.clone() as Arc<dyn AnswerGenerator>));

    let outcome = svc
        .ask(&QueryRequest::new("How do I get a visa?").with_top_k(1))
        .await
        .unwrap();
    assert_eq!(outcome.answer.text, "Apply at the consulate.");
    assert_eq!(outcome.retrieval.rows(), vec![0]);

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let prompt = &seen[0];
    assert_eq!(prompt.system, SYSTEM_INSTRUCTION);
    assert_eq!(prompt.user, format!("Context:\n{VISA}\n\n\n\nQuestion: How do I get a visa?"));
    assert!(!prompt.user.contains(HOUSING));
    assert!(!prompt.user.contains(BANKING));
}

#[tokio::test]
async fn test_ask_uses_default_top_k() {
    let recorder = Arc::new(RecordingGenerator::default());
    let svc = service(Some(recorder.clone() as Arc<dyn AnswerGenerator>));
    let outcome = svc.ask(&QueryRequest::new("visa")).await.unwrap();
    assert_eq!(outcome.retrieval.len(), 3);
}

// ============================================================
// Embedder selection
// ============================================================

#[tokio::test]
async fn test_model_dir_selects_local_embedder() {
    let cfg = EmbeddingConfig {
        model_dir: Some(std::env::temp_dir().join("rag-missing-model-dir")),
        endpoint: "http://127.0.0.1:9/v1/embeddings".into(),
        ..EmbeddingConfig::default()
    };
    let err = connect_embedder(&cfg).await.err().unwrap();
    assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    assert!(err.to_string().contains("model.onnx"));
}
