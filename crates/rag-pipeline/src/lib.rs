//! Retrieval-augmented answering: embed the question, fetch the nearest
//! snippets, assemble a prompt and ask the completion service.

pub mod embedder;
pub mod generator;
pub mod onnx;
pub mod prompt;
pub mod retriever;
pub mod service;

pub use embedder::{Embedder, HttpEmbedder};
pub use generator::{AnswerGenerator, Credential, YandexGptClient};
pub use onnx::OnnxEmbedder;
pub use prompt::{PromptAssembler, SYSTEM_INSTRUCTION};
pub use retriever::Retriever;
pub use service::{connect_embedder, RagService};
