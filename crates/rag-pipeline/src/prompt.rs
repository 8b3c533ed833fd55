//! Prompt assembly: retrieved snippets become a context block, wrapped with
//! the assistant persona and the user's question. Pure, no I/O.

use rag_core::{GenerationRequest, RetrievalResult};

/// Assistant persona and response-language directive.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert assistant specialized in topics related to settling abroad as an international student.\nAnswer all questions in English clearly and concisely. Use the context provided to give accurate advice.";

const SNIPPET_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_instruction: String,
    max_context_chars: Option<usize>,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            max_context_chars: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Cap the context block. Snippets are taken in order until the next one
    /// would overflow; the first snippet is always kept.
    pub fn with_max_context_chars(mut self, max: Option<usize>) -> Self {
        self.max_context_chars = max;
        self
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Concatenate snippets in result order, each followed by a blank line.
    pub fn build_context(&self, result: &RetrievalResult) -> String {
        let mut context = String::new();
        let mut used = 0usize;
        for snippet in result.snippets() {
            let cost = snippet.chars().count() + SNIPPET_SEPARATOR.len();
            if let Some(max) = self.max_context_chars {
                if !context.is_empty() && used + cost > max {
                    break;
                }
            }
            context.push_str(snippet);
            context.push_str(SNIPPET_SEPARATOR);
            used += cost;
        }
        context
    }

    pub fn assemble(&self, question: &str, result: &RetrievalResult) -> GenerationRequest {
        let context = self.build_context(result);
        GenerationRequest {
            system: self.system_instruction.clone(),
            user: format!("Context:\n{context}\n\nQuestion: {question}"),
        }
    }
}
