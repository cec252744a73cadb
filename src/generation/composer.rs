//! Grounding prompt assembly and answer post-processing

use super::{GenerationParams, LanguageModel};
use crate::config::GenerationConfig;
use crate::corpus::{truncate_chars, Chunk};
use serde::Serialize;
use tracing::warn;

/// Returned when the model produces only whitespace
pub const FALLBACK_ANSWER: &str = "I couldn't generate a response. Please try rephrasing your question.";

/// Stands in for the context block when retrieval found nothing
pub const NO_CONTEXT_TEXT: &str = "No specific context found in the knowledge base.";

const INSTRUCTIONS: &[&str] = &[
    "Answer the question based on the provided context",
    "If the context doesn't contain relevant information, say so honestly",
    "Be concise but informative",
    "Cite sources when possible (e.g., \"According to Source X...\")",
];

/// How the answer text came to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Generated,
    /// The model returned nothing usable
    Fallback,
    /// The model call failed; the text already explains why
    Failed(String),
}

/// Final, always-displayable answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, AnswerOutcome::Failed(_))
    }
}

/// Builds prompts and delegates to a [`LanguageModel`]
pub struct AnswerComposer {
    model: Box<dyn LanguageModel>,
    params: GenerationParams,
    excerpt_chars: usize,
    title_chars: usize,
}

impl AnswerComposer {
    pub fn new(model: Box<dyn LanguageModel>, config: &GenerationConfig) -> Self {
        Self {
            model,
            params: GenerationParams::from(config),
            excerpt_chars: config.excerpt_chars,
            title_chars: config.source_title_chars,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// The context block: one entry per chunk, in retrieval order
    pub fn format_context(&self, context: &[Chunk]) -> String {
        if context.is_empty() {
            return NO_CONTEXT_TEXT.to_string();
        }

        context
            .iter()
            .map(|chunk| {
                format!(
                    "[Source {} - {} ({})]:\n{}",
                    chunk.chunk_id,
                    truncate_chars(&chunk.title, self.title_chars),
                    chunk.year,
                    truncate_chars(&chunk.text, self.excerpt_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build_prompt(&self, query: &str, context: &[Chunk]) -> String {
        let instructions = INSTRUCTIONS
            .iter()
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a helpful AI assistant with access to a knowledge base of research papers.\n\n\
             Context from knowledge base:\n{}\n\n\
             User question: {}\n\n\
             Instructions:\n{}\n\n\
             Answer:",
            self.format_context(context),
            query,
            instructions
        )
    }

    /// Compose with the configured sampling parameters
    pub fn answer(&self, query: &str, context: &[Chunk]) -> Answer {
        self.answer_with(query, context, &self.params)
    }

    /// Compose with explicit sampling parameters
    ///
    /// Never fails: model errors become an inline error message.
    pub fn answer_with(&self, query: &str, context: &[Chunk], params: &GenerationParams) -> Answer {
        let prompt = self.build_prompt(query, context);

        match self.model.complete(&prompt, params) {
            Ok(raw) => {
                let text = raw.trim();
                if text.is_empty() {
                    Answer {
                        text: FALLBACK_ANSWER.to_string(),
                        outcome: AnswerOutcome::Fallback,
                    }
                } else {
                    Answer {
                        text: text.to_string(),
                        outcome: AnswerOutcome::Generated,
                    }
                }
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                Answer {
                    text: format!("Error generating response: {}", e),
                    outcome: AnswerOutcome::Failed(e.to_string()),
                }
            }
        }
    }
}
