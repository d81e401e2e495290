//! ResponseSynthesizer: persona profile + memories → reply text.
//!
//! Generation is attempted only with a generator configured and a named
//! persona. Any generator error, timeout or blank output falls back to the
//! template path. Either way the reply carries the safety footer.

pub mod fallback;
pub mod generator;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{GenerationConfig, RetrievalConfig};
use crate::memory::RetrievedMemory;
use crate::persona::PersonaProfile;

pub use fallback::{ensure_footer, fallback_reply, safety_footer};
pub use generator::{create_generator, AnthropicGenerator, TextGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Generated,
    Template,
}

#[derive(Debug, Clone)]
pub struct Synthesis {
    pub text: String,
    pub source: ReplySource,
}

pub struct ResponseSynthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    context_snippets: usize,
    snippet_chars: usize,
}

impl ResponseSynthesizer {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        generation: &GenerationConfig,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            generator,
            timeout: Duration::from_secs(generation.timeout_secs),
            context_snippets: retrieval.context_snippets,
            snippet_chars: retrieval.snippet_chars,
        }
    }

    pub async fn reply(
        &self,
        profile: &PersonaProfile,
        memories: &[RetrievedMemory],
        question: &str,
    ) -> Synthesis {
        if let Some(text) = self.try_generate(profile, memories, question).await {
            return Synthesis {
                text: ensure_footer(&text, &profile.name),
                source: ReplySource::Generated,
            };
        }
        let text = fallback_reply(profile, memories, &mut rand::thread_rng());
        Synthesis {
            text,
            source: ReplySource::Template,
        }
    }

    async fn try_generate(
        &self,
        profile: &PersonaProfile,
        memories: &[RetrievedMemory],
        question: &str,
    ) -> Option<String> {
        let generator = self.generator.as_ref()?;
        if !profile.has_persona() {
            return None;
        }

        let system = prompt::system_instruction(profile);
        let context = prompt::memory_context(memories, self.context_snippets, self.snippet_chars);

        match tokio::time::timeout(self.timeout, generator.generate(&system, question, &context)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(Ok(_)) => {
                tracing::warn!("generator returned empty text, using template");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "generation failed, using template");
                None
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "generation timed out, using template");
                None
            }
        }
    }
}
