//! Trade advice from a language model
//!
//! The decision loop only sees the [`Advisor`] trait: it hands over a
//! rendered prompt and gets free text back. Turning that text into an
//! order is the job of the command parser.

pub mod client;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;

pub use client::OpenAiAdvisor;
pub use prompt::{PromptBuilder, RESPONSE_INSTRUCTION};

/// Rendered advice request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvicePrompt {
    /// Preamble plus the serialised state snapshot
    pub system: String,
    /// Command menu and response format
    pub user: String,
}

/// Anything that can turn a prompt into trade advice
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, prompt: &AdvicePrompt) -> Result<String>;
}
