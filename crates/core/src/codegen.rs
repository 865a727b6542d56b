//! Code-generation collaborator trait — the abstraction over LLM
//! backends.
//!
//! A `CodeGenerator` turns a structured prompt context into candidate
//! source text. Implementations (Anthropic, OpenAI-compatible, mocks)
//! live in their own crates; the engine only sees this trait.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured context for one generation call.
///
/// Repair trials are always conditioned on the immediately preceding
/// artifact plus the newest error list — never on deeper history — so
/// this struct is the whole conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContext {
    /// Role/instruction preamble (what kind of artifact to produce,
    /// signature and side-effect constraints).
    pub system: String,

    /// The task body: policy item description, examples, and the
    /// domain declarations the generated code must compile against.
    pub task: String,

    /// Previous trial's artifact, when revising.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_artifact: Option<String>,

    /// Accumulated free-text review comments (static-check diagnostics,
    /// test failures) for the revision.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_comments: Vec<String>,
}

impl PromptContext {
    pub fn new(system: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            task: task.into(),
            previous_artifact: None,
            review_comments: Vec::new(),
        }
    }

    /// Condition the next generation on a previous artifact and the
    /// errors observed against it.
    pub fn revising(mut self, previous: impl Into<String>, comments: Vec<String>) -> Self {
        self.previous_artifact = Some(previous.into());
        self.review_comments = comments;
        self
    }

    /// Render the user-message body providers send to the backend.
    pub fn render_user(&self) -> String {
        let mut out = self.task.clone();
        if let Some(prev) = &self.previous_artifact {
            out.push_str("\n\nCurrent version:\n```python\n");
            out.push_str(prev);
            if !prev.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        if !self.review_comments.is_empty() {
            out.push_str("\nProblems that must be fixed in your revision:\n");
            for comment in &self.review_comments {
                out.push_str("- ");
                out.push_str(comment);
                out.push('\n');
            }
        }
        out
    }
}

/// The code-generation collaborator.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Provider name for logging/tracking.
    fn name(&self) -> &str;

    /// Produce candidate source text for the given context. The raw
    /// completion may wrap the source in a fenced code block; callers
    /// strip it with [`extract_source`] before persisting.
    async fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError>;
}

/// Strip a fenced code block from an LLM completion.
///
/// Accepts ```python / ``` fences with optional prose around them;
/// a completion without any fence is taken verbatim. Returns an error
/// only when the completion is effectively empty.
pub fn extract_source(completion: &str) -> Result<String, ProviderError> {
    let trimmed = completion.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::MalformedCompletion(
            "empty completion".into(),
        ));
    }

    let Some(open) = trimmed.find("```") else {
        return Ok(format!("{trimmed}\n"));
    };

    // Skip the fence line itself (``` or ```python).
    let after_open = &trimmed[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];

    let source = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };

    let source = source.trim_end();
    if source.is_empty() {
        return Err(ProviderError::MalformedCompletion(
            "code block was empty".into(),
        ));
    }
    Ok(format!("{source}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_python_block() {
        let completion = "Here is the guard:\n```python\ndef guard():\n    pass\n```\nDone.";
        assert_eq!(extract_source(completion).unwrap(), "def guard():\n    pass\n");
    }

    #[test]
    fn bare_fence_without_language_tag() {
        let completion = "```\nx = 1\n```";
        assert_eq!(extract_source(completion).unwrap(), "x = 1\n");
    }

    #[test]
    fn unfenced_completion_taken_verbatim() {
        assert_eq!(extract_source("x = 1").unwrap(), "x = 1\n");
    }

    #[test]
    fn empty_completion_is_malformed() {
        assert!(extract_source("   \n").is_err());
        assert!(extract_source("```python\n```").is_err());
    }

    #[test]
    fn render_user_includes_previous_and_comments() {
        let ctx = PromptContext::new("sys", "Write the tests.").revising(
            "def test_a(): pass",
            vec!["error: name 'x' is not defined".into()],
        );
        let body = ctx.render_user();
        assert!(body.contains("Write the tests."));
        assert!(body.contains("def test_a(): pass"));
        assert!(body.contains("- error: name 'x' is not defined"));
    }

    #[test]
    fn render_user_without_revision_is_just_task() {
        let ctx = PromptContext::new("sys", "Write the tests.");
        assert_eq!(ctx.render_user(), "Write the tests.");
    }
}
