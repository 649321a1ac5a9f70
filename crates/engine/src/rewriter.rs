use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use linebook_core::config::RewriterConfig;

/// Instruction sent alongside the cleaned description text.
pub const REWRITE_INSTRUCTION: &str = "Rewrite the following contractor job line description \
as one concise, correctly spelled sentence. Preserve all quantities and units exactly. \
Reply with the sentence only.";

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("rewriter credential is not configured")]
    MissingCredential,
    #[error("rewrite request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rewrite service returned status {0}")]
    Status(u16),
    #[error("rewrite response was malformed: {0}")]
    MalformedResponse(String),
}

/// Capability interface for the external text-rewriting service. Callers
/// compose this with a deterministic fallback; implementations report
/// failures rather than swallowing them.
#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, text: &str) -> Result<String, RewriteError>;
}

pub struct HttpRewriter {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl HttpRewriter {
    /// Build a rewriter from configuration. Returns `None` when the service
    /// is not configured at all, which callers treat as permanent
    /// deterministic-only mode.
    pub fn from_config(config: &RewriterConfig) -> Result<Option<Self>, RewriteError> {
        let (Some(api_key), Some(base_url)) = (&config.api_key, &config.base_url) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
            model: config.model.clone(),
        }))
    }
}

/// Collapse the rewrite result to a single trimmed line. Stored descriptions
/// are one sentence; a compliant service only ever differs from its input
/// here by insignificant whitespace.
fn single_line(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl TextRewriter for HttpRewriter {
    /// Post the text to the rewrite endpoint and return the first choice.
    /// The response is used as-is apart from whitespace: runs and line
    /// breaks are collapsed so the result is always a single line.
    async fn rewrite(&self, text: &str) -> Result<String, RewriteError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(RewriteError::MissingCredential);
        }

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: REWRITE_INSTRUCTION },
                ChatMessage { role: "user", content: text },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RewriteError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| RewriteError::MalformedResponse(error.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        let sentence = single_line(&content);
        if sentence.is_empty() {
            return Err(RewriteError::MalformedResponse("empty rewrite result".to_string()));
        }
        Ok(sentence)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use linebook_core::config::RewriterConfig;

    use super::{single_line, HttpRewriter};

    fn config(api_key: Option<&str>, base_url: Option<&str>) -> RewriterConfig {
        RewriterConfig {
            api_key: api_key.map(|key| SecretString::from(key.to_string())),
            base_url: base_url.map(ToString::to_string),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn absent_configuration_builds_no_rewriter() {
        assert!(HttpRewriter::from_config(&config(None, None)).expect("build").is_none());
        assert!(HttpRewriter::from_config(&config(Some("sk-test"), None))
            .expect("build")
            .is_none());
        assert!(HttpRewriter::from_config(&config(None, Some("https://rewrite.example")))
            .expect("build")
            .is_none());
    }

    #[test]
    fn full_configuration_builds_a_rewriter_with_trimmed_base_url() {
        let rewriter =
            HttpRewriter::from_config(&config(Some("sk-test"), Some("https://rewrite.example/")))
                .expect("build")
                .expect("configured");

        assert_eq!(rewriter.base_url, "https://rewrite.example");
    }

    #[test]
    fn rewrite_result_keeps_words_verbatim_on_one_line() {
        assert_eq!(
            single_line("  Paint the living room\nwith two coats.  "),
            "Paint the living room with two coats."
        );
        assert_eq!(single_line("already one line."), "already one line.");
        assert_eq!(single_line("  \n "), "");
    }
}
