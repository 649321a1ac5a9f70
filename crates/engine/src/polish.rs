use std::sync::Arc;

use tracing::{debug, warn};

use linebook_core::interpret::normalize::normalize;

use crate::rewriter::TextRewriter;

/// Description polisher: deterministic cleanup always runs, the external
/// rewriter is best-effort on top.
///
/// `polish` never fails. When no rewriter is configured, or the rewrite call
/// errors in any way (missing credential, timeout, non-success status,
/// malformed body), the deterministic output is returned and the failure is
/// only logged. The external call can degrade the polish, never the request.
pub struct RewriterWithFallback {
    rewriter: Option<Arc<dyn TextRewriter>>,
}

impl RewriterWithFallback {
    pub fn new(rewriter: Option<Arc<dyn TextRewriter>>) -> Self {
        Self { rewriter }
    }

    pub fn deterministic() -> Self {
        Self { rewriter: None }
    }

    pub async fn polish(&self, raw: &str) -> String {
        let cleaned = normalize(raw);

        let Some(rewriter) = &self.rewriter else {
            return cleaned;
        };

        match rewriter.rewrite(&cleaned).await {
            Ok(rewritten) => {
                debug!(
                    event_name = "pipeline.polish.rewritten",
                    "external rewriter produced description"
                );
                rewritten
            }
            Err(error) => {
                warn!(
                    event_name = "pipeline.polish.rewrite_failed",
                    error = %error,
                    "rewrite failed, using deterministic cleanup"
                );
                cleaned
            }
        }
    }
}
