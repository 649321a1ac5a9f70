pub mod polish;
pub mod rewriter;
pub mod upsert;

pub use polish::RewriterWithFallback;
pub use rewriter::{HttpRewriter, RewriteError, TextRewriter};
pub use upsert::{LineItemService, UpsertOutcome, UpsertRequest};
