pub mod generate;
pub mod prompt;

use safepoint_core::{QuotaUsage, ReplyContext};

pub use generate::{GenerationConfig, ReplySynthesizer};
pub use prompt::{
    context_messages, fallback_reply, ChatMessage, CONVERSATIONAL_FALLBACK,
    INFORMATIONAL_FALLBACK, NO_NEARBY_RESULTS_REPLY,
};

/// Output of one synthesis pass. `quota` carries upstream-reported rate
/// limit state when the provider exposed it.
#[derive(Debug, Clone)]
pub struct ComposedReply {
    pub text: String,
    pub fallback_used: bool,
    pub quota: Option<QuotaUsage>,
}

/// Seam for reply synthesis. `compose` never fails: an unusable provider
/// response degrades to the branch's deterministic fallback string.
pub trait ReplyComposer: Send + Sync {
    async fn compose(&self, context: &ReplyContext) -> ComposedReply;

    fn fallback_text(&self, context: &ReplyContext) -> String {
        fallback_reply(context)
    }
}
