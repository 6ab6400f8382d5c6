use safepoint_core::{Intent, ReplyContext};
use serde::Serialize;

/// Returned when the generation provider fails on a conversational turn.
pub const CONVERSATIONAL_FALLBACK: &str =
    "Hi! I can find the nearest hospital, pharmacy, or police station for you. \
     Tell me what you need and share your location.";

/// Returned when the generation provider fails on an informational turn.
pub const INFORMATIONAL_FALLBACK: &str =
    "I found a place for you but couldn't generate a response right now. Please try again.";

/// Returned by the orchestrator when the place search has zero matches.
/// A successful reply with negative content, not an error.
pub const NO_NEARBY_RESULTS_REPLY: &str =
    "I couldn't find any matching place near your location. You may want to widen the search \
     or try again shortly.";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Builds the role-tagged message list for the branch that produced the
/// context. Deterministic; the only dynamic parts are the looked-up facts.
pub fn context_messages(context: &ReplyContext) -> Vec<ChatMessage> {
    match context {
        ReplyContext::Conversational { intent } => vec![
            ChatMessage::system(
                "You are Safepoint, a conversational safety assistant. Greet the user briefly \
                 and explain the two things you can do: find the nearest hospital, pharmacy, or \
                 police station near their location, or ask one clarifying question when their \
                 intent is unclear. Keep the reply to a few short sentences.",
            ),
            ChatMessage::user(conversational_cue(*intent)),
        ],
        ReplyContext::Informational {
            category,
            place,
            route,
        } => {
            let mut facts = vec![
                format!("Category: {}", category.label()),
                format!("Name: {}", place.name),
                format!("Address: {}", place.address),
            ];
            match route {
                Some(route) => {
                    facts.push(format!("Driving time: {} minutes", route.duration_minutes));
                    facts.push(format!("Directions: {}", route.steps.join("; ")));
                }
                None => facts.push("Directions: unavailable".to_string()),
            }

            vec![
                ChatMessage::system(
                    "You are Safepoint, a safety assistant. Describe the place to the user: \
                     name and address first, then the driving time if given, then the \
                     turn-by-turn directions. If directions are unavailable, say so briefly. \
                     Be concise and reassuring.",
                ),
                ChatMessage::user(facts.join("\n")),
            ]
        }
    }
}

fn conversational_cue(intent: Intent) -> String {
    match intent {
        Intent::Greeting => "The user greeted you.".to_string(),
        Intent::Help => "The user asked what you can do.".to_string(),
        _ => "The user's intent was unclear; ask one clarifying question.".to_string(),
    }
}

/// Deterministic replacement text for the branch, used whenever the
/// provider's response is missing, empty, or malformed.
pub fn fallback_reply(context: &ReplyContext) -> String {
    match context {
        ReplyContext::Conversational { .. } => CONVERSATIONAL_FALLBACK.to_string(),
        ReplyContext::Informational { .. } => INFORMATIONAL_FALLBACK.to_string(),
    }
}
