//! Prompt assembly for the chat model.

use std::fmt::Write as _;

use crate::generation::ChatMessage;
use crate::retrieval::RankedResult;

/// The advisor persona. Kept fixed; prompt iteration happens in one
/// place.
pub const SYSTEM_PROMPT: &str = "\
You are an expert dermatologist and beauty consultant with extensive experience in skincare.
Your role is to:
1. Provide personalized skincare advice
2. Recommend treatments and products
3. Answer questions about skincare concerns
4. Give practical, actionable advice

Always maintain a professional yet friendly tone. When discussing products, use the provided
product information and explain why they would be beneficial. If the retrieved context is
insufficient to make a strong recommendation, acknowledge that. If asked about something not
related to skincare, politely redirect to skin-related topics.";

/// Render retrieved results into a context block for the user turn.
/// Empty results produce an empty string so the prompt stays clean.
#[inline]
pub fn build_context(results: &[RankedResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut context = String::from("Relevant product information:\n");
    for result in results {
        let _ = write!(context, "- {}", result.name);
        if let Some(benefits) = result.payload.get("keyBenefits") {
            if let Some(text) = benefits.as_str() {
                let _ = write!(context, ": {}", text);
            } else if let Some(items) = benefits.as_array() {
                let joined: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                if !joined.is_empty() {
                    let _ = write!(context, ": {}", joined.join(", "));
                }
            }
        }
        context.push('\n');
    }

    context
}

/// Assemble the full message list: persona, prior turns, then the user's
/// question with retrieved context attached.
#[inline]
pub fn build_messages(
    history: &[ChatMessage],
    question: &str,
    context: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);

    let user_content = if context.is_empty() {
        question.to_string()
    } else {
        format!("{}\n\n{}", question, context)
    };
    messages.push(ChatMessage::user(user_content));

    messages
}
