//! Prompt composition with explicit truncation budgets.
//!
//! All prompt strings the service sends to the completion gateway are built
//! here, never concatenated ad hoc in handlers. Document and context text is
//! cut to a fixed character budget with a visible marker, so over-budget
//! input is a deterministic, testable policy rather than silent loss.
//!
//! Validation happens before composition: a blank question or message fails
//! immediately and no upstream call is made.

use crate::error::ApiError;

/// Fixed suffix appended to text cut at the character budget. Signals to
/// the model (and to tests) that the content is incomplete.
pub const TRUNCATION_MARKER: &str = "...";

/// Persona for the document-Q&A path.
pub const DOCUMENT_PERSONA: &str = "You are an intelligent assistant analyzing a document. \
Based on the following content, please answer the user's question accurately and concisely.";

/// Persona for the free-form chat path.
pub const CHAT_PERSONA: &str = "You are SkillWise's AI mentor assistant. Be helpful, concise, \
provide clear explanations, ask clarifying questions if needed, and avoid hallucination. \
If the user asks for code, produce runnable code blocks.";

/// Parameters for [`compose_document_prompt`]: the instruction persona and
/// the character budget applied to the document text.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub persona: String,
    pub budget: usize,
}

impl PromptConfig {
    pub fn new(persona: impl Into<String>, budget: usize) -> Self {
        Self {
            persona: persona.into(),
            budget,
        }
    }
}

/// Keeps exactly the first `budget` characters of `text` and appends the
/// truncation marker; returns the text unchanged when within budget.
///
/// Budgets are measured in characters (Unicode scalar values), not bytes,
/// so multi-byte text is never split mid-character.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}

/// Builds the document-Q&A prompt: persona, the (possibly truncated)
/// document framed as `Content`, the question framed as `Question`, and an
/// `Answer:` cue. The cue reliably elicits a direct answer from
/// instruction-tuned models instead of a restatement.
pub fn compose_document_prompt(
    config: &PromptConfig,
    document: &str,
    question: &str,
) -> Result<String, ApiError> {
    if question.trim().is_empty() {
        return Err(ApiError::EmptyQuestion);
    }
    if document.trim().is_empty() {
        return Err(ApiError::NoDocument);
    }
    let content = truncate_to_budget(document, config.budget);
    Ok(format!(
        "{persona}\n\nContent: \"{content}\"\n\nQuestion: \"{question}\"\n\nAnswer:",
        persona = config.persona,
        content = content,
        question = question.trim(),
    ))
}

/// Builds the single-shot chat prompt: `System:` persona, an optional
/// `Context:` section (truncated at `context_budget`), and the `User:`
/// message, joined by blank lines.
pub fn compose_chat_prompt(
    persona: &str,
    message: &str,
    context: Option<&str>,
    context_budget: usize,
) -> Result<String, ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let mut parts = vec![format!("System: {}", persona)];
    if let Some(ctx) = context {
        if !ctx.trim().is_empty() {
            parts.push(format!("Context: {}", truncate_to_budget(ctx, context_budget)));
        }
    }
    parts.push(format!("User: {}", message.trim()));
    Ok(parts.join("\n\n"))
}

/// Maps the short difficulty codes used by the front end to the labels the
/// quiz prompt embeds. Unknown values fall back to `medium`.
pub fn difficulty_label(code: &str) -> &'static str {
    match code {
        "ez" => "easy",
        "mid" => "medium",
        "tuff" => "hard",
        _ => "medium",
    }
}

/// Builds the quiz-generation prompt. The exact-JSON-format instructions
/// keep the completion parseable as a bare array of question objects.
pub fn build_quiz_prompt(topic: &str, num_questions: u32, difficulty: &str) -> String {
    format!(
        r#"You are an expert quiz generator. Generate {num} unique and challenging multiple-choice questions on the topic "{topic}" with "{difficulty}" difficulty.

Use this exact JSON format:
[
  {{
    "question": "Your question here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "answer": 2
  }}
]

Rules:
- "answer" is the index of the correct option (0 to 3).
- Make sure difficulty matches "{difficulty}" level.
- Do NOT return any explanation, commentary, or markdown.
- Ensure the questions are varied and not repetitive.
- Randomize the content to avoid repetition across calls."#,
        num = num_questions,
        topic = topic.trim(),
        difficulty = difficulty,
    )
}
