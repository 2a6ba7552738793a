use crate::models::{ChatTurn, RetrievalCandidate};
use serde::{Deserialize, Serialize};

/// Fixed system instruction for the answering model. Explains the
/// relevance-score convention on context excerpts and the expected
/// answer-confidence policy.
pub const SYSTEM_PROMPT: &str = "\
You are a lawyer's assistant for question-answering tasks regarding medical files for a \
legal case. Your task is to use the provided excerpts of a file as context to answer these \
questions. The excerpts consist of a summary, then the actual information.\n\
For each of the provided excerpts, you will first see an associated relevance score enclosed \
in square brackets which you should use to guide your judgement and confidence. A higher \
value means more relevance.\n\
Highly relevant excerpts should contain the information you are looking for. If none of the \
excerpts have particularly high scores, you should focus on the most relevant one and try to \
find the information there.\n\
It is better to partially answer the question than to provide no answer, but if you really \
don't know then say so and request additional clarification.";

/// Closing marker of the reasoning segment some models emit before their
/// actual answer.
const REASONING_CLOSE_TAG: &str = "</think>";

/// Ordered question/answer history for one session. Append-only; the core
/// never truncates or summarizes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a user turn then an assistant turn. Only called once an
    /// answer has been finalized; a failed generation must leave the
    /// conversation untouched.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(ChatTurn::user(question));
        self.turns.push(ChatTurn::assistant(answer));
    }
}

/// Assembles the full prompt for the answering model, in fixed order:
/// system instruction, prior conversation oldest-first, then one user turn
/// carrying the scored context and the current question.
pub fn build_prompt(
    conversation: &Conversation,
    context: &[RetrievalCandidate],
    question: &str,
) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(conversation.len() + 2);
    turns.push(ChatTurn::system(SYSTEM_PROMPT));
    turns.extend(conversation.turns().iter().cloned());
    turns.push(ChatTurn::user(question_prompt(context, question)));
    turns
}

fn question_prompt(context: &[RetrievalCandidate], question: &str) -> String {
    let rendered = context
        .iter()
        .map(|candidate| {
            format!(
                "[Relevance Score: {}] {}",
                candidate.score,
                candidate.chunk.combined_content()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You have the following information as context:\n\n\
         <context>\n{rendered}\n</context>\n\n\
         Respond to the following question as helpfully as possible, but keep your answer \
         concise.\n\n\
         <question>\n{question}\n</question>\n\n\
         Answer:"
    )
}

/// Drops the internal reasoning segment from model output: everything up to
/// and including the first `</think>`. When the marker is absent the whole
/// text is kept, so models that answer directly pass through unchanged.
pub fn strip_reasoning(raw: &str) -> &str {
    match raw.find(REASONING_CLOSE_TAG) {
        Some(index) => &raw[index + REASONING_CLOSE_TAG.len()..],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, Chunk};

    fn candidate(text: &str, score: f64) -> RetrievalCandidate {
        RetrievalCandidate {
            chunk: Chunk::new("doc.pdf", 0, 0, text.to_string()),
            score,
        }
    }

    #[test]
    fn reasoning_segment_is_stripped() {
        let raw = "<think>reasoning</think>The answer is 42.";
        assert_eq!(strip_reasoning(raw), "The answer is 42.");
    }

    #[test]
    fn missing_marker_keeps_the_full_text() {
        assert_eq!(strip_reasoning("Just an answer."), "Just an answer.");
    }

    #[test]
    fn only_the_first_marker_counts() {
        let raw = "<think>a</think>one</think>two";
        assert_eq!(strip_reasoning(raw), "one</think>two");
    }

    #[test]
    fn record_exchange_appends_user_then_assistant() {
        let mut conversation = Conversation::new();
        conversation.record_exchange("what happened?", "an accident");
        conversation.record_exchange("when?", "last june");

        let turns = conversation.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[2].text, "when?");
        assert_eq!(turns[3].text, "last june");
    }

    #[test]
    fn prompt_order_is_system_history_then_context_and_question() {
        let mut conversation = Conversation::new();
        conversation.record_exchange("earlier question", "earlier answer");

        let context = vec![candidate("excerpt text", 0.87)];
        let turns = build_prompt(&conversation, &context, "current question");

        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, ChatRole::System);
        assert_eq!(turns[0].text, SYSTEM_PROMPT);
        assert_eq!(turns[1].text, "earlier question");
        assert_eq!(turns[2].text, "earlier answer");

        let last = &turns[3];
        assert_eq!(last.role, ChatRole::User);
        assert!(last.text.contains("[Relevance Score: 0.87] excerpt text"));
        assert!(last.text.contains("<question>\ncurrent question\n</question>"));
    }

    #[test]
    fn empty_context_still_renders_a_prompt() {
        let turns = build_prompt(&Conversation::new(), &[], "question");
        assert_eq!(turns.len(), 2);
        assert!(turns[1].text.contains("<context>\n\n</context>"));
    }
}
