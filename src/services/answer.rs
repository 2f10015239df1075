use anyhow::{anyhow, Result};
use rig::client::completion::CompletionClient;
use rig::completion::Prompt;

use crate::config::LlmConfig;
use crate::services::llm;
use crate::services::vector::ChunkIndex;
use crate::session::ChatEntry;

/// Guidance returned when a question arrives before any PDFs were processed.
pub const MISSING_INDEX_MESSAGE: &str = "Please process the PDF files first.";

/// Fixed instructions prepended to every completion. The refusal wording is
/// part of the product behavior, so it lives here verbatim.
const INSTRUCTIONS: &str = "Answer the question precisely from the provided context, \
also make sure to provide all the details. If the answer is not in the provided context, \
just say, \"I am sorry, answer is not available in the context.\" Do not provide a wrong \
answer. If user greets or says thanks to you, reply nicely and accordingly. In case the \
question is not relevant to the provided document, politely respond that \"The answer to \
your question is not available in the provided text. How can I help you further?\". You \
are provided with the chat history too so if the user asks any question indirectly it may \
be related to the previous questions, so before refusing, also go through the chat \
history too.";

/// Assemble the system preamble: instructions, prior turns, retrieved context.
pub fn build_preamble(context: &[String], history: &[ChatEntry]) -> String {
    let mut preamble = String::from(INSTRUCTIONS);

    if !history.is_empty() {
        preamble.push_str("\n\nChat history:\n");
        for entry in history {
            preamble.push_str("User: ");
            preamble.push_str(&entry.question);
            preamble.push_str("\nAssistant: ");
            preamble.push_str(&entry.answer);
            preamble.push('\n');
        }
    }

    preamble.push_str("\n\nContext:\n---\n");
    preamble.push_str(&context.join("\n\n"));
    preamble.push_str("\n---");

    preamble
}

/// Run `attempt` until it succeeds or the retry budget is spent.
///
/// `max_retries` counts additional attempts after the first call, so a budget
/// of 2 allows three calls in total.
async fn with_retries<T, E, F, Fut>(max_retries: u32, mut attempt: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if attempts <= max_retries => {
                tracing::warn!("LLM call failed (attempt {attempts}), retrying: {e}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Answer `question` from the session's index and prior turns.
///
/// The question is embedded, the top-k chunks become the context block, and
/// the completion runs at temperature 0 under a bounded retry budget.
pub async fn answer(
    config: &LlmConfig,
    index: &ChunkIndex,
    history: &[ChatEntry],
    question: &str,
) -> Result<String> {
    let query = llm::embed_query(config, question).await?;
    let results = index.search(&query, config.top_k)?;

    let context: Vec<String> = results
        .into_iter()
        .map(|r| r.content)
        .filter(|c| !c.is_empty())
        .collect();

    tracing::debug!(
        "Answering with {} context chunk(s) and {} prior turn(s)",
        context.len(),
        history.len()
    );

    let preamble = build_preamble(&context, history);

    let client = llm::gemini_client(&config.api_key)?;
    let agent = client
        .agent(&config.model)
        .preamble(&preamble)
        .temperature(0.0)
        .build();

    with_retries(config.max_retries, || async { agent.prompt(question).await })
        .await
        .map_err(|e| anyhow!("LLM error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn entry(question: &str, answer: &str) -> ChatEntry {
        ChatEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_preamble_contains_instructions_and_context() {
        let context = vec!["alpha chunk".to_string(), "beta chunk".to_string()];
        let preamble = build_preamble(&context, &[]);

        assert!(preamble.starts_with(INSTRUCTIONS));
        assert!(preamble.contains("alpha chunk"));
        assert!(preamble.contains("beta chunk"));
        assert!(!preamble.contains("Chat history:"));
    }

    #[test]
    fn test_preamble_includes_prior_turns_in_order() {
        let history = vec![entry("first q", "first a"), entry("second q", "second a")];
        let preamble = build_preamble(&["ctx".to_string()], &history);

        assert!(preamble.contains("User: first q\nAssistant: first a"));
        assert!(preamble.contains("User: second q\nAssistant: second a"));

        let first = preamble.find("first q").unwrap();
        let second = preamble.find("second q").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_user_facing_messages_are_fixed() {
        assert!(INSTRUCTIONS.contains("I am sorry, answer is not available in the context."));
        assert_eq!(MISSING_INDEX_MESSAGE, "Please process the PDF files first.");
    }

    #[tokio::test]
    async fn test_first_try_success_makes_one_attempt() {
        let calls = Cell::new(0u32);
        let result: Result<&str, String> = with_retries(2, || {
            calls.set(calls.get() + 1);
            async { Ok("answer") }
        })
        .await;

        assert_eq!(result, Ok("answer"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_is_additional_attempts() {
        let calls = Cell::new(0u32);
        let result: Result<(), String> = with_retries(2, || {
            calls.set(calls.get() + 1);
            async { Err("boom".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers_within_budget() {
        let calls = Cell::new(0u32);
        let result = with_retries(2, || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt < 3 {
                    Err("transient".to_string())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_zero_budget_means_single_attempt() {
        let calls = Cell::new(0u32);
        let result: Result<(), String> = with_retries(0, || {
            calls.set(calls.get() + 1);
            async { Err("boom".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
