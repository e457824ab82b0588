//! Answer generator
//!
//! Assembles a single-turn prompt from the ranked email texts and the user's
//! question, sends it to the OpenAI chat completions API, and returns the
//! model's text verbatim. Prompt assembly is a pure function so the shape of
//! the prompt (including the empty-context case) is pinned by unit tests.

use crate::errors::{InboxError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a helpful assistant using chain-of-thought reasoning.";

/// Build the user prompt: instructional frame, context emails joined by
/// blank lines in the given order, then the literal question.
pub fn build_prompt(question: &str, context_texts: &[String]) -> String {
    let email_text = context_texts.join("\n\n");
    format!(
        "You are an AI email assistant. Use the following chain of thought approach:\n\
         \n\
         1. **Understand the context**: Carefully read the emails provided.\n\
         2. **Extract relevant information**: Identify the content most relevant to the user's query.\n\
         3. **Answer the question concisely**: Use the extracted information to answer the user's question as clearly as possible.\n\
         \n\
         Here are some emails from my inbox:\n\
         {}\n\
         \n\
         Now answer this question based on my emails: {}",
        email_text, question
    )
}

/// HTTP client for the OpenAI chat completions endpoint
pub struct AnswerGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl AnswerGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Answer `question` from `context_texts`. The response text is returned
    /// verbatim; no post-processing or citation extraction.
    pub async fn answer(&self, question: &str, context_texts: &[String]) -> Result<String> {
        let prompt = build_prompt(question, context_texts);

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(InboxError::Provider(format!(
                "chat API returned {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InboxError::Provider(format!("malformed chat response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| InboxError::Provider("chat response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_contexts_in_order() {
        let contexts = vec![
            "From: a\nSubject: s1\nBody: first".to_string(),
            "From: b\nSubject: s2\nBody: second".to_string(),
        ];
        let prompt = build_prompt("what happened?", &contexts);

        let first = prompt.find("Body: first").unwrap();
        let second = prompt.find("Body: second").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Body: first\n\nFrom: b"));
        assert!(prompt.ends_with("Now answer this question based on my emails: what happened?"));
    }

    #[test]
    fn test_prompt_with_empty_context() {
        // No guard: the context section is simply empty
        let prompt = build_prompt("anything in my inbox?", &[]);
        assert!(prompt.contains("Here are some emails from my inbox:\n\n"));
        assert!(prompt.ends_with("anything in my inbox?"));
    }

    #[test]
    fn test_prompt_question_is_literal() {
        let prompt = build_prompt("  weird \"question\"  ", &[]);
        assert!(prompt.contains("  weird \"question\"  "));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "The invoice is $100."}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "The invoice is $100.");
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY
    async fn test_answer_live() {
        let key = std::env::var("OPENAI_API_KEY").unwrap();
        let generator = AnswerGenerator::new(key, "gpt-4o");
        let contexts = vec!["From: billing\nSubject: Invoice\nBody: Total due: $42".to_string()];
        let answer = generator
            .answer("what is the total due?", &contexts)
            .await
            .unwrap();
        assert!(answer.contains("42"));
    }
}
