//! Prompt templates for the conversation engine and follow-up generator.
//!
//! Mixtral-style `[INST]` framing, matching the hosted model family the
//! service is deployed against.

use serde_json::Value;

use crate::store::MetricFact;

use super::engine::Exchange;

/// Reply returned when the model cannot produce a usable answer.
pub const CLARIFICATION_REPLY: &str = "I'm sorry, I couldn't find a grounded answer to that. \
Could you rephrase the question or point me at a specific sustainability metric?";

pub fn chat_prompt(
    company: &str,
    history: &[Exchange],
    facts: &[MetricFact],
    user_message: &str,
) -> String {
    let mut prompt = format!(
        "<s>[INST] You are a sustainability assistant speaking with a representative from {company}.\n\
Your goal is to help the representative understand the company's ESG performance.\n\
Answer concisely, ground your reply in the reference data when it is relevant, \
and say so plainly when the data does not cover the question.\n"
    );

    if !facts.is_empty() {
        prompt.push_str("\nReference data:\n");
        for fact in facts {
            prompt.push_str(&format!("- {}: {}\n", fact.description, fact.value));
        }
    }

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for exchange in history {
            prompt.push_str(&format!("Representative: {}\n", exchange.user));
            prompt.push_str(&format!("Assistant: {}\n", exchange.assistant));
        }
    }

    prompt.push_str(&format!("\n{} [/INST]\n", user_message));
    prompt
}

pub fn follow_up_prompt(company: &str, report: &Value) -> String {
    let serialized = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());

    format!(
        "<s>[INST] You are an agent speaking with a representative from {company}.\n\
Your goal is to assist the representative to help them better understand their sustainability practices.\n\
\n\
You provide follow up questions that the representative may ask.\n\
Use the data given to you to provide two follow up questions they could ask to better understand their data.\n\
\n\
You provide your output in JSON format, for example:\n\
```\n\
[\n\
    \"What actions do you suggest to increase renewable energy use from 86% to 100%?\",\n\
    \"How can we improve our diversity and inclusion efforts to balance the gender ratio currently at 80-20?\"\n\
]\n\
```\n\
\n\
You only provide questions in JSON format as output. Do not provide your data in any other format.\n\
\n\
Given the following data, provide questions that the representative may ask:\n\
```\n\
{serialized}\n\
```\n\
[/INST]\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prompt_includes_facts_and_history() {
        let history = vec![Exchange {
            user: "How are we doing on water?".to_string(),
            assistant: "Water withdrawal fell 8% year over year.".to_string(),
        }];
        let facts = vec![MetricFact {
            value: "3 ML".to_string(),
            description: "annual water withdrawal".to_string(),
        }];

        let prompt = chat_prompt("Acme", &history, &facts, "And waste?");

        assert!(prompt.contains("representative from Acme"));
        assert!(prompt.contains("- annual water withdrawal: 3 ML"));
        assert!(prompt.contains("Representative: How are we doing on water?"));
        assert!(prompt.trim_end().ends_with("And waste? [/INST]"));
    }

    #[test]
    fn chat_prompt_omits_empty_sections() {
        let prompt = chat_prompt("Acme", &[], &[], "Hello");
        assert!(!prompt.contains("Reference data:"));
        assert!(!prompt.contains("Conversation so far:"));
    }

    #[test]
    fn follow_up_prompt_embeds_report_json() {
        let report = serde_json::json!({"Environmental": {"Renewable Energy": []}});
        let prompt = follow_up_prompt("Acme", &report);
        assert!(prompt.contains("\"Renewable Energy\""));
        assert!(prompt.contains("two follow up questions"));
    }
}
