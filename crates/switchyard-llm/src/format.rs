//! Response envelope assembly for non-streaming completions

use crate::types::{CompletionResponse, FinishReason, Usage};

/// Fresh `chatcmpl-<32 hex>` identifier
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// Current Unix time in seconds
pub fn unix_now() -> u64 {
    u64::try_from(jiff::Timestamp::now().as_second()).unwrap_or_default()
}

/// Stamp a backend result with the gateway's envelope
///
/// The backend's own id is discarded so every top-level request gets a
/// new one. Missing finish reasons read as `stop` and the usage total is
/// recomputed from its parts.
pub fn finalize(mut response: CompletionResponse, requested_model: &str) -> CompletionResponse {
    response.id = completion_id();
    response.object = "chat.completion".to_owned();
    response.created = unix_now();

    if response.model.is_empty() {
        requested_model.clone_into(&mut response.model);
    }

    for choice in &mut response.choices {
        choice.finish_reason.get_or_insert(FinishReason::Stop);
    }

    response.usage = response
        .usage
        .map(|usage| Usage::new(usage.prompt_tokens, usage.completion_tokens));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Choice, ChoiceMessage};

    fn backend_response() -> CompletionResponse {
        CompletionResponse {
            id: "upstream-1".to_owned(),
            object: String::new(),
            created: 0,
            model: String::new(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage::text("4".to_owned()),
                finish_reason: None,
            }],
            usage: Some(Usage {
                prompt_tokens: 7,
                completion_tokens: 1,
                total_tokens: 0,
            }),
        }
    }

    #[test]
    fn envelope_fields_are_filled() {
        let response = finalize(backend_response(), "llama3");

        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.id.len(), "chatcmpl-".len() + 32);
        assert_eq!(response.object, "chat.completion");
        assert!(response.created > 0);
        assert_eq!(response.model, "llama3");
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 8);
    }

    #[test]
    fn ids_are_never_reused() {
        let first = finalize(backend_response(), "llama3");
        let second = finalize(backend_response(), "llama3");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn backend_model_name_is_kept() {
        let mut response = backend_response();
        response.model = "llama3:8b".to_owned();
        assert_eq!(finalize(response, "llama3").model, "llama3:8b");
    }
}
