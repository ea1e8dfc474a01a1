//! Repairs the backend body into the canonical response shape.

use serde_json::Value;

use crate::types::{BackendResponse, CanonicalResponse, ChatCompletionRequest};
use crate::{RelayError, Result};

/// Produces a canonical response body from whatever the backend returned.
///
/// Total over missing fields: Bedrock does not always confirm the model in
/// the response, so an absent or empty `model` is back-filled from the
/// *original* request string — the client gets back the name it asked for,
/// not the resolved Bedrock id. Every other field, including any
/// pipeline-injected `proxy` metadata, passes through verbatim. The only
/// failure is a body that is not a JSON object at all.
pub fn normalize(
    response: BackendResponse,
    original: &ChatCompletionRequest,
) -> Result<CanonicalResponse> {
    let parsed: Value = serde_json::from_str(&response.body).map_err(|err| {
        RelayError::UnexpectedBackendShape(format!("backend body is not valid json: {err}"))
    })?;
    let Value::Object(mut body) = parsed else {
        return Err(RelayError::UnexpectedBackendShape(format!(
            "expected a json object, got {}",
            json_kind(&parsed)
        )));
    };

    let has_model = matches!(body.get("model"), Some(Value::String(model)) if !model.is_empty());
    if !has_model {
        body.insert("model".to_string(), Value::String(original.model.clone()));
    }

    Ok(body)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn original() -> ChatCompletionRequest {
        ChatCompletionRequest::new("mistral-small-latest", Vec::new())
    }

    fn backend(body: Value) -> BackendResponse {
        BackendResponse {
            status: StatusCode::OK,
            body: body.to_string(),
        }
    }

    #[test]
    fn backfills_model_from_the_original_request() {
        let normalized = normalize(
            backend(json!({"choices": [{"message": {"content": "hi"}}]})),
            &original(),
        )
        .unwrap();
        assert_eq!(
            normalized.get("model"),
            Some(&Value::String("mistral-small-latest".to_string()))
        );
    }

    #[test]
    fn empty_model_counts_as_missing() {
        let normalized = normalize(backend(json!({"model": ""})), &original()).unwrap();
        assert_eq!(
            normalized.get("model"),
            Some(&Value::String("mistral-small-latest".to_string()))
        );
    }

    #[test]
    fn backend_model_passes_through_when_present() {
        let normalized = normalize(
            backend(json!({"model": "mistral.mistral-small-2402-v1:0"})),
            &original(),
        )
        .unwrap();
        assert_eq!(
            normalized.get("model"),
            Some(&Value::String("mistral.mistral-small-2402-v1:0".to_string()))
        );
    }

    #[test]
    fn injected_proxy_metadata_is_preserved_verbatim() {
        let normalized = normalize(
            backend(json!({"proxy": {"tokens": 12}, "usage": {"total_tokens": 12}})),
            &original(),
        )
        .unwrap();
        assert_eq!(normalized.get("proxy"), Some(&json!({"tokens": 12})));
        assert_eq!(normalized.get("usage"), Some(&json!({"total_tokens": 12})));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = normalize(backend(json!(["not", "an", "object"])), &original()).unwrap_err();
        assert!(matches!(err, RelayError::UnexpectedBackendShape(_)));

        let err = normalize(
            BackendResponse {
                status: StatusCode::OK,
                body: "not json at all".to_string(),
            },
            &original(),
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::UnexpectedBackendShape(_)));
    }
}
