//! Translates between the canonical Mistral chat dialect and the Bedrock
//! invoke wire format.

use serde_json::Value;

use crate::aliases;
use crate::normalize;
use crate::outbound::UnsignedRequest;
use crate::types::{BackendResponse, CanonicalResponse, ChatCompletionRequest};
use crate::{RelayError, Result};

/// The (input dialect, output dialect, backend) triple a translator can
/// serve. The pipeline refuses to wire a translator onto a route whose
/// triple does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorCapability {
    pub input_api: &'static str,
    pub output_api: &'static str,
    pub service: &'static str,
}

impl std::fmt::Display for TranslatorCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{} via {}",
            self.input_api, self.output_api, self.service
        )
    }
}

/// Mistral-native requests in, Mistral-native responses out, dispatched to
/// Bedrock's `InvokeModel` endpoint.
#[derive(Debug, Clone)]
pub struct MistralBedrockTranslator {
    endpoint: String,
}

impl MistralBedrockTranslator {
    pub const CAPABILITY: TranslatorCapability = TranslatorCapability {
        input_api: "mistral-ai",
        output_api: "mistral-ai",
        service: "aws",
    };

    pub fn new(region: &str) -> Self {
        Self {
            endpoint: format!("https://bedrock-runtime.{region}.amazonaws.com"),
        }
    }

    /// Points the translator at a different endpoint, e.g. a test stub.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn capability(&self) -> TranslatorCapability {
        Self::CAPABILITY
    }

    /// Builds the unauthenticated backend request. Alias resolution is the
    /// final step of body construction, so the outbound body always carries
    /// the resolved Bedrock id and never the raw client string.
    pub fn to_backend(&self, request: &ChatCompletionRequest) -> Result<UnsignedRequest> {
        let (protocol, host) = self.split_endpoint()?;

        let mut body = match serde_json::to_value(request)? {
            Value::Object(map) => map,
            other => {
                return Err(RelayError::Internal(format!(
                    "canonical request serialized to {other:?}, expected an object"
                )));
            }
        };
        let resolved = aliases::resolve(&request.model)?;
        body.insert("model".to_string(), Value::String(resolved.to_string()));
        let payload = serde_json::to_vec(&Value::Object(body))?;

        Ok(
            UnsignedRequest::new(
                "POST",
                protocol,
                host,
                format!("/model/{resolved}/invoke"),
                payload,
            )
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json"),
        )
    }

    /// Total over missing optional fields; see [`normalize::normalize`].
    pub fn from_backend(
        &self,
        response: BackendResponse,
        original: &ChatCompletionRequest,
    ) -> Result<CanonicalResponse> {
        normalize::normalize(response, original)
    }

    fn split_endpoint(&self) -> Result<(&str, &str)> {
        let (protocol, host) = self
            .endpoint
            .split_once("://")
            .ok_or_else(|| RelayError::Config(format!("invalid endpoint {:?}", self.endpoint)))?;
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(RelayError::Config(format!(
                "endpoint {:?} has no host",
                self.endpoint
            )));
        }
        Ok((protocol, host))
    }
}
