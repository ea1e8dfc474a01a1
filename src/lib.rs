//! A gateway that accepts Mistral-native chat-completion requests and
//! forwards them to AWS Bedrock: model aliases are resolved to concrete
//! Bedrock ids, the request is SigV4-signed, admission to the backend is
//! bounded by a FIFO queue, and the Bedrock response is normalized back
//! into the canonical schema before it reaches the client.

pub mod aliases;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod normalize;
pub mod outbound;
pub mod pipeline;
pub mod queue;
pub mod translation;
pub mod types;

mod error;

#[doc(hidden)]
pub mod test_support;

pub use auth::{SigV4Credentials, SigV4Signer, SigV4Timestamp};
pub use config::{Env, RelayConfig, resolve_credentials};
pub use dispatch::{Dispatch, HttpDispatcher};
pub use error::{RelayError, Result};
pub use http::{AppState, router};
pub use outbound::{SignedRequest, UnsignedRequest};
pub use pipeline::Pipeline;
pub use queue::{AdmissionQueue, AdmissionTicket};
pub use translation::{MistralBedrockTranslator, TranslatorCapability};
pub use types::{BackendResponse, CanonicalResponse, ChatCompletionRequest, ChatMessage, Role};
