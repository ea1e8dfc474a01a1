//! The signed-dispatch pipeline: translate, admit, sign, dispatch,
//! normalize. Each stage hands an immutable value to the next; nothing is
//! mutated in place across stages.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::sigv4::{SigV4Signer, SigV4Timestamp};
use crate::dispatch::Dispatch;
use crate::queue::AdmissionQueue;
use crate::translation::{MistralBedrockTranslator, TranslatorCapability};
use crate::types::{CanonicalResponse, ChatCompletionRequest};
use crate::{RelayError, Result};

pub struct Pipeline {
    translator: MistralBedrockTranslator,
    signer: SigV4Signer,
    queue: AdmissionQueue,
    dispatcher: Arc<dyn Dispatch>,
    queue_key: String,
}

impl Pipeline {
    /// Wires the stages together for one route. Fails if the translator
    /// does not serve the route's dialect/backend triple.
    pub fn new(
        route: TranslatorCapability,
        translator: MistralBedrockTranslator,
        signer: SigV4Signer,
        queue: AdmissionQueue,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Result<Self> {
        if translator.capability() != route {
            return Err(RelayError::Config(format!(
                "translator serves {} but the route is {}",
                translator.capability(),
                route
            )));
        }
        let queue_key = route.service.to_string();
        Ok(Self {
            translator,
            signer,
            queue,
            dispatcher,
            queue_key,
        })
    }

    /// Runs one request through the pipeline.
    ///
    /// Translation (which resolves the model alias) happens before
    /// admission, so rejected requests never occupy a slot. The ticket is
    /// held until normalization finishes: a released slot means the
    /// pipeline has fully drained for that request, and the ticket's drop
    /// is also the release path on every error return and on abandonment.
    pub async fn handle(&self, request: ChatCompletionRequest) -> Result<CanonicalResponse> {
        let outbound = self.translator.to_backend(&request)?;

        let ticket = self.queue.acquire(&self.queue_key).await?;
        let signed = self.signer.sign(&outbound, SigV4Timestamp::now()?)?;
        debug!(
            model = %request.model,
            host = %signed.hostname(),
            "dispatching signed request"
        );

        let response = self.dispatcher.send(&signed).await?;
        if !response.status.is_success() {
            warn!(status = %response.status, "backend rejected request");
            return Err(RelayError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let body = self.translator.from_backend(response, &request)?;
        drop(ticket);

        info!(model = %request.model, "request completed");
        Ok(body)
    }
}
