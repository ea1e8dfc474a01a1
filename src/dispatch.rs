//! Sends signed requests over the network. No retries here: retry policy,
//! if any, belongs to a layer outside this pipeline.

use async_trait::async_trait;

use crate::outbound::SignedRequest;
use crate::types::BackendResponse;
use crate::{RelayError, Result};

/// The transport seam. Production uses [`HttpDispatcher`]; tests substitute
/// stubs to drive the pipeline without a network.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn send(&self, request: &SignedRequest) -> Result<BackendResponse>;
}

#[derive(Clone)]
pub struct HttpDispatcher {
    http: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(RelayError::Transport)?;
        Ok(Self { http })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn send(&self, request: &SignedRequest) -> Result<BackendResponse> {
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|err| RelayError::Internal(format!("invalid method: {err}")))?;

        // The target comes from the signed descriptor and nowhere else.
        let req = self
            .http
            .request(method, request.target_url())
            .body(request.body());
        let response = request.apply_headers(req).send().await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(BackendResponse { status, body })
    }
}
