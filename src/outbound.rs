//! Outbound request descriptors.
//!
//! `UnsignedRequest` carries everything needed to sign but no routable
//! target; `SignedRequest` is only ever produced by the signer and is the
//! sole source of routing information. Code that needs a target URL must
//! hold a `SignedRequest`, so a request cannot reach the dispatcher
//! unsigned by construction.

use std::collections::BTreeMap;

use bytes::Bytes;

/// A backend-dialect request that has not been authenticated yet.
#[derive(Debug, Clone)]
pub struct UnsignedRequest {
    pub method: String,
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl UnsignedRequest {
    pub fn new(
        method: impl Into<String>,
        protocol: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            method: method.into(),
            protocol: protocol.into(),
            host: host.into(),
            path: path.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// A signed, immutable, routable request. Constructed exclusively by
/// `SigV4Signer::sign`; the path and query are stored exactly as they were
/// canonicalized, and the dispatcher must send them byte-for-byte so the
/// wire request matches the signature.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    method: String,
    protocol: String,
    hostname: String,
    path: String,
    query: String,
    headers: BTreeMap<String, String>,
    body: Bytes,
    amz_date: String,
    signature: String,
}

impl SignedRequest {
    pub(crate) fn new(
        request: &UnsignedRequest,
        canonical_path: String,
        canonical_query: String,
        headers: BTreeMap<String, String>,
        amz_date: String,
        signature: String,
    ) -> Self {
        Self {
            method: request.method.trim().to_string(),
            protocol: request.protocol.trim().to_string(),
            hostname: request.host.trim().to_string(),
            path: canonical_path,
            query: canonical_query,
            headers,
            body: request.body.clone(),
            amz_date,
            signature,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// All outbound headers, including the SigV4 authorization set.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    /// Signing timestamp in `YYYYMMDDTHHMMSSZ` form.
    pub fn amz_date(&self) -> &str {
        &self.amz_date
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The routing decision. Derived from this descriptor's own fields and
    /// nowhere else.
    pub fn target_url(&self) -> String {
        let mut url = format!("{}://{}{}", self.protocol, self.hostname, self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        url
    }

    pub fn apply_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.headers {
            req = req.header(name, value);
        }
        req
    }
}
