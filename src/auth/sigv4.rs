//! AWS Signature Version 4 over an [`UnsignedRequest`] descriptor.
//!
//! Signing is the only way to obtain a [`SignedRequest`], and routing reads
//! its target off the signed value, so "route before signing" is not
//! expressible. The canonicalized path and query are carried into the
//! signed descriptor so the dispatcher sends exactly what was signed.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::outbound::{SignedRequest, UnsignedRequest};
use crate::{RelayError, Result};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Opaque credential context supplied by the configuration layer.
#[derive(Debug, Clone)]
pub struct SigV4Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SigV4Timestamp {
    pub amz_date: String,
    pub date: String,
}

impl SigV4Timestamp {
    pub fn now() -> Result<Self> {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    pub fn from_datetime(datetime: OffsetDateTime) -> Result<Self> {
        const AMZ_FORMAT: &[FormatItem<'_>] =
            format_description!("[year][month][day]T[hour][minute][second]Z");
        const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year][month][day]");

        let amz_date = datetime
            .format(AMZ_FORMAT)
            .map_err(|err| RelayError::Signing(format!("failed to format amz date: {err}")))?;
        let date = datetime
            .format(DATE_FORMAT)
            .map_err(|err| RelayError::Signing(format!("failed to format scope date: {err}")))?;
        Ok(Self { amz_date, date })
    }

    pub fn from_amz_date(amz_date: &str) -> Result<Self> {
        let amz_date = amz_date.trim();
        if amz_date.len() < 8 {
            return Err(RelayError::Signing(
                "amz date must be at least 8 chars".to_string(),
            ));
        }
        Ok(Self {
            amz_date: amz_date.to_string(),
            date: amz_date[..8].to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: SigV4Credentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(
        credentials: SigV4Credentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self> {
        let region = region.into();
        let service = service.into();

        if credentials.access_key.trim().is_empty() {
            return Err(RelayError::Signing("access_key is required".to_string()));
        }
        if credentials.secret_key.trim().is_empty() {
            return Err(RelayError::Signing("secret_key is required".to_string()));
        }
        if region.trim().is_empty() {
            return Err(RelayError::Signing("region is required".to_string()));
        }
        if service.trim().is_empty() {
            return Err(RelayError::Signing("service is required".to_string()));
        }

        Ok(Self {
            credentials,
            region,
            service,
        })
    }

    /// Signs the descriptor, producing the only routable request form.
    ///
    /// Fails with [`RelayError::Signing`] if the descriptor is incomplete;
    /// an incomplete descriptor must never fall through to dispatch.
    pub fn sign(&self, request: &UnsignedRequest, timestamp: SigV4Timestamp) -> Result<SignedRequest> {
        let method = request.method.trim();
        if method.is_empty() {
            return Err(RelayError::Signing("method must be non-empty".to_string()));
        }
        let host = request.host.trim();
        if host.is_empty() {
            return Err(RelayError::Signing("host must be non-empty".to_string()));
        }
        let protocol = request.protocol.trim();
        if protocol != "http" && protocol != "https" {
            return Err(RelayError::Signing(format!(
                "unsupported protocol {protocol:?}"
            )));
        }
        if !request.path.starts_with('/') {
            return Err(RelayError::Signing(format!(
                "path must be absolute (got {:?})",
                request.path
            )));
        }

        let payload_hash = sha256_hex(&request.body);
        let prepared = prepare_headers(
            &request.headers,
            host,
            &timestamp.amz_date,
            &payload_hash,
            self.credentials.session_token.as_deref(),
        );
        let (canonical_headers, signed_headers) = canonical_headers(&prepared);
        let canonical_path = canonical_uri(&request.path);
        let canonical_query = canonical_query(&request.query);

        let canonical_request = format!(
            "{method}\n{canonical_path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );
        let scope = format!(
            "{}/{}/{}/aws4_request",
            timestamp.date, self.region, self.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{scope}\n{}",
            timestamp.amz_date,
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = self.derive_signature(&timestamp.date, &string_to_sign)?;

        let mut headers = prepared;
        headers.insert(
            "authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credentials.access_key
            ),
        );

        Ok(SignedRequest::new(
            request,
            canonical_path,
            canonical_query,
            headers,
            timestamp.amz_date,
            signature,
        ))
    }

    fn derive_signature(&self, date: &str, string_to_sign: &str) -> Result<String> {
        let k_date = hmac_sha256(
            format!("AWS4{}", self.credentials.secret_key).as_bytes(),
            date,
        )?;
        let k_region = hmac_sha256(&k_date, &self.region)?;
        let k_service = hmac_sha256(&k_region, &self.service)?;
        let k_signing = hmac_sha256(&k_service, "aws4_request")?;
        Ok(hex_encode(&hmac_sha256(&k_signing, string_to_sign)?))
    }
}

fn prepare_headers(
    headers: &BTreeMap<String, String>,
    host: &str,
    amz_date: &str,
    payload_hash: &str,
    session_token: Option<&str>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::<String, String>::new();
    for (name, value) in headers {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let key = name.to_ascii_lowercase();
        let value = normalize_header_value(value);
        if let Some(existing) = out.get_mut(&key) {
            if !existing.is_empty() {
                existing.push(',');
            }
            existing.push_str(&value);
        } else {
            out.insert(key, value);
        }
    }

    out.entry("host".to_string())
        .or_insert_with(|| host.to_string());
    out.insert("x-amz-date".to_string(), amz_date.to_string());
    out.entry("x-amz-content-sha256".to_string())
        .or_insert_with(|| payload_hash.to_string());
    if let Some(token) = session_token {
        out.insert(
            "x-amz-security-token".to_string(),
            normalize_header_value(token),
        );
    }
    out
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let mut canonical = String::new();
    let mut signed = Vec::<&str>::new();

    for (name, value) in headers {
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
        signed.push(name);
    }

    (canonical, signed.join(";"))
}

fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        aws_percent_encode(path, false)
    }
}

fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs = query
        .iter()
        .map(|(name, value)| {
            (
                aws_percent_encode(name, true),
                aws_percent_encode(value, true),
            )
        })
        .collect::<Vec<_>>();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn aws_percent_encode(value: &str, encode_slash: bool) -> String {
    let mut out = String::new();
    for &byte in value.as_bytes() {
        let is_unreserved =
            matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~');
        if is_unreserved || (!encode_slash && byte == b'/') {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX_CHARS[(byte >> 4) as usize] as char);
            out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
    }
    out
}

fn normalize_header_value(value: &str) -> String {
    let mut out = String::new();
    let mut last_space = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| RelayError::Signing(format!("invalid hmac key: {err}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX_CHARS[(byte >> 4) as usize] as char);
        out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    out
}
