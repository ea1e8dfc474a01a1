//! Maps loosely-specified Mistral model names to concrete Bedrock model ids.

use crate::{RelayError, Result};

/// Ordered substring rules, first match wins. Order is load-bearing:
/// `8x7b` must stay ahead of `7b` and `large-2402` ahead of `large`,
/// otherwise the more specific rule becomes unreachable.
const ALIAS_RULES: &[(&str, &str)] = &[
    ("8x7b", "mistral.mixtral-8x7b-instruct-v0:1"),
    ("7b", "mistral.mistral-7b-instruct-v0:2"),
    ("large-2402", "mistral.mistral-large-2402-v1:0"),
    ("large", "mistral.mistral-large-2407-v1:0"),
    ("small", "mistral.mistral-small-2402-v1:0"),
];

const BEDROCK_PREFIX: &str = "mistral.";

/// Resolves a requested model name to exactly one known Bedrock id.
///
/// Bedrock-native ids pass through verbatim, but only if they are in the
/// known-id set; forwarding an arbitrary `mistral.`-prefixed string would
/// let unsupported models reach the dispatcher disguised as valid ones.
/// Anything else goes through the alias table on the lower-cased input.
/// There is no default: an unmatched name is a terminal error carrying the
/// offending string.
pub fn resolve(requested: &str) -> Result<&'static str> {
    if requested.starts_with(BEDROCK_PREFIX) {
        return ALIAS_RULES
            .iter()
            .map(|(_, id)| *id)
            .find(|id| *id == requested)
            .ok_or_else(|| RelayError::UnsupportedModel {
                model: requested.to_string(),
            });
    }

    let normalized = requested.to_ascii_lowercase();
    for (needle, id) in ALIAS_RULES {
        if normalized.contains(needle) {
            return Ok(id);
        }
    }
    Err(RelayError::UnsupportedModel {
        model: requested.to_string(),
    })
}

/// The Bedrock ids this gateway will dispatch to, in rule order.
pub fn supported_ids() -> impl Iterator<Item = &'static str> {
    ALIAS_RULES.iter().map(|(_, id)| *id)
}
