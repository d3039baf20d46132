//! Share tokens: a plan's `{content, links}` as percent-encoded JSON wrapped in
//! base64, carried in the `share` query parameter.
//!
//! Decoding is lenient about how the token travelled. It accepts tokens that
//! were URL-encoded once more, URL-safe or standard alphabets, missing
//! padding, and the full stored plan instead of the `{content, links}` pair.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::types::{GroundingLink, Plan, PlanRequest, deserialize_links};

pub const SHARE_PARAM: &str = "share";

const STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share token is empty")]
    Empty,
    #[error("share token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("share payload is not a plan: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid share URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Serialize)]
struct SharePayload<'a> {
    content: &'a str,
    links: &'a [GroundingLink],
}

/// What a share token carries.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SharedPlan {
    pub content: String,
    #[serde(default, alias = "groundingLinks", deserialize_with = "deserialize_links")]
    pub links: Vec<GroundingLink>,
    /// Only present when the token holds a full stored plan.
    #[serde(default, deserialize_with = "lenient_request")]
    pub request: Option<PlanRequest>,
}

/// A request that doesn't parse is dropped; the content and links still load.
fn lenient_request<'de, D>(deserializer: D) -> Result<Option<PlanRequest>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        serde_json::from_value(value)
            .inspect_err(|e| debug!(error = %e, "ignoring request in share token"))
            .ok()
    }))
}

impl SharedPlan {
    /// Hydrates a new plan with a `shared-<millis>` id stamped now.
    pub fn into_plan(self) -> Plan {
        let now = Utc::now();
        Plan {
            id: format!("shared-{}", now.timestamp_millis()),
            created_at: now,
            request: self.request,
            content: self.content,
            links: self.links,
        }
    }
}

pub fn encode(plan: &Plan) -> Result<String, ShareError> {
    let json = serde_json::to_string(&SharePayload {
        content: &plan.content,
        links: &plan.links,
    })?;
    let escaped = urlencoding::encode(&json);
    Ok(STANDARD.encode(escaped.as_bytes()))
}

pub fn decode(token: &str) -> Result<SharedPlan, ShareError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ShareError::Empty);
    }
    let token: Cow<'_, str> = if token.contains('%') {
        urlencoding::decode(token)?
    } else {
        Cow::Borrowed(token)
    };
    // form decoding turns '+' into ' '
    let token = token.replace(' ', "+");

    let bytes = if token.contains(['-', '_']) {
        URL_SAFE.decode(token.as_bytes())?
    } else {
        STANDARD.decode(token.as_bytes())?
    };
    let inner = String::from_utf8(bytes)?;
    let json: Cow<'_, str> = if inner.trim_start().starts_with('{') {
        Cow::Borrowed(inner.as_str())
    } else {
        urlencoding::decode(&inner)?
    };
    Ok(serde_json::from_str(&json)?)
}

/// `base` with its `share` parameter replaced by `token`.
pub fn share_url(base: &str, token: &str) -> Result<String, ShareError> {
    let mut url = Url::parse(base)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != SHARE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(SHARE_PARAM, token);
    Ok(url.into())
}

/// Pulls the token out of a share URL. Input that doesn't parse as a URL is
/// taken to be the bare token.
pub fn token_from_input(input: &str) -> Option<String> {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == SHARE_PARAM)
            .map(|(_, v)| v.into_owned()),
        Err(_) if input.is_empty() => None,
        Err(_) => Some(input.to_string()),
    }
}
