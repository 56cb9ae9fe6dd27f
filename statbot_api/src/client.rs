//! HTTP client for the game-statistics providers.

use std::time::Duration;

use serde_json::{json, Value};
use url::Url;

use crate::Error;

/// Timeout for tracker network profile requests.
const TRN_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for RapidAPI requests.
const RAPIDAPI_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the tracker network and RapidAPI-hosted providers.
///
/// Responses are returned as raw JSON values; mapping them to display fields
/// is left to the caller. Each request builds a fresh `reqwest::Client` with
/// the timeout of the provider being queried.
pub struct Client {
    /// Base URL for the tracker network. Defaults to `https://public-api.tracker.gg`.
    trn_base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a new client pointing at the production tracker network API.
    pub fn new() -> Self {
        Self {
            trn_base_url: "https://public-api.tracker.gg".to_string(),
        }
    }

    /// Creates a new client with a custom tracker network base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            trn_base_url: base_url.to_string(),
        }
    }

    fn trn_profile_url(&self, game: &str, platform: &str, identifier: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&self.trn_base_url).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                tracing::error!("Base URL cannot carry a path: {}", self.trn_base_url);
                Error::RequestFailed
            })?
            .pop_if_empty()
            .extend(["v2", game, "standard", "profile", platform, identifier]);
        Ok(url)
    }

    async fn send(
        &self,
        url: Url,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<(u16, String), Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        let mut req = client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!("Failed to get resource: {}", e);
            Error::RequestFailed
        })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;
        Ok((status, body))
    }

    /// Fetches a player profile from the tracker network.
    ///
    /// `identifier` is percent-encoded as a single path segment.
    pub async fn trn_profile(
        &self,
        api_key: &str,
        game: &str,
        platform: &str,
        identifier: &str,
    ) -> Result<Value, Error> {
        let url = self.trn_profile_url(game, platform, identifier)?;
        let (status, body) = self
            .send(url, &[("TRN-Api-Key", api_key)], TRN_TIMEOUT)
            .await?;

        if status >= 400 {
            let snippet = truncate_body(&body);
            tracing::error!("TRN request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status,
                body: snippet,
            });
        }

        serde_json::from_str::<Value>(&body).map_err(|e| {
            tracing::error!("Failed to parse TRN profile: {} | body: {}", e, truncate_body(&body));
            Error::InvalidJson
        })
    }

    /// Fetches a JSON object from a RapidAPI-hosted provider.
    ///
    /// Providers are loose with content types, so a body that is not JSON is
    /// wrapped as `{"raw": <text>}`. Error envelopes inside a 2xx response,
    /// empty objects and non-object bodies are all rejected so they never
    /// reach a cache.
    pub async fn rapidapi_json(
        &self,
        url: &str,
        api_key: &str,
        api_host: &str,
    ) -> Result<Value, Error> {
        let parsed = Url::parse(url).map_err(|e| {
            tracing::error!("Invalid RapidAPI URL {}: {}", url, e);
            Error::RequestFailed
        })?;
        let headers = [
            ("X-RapidAPI-Key", api_key),
            ("X-RapidAPI-Host", api_host),
            ("Accept-Encoding", "identity"),
        ];
        let (status, body) = self.send(parsed, &headers, RAPIDAPI_TIMEOUT).await?;

        let data = serde_json::from_str::<Value>(&body).unwrap_or_else(|_| json!({ "raw": body }));
        if status >= 400 {
            let snippet = truncate_body(&data.to_string());
            tracing::error!("RapidAPI request to {} failed with status {}: {}", url, status, snippet);
            return Err(Error::HttpStatus {
                status,
                body: snippet,
            });
        }
        check_payload(data)
    }
}

/// Validates a successful RapidAPI payload.
fn check_payload(data: Value) -> Result<Value, Error> {
    match data {
        Value::Object(map) => {
            if map.contains_key("error") && map.contains_key("statusCode") {
                let status = map
                    .get("statusCode")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(500);
                let snippet = truncate_body(&Value::Object(map).to_string());
                tracing::error!("RapidAPI payload carries error status {}: {}", status, snippet);
                return Err(Error::HttpStatus {
                    status,
                    body: snippet,
                });
            }
            if map.is_empty() {
                return Err(Error::EmptyPayload);
            }
            Ok(Value::Object(map))
        }
        other => Err(Error::UnexpectedShape(json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_encodes_identifier() {
        let client = Client::with_base_url("http://localhost:9000");
        let url = client
            .trn_profile_url("smite2", "steam", "Some Name/x")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/v2/smite2/standard/profile/steam/Some%20Name%2Fx"
        );
    }

    #[test]
    fn payload_error_envelope_uses_status_code() {
        let err = check_payload(json!({"error": "quota", "statusCode": 429})).unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn payload_error_envelope_defaults_to_500() {
        let err = check_payload(json!({"error": "boom", "statusCode": "bad"})).unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn empty_payload_rejected() {
        let err = check_payload(json!({})).unwrap_err();
        assert!(matches!(err, Error::EmptyPayload));
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn non_object_payload_rejected() {
        let err = check_payload(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape("array")));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(1500);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
    }
}
