//! Shared REST plumbing for upstream API calls.
//!
//! [`RestClient`] owns a base URL, an optional bearer-token env var, and the
//! response envelope convention of one upstream service. Credentials are read
//! from the environment at call time and a missing credential fails with a
//! configuration error before any request is sent. Transport failures map
//! onto [`AdapterError`]: a timeout becomes [`AdapterError::Timeout`], a
//! non-2xx answer becomes [`AdapterError::HttpStatus`] with the response body
//! attached, and HTTP 204 yields an empty JSON object.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{AdapterError, Result};

/// Timeout for ordinary single-resource requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Timeout for batch requests that fan out server-side (route matrices).
pub const BATCH_TIMEOUT_SECS: u64 = 60;

/// How an upstream wraps its JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// The response body is the payload.
    Raw,
    /// The payload lives under a top-level `data` key (Asana convention).
    Data,
}

fn unwrap_envelope(envelope: Envelope, value: Value) -> Value {
    match envelope {
        Envelope::Raw => value,
        Envelope::Data => match value {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        },
    }
}

/// A thin typed wrapper over [`reqwest::Client`] for one upstream service.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    token_env: Option<&'static str>,
    envelope: Envelope,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, token_env: Option<&'static str>, envelope: Envelope) -> Self {
        Self {
            base_url: base_url.into(),
            token_env,
            envelope,
            client: reqwest::Client::new(),
        }
    }

    /// Resolve the bearer token from the configured env var.
    ///
    /// Returns a configuration error naming the variable when it is unset,
    /// so misconfiguration surfaces before any network traffic.
    pub fn bearer_token(&self) -> Result<Option<String>> {
        let Some(var) = self.token_env else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token)),
            _ => Err(AdapterError::Config(format!(
                "{var} environment variable not set"
            ))),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Start a request against `path`, with the bearer token applied when
    /// one is configured. Used directly by adapters that need extra headers.
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.url(path);
        debug!(%method, %url, "dispatching upstream request");
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.bearer_token()? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send a prepared request and parse the JSON payload.
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value> {
        self.send_with_timeout(builder, DEFAULT_TIMEOUT_SECS).await
    }

    /// Send with an explicit timeout and parse the JSON payload.
    pub async fn send_with_timeout(
        &self,
        builder: reqwest::RequestBuilder,
        timeout_secs: u64,
    ) -> Result<Value> {
        let response = self.dispatch(builder, timeout_secs).await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(json!({}));
        }
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::unexpected("ResponseReadError", e))?;
        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        let value: Value = serde_json::from_str(&body)?;
        Ok(unwrap_envelope(self.envelope, value))
    }

    /// Send with an explicit timeout and return the raw body text.
    ///
    /// Needed for endpoints that stream JSON Lines rather than one document.
    pub async fn send_text(
        &self,
        builder: reqwest::RequestBuilder,
        timeout_secs: u64,
    ) -> Result<String> {
        let response = self.dispatch(builder, timeout_secs).await?;
        response
            .text()
            .await
            .map_err(|e| AdapterError::unexpected("ResponseReadError", e))
    }

    async fn dispatch(
        &self,
        builder: reqwest::RequestBuilder,
        timeout_secs: u64,
    ) -> Result<reqwest::Response> {
        let response = builder
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout {
                        seconds: timeout_secs,
                    }
                } else {
                    AdapterError::unexpected("RequestError", e)
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Convenience verbs
    // -----------------------------------------------------------------------

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self.request(Method::GET, path)?.query(query);
        self.send(builder).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::POST, path)?.json(body);
        self.send(builder).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::PUT, path)?.json(body);
        self.send(builder).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self.request(Method::PATCH, path)?.json(body);
        self.send(builder).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        let builder = self.request(Method::DELETE, path)?;
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_envelope_is_unwrapped() {
        let wrapped = json!({"data": {"gid": "42"}});
        assert_eq!(unwrap_envelope(Envelope::Data, wrapped), json!({"gid": "42"}));
    }

    #[test]
    fn data_envelope_passes_through_unwrapped_payloads() {
        let plain = json!({"gid": "42"});
        assert_eq!(unwrap_envelope(Envelope::Data, plain.clone()), plain);
    }

    #[test]
    fn raw_envelope_is_identity() {
        let value = json!({"data": {"gid": "42"}});
        assert_eq!(unwrap_envelope(Envelope::Raw, value.clone()), value);
    }

    #[test]
    fn url_join_ignores_duplicate_slashes() {
        let client = RestClient::new("https://api.example.com/v1/", None, Envelope::Raw);
        assert_eq!(client.url("/tasks/42"), "https://api.example.com/v1/tasks/42");
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let client = RestClient::new(
            "https://api.example.com",
            Some("CONCIERGE_HTTP_TEST_UNSET_TOKEN"),
            Envelope::Raw,
        );
        let err = client.bearer_token().unwrap_err();
        assert_eq!(
            err.user_message(),
            "Configuration Error: CONCIERGE_HTTP_TEST_UNSET_TOKEN environment variable not set"
        );
    }

    #[test]
    fn absent_token_env_means_no_auth_header() {
        let client = RestClient::new("https://api.example.com", None, Envelope::Raw);
        assert!(client.bearer_token().unwrap().is_none());
    }
}
