//! REST transport backed by `reqwest`.

use crate::config::{AuthConfig, SyncConfig};
use async_trait::async_trait;
use ecopoint_core::{FetchError, Transport, TransportResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};

#[derive(Debug, thiserror::Error)]
pub enum TransportBuildError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid auth header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// GET-only REST client.
///
/// No client-wide timeout is set; each request is bounded by the
/// orchestrator, which drops the in-flight future when its own timeout fires.
#[derive(Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestTransport {
    pub fn new(config: &SyncConfig) -> Result<Self, TransportBuildError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ecopoint-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let headers = build_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FetchError::Connection {
            endpoint: endpoint.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;
        Ok(TransportResponse { status, body })
    }
}

fn build_headers(auth: &AuthConfig) -> Result<HeaderMap, TransportBuildError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key)?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_headers_with_both_credentials() {
        let headers = build_headers(&AuthConfig {
            api_key: Some("key-1".to_string()),
            bearer_token: Some("tok".to_string()),
        })
        .expect("valid headers");
        assert_eq!(headers.get("x-api-key").unwrap(), "key-1");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_build_headers_anonymous() {
        let headers = build_headers(&AuthConfig {
            api_key: None,
            bearer_token: None,
        })
        .expect("valid headers");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_build_headers_rejects_control_chars() {
        let result = build_headers(&AuthConfig {
            api_key: Some("bad\nkey".to_string()),
            bearer_token: None,
        });
        assert!(matches!(result, Err(TransportBuildError::Header(_))));
    }
}
