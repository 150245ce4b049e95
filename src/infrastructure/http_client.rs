//! # HTTP Client
//!
//! Shared JSON-over-HTTP client for the reasoning service and the
//! exchange-rate backends.
//!
//! Every request carries a hard timeout. Transport failures and non-2xx
//! statuses are mapped onto [`IntegrationError`] so callers can decide
//! whether a retry makes sense.
//!
//! # Examples
//!
//! ```ignore
//! use eor_quote_engine::infrastructure::http_client::HttpClient;
//!
//! let client = HttpClient::new(5000)?;
//! let body: serde_json::Value = client.get("https://api.frankfurter.app/latest").await?;
//! ```

use crate::infrastructure::error::{IntegrationError, IntegrationResult};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client wrapper with timeout and error mapping.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_ms: u64,
}

impl HttpClient {
    /// Creates a client whose requests abort after `timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError::Internal` if the client cannot be created.
    pub fn new(timeout_ms: u64) -> IntegrationResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| IntegrationError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout_ms })
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Makes a GET request and deserializes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError::Timeout` or `Connection` if the request
    /// fails, a status-specific error for non-2xx responses, and
    /// `IntegrationError::Protocol` if the body cannot be parsed.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> IntegrationResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Makes a GET request with query parameters.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn get_with_params<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        url: &str,
        params: &P,
    ) -> IntegrationResult<T> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    /// Makes a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> IntegrationResult<T> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> IntegrationResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| IntegrationError::protocol(format!("failed to parse response: {e}")))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::map_status_error(status, &body))
        }
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> IntegrationError {
        if error.is_timeout() {
            IntegrationError::timeout_with_duration("request timed out", self.timeout_ms)
        } else if error.is_connect() {
            IntegrationError::connection(format!("connection failed: {error}"))
        } else {
            IntegrationError::connection(format!("HTTP request failed: {error}"))
        }
    }

    fn map_status_error(status: StatusCode, body: &str) -> IntegrationError {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                IntegrationError::invalid_request(format!("bad request ({status}): {body}"))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                IntegrationError::authentication(format!("authentication failed: {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => IntegrationError::rate_limited("rate limit exceeded"),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                IntegrationError::timeout(format!("remote timeout ({status})"))
            }
            s if s.is_server_error() => {
                IntegrationError::connection(format!("server error ({status}): {body}"))
            }
            _ => IntegrationError::protocol(format!("HTTP error ({status}): {body}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn new_client() {
        let client = HttpClient::new(5000).unwrap();
        assert_eq!(client.timeout_ms(), 5000);
    }

    #[tokio::test]
    async fn get_with_params_parses_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("from", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rates": {"USD": 1.1}})))
            .mount(&server)
            .await;

        let client = HttpClient::new(1000).unwrap();
        let body: Value = client
            .get_with_params(&format!("{}/latest", server.uri()), &[("from", "EUR")])
            .await
            .unwrap();
        assert_eq!(body["rates"]["USD"], json!(1.1));
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/baseline"))
            .and(body_json(json!({"country": "PT"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(1000).unwrap();
        let body: Value = client
            .post(&format!("{}/baseline", server.uri()), &json!({"country": "PT"}))
            .await
            .unwrap();
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn status_codes_are_mapped() {
        let server = MockServer::start().await;
        for (route, status) in [("/auth", 401), ("/limit", 429), ("/down", 503), ("/gone", 404)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let client = HttpClient::new(1000).unwrap();
        let call = |route: &'static str| {
            let client = client.clone();
            let url = format!("{}{}", server.uri(), route);
            async move { client.get::<Value>(&url).await.unwrap_err() }
        };

        assert!(matches!(call("/auth").await, IntegrationError::Authentication { .. }));
        assert!(matches!(call("/limit").await, IntegrationError::RateLimited { .. }));
        assert!(matches!(call("/down").await, IntegrationError::Connection { .. }));
        assert!(matches!(call("/gone").await, IntegrationError::Protocol { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = HttpClient::new(1000).unwrap();
        let err = client.get::<Value>(&server.uri()).await.unwrap_err();
        assert!(matches!(err, IntegrationError::Protocol { .. }));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(50).unwrap();
        let err = client.get::<Value>(&server.uri()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
