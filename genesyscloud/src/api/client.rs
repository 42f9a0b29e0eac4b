use reqwest::header::AUTHORIZATION;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ApiError, ApiErrorBody};

/// Genesys Cloud platform API client
///
/// Cheap to clone; all state lives behind an Arc. One instance is built at
/// provider configure time and shared by every resource and data source.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl ApiClient {
    /// Create a new API client with default retry configuration
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, access_token, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        access_token: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_header: format!("Bearer {}", access_token),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .send_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("GET request to: {}", url);

                    self.inner
                        .http_client
                        .get(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_response(response).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("POST request to: {}", url);

                    self.inner
                        .http_client
                        .post(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(body)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_response(response).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send_with_retry(
                || async {
                    let url = format!("{}{}", self.inner.base_url, path);

                    tracing::debug!("PUT request to: {}", url);

                    self.inner
                        .http_client
                        .put(&url)
                        .header(AUTHORIZATION, &self.inner.auth_header)
                        .json(body)
                        .send()
                        .await
                },
                path,
            )
            .await?;

        self.parse_response(response).await
    }

    /// Execute a DELETE request with retry logic
    ///
    /// Delete endpoints answer with an empty body, so nothing is parsed.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_with_retry(
            || async {
                let url = format!("{}{}", self.inner.base_url, path);

                tracing::debug!("DELETE request to: {}", url);

                self.inner
                    .http_client
                    .delete(&url)
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
                    .await
            },
            path,
        )
        .await
        .map(|_| ())
    }

    /// Send a request, retrying rate limits, 5xx and transient transport errors
    async fn send_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::Auth);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(Self::error_from_response(response).await);
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::trace!("API response body: {}", text);

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::Parse(format!("Failed to parse response: {}", e))
        })
    }

    /// Turn a non-retryable error response into ApiError::Api, keeping the
    /// status and raw body for diagnostics and 404 detection
    async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .map(Box::new);

        ApiError::Api {
            status,
            message: text,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Widget {
        id: String,
        name: String,
    }

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn get_parses_json_and_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/widgets/w-1")
            .match_header("authorization", "Bearer secret-token")
            .with_body(r#"{"id":"w-1","name":"first"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "secret-token").unwrap();
        let widget: Widget = client.get("/api/v2/widgets/w-1").await.unwrap();

        assert_eq!(widget.id, "w-1");
        assert_eq!(widget.name, "first");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error_without_retry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/widgets")
            .with_status(401)
            .with_body(r#"{"message":"bad token"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ApiClient::with_config(&server.url(), "bad", fast_retries()).unwrap();
        let result: Result<Widget, _> = client.get("/api/v2/widgets").await;

        assert!(matches!(result, Err(ApiError::Auth)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_preserves_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/widgets/missing")
            .with_status(404)
            .with_body(r#"{"message":"widget not found","code":"not.found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "token").unwrap();
        let result: Result<Widget, _> = client.get("/api/v2/widgets/missing").await;

        match result {
            Err(err) => {
                assert!(err.is_not_found());
                match err {
                    ApiError::Api {
                        status,
                        message,
                        details,
                    } => {
                        assert_eq!(status, 404);
                        assert!(message.contains("widget not found"));
                        assert_eq!(
                            details.unwrap().message.as_deref(),
                            Some("widget not found")
                        );
                    }
                    other => panic!("expected ApiError::Api, got {:?}", other),
                }
            }
            Ok(_) => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = Server::new_async().await;
        // max_retries=1 means the original attempt plus one retry
        let mock = server
            .mock("GET", "/api/v2/widgets")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = ApiClient::with_config(&server.url(), "token", fast_retries()).unwrap();
        let result: Result<Widget, _> = client.get("/api/v2/widgets").await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limiting_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v2/widgets/w-1")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let client = ApiClient::with_config(&server.url(), "token", fast_retries()).unwrap();
        let result = client.delete("/api/v2/widgets/w-1").await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_tolerates_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v2/widgets/w-1")
            .with_status(204)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), "token").unwrap();
        client.delete("/api/v2/widgets/w-1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_base_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/widgets/w-1")
            .with_body(r#"{"id":"w-1","name":"first"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/", server.url()), "token").unwrap();
        let _: Widget = client.get("/api/v2/widgets/w-1").await.unwrap();
        mock.assert_async().await;
    }
}
