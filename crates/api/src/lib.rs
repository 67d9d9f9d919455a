pub mod error;
pub mod retry;

use error::{ApiError, Result};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use retry::{retry_with_backoff, RetryConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

pub use reqwest::{Method, StatusCode};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone, Debug)]
pub enum AuthMethod {
    Basic { username: String, token: String },
    Bearer { token: String },
}

/// HTTP client bound to one Jira site.
///
/// Requests are built with [`ApiClient::new_request`] and run with
/// [`ApiClient::send`] (raw response) or [`ApiClient::execute`] (decoded JSON).
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: Option<AuthMethod>,
    retry_config: RetryConfig,
    timeout: Duration,
}

/// A fully built request, tied to the cancellation token it was created with.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    body: Option<Vec<u8>>,
    ctx: CancellationToken,
}

impl ApiRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn context(&self) -> &CancellationToken {
        &self.ctx
    }
}

/// A response with a success status whose body has not been consumed yet.
#[derive(Debug)]
pub struct ApiResponse {
    inner: reqwest::Response,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Reads the whole body, consuming the response.
    pub async fn bytes(self) -> Result<Vec<u8>> {
        let status = self.inner.status();
        self.inner
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|source| ApiError::ReadBody { status, source })
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let status = self.status();
        let body = self.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { status, source })
    }
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(base_url.as_ref())?;
        // Endpoint paths are joined relative to the base, so it must look like a directory.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(format!("jira-users/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            base_url: url,
            auth: None,
            retry_config: RetryConfig::none(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.auth = Some(AuthMethod::Basic {
            username: username.into(),
            token: token.into(),
        });
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(AuthMethod::Bearer {
            token: token.into(),
        });
        self
    }

    /// Opts in to retries. They only ever apply to `GET` and `HEAD`; every
    /// other method is sent exactly once.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds a request for `path` (relative to the base URL) with the given
    /// query pairs and optional JSON body. Nothing is sent yet.
    pub fn new_request<B: Serialize + ?Sized>(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ApiRequest> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ApiError::Serialize)?;

        Ok(ApiRequest {
            method,
            url,
            body,
            ctx: ctx.clone(),
        })
    }

    /// Runs the request and returns the raw response when the status is a success.
    ///
    /// Non-success statuses become [`ApiError::Http`] carrying a snippet of the
    /// response body. The request's cancellation token is raced against the call.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.ctx.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        debug!(method = %request.method, url = %request.url, "Sending request");

        let ctx = request.ctx.clone();
        let single = RetryConfig::none();
        let retry_config = if is_safe(&request.method) {
            &self.retry_config
        } else {
            &single
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!(url = %request.url, "Request cancelled");
                Err(ApiError::Cancelled)
            }
            result = retry_with_backoff(retry_config, &ctx, || self.dispatch(&request)) => result,
        }
    }

    /// [`ApiClient::send`] followed by decoding the JSON body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json().await
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        req = self.apply_auth(req);

        if let Some(body) = &request.body {
            req = req
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = req.send().await.map_err(ApiError::RequestFailed)?;
        let status = response.status();
        debug!(status = status.as_u16(), "Received response");

        if status.is_success() {
            return Ok(ApiResponse { inner: response });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Http {
            status,
            message: error_message(status, &body),
        })
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(AuthMethod::Basic { username, token }) => {
                request.basic_auth(username, Some(token))
            }
            Some(AuthMethod::Bearer { token }) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn is_safe(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Unexpected status")
            .to_string();
    }

    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new("https://example.com/jira").unwrap();
        assert_eq!(client.base_url().as_str(), "https://example.com/jira/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_new_request_joins_under_context_path() {
        let client = ApiClient::new("https://example.com/jira").unwrap();
        let ctx = CancellationToken::new();
        let request = client
            .new_request(
                &ctx,
                Method::GET,
                "/rest/api/2/myself",
                &[],
                Option::<&()>::None,
            )
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://example.com/jira/rest/api/2/myself"
        );
        assert!(request.url().query().is_none());
        assert!(request.body().is_none());
    }

    #[test]
    fn test_new_request_encodes_query_in_order() {
        let client = ApiClient::new("https://example.com").unwrap();
        let ctx = CancellationToken::new();
        let request = client
            .new_request(
                &ctx,
                Method::GET,
                "rest/api/2/user/search",
                &[("username", "j doe&co"), ("maxResults", "5")],
                Option::<&()>::None,
            )
            .unwrap();

        assert_eq!(
            request.url().query(),
            Some("username=j+doe%26co&maxResults=5")
        );
    }

    #[test]
    fn test_new_request_serializes_body() {
        let client = ApiClient::new("https://example.com").unwrap();
        let ctx = CancellationToken::new();
        let body = serde_json::json!({"name": "jdoe"});
        let request = client
            .new_request(&ctx, Method::POST, "rest/api/2/user", &[], Some(&body))
            .unwrap();

        assert_eq!(*request.method(), Method::POST);
        assert_eq!(request.body(), Some(br#"{"name":"jdoe"}"#.as_slice()));
    }

    #[test]
    fn test_only_safe_methods_are_retryable() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::DELETE));
        assert!(!is_safe(&Method::PUT));
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(error_message(StatusCode::NOT_FOUND, "  "), "Not Found");
    }

    #[test]
    fn test_error_message_truncates_long_bodies() {
        let body = "x".repeat(MAX_ERROR_BODY + 100);
        let message = error_message(StatusCode::BAD_REQUEST, &body);
        assert_eq!(message.len(), MAX_ERROR_BODY + 3);
        assert!(message.ends_with("..."));
    }
}
