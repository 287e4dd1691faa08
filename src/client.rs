use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletionRequest, ChatTurn, StreamUpdate};

/// The GitHub Models inference endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://models.github.ai/inference";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A boxed stream of updates for one completion.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<StreamUpdate>> + Send>>;

/// Something that can stream a completion for a conversation.
///
/// The chat session only ever talks to this trait; [`InferenceClient`] is the
/// HTTP implementation.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Starts a streaming completion for `turns`.
    ///
    /// Implementations should give up with [`Error::Cancelled`] when `cancel`
    /// fires before the stream is established.  Once the stream is returned
    /// the caller owns cancellation of the reads.
    async fn stream_completion(
        &self,
        turns: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<UpdateStream>;
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
///
/// Built once per session and reused for every turn, so the connection pool
/// and credential are shared across requests.
#[derive(Clone)]
pub struct InferenceClient {
    credential: String,
    model: String,
    client: ReqwestClient,
    completions_url: Url,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl InferenceClient {
    /// Create a new client for `model` at `endpoint`, authenticating with `credential`.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint is not a valid URL, the credential or model is
    /// empty, or the HTTP client cannot be built.
    pub fn new(endpoint: &str, credential: &str, model: &str) -> Result<Self> {
        Self::with_timeout(endpoint, credential, model, DEFAULT_TIMEOUT)
    }

    /// Create a new client with a custom timeout for connecting and for
    /// receiving the response head.
    pub fn with_timeout(
        endpoint: &str,
        credential: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(Error::authentication("no credential provided"));
        }
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::validation(
                "model identifier must not be empty",
                Some("model".to_string()),
            ));
        }
        let completions_url = completions_url(endpoint)?;

        // No total request timeout: a streamed reply may take longer than
        // `timeout` to finish.
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            credential: credential.to_string(),
            model: model.to_string(),
            client,
            completions_url,
            timeout,
            temperature: None,
            max_tokens: None,
        })
    }

    /// Sets the sampling temperature sent with every request.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum number of tokens to generate per reply.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the URL requests are posted to.
    pub fn completions_url(&self) -> &Url {
        &self.completions_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|_| {
                Error::authentication("credential contains characters not allowed in a header")
            })?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let headers = response.headers().clone();
        match response.text().await {
            Ok(body) => error_from_response(status, &headers, &body),
            Err(e) => Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            ),
        }
    }

    /// The request body for `turns` with this client's sampling settings.
    fn request<'a>(&'a self, turns: &'a [ChatTurn]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest::streaming(&self.model, turns)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Send the conversation and get a stream of updates.
    async fn send_streaming(&self, turns: &[ChatTurn]) -> Result<UpdateStream> {
        let params = self.request(turns);

        CLIENT_REQUESTS.click();
        tracing::debug!(
            model = %self.model,
            turns = turns.len(),
            url = %self.completions_url,
            "sending streaming completion request"
        );

        let request = self
            .client
            .post(self.completions_url.clone())
            .headers(self.default_headers()?)
            .json(&params)
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?,
            Err(_) => {
                return Err(Error::timeout(
                    "no response from the inference endpoint",
                    Some(self.timeout.as_secs_f64()),
                ));
            }
        };

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[async_trait::async_trait]
impl CompletionTransport for InferenceClient {
    async fn stream_completion(
        &self,
        turns: &[ChatTurn],
        cancel: &CancellationToken,
    ) -> Result<UpdateStream> {
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::cancelled("request cancelled before a response arrived")),
            result = self.send_streaming(turns) => result,
        };
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result
            && !err.is_cancelled()
        {
            CLIENT_REQUEST_ERRORS.click();
            tracing::warn!(error = %err, "completion request failed");
        }
        result
    }
}

impl fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceClient")
            .field("credential", &"<redacted>")
            .field("model", &self.model)
            .field("completions_url", &self.completions_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Map an error status, its headers and its body to an [`Error`].
///
/// The message comes from `{"error": {"message"}}` when the body has one,
/// else the raw body, else the status reason.
fn error_from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        code: Option<serde_json::Value>,
        message: Option<String>,
        param: Option<String>,
    }

    let request_id = header_str(headers, "x-request-id").map(String::from);
    let retry_after =
        header_str(headers, "retry-after").and_then(|val| val.trim().parse::<u64>().ok());

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);
    let (error_type, message, param) = match detail {
        Some(detail) => (
            detail.code.map(|code| match code {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            detail.message,
            detail.param,
        ),
        None => (None, None, None),
    };
    let message = message.unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            body.to_string()
        }
    });

    match status.as_u16() {
        400 => Error::bad_request(message, param),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message, request_id),
        502..=504 => Error::service_unavailable(message, retry_after),
        code => Error::api(code, error_type, message, request_id),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|val| val.to_str().ok())
}

/// Resolve `{endpoint}/chat/completions`, tolerating a trailing slash.
fn completions_url(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    let mut base = Url::parse(endpoint)
        .map_err(|e| Error::url(format!("invalid endpoint {endpoint:?}: {e}"), Some(e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(Error::validation(
            format!("endpoint must be http or https, not {}", base.scheme()),
            Some("endpoint".to_string()),
        ));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("chat/completions")?)
}
