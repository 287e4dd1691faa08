//! Error types for modelchat.
//!
//! One enum covers the transport, the stream consumer and the chat session.
//! Cancellation is a variant of its own: it ends the session, while every
//! other error only fails the current turn.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// A shareable underlying cause.
type Source = Arc<dyn error::Error + Send + Sync>;

/// The main error type for modelchat.
#[derive(Clone, Debug)]
pub enum Error {
    /// Any HTTP error status without a more specific variant, or an error
    /// event inside the stream.
    Api {
        status_code: u16,
        /// The `error.code` reported by the server.
        error_type: Option<String>,
        message: String,
        request_id: Option<String>,
    },

    /// 401: the credential was rejected.
    Authentication { message: String },

    /// 403: the credential may not use this model.
    Permission { message: String },

    /// 404: usually an unknown model identifier.
    NotFound { message: String },

    /// 429.
    RateLimit {
        message: String,
        /// Seconds from the `retry-after` header.
        retry_after: Option<u64>,
    },

    /// 400.
    BadRequest {
        message: String,
        param: Option<String>,
    },

    /// 408, or no response head within the client timeout.
    Timeout {
        message: String,
        /// The timeout that elapsed, in seconds.
        duration: Option<f64>,
    },

    /// The user interrupted the session.
    Cancelled { message: String },

    Connection {
        message: String,
        source: Option<Source>,
    },

    /// 500.
    InternalServer {
        message: String,
        request_id: Option<String>,
    },

    /// 502 to 504.
    ServiceUnavailable {
        message: String,
        /// Seconds from the `retry-after` header.
        retry_after: Option<u64>,
    },

    Serialization {
        message: String,
        source: Option<Source>,
    },

    Io {
        message: String,
        source: Arc<io::Error>,
    },

    HttpClient {
        message: String,
        source: Option<Source>,
    },

    /// A caller-supplied value was rejected before any request was made.
    Validation {
        message: String,
        param: Option<String>,
    },

    Url {
        message: String,
        source: Option<url::ParseError>,
    },

    /// The response body failed part way through.
    Streaming {
        message: String,
        source: Option<Source>,
    },

    /// An event was not valid UTF-8.
    Encoding {
        message: String,
        source: Option<Source>,
    },
}

fn shared(source: Option<Box<dyn error::Error + Send + Sync>>) -> Option<Source> {
    source.map(Arc::from)
}

impl Error {
    pub fn api(
        status_code: u16,
        error_type: Option<String>,
        message: String,
        request_id: Option<String>,
    ) -> Self {
        Error::Api {
            status_code,
            error_type,
            message,
            request_id,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn bad_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            param,
        }
    }

    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Error::Cancelled {
            message: message.into(),
        }
    }

    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: shared(source),
        }
    }

    pub fn internal_server(message: impl Into<String>, request_id: Option<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
            request_id,
        }
    }

    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
            retry_after,
        }
    }

    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: shared(source),
        }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: shared(source),
        }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: shared(source),
        }
    }

    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: shared(source),
        }
    }

    /// Returns true if the user cancelled the operation.
    ///
    /// Cancellation ends the chat session; every other error is recoverable
    /// at the granularity of a single turn.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// The human-readable message, without the kind prefix or any detail.
    pub fn message(&self) -> &str {
        match self {
            Error::Api { message, .. }
            | Error::Authentication { message }
            | Error::Permission { message }
            | Error::NotFound { message }
            | Error::RateLimit { message, .. }
            | Error::BadRequest { message, .. }
            | Error::Timeout { message, .. }
            | Error::Cancelled { message }
            | Error::Connection { message, .. }
            | Error::InternalServer { message, .. }
            | Error::ServiceUnavailable { message, .. }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Validation { message, .. }
            | Error::Url { message, .. }
            | Error::Streaming { message, .. }
            | Error::Encoding { message, .. } => message,
        }
    }

    fn kind(&self) -> &str {
        match self {
            Error::Api {
                error_type: Some(code),
                ..
            } => code,
            Error::Api { .. } => "API error",
            Error::Authentication { .. } => "Authentication error",
            Error::Permission { .. } => "Permission error",
            Error::NotFound { .. } => "Not found",
            Error::RateLimit { .. } => "Rate limit exceeded",
            Error::BadRequest { .. } => "Bad request",
            Error::Timeout { .. } => "Timeout",
            Error::Cancelled { .. } => "Cancelled",
            Error::Connection { .. } => "Connection error",
            Error::InternalServer { .. } => "Internal server error",
            Error::ServiceUnavailable { .. } => "Service unavailable",
            Error::Serialization { .. } => "Serialization error",
            Error::Io { .. } => "I/O error",
            Error::HttpClient { .. } => "HTTP client error",
            Error::Validation { .. } => "Validation error",
            Error::Url { .. } => "URL error",
            Error::Streaming { .. } => "Streaming error",
            Error::Encoding { .. } => "Encoding error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())?;
        match self {
            Error::RateLimit {
                retry_after: Some(secs),
                ..
            }
            | Error::ServiceUnavailable {
                retry_after: Some(secs),
                ..
            } => write!(f, " (retry after {secs} seconds)"),
            Error::BadRequest {
                param: Some(param),
                ..
            }
            | Error::Validation {
                param: Some(param),
                ..
            } => write!(f, " (parameter: {param})"),
            Error::Timeout {
                duration: Some(secs),
                ..
            } => write!(f, " (after {secs} seconds)"),
            Error::Api {
                request_id: Some(id),
                ..
            }
            | Error::InternalServer {
                request_id: Some(id),
                ..
            } => write!(f, " (Request ID: {id})"),
            _ => Ok(()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_deref()
                .map(|e| e as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => source.as_ref().map(|e| e as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for modelchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_display() {
        let err = Error::cancelled("interrupted by user");
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Cancelled: interrupted by user");
        assert_eq!(err.message(), "interrupted by user");
    }

    #[test]
    fn api_display_uses_server_code() {
        let err = Error::api(
            418,
            Some("teapot".to_string()),
            "short and stout".to_string(),
            Some("req-1".to_string()),
        );
        assert_eq!(err.to_string(), "teapot: short and stout (Request ID: req-1)");

        let err = Error::api(599, None, "odd".to_string(), None);
        assert_eq!(err.to_string(), "API error: odd");
    }

    #[test]
    fn retry_after_is_shown() {
        assert_eq!(
            Error::rate_limit("slow down", Some(3)).to_string(),
            "Rate limit exceeded: slow down (retry after 3 seconds)"
        );
        assert_eq!(
            Error::service_unavailable("busy", Some(10)).to_string(),
            "Service unavailable: busy (retry after 10 seconds)"
        );
        assert_eq!(
            Error::rate_limit("slow down", None).to_string(),
            "Rate limit exceeded: slow down"
        );
    }

    #[test]
    fn param_and_duration_are_shown() {
        assert_eq!(
            Error::validation("must not be empty", Some("model".to_string())).to_string(),
            "Validation error: must not be empty (parameter: model)"
        );
        assert_eq!(
            Error::timeout("no response", Some(60.0)).to_string(),
            "Timeout: no response (after 60 seconds)"
        );
    }

    #[test]
    fn sources_are_exposed() {
        let err: Error = io::Error::other("disk on fire").into();
        assert!(error::Error::source(&err).is_some());

        let err = Error::streaming("reset", Some(Box::new(io::Error::other("eof"))));
        assert_eq!(
            error::Error::source(&err).map(|e| e.to_string()),
            Some("eof".to_string())
        );
        assert!(error::Error::source(&Error::not_found("gone")).is_none());
    }
}
