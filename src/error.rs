//! Error types for the ernie-chat SDK.
//!
//! Every fallible operation in this crate returns [`Error`].  The variants fall into a few
//! families: credential exchange failures ([`Error::Authentication`]), completion failures
//! ([`Error::Api`] plus the network class [`Error::Timeout`], [`Error::Connection`] and
//! [`Error::HttpClient`]), stream decoding problems, and local misuse such as missing
//! configuration or an overlapping send.

use std::error;
use std::fmt;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for the ernie-chat SDK.
#[derive(Clone, Debug)]
pub enum Error {
    /// The credential exchange with the identity endpoint failed.
    Authentication {
        /// Human-readable error message.
        message: String,
        /// HTTP status returned by the identity endpoint, if one was received.
        status: Option<u16>,
    },

    /// The completion endpoint rejected the request or reported a provider error.
    Api {
        /// HTTP status code, if the failure came with one.
        status_code: Option<u16>,
        /// Provider-level error code carried in the response body.
        error_code: Option<i64>,
        /// Human-readable error message.
        message: String,
    },

    /// The request timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A single streamed line could not be decoded.
    ///
    /// Streams skip such lines; this variant exists so the skip can be logged and inspected.
    Parse {
        /// Human-readable error message.
        message: String,
        /// The offending line.
        line: String,
    },

    /// The response stream failed mid-flight.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing or invalid.
    Configuration {
        /// Human-readable error message.
        message: String,
        /// Environment variable that supplies the value, if any.
        variable: Option<String>,
    },

    /// A send was attempted while another one was still outstanding.
    Busy,
}

impl Error {
    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>, status: Option<u16>) -> Self {
        Error::Authentication {
            message: message.into(),
            status,
        }
    }

    /// Creates a new API error.
    pub fn api(status_code: Option<u16>, error_code: Option<i64>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_code,
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new parse error for a streamed line.
    pub fn parse(message: impl Into<String>, line: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
            line: line.into(),
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>, variable: Option<&str>) -> Self {
        Error::Configuration {
            message: message.into(),
            variable: variable.map(String::from),
        }
    }

    /// Translate a transport failure from reqwest into the network class of errors.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Option<f64>) -> Self {
        if err.is_timeout() {
            Error::timeout(format!("Request timed out: {err}"), timeout)
        } else if err.is_connect() {
            Error::connection(format!("Connection error: {err}"), Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {err}"), Some(Box::new(err)))
        }
    }

    /// Returns true if this error came from the credential exchange.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is an API error, including network failures.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Error::Api { .. }
                | Error::Timeout { .. }
                | Error::Connection { .. }
                | Error::HttpClient { .. }
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a per-line parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    /// Returns true if this error is an encoding error.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Error::Encoding { .. })
    }

    /// Returns true if this error is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Returns true if a send was rejected because another was outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy)
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => *status_code,
            Error::Authentication { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the provider error code associated with this error, if any.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Error::Api { error_code, .. } => *error_code,
            _ => None,
        }
    }

    /// The text shown to a person reading the conversation.
    ///
    /// Provider messages are surfaced verbatim; everything else uses the `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication { message, status } => {
                if let Some(status) = status {
                    write!(f, "Authentication error: {message} (HTTP {status})")
                } else {
                    write!(f, "Authentication error: {message}")
                }
            }
            Error::Api {
                status_code,
                error_code,
                message,
            } => match (status_code, error_code) {
                (_, Some(code)) => write!(f, "API error {code}: {message}"),
                (Some(status), None) => write!(f, "API error: {message} (HTTP {status})"),
                (None, None) => write!(f, "API error: {message}"),
            },
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Parse { message, line } => {
                write!(f, "Parse error: {message} in line {line:?}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "Encoding error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Configuration { message, variable } => {
                if let Some(variable) = variable {
                    write!(f, "Configuration error: {message} (set {variable})")
                } else {
                    write!(f, "Configuration error: {message}")
                }
            }
            Error::Busy => {
                write!(f, "A message is already being sent")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
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

/// A specialized Result type for ernie-chat operations.
pub type Result<T> = std::result::Result<T, Error>;
