//! Error types for payment app resolution.
//!
//! Every failure inside a resolution pass is contained by the coordinator and
//! degrades to "not authorized". These types are what gets recorded in the
//! outcome so callers can inspect what went wrong.

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FinderErrorCode {
    /// Method identifier rejected before any I/O
    InvalidMethodIdentifier = 1000,
    /// Manifest download failed
    Fetch = 2000,
    /// Manifest download timed out
    FetchTimeout = 2001,
    /// Manifest document rejected
    Parse = 3000,
    /// Invalid configuration value
    Config = 4000,
    /// HTTP client could not be constructed
    Client = 5000,
}

/// Failure to download a manifest document.
///
/// Always tagged with the URL that failed; no partial body is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status.
    #[error("request to {url} returned HTTP {status}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection or protocol failure.
    #[error("request to {url} failed: {reason}")]
    Network {
        /// Requested URL
        url: String,
        /// Underlying error message
        reason: String,
    },

    /// Request did not finish within the configured timeout.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Body exceeded the configured size limit.
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested URL
        url: String,
        /// Maximum accepted body size
        limit: u64,
    },

    /// The URL, a redirect hop, or a `Link` target is not allowed.
    #[error("refusing to fetch {url}: {reason}")]
    Insecure {
        /// Requested URL
        url: String,
        /// Why the URL was refused
        reason: String,
    },
}

impl FetchError {
    /// The URL whose download failed.
    pub fn url(&self) -> &str {
        match self {
            Self::HttpStatus { url, .. }
            | Self::Network { url, .. }
            | Self::Timeout { url, .. }
            | Self::TooLarge { url, .. }
            | Self::Insecure { url, .. } => url,
        }
    }

    /// Message suitable for display next to the payment sheet.
    pub fn user_message(&self) -> String {
        download_failure_message(self.url())
    }
}

/// Formats the user-facing download failure message for `url`.
pub fn download_failure_message(url: &str) -> String {
    format!("Unable to download payment manifest \"{url}\".")
}

/// A manifest document was rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Body is not JSON.
    #[error("not valid JSON: {0}")]
    InvalidJson(String),

    /// Root of the document is not a JSON object.
    #[error("document root must be a JSON object")]
    NotAnObject,

    /// Required member is absent.
    #[error("missing required field \"{0}\"")]
    MissingField(String),

    /// Member is present but malformed.
    #[error("invalid \"{field}\": {reason}")]
    InvalidField {
        /// JSON path of the offending member
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// A list member is longer than allowed.
    #[error("\"{field}\" has more than {limit} entries")]
    TooManyEntries {
        /// JSON path of the list
        field: String,
        /// Maximum accepted length
        limit: usize,
    },
}

impl ParseError {
    /// Create an invalid field error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FinderError {
    /// Requested or declared method identifier is unusable.
    #[error("invalid payment method identifier \"{identifier}\": {reason}")]
    InvalidMethodIdentifier {
        /// The raw identifier
        identifier: String,
        /// Why it was rejected
        reason: String,
    },

    /// Manifest download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Manifest downloaded but rejected by the parser.
    #[error("manifest {url} rejected: {source}")]
    Parse {
        /// Manifest URL
        url: String,
        /// Parser failure
        #[source]
        source: ParseError,
    },

    /// Configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FinderError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> FinderErrorCode {
        match self {
            Self::InvalidMethodIdentifier { .. } => FinderErrorCode::InvalidMethodIdentifier,
            Self::Fetch(FetchError::Timeout { .. }) => FinderErrorCode::FetchTimeout,
            Self::Fetch(_) => FinderErrorCode::Fetch,
            Self::Parse { .. } => FinderErrorCode::Parse,
            Self::Config(_) => FinderErrorCode::Config,
            Self::Client(_) => FinderErrorCode::Client,
        }
    }

    /// Create an invalid method identifier error.
    pub fn invalid_method(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMethodIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error for the manifest at `url`.
    pub fn parse(url: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }

    /// User-facing message, only for download failures.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Fetch(err) => Some(err.user_message()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_message_template() {
        let err = FetchError::HttpStatus {
            url: "https://bobpay.com/webpay".to_string(),
            status: 404,
        };
        assert_eq!(
            err.user_message(),
            "Unable to download payment manifest \"https://bobpay.com/webpay\"."
        );
    }

    #[test]
    fn test_error_codes() {
        let err = FinderError::from(FetchError::Timeout {
            url: "https://bobpay.com/webpay".to_string(),
            timeout_ms: 1000,
        });
        assert_eq!(err.code(), FinderErrorCode::FetchTimeout);
        assert!(err.user_message().is_some());

        let err = FinderError::parse("https://bobpay.com/webpay", ParseError::NotAnObject);
        assert_eq!(err.code(), FinderErrorCode::Parse);
        assert!(err.user_message().is_none());
        assert!(err.to_string().contains("https://bobpay.com/webpay"));
    }

    #[test]
    fn test_helper_constructors() {
        let err = FinderError::invalid_method("http://bobpay.com", "scheme must be https");
        assert_eq!(err.code(), FinderErrorCode::InvalidMethodIdentifier);
        assert!(err.to_string().contains("http://bobpay.com"));
    }
}
