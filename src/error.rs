//! Error types for the CalDAV client.

use std::fmt;

use crate::types::Href;

/// Errors raised by the CalDAV client.
#[non_exhaustive]
#[derive(Debug)]
pub enum CalDavError {
    /// Catch-all protocol error, carrying an optional HTTP status and body.
    Protocol {
        /// Human-readable description.
        message: String,
        /// HTTP status code, if one was involved.
        status: Option<u16>,
        /// Response body, if one was captured.
        body: Option<String>,
    },

    /// HTTP 401: the server rejected the credentials.
    Authentication(String),

    /// HTTP 404: the requested resource does not exist.
    NotFound(Href),

    /// HTTP 409 or 412: a precondition (usually an ETag) did not hold.
    Conflict(String),

    /// One of the three discovery stages failed.
    Discovery(String),

    /// Malformed XML or iCalendar payload.
    Parse(String),

    /// The server does not support CalDAV (no `calendar-access` in the `DAV` header).
    NotACalDavServer,

    /// Constructing a client against a plaintext URL without `allow_insecure`.
    InsecureConnection,
}

impl fmt::Display for CalDavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol {
                message, status, ..
            } => match status {
                Some(code) => write!(f, "protocol error ({code}): {message}"),
                None => write!(f, "protocol error: {message}"),
            },
            Self::Authentication(e) => write!(f, "authentication failed: {e}"),
            Self::NotFound(href) => write!(f, "resource not found: {href}"),
            Self::Conflict(e) => write!(f, "conflict: {e}"),
            Self::Discovery(e) => write!(f, "discovery failed: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::NotACalDavServer => write!(f, "server does not support CalDAV"),
            Self::InsecureConnection => {
                write!(f, "refusing plaintext connection without allow_insecure")
            }
        }
    }
}

impl std::error::Error for CalDavError {}

impl From<reqwest::Error> for CalDavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Protocol {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
            body: None,
        }
    }
}

impl From<quick_xml::Error> for CalDavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<std::io::Error> for CalDavError {
    fn from(e: std::io::Error) -> Self {
        Self::Parse(format!("IO error: {e}"))
    }
}

impl From<url::ParseError> for CalDavError {
    fn from(e: url::ParseError) -> Self {
        Self::Discovery(format!("invalid URL: {e}"))
    }
}
