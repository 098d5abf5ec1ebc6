//! Error types of the HTTP layer.

use reqwest::StatusCode;

/// Errors that can happen while talking to the messages service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client, such as connection errors and
    /// timeouts.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// The service responded with a non-success status code.
    #[error("unexpected status {status}")]
    Status {
        /// The status code of the response.
        status: StatusCode,
    },
    /// The configured remote is not a valid base URL.
    #[error("invalid remote URL `{url}`: {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// The URL error message.
        message: String,
    },
}

impl Error {
    /// A short label for grouping failures in reports.
    ///
    /// Unlike [`Display`](std::fmt::Display), this does not include request URLs, so failures
    /// against different actors end up in the same group.
    pub fn reason(&self) -> String {
        match self {
            Error::Reqwest(err) if err.is_timeout() => "timeout".to_owned(),
            Error::Reqwest(err) if err.is_connect() => "connection error".to_owned(),
            Error::Reqwest(err) if err.is_body() || err.is_decode() => "body error".to_owned(),
            Error::Reqwest(_) => "request error".to_owned(),
            Error::Status { status } => format!("HTTP {status}"),
            Error::InvalidUrl { .. } => "invalid URL".to_owned(),
        }
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
