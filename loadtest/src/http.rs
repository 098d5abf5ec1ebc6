//! Contains a remote implementation using HTTP to interact with the messages service.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::{Error, Result};
use crate::request::Request;

/// The outcome of a successful request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    /// The number of response body bytes that were read and discarded.
    pub bytes_read: u64,
}

/// A remote implementation using HTTP to interact with the messages service.
#[derive(Debug)]
pub struct HttpRemote {
    /// The base URL, without a trailing slash.
    base: String,
    /// The HTTP client shared by all simulated users.
    client: Client,
}

impl HttpRemote {
    /// Creates a new `HttpRemote` for the given base URL.
    ///
    /// The base URL may contain a path prefix which is prepended to all request paths. Requests
    /// are aborted after `timeout`, if given.
    pub fn new(remote: &str, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(remote).map_err(|err| Error::InvalidUrl {
            url: remote.to_owned(),
            message: err.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: remote.to_owned(),
                message: "cannot be a base".to_owned(),
            });
        }

        let mut builder =
            Client::builder().user_agent(concat!("loadtest/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base: remote.trim_end_matches('/').to_owned(),
            client: builder.build()?,
        })
    }

    /// Returns the full URL for a request path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Sends the request and reads the full response body.
    ///
    /// Any non-success status is returned as [`Error::Status`]. The response body is discarded.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { status });
        }

        let bytes = response.bytes().await?;
        Ok(Response {
            bytes_read: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths() {
        let remote = HttpRemote::new("http://localhost:5000/", None).unwrap();
        assert_eq!(remote.url("/messages/1"), "http://localhost:5000/messages/1");

        let remote = HttpRemote::new("http://localhost:5000/api", None).unwrap();
        assert_eq!(
            remote.url("/messages/1"),
            "http://localhost:5000/api/messages/1"
        );
    }

    #[test]
    fn rejects_invalid_urls() {
        let err = HttpRemote::new("localhost", None).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));

        let err = HttpRemote::new("mailto:someone@example.com", None).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }
}
