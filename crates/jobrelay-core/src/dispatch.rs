//! Failover dispatch across an ordered list of mirrored backend hosts.
//!
//! One logical request is attempted against each base URL in turn. A host
//! that exceeds the per-attempt deadline is treated as unavailable and the
//! next host is tried; any other transport failure aborts the whole dispatch
//! immediately. The first host that answers wins, whatever its HTTP status —
//! payload-level success lives inside the envelope and is the caller's
//! concern.

use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};

/// Deadline for a single host attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

enum Mode<'a> {
    Get,
    Post(Option<&'a Value>),
}

/// Sends one logical request across an ordered candidate list.
#[derive(Debug, Clone)]
pub struct FailoverDispatcher {
    timeout: Duration,
}

impl Default for FailoverDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FailoverDispatcher {
    pub fn new() -> Self {
        Self {
            timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Override the per-attempt deadline (tests use a short one).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// GET `path` against the first host that answers.
    pub fn get(&self, base_urls: &[String], path: &str) -> Result<Vec<u8>> {
        self.send(base_urls, path, Mode::Get)
    }

    /// POST `path` with an optional JSON body against the first host that
    /// answers.
    pub fn post(&self, base_urls: &[String], path: &str, body: Option<&Value>) -> Result<Vec<u8>> {
        self.send(base_urls, path, Mode::Post(body))
    }

    fn send(&self, base_urls: &[String], path: &str, mode: Mode<'_>) -> Result<Vec<u8>> {
        // The client is scoped to this one logical dispatch.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;

        for base in base_urls {
            let url = format!("{base}{path}");
            let request = match &mode {
                Mode::Get => client.get(&url),
                Mode::Post(Some(json)) => client.post(&url).json(json),
                Mode::Post(None) => client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json"),
            };

            match request.send() {
                Ok(resp) => {
                    let bytes = resp
                        .bytes()
                        .map_err(|e| Error::Upstream(format!("body read failed: {e}")))?;
                    return Ok(bytes.to_vec());
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!(url = %url, "backend attempt timed out, trying next host");
                    continue;
                }
                Err(e) => return Err(Error::Upstream(e.to_string())),
            }
        }

        Err(Error::UpstreamUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// A bound listener whose backlog accepts connections but never answers,
    /// so every request against it runs into the client timeout.
    fn stalled_host() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    /// A URL whose port was bound once and released, so connecting to it is
    /// refused outright rather than timing out.
    fn refused_host() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    fn short_dispatcher() -> FailoverDispatcher {
        FailoverDispatcher::with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn first_answering_host_wins() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/v1/ping")
            .with_body(r#"{"data":"pong"}"#)
            .create();

        let (_stall_a, url_a) = stalled_host();
        let (_stall_b, url_b) = stalled_host();
        let urls = vec![url_a, url_b, server.url()];

        let body = short_dispatcher().get(&urls, "/api/v1/ping").unwrap();
        assert_eq!(body, br#"{"data":"pong"}"#);
        mock.assert();
    }

    #[test]
    fn hosts_after_the_answering_one_are_not_contacted() {
        let mut answering = mockito::Server::new();
        let hit = answering.mock("GET", "/p").with_body("ok").create();
        let mut spare = mockito::Server::new();
        let untouched = spare.mock("GET", "/p").expect(0).create();

        let urls = vec![answering.url(), spare.url()];
        let body = short_dispatcher().get(&urls, "/p").unwrap();

        assert_eq!(body, b"ok");
        hit.assert();
        untouched.assert();
    }

    #[test]
    fn non_timeout_failure_aborts_without_trying_remaining_hosts() {
        let mut spare = mockito::Server::new();
        let untouched = spare.mock("GET", "/p").expect(0).create();

        let urls = vec![refused_host(), spare.url()];
        let err = short_dispatcher().get(&urls, "/p").unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        untouched.assert();
    }

    #[test]
    fn exhausted_list_reports_no_backend_available() {
        let (_stall, url) = stalled_host();
        let err = short_dispatcher().get(&[url], "/p").unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable));

        let err = short_dispatcher().get(&[], "/p").unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable));
    }

    #[test]
    fn non_success_status_still_returns_the_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/p")
            .with_status(500)
            .with_body(r#"{"code":500,"message":"boom"}"#)
            .create();

        let body = short_dispatcher().get(&[server.url()], "/p").unwrap();
        assert_eq!(body, br#"{"code":500,"message":"boom"}"#);
    }

    #[test]
    fn post_carries_json_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/p")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!({"expr": "0 0 * * *"})))
            .with_body(r#"{"data":null}"#)
            .create();

        let payload = serde_json::json!({"expr": "0 0 * * *"});
        short_dispatcher()
            .post(&[server.url()], "/p", Some(&payload))
            .unwrap();
        mock.assert();
    }
}
