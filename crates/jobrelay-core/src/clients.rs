//! Domain façades over the failover dispatcher: log queries against the
//! agent pool, schedule/info queries and progress reports against the
//! compute pool. Each façade owns its ordered host list; the envelope codec
//! interprets whatever body the first answering host returned.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::dispatch::FailoverDispatcher;
use crate::envelope;
use crate::error::Result;

// ---------------------------------------------------------------------------
// LogClient
// ---------------------------------------------------------------------------

/// Fetches execution logs from the mirrored log hosts. Responses are passed
/// through raw; this gateway does not reinterpret log payloads.
#[derive(Debug, Clone)]
pub struct LogClient {
    urls: Vec<String>,
    dispatcher: FailoverDispatcher,
}

impl LogClient {
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_dispatcher(urls, FailoverDispatcher::new())
    }

    pub fn with_dispatcher(urls: Vec<String>, dispatcher: FailoverDispatcher) -> Self {
        Self { urls, dispatcher }
    }

    /// Log entries for a job. `last_id` and `limit` become query parameters
    /// only when non-empty / non-zero.
    pub fn get_logs(&self, job_id: &str, last_id: Option<&str>, limit: u32) -> Result<Vec<u8>> {
        let mut query = Vec::new();
        if let Some(last) = last_id.filter(|v| !v.is_empty()) {
            query.push(format!("lastId={last}"));
        }
        if limit > 0 {
            query.push(format!("limit={limit}"));
        }

        let mut path = format!("/api/v1/request/{job_id}/logs");
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.join("&"));
        }

        self.dispatcher.get(&self.urls, &path)
    }

    /// A single log entry by id.
    pub fn get_log(&self, job_id: &str, id: &str) -> Result<Vec<u8>> {
        self.dispatcher
            .get(&self.urls, &format!("/api/v1/request/{job_id}/log/{id}"))
    }
}

// ---------------------------------------------------------------------------
// ComputeClient
// ---------------------------------------------------------------------------

/// Talks to the mirrored compute hosts: next-run schedules, next-run info,
/// and progress kicks.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    urls: Vec<String>,
    dispatcher: FailoverDispatcher,
}

impl ComputeClient {
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_dispatcher(urls, FailoverDispatcher::new())
    }

    pub fn with_dispatcher(urls: Vec<String>, dispatcher: FailoverDispatcher) -> Self {
        Self { urls, dispatcher }
    }

    /// Next schedule for a not-yet-created trigger definition.
    pub fn pre_next_schedule(&self, name: &str, payload: &Value) -> Result<DateTime<Utc>> {
        let body = self.dispatcher.post(
            &self.urls,
            &format!("/api/v1/schedule/pre-next/{name}"),
            Some(payload),
        )?;
        envelope::decode_timestamp(&body)
    }

    /// Next schedule for an existing job.
    pub fn next_schedule(&self, job_id: &str) -> Result<DateTime<Utc>> {
        let body = self
            .dispatcher
            .post(&self.urls, &format!("/api/v1/schedule/next/{job_id}"), None)?;
        envelope::decode_timestamp(&body)
    }

    /// Next-run detail for a not-yet-created action definition.
    pub fn pre_next_info(&self, name: &str, payload: &Value) -> Result<Value> {
        let body = self.dispatcher.post(
            &self.urls,
            &format!("/api/v1/request/pre-next/{name}"),
            Some(payload),
        )?;
        envelope::decode_opaque(&body)
    }

    /// Next-run detail for an existing job.
    pub fn next_info(&self, job_id: &str) -> Result<Value> {
        let body = self
            .dispatcher
            .post(&self.urls, &format!("/api/v1/request/next/{job_id}"), None)?;
        envelope::decode_opaque(&body)
    }

    /// Kick a progress pass over every job. The response body is discarded;
    /// only transport failures surface.
    pub fn progress(&self) -> Result<()> {
        self.dispatcher.post(&self.urls, "/api/v1/progress", None)?;
        Ok(())
    }

    /// Kick a progress pass for one job.
    pub fn progress_once(&self, job_id: &str) -> Result<()> {
        self.dispatcher
            .post(&self.urls, &format!("/api/v1/progress/{job_id}"), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;
    use std::time::Duration;

    fn short_dispatcher() -> FailoverDispatcher {
        FailoverDispatcher::with_timeout(Duration::from_millis(200))
    }

    #[test]
    fn get_logs_builds_query_only_from_present_params() {
        let mut server = mockito::Server::new();
        let bare = server
            .mock("GET", "/api/v1/request/j1/logs")
            .match_query(mockito::Matcher::Missing)
            .with_body("[]")
            .create();

        let client = LogClient::with_dispatcher(vec![server.url()], short_dispatcher());
        client.get_logs("j1", None, 0).unwrap();
        bare.assert();

        let full = server
            .mock("GET", "/api/v1/request/j1/logs?lastId=42&limit=10")
            .with_body("[]")
            .create();
        client.get_logs("j1", Some("42"), 10).unwrap();
        full.assert();
    }

    #[test]
    fn get_log_fetches_single_entry() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/v1/request/j1/log/7")
            .with_body(r#"{"data":{"id":"7"}}"#)
            .create();

        let client = LogClient::with_dispatcher(vec![server.url()], short_dispatcher());
        let body = client.get_log("j1", "7").unwrap();
        assert_eq!(body, br#"{"data":{"id":"7"}}"#);
        mock.assert();
    }

    #[test]
    fn next_schedule_decodes_wire_timestamp() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/v1/schedule/next/j1")
            .with_body(r#"{"data":"2023-05-01T12:00:00Z"}"#)
            .create();

        let client = ComputeClient::with_dispatcher(vec![server.url()], short_dispatcher());
        let ts = client.next_schedule("j1").unwrap();
        assert_eq!(ts, chrono::Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn pre_next_schedule_posts_the_payload() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/v1/schedule/pre-next/cron")
            .match_body(mockito::Matcher::Json(serde_json::json!({"expr": "0 0 * * *"})))
            .with_body(r#"{"data":"2024-01-01T00:00:00Z"}"#)
            .create();

        let client = ComputeClient::with_dispatcher(vec![server.url()], short_dispatcher());
        client
            .pre_next_schedule("cron", &serde_json::json!({"expr": "0 0 * * *"}))
            .unwrap();
        mock.assert();
    }

    #[test]
    fn next_info_returns_opaque_data() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/v1/request/next/j1")
            .with_body(r#"{"data":{"cmd":"ls"}}"#)
            .create();

        let client = ComputeClient::with_dispatcher(vec![server.url()], short_dispatcher());
        let info = client.next_info("j1").unwrap();
        assert_eq!(info["cmd"], "ls");
    }

    #[test]
    fn malformed_schedule_body_is_a_decode_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/v1/schedule/next/j1")
            .with_body(r#"{"data":"tomorrow-ish"}"#)
            .create();

        let client = ComputeClient::with_dispatcher(vec![server.url()], short_dispatcher());
        assert!(matches!(
            client.next_schedule("j1").unwrap_err(),
            Error::Decode(_)
        ));
    }

    #[test]
    fn progress_discards_the_body() {
        let mut server = mockito::Server::new();
        let all = server
            .mock("POST", "/api/v1/progress")
            .with_body(r#"{"data":"ok"}"#)
            .create();
        let once = server
            .mock("POST", "/api/v1/progress/j1")
            .with_body(r#"{"data":"ok"}"#)
            .create();

        let client = ComputeClient::with_dispatcher(vec![server.url()], short_dispatcher());
        client.progress().unwrap();
        client.progress_once("j1").unwrap();
        all.assert();
        once.assert();
    }
}
