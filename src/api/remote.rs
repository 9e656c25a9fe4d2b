//! Purpose: HTTP client for the remote tabular roster endpoint.
//! Exports: `RemoteGateway`, `RetryPolicy`.
//! Role: Stateless request/response gateway; one of the two backends.
//! Invariants: Reads retry with exponential backoff; mutations never retry
//! (the endpoint is at-least-once with no idempotency key).
//! Invariants: The endpoint does not echo the roster, so every successful
//! mutation is followed by a full read; post-mutation state is never guessed.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use super::backend::Backend;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::StudentRecord;

/// Read backoff: `delay = 2^attempt * base`, `retries` extra attempts
/// after the first. The defaults match the endpoint's documented limits;
/// tests shrink `base_delay` to keep runs fast.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Action {
    Add,
    Update,
    Delete,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

#[derive(Serialize)]
struct ActionRequest<'a> {
    action: &'static str,
    data: &'a Value,
}

pub struct RemoteGateway {
    agent: ureq::Agent,
    endpoint: Url,
    token: Option<String>,
    retry: RetryPolicy,
}

impl RemoteGateway {
    pub fn new(endpoint: Url) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint,
            token: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn fetch_roster(&self) -> Result<Vec<StudentRecord>, Error> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_once() {
                Ok(roster) => return Ok(roster),
                Err(err) if attempt < self.retry.retries => {
                    let delay = self.retry.backoff_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "roster read failed, backing off"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(Error::new(ErrorKind::Network)
                        .with_message(format!(
                            "failed to load roster from endpoint after {} attempts",
                            attempt + 1
                        ))
                        .with_operation("read")
                        .with_hint("Check the endpoint URL and network connectivity.")
                        .with_source(err));
                }
            }
        }
    }

    fn fetch_once(&self) -> Result<Vec<StudentRecord>, Error> {
        let response = self
            .request("GET")
            .call()
            .map_err(|err| transport_error(err, "read"))?;
        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read roster response body")
                .with_source(err)
        })?;
        let rows: Vec<Value> = serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("endpoint did not return a JSON record array")
                .with_source(err)
        })?;
        Ok(parse_rows(&rows))
    }

    /// Single mutating request; the action tag tells the endpoint what to
    /// do with the payload. Failures surface immediately.
    fn mutate(&self, action: Action, data: &Value) -> Result<(), Error> {
        let payload = serde_json::to_string(&ActionRequest {
            action: action.as_str(),
            data,
        })
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode mutation request")
                .with_source(err)
        })?;
        self.request("POST")
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(|err| transport_error(err, action.as_str()))?;
        Ok(())
    }

    fn request(&self, method: &str) -> ureq::Request {
        let mut request = self
            .agent
            .request(method, self.endpoint.as_str())
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }
}

impl Backend for RemoteGateway {
    fn read(&self) -> Result<Vec<StudentRecord>, Error> {
        self.fetch_roster()
    }

    fn write(&self, record: &StudentRecord) -> Result<Vec<StudentRecord>, Error> {
        let action = if record.id.is_empty() {
            Action::Add
        } else {
            Action::Update
        };
        let data = serde_json::to_value(record).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode record")
                .with_source(err)
        })?;
        self.mutate(action, &data)?;
        self.fetch_roster()
    }

    fn remove(&self, id: &str) -> Result<Vec<StudentRecord>, Error> {
        self.mutate(Action::Delete, &json!({ "id": id }))?;
        self.fetch_roster()
    }
}

fn parse_rows(rows: &[Value]) -> Vec<StudentRecord> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| StudentRecord::from_wire(row, index))
        .collect()
}

fn transport_error(err: ureq::Error, operation: &str) -> Error {
    match err {
        ureq::Error::Status(code, _response) => Error::new(ErrorKind::Network)
            .with_message(format!("endpoint returned status {code}"))
            .with_operation(operation),
        ureq::Error::Transport(transport) => Error::new(ErrorKind::Network)
            .with_message("request failed")
            .with_operation(operation)
            .with_source(transport),
    }
}

/// Parse and validate a remote endpoint URL. Paths are allowed; tabular
/// web-app endpoints commonly live under one.
pub fn parse_endpoint_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid endpoint url: {raw}"))
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("endpoint url must use http or https scheme")
            .with_hint("Use an http(s):// endpoint, or \"local\" for the local store."));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::{Action, RetryPolicy, parse_endpoint_url, parse_rows};
    use crate::core::error::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy {
            retries: 3,
            base_delay: Duration::from_millis(1000),
        };
        assert_eq!(retry.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(4000));
    }

    #[test]
    fn action_tags_match_wire_contract() {
        assert_eq!(Action::Add.as_str(), "add");
        assert_eq!(Action::Update.as_str(), "update");
        assert_eq!(Action::Delete.as_str(), "delete");
    }

    #[test]
    fn parse_endpoint_url_accepts_paths() {
        let url = parse_endpoint_url("https://example.com/macros/s/abc/exec").expect("url");
        assert_eq!(url.path(), "/macros/s/abc/exec");
    }

    #[test]
    fn parse_endpoint_url_rejects_non_http_schemes() {
        let err = parse_endpoint_url("ftp://example.com/roster").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn parse_rows_normalizes_each_row() {
        let rows = vec![
            json!({"studentId": "S001", "studentName": "Ravi Sharma", "rollNo": 101}),
            json!({"studentName": "No Key"}),
        ];
        let roster = parse_rows(&rows);
        assert_eq!(roster[0].roll_no, "101");
        assert_eq!(roster[0].id, "S001");
        assert_eq!(roster[1].id, "temp-1");
    }
}
