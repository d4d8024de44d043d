//! Call executor: one dispatch, one timing measurement, one outcome.

use std::time::Instant;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::instrument::call::Headers;
use crate::instrument::describer::NormalizedRequest;
use crate::transport::{RawResponse, Transport, TransportError};

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Body of a response declaring a JSON content type.
    Json(Value),
    /// Anything else, kept as opaque text.
    Text(String),
}

/// Response returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl CallResponse {
    /// The body as JSON: parsed JSON stays as-is, text becomes a JSON string.
    pub fn json(&self) -> Value {
        match &self.body {
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Result of one executed call, as seen by the reporter.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        status_code: u16,
        response_body: ResponseBody,
        duration_ms: f64,
    },
    Failure {
        error_description: String,
        duration_ms: f64,
    },
}

impl Outcome {
    pub fn duration_ms(&self) -> f64 {
        match self {
            Outcome::Success { duration_ms, .. } | Outcome::Failure { duration_ms, .. } => {
                *duration_ms
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Milliseconds since `start`, rounded to two decimals.
pub fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

fn declares_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn decode(raw: RawResponse) -> Result<CallResponse, TransportError> {
    let body = if declares_json(raw.content_type()) && !raw.body.is_empty() {
        let value = serde_json::from_slice(&raw.body).map_err(|e| TransportError::MalformedBody {
            message: e.to_string(),
        })?;
        ResponseBody::Json(value)
    } else {
        ResponseBody::Text(String::from_utf8_lossy(&raw.body).into_owned())
    };

    Ok(CallResponse {
        status_code: raw.status_code,
        headers: raw.headers,
        body,
    })
}

/// One dispatched call: when it left, how it resolved, and what the caller
/// gets back once the outcome is reported.
#[derive(Debug)]
pub struct Execution {
    /// Local wall-clock time taken right before dispatch.
    pub dispatched_at: DateTime<Local>,
    pub outcome: Outcome,
    pub result: Result<CallResponse, TransportError>,
}

/// Dispatch `request` once and time it.
///
/// Both branches measure from the same start instant, taken right before
/// dispatch, to the moment the call (including body decoding) resolved.
pub async fn execute(transport: &dyn Transport, request: &NormalizedRequest) -> Execution {
    let dispatched_at = Local::now();
    let start = Instant::now();
    let result = match transport.perform_call(request).await {
        Ok(raw) => decode(raw),
        Err(e) => Err(e),
    };
    let duration_ms = elapsed_ms(start);

    let outcome = match &result {
        Ok(response) => Outcome::Success {
            status_code: response.status_code,
            response_body: response.body.clone(),
            duration_ms,
        },
        Err(e) => Outcome::Failure {
            error_description: e.to_string(),
            duration_ms,
        },
    };

    Execution {
        dispatched_at,
        outcome,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::call::CallSpec;
    use crate::instrument::describer::describe;
    use crate::instrument::policy::LogPolicy;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::time::Duration;

    struct Scripted {
        delay: Duration,
        response: Option<(u16, &'static str, &'static str)>,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn perform_call(&self, request: &NormalizedRequest) -> Result<RawResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            match self.response {
                Some((status, content_type, body)) => Ok(RawResponse {
                    status_code: status,
                    headers: [("Content-Type", content_type)].into_iter().collect(),
                    body: Bytes::from_static(body.as_bytes()),
                }),
                None => Err(TransportError::Timeout {
                    timeout: request.timeout,
                }),
            }
        }
    }

    fn request() -> NormalizedRequest {
        let spec = CallSpec::builder()
            .method("GET")
            .url("https://api.example.test/cards")
            .build()
            .unwrap();
        describe(&spec, &LogPolicy::default()).0
    }

    #[tokio::test]
    async fn test_json_response_is_parsed() {
        let transport = Scripted {
            delay: Duration::ZERO,
            response: Some((201, "application/json; charset=utf-8", r#"{"id":"7"}"#)),
        };
        let Execution { outcome, result, .. } = execute(&transport, &request()).await;

        let response = result.unwrap();
        assert_eq!(response.status_code, 201);
        assert_eq!(response.body, ResponseBody::Json(json!({"id": "7"})));
        assert!(matches!(outcome, Outcome::Success { status_code: 201, .. }));
    }

    #[tokio::test]
    async fn test_text_response_is_not_parsed() {
        let transport = Scripted {
            delay: Duration::ZERO,
            response: Some((200, "text/plain", r#"{"looks":"like json"}"#)),
        };
        let result = execute(&transport, &request()).await.result;
        assert_eq!(
            result.unwrap().body,
            ResponseBody::Text(r#"{"looks":"like json"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_non_2xx_is_still_success() {
        let transport = Scripted {
            delay: Duration::ZERO,
            response: Some((503, "text/plain", "down")),
        };
        let Execution { outcome, result, .. } = execute(&transport, &request()).await;
        assert!(outcome.is_success());
        assert!(!result.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_malformed_json_is_failure() {
        let transport = Scripted {
            delay: Duration::ZERO,
            response: Some((200, "application/json", "{not json")),
        };
        let Execution { outcome, result, .. } = execute(&transport, &request()).await;
        assert!(matches!(result, Err(TransportError::MalformedBody { .. })));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_failure_duration_covers_elapsed_time() {
        let transport = Scripted {
            delay: Duration::from_millis(50),
            response: None,
        };
        let Execution { outcome, result, .. } = execute(&transport, &request()).await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        match outcome {
            Outcome::Failure {
                error_description,
                duration_ms,
            } => {
                assert!(duration_ms >= 50.0, "duration was {}", duration_ms);
                assert!(error_description.contains("timed out"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_time_is_taken_before_the_call() {
        let transport = Scripted {
            delay: Duration::from_millis(200),
            response: None,
        };
        let before = Local::now();
        let execution = execute(&transport, &request()).await;
        let after = Local::now();

        assert!(execution.dispatched_at >= before);
        assert!((after - execution.dispatched_at).num_milliseconds() >= 200);
        assert!((execution.dispatched_at - before).num_milliseconds() < 100);
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(declares_json(Some("application/json")));
        assert!(declares_json(Some("Application/JSON; charset=utf-8")));
        assert!(declares_json(Some("application/problem+json")));
        assert!(!declares_json(Some("text/plain")));
        assert!(!declares_json(None));
    }
}
