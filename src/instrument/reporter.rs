//! Outcome reporter: exactly one metric observation and one audit record
//! per call.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::instrument::describer::{MaskedRequestView, NormalizedRequest};
use crate::instrument::executor::{Outcome, ResponseBody};
use crate::instrument::mask::mask_fields;
use crate::instrument::policy::LogPolicy;
use crate::observability::metrics::{MetricEvent, MetricsSink, ERROR_STATUS};
use crate::observability::{LogSink, Severity};

/// Maximum number of characters of a non-object response body kept in a log
/// record.
pub const RESPONSE_BODY_LOG_LIMIT: usize = 200;

pub const LOG_CODE_SUCCESS: &str = "REQ_SUCCESS";
pub const LOG_CODE_ERROR: &str = "REQ_ERROR";

const MESSAGE_SUCCESS: &str = "HTTP request successfully executed";
const MESSAGE_ERROR: &str = "HTTP request failed";
const DATETIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// The response half of a log payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseRecord {
    Success {
        status_code: u16,
        body: Value,
        duration_ms: f64,
    },
    Failure {
        status_code: &'static str,
        error: String,
        duration_ms: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPayload {
    pub request: MaskedRequestView,
    pub response: ResponseRecord,
}

/// One audit record. Built per call and handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub datetime: String,
    pub caller_log_code: Option<String>,
    #[serde(rename = "logCode")]
    pub log_code: &'static str,
    #[serde(rename = "logMessage")]
    pub log_message: &'static str,
    pub duration_ms: f64,
    pub payload: LogPayload,
}

impl LogRecord {
    pub fn severity(&self) -> Severity {
        match self.payload.response {
            ResponseRecord::Success { .. } => Severity::Info,
            ResponseRecord::Failure { .. } => Severity::Error,
        }
    }

    /// Render as JSON indented by four spaces.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Derive the metric event for an outcome.
pub fn metric_event(request: &NormalizedRequest, outcome: &Outcome) -> MetricEvent {
    let status = match outcome {
        Outcome::Success { status_code, .. } => status_code.to_string(),
        Outcome::Failure { .. } => ERROR_STATUS.to_string(),
    };
    MetricEvent {
        method: request.method.as_str().to_string(),
        endpoint: request.endpoint().to_string(),
        status,
        duration_secs: outcome.duration_ms() / 1000.0,
    }
}

/// Emits the metric and audit log of every resolved call.
#[derive(Clone)]
pub struct OutcomeReporter {
    metrics: Arc<dyn MetricsSink>,
    sink: Arc<dyn LogSink>,
    body_log_limit: usize,
}

impl OutcomeReporter {
    pub fn new(metrics: Arc<dyn MetricsSink>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            metrics,
            sink,
            body_log_limit: RESPONSE_BODY_LOG_LIMIT,
        }
    }

    /// Override how many characters of a non-object response body are logged.
    pub fn with_body_log_limit(mut self, limit: usize) -> Self {
        self.body_log_limit = limit;
        self
    }

    fn logged_body(&self, body: &ResponseBody, policy: &LogPolicy) -> Value {
        match body {
            ResponseBody::Json(value @ Value::Object(_)) => {
                mask_fields(value, &policy.mask_response_body)
            }
            ResponseBody::Json(other) => {
                Value::String(truncate_chars(&other.to_string(), self.body_log_limit))
            }
            ResponseBody::Text(text) => Value::String(truncate_chars(text, self.body_log_limit)),
        }
    }

    /// Assemble the audit record for an outcome.
    pub fn build_record(
        &self,
        view: &MaskedRequestView,
        outcome: &Outcome,
        policy: &LogPolicy,
        timestamp: DateTime<Local>,
    ) -> LogRecord {
        let duration_ms = outcome.duration_ms();
        let (log_code, log_message, response) = match outcome {
            Outcome::Success {
                status_code,
                response_body,
                ..
            } => (
                LOG_CODE_SUCCESS,
                MESSAGE_SUCCESS,
                ResponseRecord::Success {
                    status_code: *status_code,
                    body: self.logged_body(response_body, policy),
                    duration_ms,
                },
            ),
            Outcome::Failure {
                error_description, ..
            } => (
                LOG_CODE_ERROR,
                MESSAGE_ERROR,
                ResponseRecord::Failure {
                    status_code: ERROR_STATUS,
                    error: error_description.clone(),
                    duration_ms,
                },
            ),
        };

        LogRecord {
            datetime: timestamp.format(DATETIME_FORMAT).to_string(),
            caller_log_code: policy.caller_tag.clone(),
            log_code,
            log_message,
            duration_ms,
            payload: LogPayload {
                request: view.clone(),
                response,
            },
        }
    }

    /// Record one metric observation and write one audit record stamped
    /// with the dispatch time.
    pub fn report(
        &self,
        request: &NormalizedRequest,
        view: &MaskedRequestView,
        outcome: &Outcome,
        policy: &LogPolicy,
        dispatched_at: DateTime<Local>,
    ) {
        self.metrics.observe(&metric_event(request, outcome));

        let record = self.build_record(view, outcome, policy, dispatched_at);
        let rendered = record.to_pretty_json().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to serialize audit record");
            format!(
                "{} {} {} duration_ms={}",
                record.log_code, record.log_message, view.url, record.duration_ms
            )
        });
        self.sink.write(record.severity(), &rendered);
    }
}

impl std::fmt::Debug for OutcomeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeReporter")
            .field("body_log_limit", &self.body_log_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::call::CallSpec;
    use crate::instrument::describer::describe;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMetrics(Mutex<Vec<MetricEvent>>);

    impl MetricsSink for RecordingMetrics {
        fn observe(&self, event: &MetricEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<(Severity, String)>>);

    impl LogSink for RecordingSink {
        fn write(&self, severity: Severity, record: &str) {
            self.0.lock().unwrap().push((severity, record.to_string()));
        }
    }

    fn setup() -> (Arc<RecordingMetrics>, Arc<RecordingSink>, OutcomeReporter) {
        let metrics = Arc::new(RecordingMetrics::default());
        let sink = Arc::new(RecordingSink::default());
        let reporter = OutcomeReporter::new(metrics.clone(), sink.clone());
        (metrics, sink, reporter)
    }

    fn described() -> (NormalizedRequest, MaskedRequestView) {
        let spec = CallSpec::builder()
            .method("POST")
            .url("https://api.example.test/cards")
            .json(json!({"numero": "123", "description": "secret"}))
            .build()
            .unwrap();
        describe(&spec, &LogPolicy::new().mask_request_body(["description"]))
    }

    #[test]
    fn test_success_reports_once_with_status_label() {
        let (metrics, sink, reporter) = setup();
        let (request, view) = described();
        let policy = LogPolicy::new()
            .caller("MAIN_test_post")
            .mask_response_body(["numero"]);
        let outcome = Outcome::Success {
            status_code: 201,
            response_body: ResponseBody::Json(json!({"id": "1", "numero": "123"})),
            duration_ms: 12.34,
        };

        reporter.report(&request, &view, &outcome, &policy, Local::now());

        let events = metrics.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].method, "POST");
        assert_eq!(events[0].endpoint, "https://api.example.test/cards");
        assert_eq!(events[0].status, "201");
        assert!((events[0].duration_secs - 0.01234).abs() < 1e-9);

        let logs = sink.0.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, Severity::Info);
        let record: Value = serde_json::from_str(&logs[0].1).unwrap();
        assert_eq!(record["logCode"], "REQ_SUCCESS");
        assert_eq!(record["caller_log_code"], "MAIN_test_post");
        assert_eq!(record["payload"]["response"]["body"], json!({"id": "1", "numero": "*****"}));
        assert_eq!(
            record["payload"]["request"]["body"],
            json!({"numero": "123", "description": "*****"})
        );
    }

    #[test]
    fn test_failure_reports_error_sentinel_without_body() {
        let (metrics, sink, reporter) = setup();
        let (request, view) = described();
        let outcome = Outcome::Failure {
            error_description: "request timed out after 10s".into(),
            duration_ms: 10_000.0,
        };

        reporter.report(&request, &view, &outcome, &LogPolicy::default(), Local::now());

        let events = metrics.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ERROR_STATUS);

        let logs = sink.0.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, Severity::Error);
        let record: Value = serde_json::from_str(&logs[0].1).unwrap();
        assert_eq!(record["logCode"], "REQ_ERROR");
        assert_eq!(record["caller_log_code"], Value::Null);
        let response = &record["payload"]["response"];
        assert_eq!(response["status_code"], "error");
        assert_eq!(response["error"], "request timed out after 10s");
        assert!(response.get("body").is_none());
    }

    #[test]
    fn test_text_body_is_truncated_to_limit() {
        let (_, _, reporter) = setup();
        let reporter = reporter.with_body_log_limit(5);
        let (_, view) = described();
        let outcome = Outcome::Success {
            status_code: 200,
            response_body: ResponseBody::Text("héllo world".into()),
            duration_ms: 1.0,
        };

        let record = reporter.build_record(&view, &outcome, &LogPolicy::default(), Local::now());
        match record.payload.response {
            ResponseRecord::Success { body, .. } => assert_eq!(body, json!("héllo")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json_is_stringified() {
        let (_, _, reporter) = setup();
        let (_, view) = described();
        let outcome = Outcome::Success {
            status_code: 200,
            response_body: ResponseBody::Json(json!([1, 2, 3])),
            duration_ms: 1.0,
        };

        let record = reporter.build_record(&view, &outcome, &LogPolicy::default(), Local::now());
        match record.payload.response {
            ResponseRecord::Success { body, .. } => assert_eq!(body, json!("[1,2,3]")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_record_layout_and_indent() {
        let (_, _, reporter) = setup();
        let (_, view) = described();
        let outcome = Outcome::Failure {
            error_description: "boom".into(),
            duration_ms: 3.5,
        };
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).single().unwrap();

        let rendered = reporter
            .build_record(&view, &outcome, &LogPolicy::new().caller("svc"), timestamp)
            .to_pretty_json()
            .unwrap();

        assert!(rendered.starts_with("{\n    \"datetime\": \"09-03-2024 14:05:00\",\n    \"caller_log_code\": \"svc\","));
        let keys: Vec<String> = serde_json::from_str::<serde_json::Map<String, Value>>(&rendered)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(
            keys,
            vec!["datetime", "caller_log_code", "logCode", "logMessage", "duration_ms", "payload"]
        );
    }

    #[test]
    fn test_truncate_chars_short_text_untouched() {
        assert_eq!(truncate_chars("abc", 200), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }
}
