//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use instrumented_http::instrument::InstrumentedClient;
use instrumented_http::observability::{LogSink, MetricEvent, MetricsSink, Severity};
use instrumented_http::transport::ReqwestTransport;

/// A canned upstream reply.
#[allow(dead_code)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

#[allow(dead_code)]
impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self { status, content_type: "application/json", body: body.to_string() }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self { status, content_type: "text/plain", body: body.to_string() }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Read one request: the head, then as many body bytes as Content-Length says.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&data).into_owned();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Start a programmable backend on an ephemeral port.
///
/// The handler receives the raw request text (head and whatever body arrived
/// with it) and returns the reply.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let raw = read_request(&mut socket).await;

                let reply = f(raw).await;
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.status,
                    status_text(reply.status),
                    reply.content_type,
                    reply.body.len(),
                    reply.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that always returns the same reply.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, content_type: &'static str, body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move {
        Reply { status, content_type, body: body.to_string() }
    })
    .await
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[derive(Default)]
pub struct RecordingMetrics(pub Mutex<Vec<MetricEvent>>);

impl MetricsSink for RecordingMetrics {
    fn observe(&self, event: &MetricEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[allow(dead_code)]
impl RecordingMetrics {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingSink(pub Mutex<Vec<(Severity, String)>>);

impl LogSink for RecordingSink {
    fn write(&self, severity: Severity, record: &str) {
        self.0.lock().unwrap().push((severity, record.to_string()));
    }
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn records(&self) -> Vec<(Severity, serde_json::Value)> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|(s, r)| (*s, serde_json::from_str(r).unwrap()))
            .collect()
    }
}

/// Client over a real reqwest transport with recording sinks.
#[allow(dead_code)]
pub fn recording_client() -> (InstrumentedClient, Arc<RecordingMetrics>, Arc<RecordingSink>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let sink = Arc::new(RecordingSink::default());
    let transport = ReqwestTransport::with_client(
        reqwest::Client::builder().no_proxy().build().unwrap(),
    );
    let client = InstrumentedClient::new(Arc::new(transport), metrics.clone(), sink.clone());
    (client, metrics, sink)
}
