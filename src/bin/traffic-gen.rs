use std::time::Duration;

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "traffic-gen")]
#[command(about = "Drive traffic through the relay service", long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:5000")]
    host: String,

    /// Bearer token sent on every request.
    #[arg(short, long, default_value = "my_token")]
    token: String,

    /// Paths requested in order on each iteration.
    #[arg(short, long = "path", default_values_t = vec!["/cards".to_string()])]
    paths: Vec<String>,

    /// Number of iterations over all paths.
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: u32,

    /// Pause between requests, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pause_ms: u64,
}

fn request_headers(token: &str) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        "Correlation-ID",
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())?,
    );
    Ok(headers)
}

fn header_json(headers: &HeaderMap) -> Value {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                Value::String(v.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let pause = Duration::from_millis(cli.pause_ms);

    let mut ok = 0u32;
    let mut failed = 0u32;

    for _ in 0..cli.iterations {
        for path in &cli.paths {
            let headers = request_headers(&cli.token)?;
            let url = format!("{}{}", cli.host.trim_end_matches('/'), path);

            let exchange = match client.get(&url).headers(headers.clone()).send().await {
                Ok(res) => {
                    let status = res.status();
                    if status.is_success() {
                        ok += 1;
                    } else {
                        failed += 1;
                    }
                    let body = res.text().await.unwrap_or_default();
                    json!({
                        "request": {"method": "GET", "url": path, "headers": header_json(&headers), "payload": null},
                        "response": {"status_code": status.as_u16(), "body": body},
                    })
                }
                Err(e) => {
                    failed += 1;
                    json!({
                        "request": {"method": "GET", "url": path, "headers": header_json(&headers), "payload": null},
                        "error": e.to_string(),
                    })
                }
            };

            println!("{}", serde_json::to_string_pretty(&exchange)?);
            tokio::time::sleep(pause).await;
        }
    }

    eprintln!("done: {} succeeded, {} failed", ok, failed);
    Ok(())
}
