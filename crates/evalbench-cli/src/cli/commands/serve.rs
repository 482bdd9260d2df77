//! JSON-lines service on stdio.
//!
//! Request: `{"id": any, "method": "grade"|"generate"|"load"|"save", "params": {...}}`
//! Response: `{"id": <same>, "status": <u16>, "body": {...}}`

use super::{exit_codes, open_gateway};
use evalbench_core::api::{self, ApiResponse};
use evalbench_core::config::EvalbenchConfig;
use evalbench_core::workbench::Workbench;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

static RID: AtomicU64 = AtomicU64::new(1);

fn next_rid() -> String {
    let n = RID.fetch_add(1, Ordering::Relaxed);
    format!("r-{n:06}")
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    status: u16,
    body: Value,
}

pub async fn run(cfg: &EvalbenchConfig) -> anyhow::Result<i32> {
    let gateway = open_gateway(cfg)?;
    let workbench = Workbench::open(gateway.clone());
    let policy = cfg.build_policy();

    tracing::info!(
        event = "serve_start",
        mode = ?policy.mode(),
        persistence = cfg.db_path.is_some()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let rid = next_rid();

        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                tracing::debug!(event = "request", rid = %rid, method = %req.method);
                let params = if req.params.is_null() {
                    json!({})
                } else {
                    req.params
                };
                let out = match req.method.as_str() {
                    "grade" => api::grade(&policy, &params).await,
                    "generate" => api::generate(&policy, &params).await,
                    "load" => api::load_data(gateway.as_ref()),
                    "save" => api::save_data(&workbench, &params),
                    other => ApiResponse::error(404, format!("unknown method: {other}")),
                };
                Response {
                    id: req.id,
                    status: out.status,
                    body: out.body,
                }
            }
            Err(e) => {
                tracing::warn!(event = "json_parse_error", rid = %rid, error = %e);
                Response {
                    id: Value::Null,
                    status: 400,
                    body: json!({ "error": format!("invalid request: {e}") }),
                }
            }
        };

        let mut out = serde_json::to_vec(&resp)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    tracing::info!(event = "serve_stop");
    Ok(exit_codes::OK)
}
