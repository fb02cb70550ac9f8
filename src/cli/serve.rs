//! `townwatch serve`: JSON requests on stdin, JSON replies on stdout.
//!
//! One request per line:
//!
//! ```text
//! {"id": 7, "action": "crewStop", "rig": "gastown", "name": "joe"}
//! ```
//!
//! One reply per line, `id` echoed when given:
//!
//! ```text
//! {"id":7,"ok":true,"response":{"kind":"done","data":{...}}}
//! {"id":8,"ok":false,"error":{"kind":"notRunning","message":"...","detail":"..."}}
//! ```
//!
//! Each request runs in its own task against the shared dashboard, so a
//! slow command never holds up the others. Finished tasks are collected as
//! each new line arrives. All replies go through a single writer so lines
//! never interleave.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::classify::ErrorKind;
use crate::dashboard::{Dashboard, Request};
use crate::error::ErrorReport;

pub(super) async fn run(dashboard: Arc<Dashboard>) -> Result<(), String> {
    serve(dashboard, BufReader::new(io::stdin()), io::stdout()).await
}

async fn serve<R, W>(dashboard: Arc<Dashboard>, input: R, output: W) -> Result<(), String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Value>(64);

    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(reply) = rx.recv().await {
            let mut line = reply.to_string();
            line.push('\n');
            output.write_all(line.as_bytes()).await?;
            output.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("failed to read stdin: {e}"))?
    {
        while let Some(joined) = tasks.try_join_next() {
            log_join(joined);
        }
        if line.trim().is_empty() {
            continue;
        }

        let (id, request) = match decode(&line) {
            Ok(decoded) => decoded,
            Err((id, reason)) => {
                let report = ErrorReport {
                    kind: ErrorKind::InvalidInput,
                    message: reason,
                    detail: None,
                };
                let _ = tx.send(reply_err(id, &report)).await;
                continue;
            }
        };

        let dashboard = Arc::clone(&dashboard);
        let tx = tx.clone();
        tasks.spawn(async move {
            let reply = match dashboard.handle(request).await {
                Ok(response) => json!({ "id": id, "ok": true, "response": response }),
                Err(e) => reply_err(id, &e.report()),
            };
            let _ = tx.send(reply).await;
        });
    }

    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
    drop(tx);

    writer
        .await
        .map_err(|e| format!("writer task failed: {e}"))?
        .map_err(|e| format!("failed to write stdout: {e}"))
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "request task failed");
    }
}

/// Split a request line into its optional `id` and the request proper.
fn decode(line: &str) -> Result<(Value, Request), (Value, String)> {
    let mut value: Value =
        serde_json::from_str(line).map_err(|e| (Value::Null, format!("invalid JSON: {e}")))?;

    let id = value
        .as_object_mut()
        .and_then(|map| map.remove("id"))
        .unwrap_or(Value::Null);

    match serde_json::from_value(value) {
        Ok(request) => Ok((id, request)),
        Err(e) => Err((id, format!("invalid request: {e}"))),
    }
}

fn reply_err(id: Value, report: &ErrorReport) -> Value {
    json!({ "id": id, "ok": false, "error": report })
}
