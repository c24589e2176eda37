//! Stdio Transport
//!
//! Newline-delimited JSON-RPC: one message per line on stdin, one response
//! per line on stdout.
//!
//! ```text
//! stdin ──lines──► reader loop ──spawn──► request task ─┐
//!                     │                    request task ─┼──mpsc──► writer task ──► stdout
//!                     └─ notifications/cancelled ─abort─►┘
//! ```
//!
//! Every request runs on its own task, so a slow upstream call never delays
//! other requests. Only the writer task touches stdout.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use super::protocol::{
    CancelledParams, INTERNAL_ERROR, Incoming, McpHandler, Request, RequestId, Response,
    parse_message,
};
use crate::error::{ErrorCode, ErrorPayload};

/// Outbound queue depth between request tasks and the writer.
const OUTBOUND_CAPACITY: usize = 256;

/// In-flight requests keyed by id. The ticket distinguishes a reused id.
type InFlight = Arc<Mutex<HashMap<RequestId, (u64, AbortHandle)>>>;

/// Serves MCP over a line-oriented byte stream.
#[derive(Debug, Clone)]
pub struct StdioServer {
    handler: McpHandler,
    shutdown: CancellationToken,
}

impl StdioServer {
    /// Create a server. It stops at end of input or when `shutdown` fires.
    #[must_use]
    pub const fn new(handler: McpHandler, shutdown: CancellationToken) -> Self {
        Self { handler, shutdown }
    }

    /// Serve on the process stdin and stdout.
    pub async fn run(&self) -> io::Result<()> {
        tracing::info!(tools = self.handler.registry().len(), "Serving MCP over stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve on arbitrary streams.
    ///
    /// At end of input, requests already running are allowed to finish and
    /// their responses are written. On shutdown they are aborted.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let writer_task = tokio::spawn(write_lines(writer, rx));

        let in_flight: InFlight = Arc::default();
        let mut tasks = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();
        let mut next_ticket = 0_u64;
        let mut read_error = None;

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    tracing::info!(in_flight = tasks.len(), "Shutdown requested, aborting in-flight requests");
                    tasks.shutdown().await;
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    reap(joined, &in_flight, &tx).await;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        next_ticket += 1;
                        self.dispatch(&line, next_ticket, &mut tasks, &in_flight, &tx).await;
                    }
                    Ok(None) => {
                        tracing::info!(in_flight = tasks.len(), "stdin closed");
                        tokio::select! {
                            () = drain(&mut tasks, &in_flight, &tx) => {}
                            () = self.shutdown.cancelled() => tasks.shutdown().await,
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        tasks.shutdown().await;
                        read_error = Some(e);
                        break;
                    }
                },
            }
        }

        drop(tx);
        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to write stdout");
                return Err(e);
            }
            Err(e) => return Err(io::Error::other(e)),
        }

        tracing::info!("Stdio transport stopped");
        read_error.map_or(Ok(()), Err)
    }

    async fn dispatch(
        &self,
        line: &str,
        ticket: u64,
        tasks: &mut JoinSet<()>,
        in_flight: &InFlight,
        tx: &mpsc::Sender<String>,
    ) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let request = match parse_message(line) {
            Incoming::Request(request) => request,
            Incoming::Reply => return,
            Incoming::Invalid(response) => {
                send_response(tx, &response).await;
                return;
            }
        };

        let Some(id) = request.id.clone() else {
            if request.method == "notifications/cancelled" {
                cancel(&request, in_flight);
                return;
            }
            let method = request.method.clone();
            if let Some(response) = self.handler.handle_request(request).await {
                tracing::warn!(method = %method, ?response, "Dropped response to a notification");
            }
            return;
        };

        let handler = self.handler.clone();
        let tx = tx.clone();
        let registered = Arc::clone(in_flight);
        let task_id = id.clone();

        // Hold the lock across spawn so the task cannot deregister first.
        let mut pending = in_flight.lock();
        let abort = tasks.spawn(async move {
            let response = handler.handle_request(request).await;
            {
                let mut pending = registered.lock();
                if pending.get(&task_id).is_some_and(|(t, _)| *t == ticket) {
                    pending.remove(&task_id);
                }
            }
            if let Some(response) = response {
                send_response(&tx, &response).await;
            }
        });
        if pending.insert(id.clone(), (ticket, abort)).is_some() {
            tracing::warn!(request_id = %id, "Request id reused while still in flight");
        }
    }
}

fn cancel(request: &Request, in_flight: &InFlight) {
    let Some(params) = CancelledParams::from_request(request) else {
        tracing::warn!("Malformed cancellation notification");
        return;
    };

    let removed = in_flight.lock().remove(&params.request_id);
    if let Some((_, handle)) = removed {
        handle.abort();
        tracing::info!(
            request_id = %params.request_id,
            reason = params.reason.as_deref().unwrap_or("none"),
            "Request cancelled"
        );
    } else {
        tracing::debug!(request_id = %params.request_id, "Cancellation for finished request");
    }
}

async fn drain(tasks: &mut JoinSet<()>, in_flight: &InFlight, tx: &mpsc::Sender<String>) {
    while let Some(joined) = tasks.join_next().await {
        reap(joined, in_flight, tx).await;
    }
}

/// Answer a request whose task panicked. Aborted tasks stay silent.
async fn reap(joined: Result<(), JoinError>, in_flight: &InFlight, tx: &mpsc::Sender<String>) {
    let Err(err) = joined else {
        return;
    };
    if !err.is_panic() {
        return;
    }

    let task = err.id();
    let request_id = {
        let mut pending = in_flight.lock();
        let found = pending
            .iter()
            .find(|(_, (_, handle))| handle.id() == task)
            .map(|(id, _)| id.clone());
        if let Some(id) = &found {
            pending.remove(id);
        }
        found
    };

    tracing::error!(task = %task, request_id = ?request_id, "Request handler panicked");
    if let Some(id) = request_id {
        let payload = ErrorPayload::new(ErrorCode::InternalError, "request handler panicked");
        let response = Response::error(
            Some(id),
            INTERNAL_ERROR,
            "internal error",
            Some(payload.to_value()),
        );
        send_response(tx, &response).await;
    }
}

async fn send_response(tx: &mpsc::Sender<String>, response: &Response) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).await.is_err() {
                tracing::debug!("Writer closed, response dropped");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{ToolRegistry, async_handler, sync_handler};
    use crate::application::tools::ping;
    use crate::domain::tool::ToolDescriptor;
    use serde_json::{Value, json};
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;

    fn server_with_slow_tool(delay: Duration) -> StdioServer {
        let mut registry = ToolRegistry::new();
        let (descriptor, handler) = ping();
        registry.register(descriptor, handler).unwrap();
        registry
            .register(
                ToolDescriptor::new("slow", "Sleeps, then answers"),
                async_handler(move |_args| async move {
                    tokio::time::sleep(delay).await;
                    Ok(json!("done"))
                }),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("broken", "Always panics"),
                sync_handler(|_args| panic!("handler bug")),
            )
            .unwrap();
        StdioServer::new(
            McpHandler::new(Arc::new(registry)),
            CancellationToken::new(),
        )
    }

    async fn run_lines(server: &StdioServer, input: &str) -> Vec<Value> {
        let (writer, mut output) = tokio::io::duplex(1 << 16);
        server.serve(input.as_bytes(), writer).await.unwrap();

        let mut raw = String::new();
        output.read_to_string(&mut raw).await.unwrap();
        raw.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn answers_requests_and_skips_notifications() {
        let server = server_with_slow_tool(Duration::ZERO);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"ping"}}"#,
            "\n",
        );

        let mut responses = run_lines(&server, input).await;
        responses.sort_by_key(|r| r["id"].as_i64());

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        assert_eq!(responses[1]["result"]["content"][0]["text"], "pong: hello");
    }

    #[tokio::test]
    async fn panicking_handler_gets_internal_error() {
        let server = server_with_slow_tool(Duration::ZERO);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"b","method":"tools/call","params":{"name":"broken"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );

        let mut responses = run_lines(&server, input).await;
        responses.sort_by_key(|r| r["id"].is_string());

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], "b");
        assert_eq!(responses[1]["error"]["code"], INTERNAL_ERROR);
        assert_eq!(responses[1]["error"]["data"]["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error() {
        let server = server_with_slow_tool(Duration::ZERO);
        let responses = run_lines(&server, "{oops\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[0]["id"], Value::Null);
    }

    #[tokio::test]
    async fn slow_request_does_not_block_fast_one() {
        let server = server_with_slow_tool(Duration::from_millis(300));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"slow"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"ping"}}"#,
            "\n",
        );

        let responses = run_lines(&server, input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "done");
    }

    #[tokio::test]
    async fn cancelled_request_gets_no_response() {
        let server = server_with_slow_tool(Duration::from_secs(30));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":"slow-1","method":"tools/call","params":{"name":"slow"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":"slow-1"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );

        let started = Instant::now();
        let responses = run_lines(&server, input).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 2);
    }

    #[tokio::test]
    async fn shutdown_aborts_in_flight_requests() {
        let server = server_with_slow_tool(Duration::from_secs(30));
        let shutdown = server.shutdown.clone();
        let (mut client, server_input) = tokio::io::duplex(1 << 12);
        let (writer, _output) = tokio::io::duplex(1 << 12);

        client
            .write_all(
                b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"slow\"}}\n",
            )
            .await
            .unwrap();

        let serving = tokio::spawn(async move { server.serve(server_input, writer).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        drop(client);
    }
}
