//! Canonical events to wire-format SSE.
//!
//! A pump task reads the run and writes encoded records into a bounded
//! channel that backs the response body. When the client goes away the
//! receiver is dropped; the pump then aborts the run and writes nothing more.
use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use gateway_harness::{ErrorCode, HarnessError, RunStream, StreamError, StreamEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// Encoded records buffered between the pump and the socket.
const BODY_BUFFER: usize = 8;

type BodyChunk = Result<Bytes, Infallible>;

/// `id: ..\nevent: ..\ndata: ..\n\n`; `done` carries the literal `[DONE]`.
pub fn encode_event(event: &StreamEvent) -> String {
    let data = match event {
        StreamEvent::Done { .. } => "[DONE]".to_string(),
        _ => event.data().unwrap_or_default().to_string(),
    };
    format!(
        "id: {}\nevent: {}\ndata: {}\n\n",
        event.event_id(),
        event.kind(),
        data
    )
}

/// Terminal `error` event for a failure raised after headers were sent.
fn failure_event(request_id: uuid::Uuid, err: HarnessError) -> StreamEvent {
    let error = match err {
        HarnessError::Provider(error) => error,
        other => StreamError::new(ErrorCode::ProviderApiError, other.to_string()),
    };
    StreamEvent::Error {
        event_id: format!("{}-failure", request_id.simple()),
        error,
    }
}

/// Wraps a started run in a streaming response with SSE headers.
pub fn sse_response(run: RunStream, cors_origin: &str) -> Response {
    let (rx, _pump) = spawn_pump(run);
    let allow_origin =
        HeaderValue::from_str(cors_origin).unwrap_or_else(|_| HeaderValue::from_static("*"));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin)
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

pub(crate) fn spawn_pump(run: RunStream) -> (mpsc::Receiver<BodyChunk>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(BODY_BUFFER);
    let pump = tokio::spawn(pump(run, tx));
    (rx, pump)
}

async fn pump(mut run: RunStream, tx: mpsc::Sender<BodyChunk>) {
    let request_id = run.request_id();
    let abort = run.abort_handle();
    loop {
        let item = tokio::select! {
            biased;
            _ = tx.closed() => {
                info!(request_id = %request_id, "client disconnected; cancelling stream");
                abort.abort();
                return;
            }
            item = run.next_event() => item,
        };
        let Some(item) = item else {
            return;
        };
        let event = match item {
            Ok(event) => event,
            Err(err) => failure_event(request_id, err),
        };
        let terminal = event.is_terminal();
        debug!(request_id = %request_id, event_id = %event.event_id(), kind = event.kind(), "writing sse record");
        if tx.send(Ok(Bytes::from(encode_event(&event)))).await.is_err() {
            info!(request_id = %request_id, "client disconnected; dropping remaining events");
            abort.abort();
            return;
        }
        if terminal {
            return;
        }
    }
}
