//! In-memory transport double for tests.
//!
//! A [`Pipe`] replaces the WebSocket: outgoing calls surface as parsed
//! [`Outgoing`] records, inbound frames are injected as JSON. The
//! connection's correlation and fan-out paths are exercised unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::broker::Broker;
use crate::identifiers::{CallId, SessionId};
use crate::protocol::Envelope;
use crate::transport::connection::{Connection, ConnectionCommand, CorrelationMap};

// ============================================================================
// Outgoing
// ============================================================================

/// One call observed on the wire.
#[derive(Debug, Clone)]
pub(crate) struct Outgoing {
    pub id: CallId,
    pub method: String,
    pub session_id: Option<SessionId>,
    pub params: Value,
}

impl Outgoing {
    fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Some(Self {
            id: CallId(value.get("id")?.as_u64()?),
            method: value.get("method")?.as_str()?.to_string(),
            session_id: value
                .get("sessionId")
                .and_then(Value::as_str)
                .map(SessionId::from),
            params: value.get("params").cloned().unwrap_or(Value::Null),
        })
    }
}

// ============================================================================
// Pipe
// ============================================================================

enum PipeFrame {
    Text(String),
    Close,
}

/// Manual test transport: the test drives both directions explicitly.
pub(crate) struct Pipe {
    outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    inbound_tx: mpsc::UnboundedSender<PipeFrame>,
}

impl Pipe {
    /// Spawns the in-memory event loop and returns the test half.
    pub(crate) fn spawn(
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        events: Broker<Envelope>,
    ) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<PipeFrame>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Some(outgoing) = Outgoing::parse(&text) {
                                let _ = outgoing_tx.send(outgoing);
                            }
                        }
                        Some(ConnectionCommand::Shutdown) | None => break,
                    },

                    frame = inbound_rx.recv() => match frame {
                        Some(PipeFrame::Text(text)) => {
                            Connection::handle_incoming(&text, &correlation, &events);
                        }
                        Some(PipeFrame::Close) | None => break,
                    },
                }
            }

            Connection::fail_pending(&correlation, &events);
        });

        Self {
            outgoing_rx,
            inbound_tx,
        }
    }

    /// Receives the next outgoing call.
    pub(crate) async fn recv(&mut self) -> Option<Outgoing> {
        self.outgoing_rx.recv().await
    }

    /// Injects a raw inbound frame.
    pub(crate) fn inject(&self, text: String) {
        let _ = self.inbound_tx.send(PipeFrame::Text(text));
    }

    /// Answers a call with a success result.
    pub(crate) fn respond(&self, id: CallId, result: Value) {
        self.inject(json!({ "id": id.0, "result": result }).to_string());
    }

    /// Answers a call with a protocol error.
    pub(crate) fn respond_err(&self, id: CallId, code: i64, message: &str) {
        self.inject(
            json!({ "id": id.0, "error": { "code": code, "message": message } }).to_string(),
        );
    }

    /// Injects an event envelope.
    pub(crate) fn event(&self, session: Option<&SessionId>, method: &str, params: Value) {
        let mut frame = json!({ "method": method, "params": params });
        if let Some(session) = session {
            frame["sessionId"] = json!(session.as_str());
        }
        self.inject(frame.to_string());
    }

    /// Simulates a transport close.
    pub(crate) fn close(&self) {
        let _ = self.inbound_tx.send(PipeFrame::Close);
    }

    /// Converts into an auto-responding pipe with a custom responder.
    ///
    /// Every observed call is appended to the returned log before the
    /// reply is injected; `AutoReply::Ignore` leaves the call pending.
    pub(crate) fn auto_with<F>(mut self, responder: F) -> AutoPipe
    where
        F: Fn(&Outgoing) -> AutoReply + Send + 'static,
    {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let inbound_tx = self.inbound_tx.clone();

        let task_log = Arc::clone(&log);
        let task_tx = self.inbound_tx.clone();
        tokio::spawn(async move {
            while let Some(outgoing) = self.outgoing_rx.recv().await {
                let reply = responder(&outgoing);
                task_log.lock().push(outgoing.clone());

                let frame = match reply {
                    AutoReply::Result(result) => {
                        json!({ "id": outgoing.id.0, "result": result })
                    }
                    AutoReply::Error { code, message } => {
                        json!({ "id": outgoing.id.0, "error": { "code": code, "message": message } })
                    }
                    AutoReply::Ignore => continue,
                };
                let _ = task_tx.send(PipeFrame::Text(frame.to_string()));
            }
        });

        AutoPipe { log, inbound_tx }
    }
}

// ============================================================================
// AutoPipe
// ============================================================================

/// How the auto-responder answers one call.
pub(crate) enum AutoReply {
    Result(Value),
    Error { code: i64, message: String },
    Ignore,
}

type CallLog = Arc<Mutex<Vec<Outgoing>>>;

/// Auto-responding test transport: calls are answered by the responder,
/// the test injects events and inspects the call log.
pub(crate) struct AutoPipe {
    log: CallLog,
    inbound_tx: mpsc::UnboundedSender<PipeFrame>,
}

impl AutoPipe {
    /// Injects an event envelope.
    pub(crate) fn event(&self, session: Option<&SessionId>, method: &str, params: Value) {
        let mut frame = json!({ "method": method, "params": params });
        if let Some(session) = session {
            frame["sessionId"] = json!(session.as_str());
        }
        let _ = self.inbound_tx.send(PipeFrame::Text(frame.to_string()));
    }

    /// Simulates a transport close.
    pub(crate) fn close(&self) {
        let _ = self.inbound_tx.send(PipeFrame::Close);
    }

    /// Calls matching `method`, in order.
    pub(crate) fn calls_of(&self, method: &str) -> Vec<Outgoing> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Waits until at least `n` calls of `method` were observed.
    pub(crate) async fn wait_for_calls(&self, method: &str, n: usize) -> Vec<Outgoing> {
        loop {
            let matching = self.calls_of(method);
            if matching.len() >= n {
                return matching;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Waits for the first call of `method`.
    pub(crate) async fn wait_for_call(&self, method: &str) -> Outgoing {
        self.wait_for_calls(method, 1).await.remove(0)
    }
}
