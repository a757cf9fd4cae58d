//! WebSocket connection and event loop.
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the browser (responses, events)
//! - Outgoing calls from the Rust API
//! - Call/response correlation by monotonic id
//! - Event publication to the connection broker
//!
//! # Cancellation
//!
//! Cancelling a caller's scope detaches its waiter; it never cancels the
//! remote work. The late reply is discarded when it arrives. A transport
//! close is fatal: every pending call fails with
//! [`Error::ConnectionClosed`] and the event broker closes, which ends
//! every page's event stream.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, trace, warn};

use crate::broker::{Broker, Subscription};
use crate::error::{Error, Result};
use crate::identifiers::{CallId, SessionId};
use crate::protocol::methods::Command;
use crate::protocol::{Call, Envelope, Message, Response};
use crate::scope::Scope;

// ============================================================================
// Types
// ============================================================================

/// Map of call ids to response channels.
///
/// Dropping a sender fails the waiter with [`Error::ConnectionClosed`].
pub(crate) type CorrelationMap = FxHashMap<CallId, oneshot::Sender<Response>>;

/// Internal commands for the event loop.
pub(crate) enum ConnectionCommand {
    /// Send a serialized frame.
    Send(String),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Connection to a browser's DevTools endpoint.
///
/// `Connection` is `Send + Sync` and cheap to clone; all clones share the
/// event loop and correlation state.
pub struct Connection {
    /// Channel into the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Pending calls awaiting a response.
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Fan-out of inbound event envelopes.
    events: Broker<Envelope>,
    /// Next call id.
    next_id: Arc<AtomicU64>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            events: self.events.clone(),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl Connection {
    /// Connects to a DevTools WebSocket endpoint
    /// (`ws://127.0.0.1:9222/devtools/browser/<id>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the WebSocket handshake fails.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        debug!(url = %ws_url, "DevTools WebSocket connected");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation: Arc<Mutex<CorrelationMap>> = Arc::new(Mutex::new(FxHashMap::default()));
        let events = Broker::new();

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            events.clone(),
        ));

        Ok(Self {
            command_tx,
            correlation,
            events,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Creates a connection backed by in-memory channels instead of a
    /// WebSocket. The returned halves inject inbound frames and observe
    /// outgoing calls.
    #[cfg(test)]
    pub(crate) fn pipe() -> (Self, super::pipe::Pipe) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation: Arc<Mutex<CorrelationMap>> = Arc::new(Mutex::new(FxHashMap::default()));
        let events = Broker::new();

        let pipe = super::pipe::Pipe::spawn(command_rx, Arc::clone(&correlation), events.clone());

        (
            Self {
                command_tx,
                correlation,
                events,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            pipe,
        )
    }

    /// Issues a raw call and waits for the matching response.
    ///
    /// `session` of `None` addresses the browser itself.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `scope` ends first (the waiter detaches,
    ///   remote work continues)
    /// - [`Error::Remote`] if the browser reports an error
    /// - [`Error::ConnectionClosed`] if the transport closed
    pub async fn call(
        &self,
        scope: &Scope,
        session: Option<&SessionId>,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        scope.check()?;

        let id = CallId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let (tx, rx) = oneshot::channel();
        self.correlation.lock().insert(id, tx);

        let call = Call {
            id,
            method: method.to_string(),
            params,
            session_id: session.cloned(),
        };
        let text = match serde_json::to_string(&call) {
            Ok(t) => t,
            Err(e) => {
                self.correlation.lock().remove(&id);
                return Err(Error::Json(e));
            }
        };

        if self
            .command_tx
            .send(ConnectionCommand::Send(text))
            .is_err()
        {
            self.correlation.lock().remove(&id);
            return Err(Error::ConnectionClosed);
        }

        trace!(%id, method, session = ?session.map(SessionId::as_str), "call sent");

        tokio::select! {
            _ = scope.cancelled() => {
                // Detach the waiter; the reply is discarded on arrival.
                self.correlation.lock().remove(&id);
                Err(Error::Cancelled)
            }
            response = rx => match response {
                Ok(response) => response.into_result(method),
                Err(_) => Err(Error::ConnectionClosed),
            }
        }
    }

    /// Issues a typed command and decodes its result.
    pub async fn execute<C: Command>(
        &self,
        scope: &Scope,
        session: Option<&SessionId>,
        cmd: &C,
    ) -> Result<C::Result> {
        let params = serde_json::to_value(cmd)?;
        let value = self.call(scope, session, C::METHOD, params).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::decode(format!("{}: {e}", C::METHOD)))
    }

    /// Subscribes to the inbound event stream under `scope`.
    ///
    /// Subscribing is synchronous: events arriving after this call returns
    /// are observed. This is the first half of every two-step wait.
    #[must_use]
    pub fn events(&self, scope: &Scope) -> Subscription<Envelope> {
        self.events.subscribe(scope)
    }

    /// Returns the number of calls awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Shuts down the connection.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop handling WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: tokio_tungstenite::WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        events: Broker<Envelope>,
    ) where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            Self::handle_incoming(&text, &correlation, &events);
                        }

                        Some(Ok(WsMessage::Close(_))) => {
                            debug!("WebSocket closed by browser");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Binary, Ping, Pong are handled by tungstenite.
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                                error!(error = %e, "WebSocket write failed");
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending(&correlation, &events);
        debug!("Connection event loop terminated");
    }

    /// Routes one inbound frame to its waiter or to the event broker.
    pub(crate) fn handle_incoming(
        text: &str,
        correlation: &Mutex<CorrelationMap>,
        events: &Broker<Envelope>,
    ) {
        match Message::parse(text) {
            Ok(Message::Response(response)) => {
                let tx = correlation.lock().remove(&response.id);

                match tx {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    // Detached waiter (cancelled call) or unknown id.
                    None => trace!(id = %response.id, "reply discarded"),
                }
            }

            Ok(Message::Event(envelope)) => {
                trace!(
                    method = %envelope.method,
                    session = ?envelope.session_id.as_ref().map(SessionId::as_str),
                    "event",
                );
                events.publish(envelope);
            }

            Err(e) => {
                warn!(error = %e, text, "failed to parse inbound frame");
            }
        }
    }

    /// Fails every pending call and ends the event stream.
    pub(crate) fn fail_pending(correlation: &Mutex<CorrelationMap>, events: &Broker<Envelope>) {
        let count = {
            let mut map = correlation.lock();
            let count = map.len();
            // Dropping the senders fails each waiter with ConnectionClosed.
            map.clear();
            count
        };

        events.close();

        if count > 0 {
            debug!(count, "failed pending calls on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
