//! Wire frames for the DevTools protocol.
//!
//! One JSON object per WebSocket text frame. The browser distinguishes
//! frame kinds structurally: responses carry `id`, events carry `method`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CallId, SessionId};
use crate::protocol::events::ProtocolEvent;

// ============================================================================
// Call
// ============================================================================

/// An outgoing protocol call.
///
/// # Format
///
/// ```json
/// {
///   "id": 17,
///   "method": "Page.navigate",
///   "params": { "url": "https://example.com" },
///   "sessionId": "8AE0..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Correlation id; the response echoes it back.
    pub id: CallId,

    /// Method in `Domain.method` format.
    pub method: String,

    /// Method parameters.
    pub params: Value,

    /// Session the call is addressed to; `None` targets the browser itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

// ============================================================================
// Response
// ============================================================================

/// Error object carried by a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    /// Protocol error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// A response to a [`Call`], matched by id.
#[derive(Debug, Clone)]
pub struct Response {
    /// Correlation id of the originating call.
    pub id: CallId,
    /// Result payload on success, error object on failure.
    pub outcome: StdResult,
}

type StdResult = std::result::Result<Value, RemoteError>;

impl Response {
    /// Converts the outcome into a crate result, attributing errors to
    /// `method`.
    pub fn into_result(self, method: &str) -> Result<Value> {
        self.outcome
            .map_err(|e| Error::remote(method, e.code, e.message))
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// An inbound event envelope.
///
/// Decoding to a typed shape is attempted per consumer; an envelope may
/// match zero or more shapes.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Session the event belongs to; `None` for browser-level events.
    pub session_id: Option<SessionId>,
    /// Event name in `Domain.event` format.
    pub method: String,
    /// Event payload.
    pub params: Value,
}

impl Envelope {
    /// Attempts to decode this envelope into the typed event `E`.
    ///
    /// Returns `None` if the method does not match or the payload does not
    /// have the expected shape.
    #[must_use]
    pub fn decode<E: ProtocolEvent>(&self) -> Option<E> {
        if self.method != E::METHOD {
            return None;
        }
        serde_json::from_value(self.params.clone()).ok()
    }

    /// Returns `true` if the envelope belongs to `session`.
    #[inline]
    #[must_use]
    pub fn is_for(&self, session: &SessionId) -> bool {
        self.session_id.as_ref() == Some(session)
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed inbound frame.
#[derive(Debug, Clone)]
pub enum Message {
    /// Response to an outstanding call.
    Response(Response),
    /// Event pushed by the browser.
    Event(Envelope),
}

/// Raw inbound frame before classification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    id: Option<CallId>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<RemoteError>,
    session_id: Option<SessionId>,
}

impl Message {
    /// Parses a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the text is not valid JSON or is
    /// neither a response nor an event.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: RawFrame =
            serde_json::from_str(text).map_err(|e| Error::decode(e.to_string()))?;

        if let Some(id) = frame.id {
            let outcome = match frame.error {
                Some(err) => Err(err),
                // Result-less success frames decode like empty objects.
                None => Ok(frame
                    .result
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new()))),
            };
            return Ok(Self::Response(Response { id, outcome }));
        }

        match frame.method {
            Some(method) => Ok(Self::Event(Envelope {
                session_id: frame.session_id,
                method,
                params: frame.params,
            })),
            None => Err(Error::decode("frame is neither response nor event")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::events::{PageFrameNavigated, TargetTargetDestroyed};

    #[test]
    fn test_call_serialization() {
        let call = Call {
            id: CallId(5),
            method: "Page.navigate".to_string(),
            params: serde_json::json!({ "url": "about:blank" }),
            session_id: Some(SessionId::from("S1")),
        };

        let json = serde_json::to_string(&call).expect("serialize");
        assert!(json.contains("\"id\":5"));
        assert!(json.contains("\"sessionId\":\"S1\""));
        assert!(json.contains("Page.navigate"));
    }

    #[test]
    fn test_call_without_session_omits_field() {
        let call = Call {
            id: CallId(1),
            method: "Target.getTargets".to_string(),
            params: serde_json::json!({}),
            session_id: None,
        };

        let json = serde_json::to_string(&call).expect("serialize");
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_parse_success_response() {
        let msg = Message::parse(r#"{"id":3,"result":{"frameId":"F1"}}"#).expect("parse");

        match msg {
            Message::Response(res) => {
                assert_eq!(res.id, CallId(3));
                let value = res.into_result("Page.navigate").expect("ok");
                assert_eq!(value["frameId"], "F1");
            }
            Message::Event(_) => panic!("expected response"),
        }
    }

    #[test]
    fn test_parse_error_response() {
        let msg = Message::parse(
            r#"{"id":9,"error":{"code":-32000,"message":"Not attached to an active page"}}"#,
        )
        .expect("parse");

        match msg {
            Message::Response(res) => {
                let err = res.into_result("Page.close").unwrap_err();
                assert!(err.is_not_attached());
            }
            Message::Event(_) => panic!("expected response"),
        }
    }

    #[test]
    fn test_parse_event() {
        let msg = Message::parse(
            r#"{"method":"Target.targetDestroyed","params":{"targetId":"T1"},"sessionId":"S1"}"#,
        )
        .expect("parse");

        match msg {
            Message::Event(envelope) => {
                assert_eq!(envelope.method, "Target.targetDestroyed");
                let event: TargetTargetDestroyed = envelope.decode().expect("decode");
                assert_eq!(event.target_id.as_str(), "T1");
            }
            Message::Response(_) => panic!("expected event"),
        }
    }

    #[test]
    fn test_decode_rejects_other_method() {
        let envelope = Envelope {
            session_id: None,
            method: "Target.targetDestroyed".to_string(),
            params: serde_json::json!({ "targetId": "T1" }),
        };

        assert!(envelope.decode::<PageFrameNavigated>().is_none());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(Message::parse("not json").is_err());
        assert!(Message::parse(r#"{"result":{}}"#).is_err());
    }
}
