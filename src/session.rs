//! Session registry and per-page event dispatch.
//!
//! The registry maps attached sessions to their targets. For each page a
//! dispatcher task filters the connection's event stream down to
//! envelopes whose session matches and republishes them to the page
//! broker.
//!
//! The dispatcher also watches the two termination signals,
//! `Target.targetDestroyed` for the page's target and
//! `Target.detachedFromTarget` for its session, and cancels the page
//! scope on either. That cancellation is the authoritative page-end
//! signal: every suspended operation rooted on the page completes with
//! [`Error::Cancelled`](crate::Error::Cancelled).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::broker::Broker;
use crate::identifiers::{SessionId, TargetId};
use crate::protocol::Envelope;
use crate::protocol::events::{TargetDetachedFromTarget, TargetTargetDestroyed};
use crate::scope::Scope;
use crate::transport::Connection;

// ============================================================================
// SessionRegistry
// ============================================================================

/// Tracks which sessions are attached and to which targets.
#[derive(Default)]
pub(crate) struct SessionRegistry {
    entries: Mutex<FxHashMap<SessionId, TargetId>>,
}

impl SessionRegistry {
    /// Records an attachment.
    pub(crate) fn register(&self, session: SessionId, target: TargetId) {
        self.entries.lock().insert(session, target);
    }

    /// Removes an attachment.
    pub(crate) fn unregister(&self, session: &SessionId) {
        self.entries.lock().remove(session);
    }

    /// Target a session is attached to, if still live.
    pub(crate) fn target_of(&self, session: &SessionId) -> Option<TargetId> {
        self.entries.lock().get(session).cloned()
    }

    /// Number of live attachments.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Spawns the dispatcher task for one page.
///
/// The task subscribes to the connection under the page scope, so page
/// cancellation tears it down; conversely the task cancels the page scope
/// when it observes a termination signal or end-of-stream.
pub(crate) fn spawn_dispatcher(
    connection: &Connection,
    registry: Arc<SessionRegistry>,
    scope: Scope,
    session_id: SessionId,
    target_id: TargetId,
    page_events: Broker<Envelope>,
) {
    let mut sub = connection.events(&scope);

    tokio::spawn(async move {
        loop {
            match sub.recv().await {
                Ok(Some(envelope)) => {
                    if is_termination(&envelope, &session_id, &target_id) {
                        debug!(
                            session = %session_id,
                            target = %target_id,
                            "session ended by browser",
                        );
                        scope.cancel();
                        break;
                    }

                    if envelope.is_for(&session_id) {
                        page_events.publish(envelope);
                    }
                }

                // Transport closed: fatal to every page.
                Ok(None) => {
                    scope.cancel();
                    break;
                }

                // Page scope cancelled elsewhere.
                Err(_) => break,
            }
        }

        page_events.close();
        registry.unregister(&session_id);
    });
}

/// Checks the two authoritative end-of-page signals.
fn is_termination(envelope: &Envelope, session: &SessionId, target: &TargetId) -> bool {
    if let Some(detached) = envelope.decode::<TargetDetachedFromTarget>()
        && detached.session_id == *session
    {
        return true;
    }

    if let Some(destroyed) = envelope.decode::<TargetTargetDestroyed>()
        && destroyed.target_id == *target
    {
        return true;
    }

    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> (Connection, crate::transport::pipe::Pipe, Arc<SessionRegistry>) {
        let (conn, pipe) = Connection::pipe();
        (conn, pipe, Arc::new(SessionRegistry::default()))
    }

    #[tokio::test]
    async fn test_dispatcher_filters_by_session() {
        let (conn, pipe, registry) = setup();
        let scope = Scope::root();
        let page_events = Broker::new();

        registry.register(SessionId::from("S1"), TargetId::from("T1"));
        spawn_dispatcher(
            &conn,
            Arc::clone(&registry),
            scope.clone(),
            SessionId::from("S1"),
            TargetId::from("T1"),
            page_events.clone(),
        );

        let mut sub = page_events.subscribe(&scope);

        pipe.event(Some(&SessionId::from("S2")), "Page.lifecycleEvent", json!({
            "frameId": "F2", "name": "load"
        }));
        pipe.event(Some(&SessionId::from("S1")), "Page.lifecycleEvent", json!({
            "frameId": "F1", "name": "load"
        }));

        let envelope = sub.recv().await.expect("recv").expect("open");
        assert!(envelope.is_for(&SessionId::from("S1")));
    }

    #[tokio::test]
    async fn test_target_destroyed_cancels_scope() {
        let (conn, pipe, registry) = setup();
        let scope = Scope::root();
        let page_events = Broker::new();

        registry.register(SessionId::from("S1"), TargetId::from("T1"));
        spawn_dispatcher(
            &conn,
            Arc::clone(&registry),
            scope.clone(),
            SessionId::from("S1"),
            TargetId::from("T1"),
            page_events.clone(),
        );

        pipe.event(None, "Target.targetDestroyed", json!({ "targetId": "T1" }));

        scope.cancelled().await;
        assert!(scope.is_cancelled());

        // Registry entry is gone once the dispatcher unwinds.
        tokio::task::yield_now().await;
        assert_eq!(registry.target_of(&SessionId::from("S1")), None);
    }

    #[tokio::test]
    async fn test_detached_from_target_cancels_scope() {
        let (conn, pipe, _registry) = setup();
        let scope = Scope::root();

        spawn_dispatcher(
            &conn,
            Arc::new(SessionRegistry::default()),
            scope.clone(),
            SessionId::from("S1"),
            TargetId::from("T1"),
            Broker::new(),
        );

        pipe.event(None, "Target.detachedFromTarget", json!({
            "sessionId": "S1", "targetId": "T1"
        }));

        scope.cancelled().await;
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_destroyed_other_target_is_ignored() {
        let (conn, pipe, _registry) = setup();
        let scope = Scope::root();
        let page_events = Broker::new();

        spawn_dispatcher(
            &conn,
            Arc::new(SessionRegistry::default()),
            scope.clone(),
            SessionId::from("S1"),
            TargetId::from("T1"),
            page_events.clone(),
        );

        let mut sub = page_events.subscribe(&scope);

        pipe.event(None, "Target.targetDestroyed", json!({ "targetId": "OTHER" }));
        pipe.event(Some(&SessionId::from("S1")), "Page.lifecycleEvent", json!({
            "frameId": "F1", "name": "load"
        }));

        // The later event still flows: the dispatcher did not stop.
        let envelope = sub.recv().await.expect("recv").expect("open");
        assert_eq!(envelope.method, "Page.lifecycleEvent");
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_transport_close_cancels_scope() {
        let (conn, pipe, _registry) = setup();
        let scope = Scope::root();

        spawn_dispatcher(
            &conn,
            Arc::new(SessionRegistry::default()),
            scope.clone(),
            SessionId::from("S1"),
            TargetId::from("T1"),
            Broker::new(),
        );

        pipe.close();
        scope.cancelled().await;
        assert!(scope.is_cancelled());
    }
}
