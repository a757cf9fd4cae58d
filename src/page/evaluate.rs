//! JavaScript evaluation and the execution context handle.
//!
//! Evaluation is a thin wrapper over `Runtime.callFunctionOn` with the
//! realm's `window` object as receiver. The context handle is resolved
//! lazily and cleared on every navigation; helper functions are injected
//! once per context and cached in the shared helpers map.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::RemoteObjectId;
use crate::protocol::methods::{
    CallArgument, RemoteObject, RuntimeCallFunctionOn, RuntimeEvaluate, RuntimeReleaseObject,
};

use super::Page;
use super::element::Element;

// ============================================================================
// Eval
// ============================================================================

/// Options for one evaluation.
///
/// `js` must be a function declaration; arguments are passed by value.
///
/// # Example
///
/// ```ignore
/// let res = page
///     .evaluate(&Eval::new("(a, b) => a + b").arg(1).arg(2))
///     .await?;
/// assert_eq!(res.value, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Eval {
    pub(crate) js: String,
    pub(crate) args: Vec<Value>,
    pub(crate) by_value: bool,
    pub(crate) await_promise: bool,
    pub(crate) user_gesture: bool,
}

impl Eval {
    /// Creates evaluation options for a function declaration.
    #[must_use]
    pub fn new(js: impl Into<String>) -> Self {
        Self {
            js: js.into(),
            args: Vec::new(),
            by_value: true,
            await_promise: false,
            user_gesture: false,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, value: impl serde::Serialize) -> Self {
        self.args
            .push(serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    /// Returns the result as a remote object reference instead of by
    /// value.
    #[must_use]
    pub fn by_object(mut self) -> Self {
        self.by_value = false;
        self
    }

    /// Awaits a returned promise before resolving.
    #[must_use]
    pub fn by_promise(mut self) -> Self {
        self.await_promise = true;
        self
    }

    /// Marks the evaluation as user-initiated. Required for APIs gated on
    /// user activation, such as `location.reload()`.
    #[must_use]
    pub fn by_user(mut self) -> Self {
        self.user_gesture = true;
        self
    }

    fn arguments(&self) -> Option<Vec<CallArgument>> {
        if self.args.is_empty() {
            return None;
        }
        Some(
            self.args
                .iter()
                .map(|v| CallArgument {
                    value: Some(v.clone()),
                    object_id: None,
                })
                .collect(),
        )
    }
}

// ============================================================================
// Page - Evaluation
// ============================================================================

impl Page {
    /// Evaluates a function declaration, returning its result by value.
    ///
    /// Promises are awaited.
    pub async fn eval(&self, js: &str) -> Result<RemoteObject> {
        self.evaluate(&Eval::new(js).by_promise()).await
    }

    /// Evaluates with explicit options.
    ///
    /// A stale execution context (destroyed by a navigation that raced
    /// this call) resets the context handle and retries; the scope bounds
    /// the retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] when the evaluation throws.
    pub async fn evaluate(&self, opts: &Eval) -> Result<RemoteObject> {
        loop {
            self.scope.check()?;

            let ctx = self.js_context().await?;
            let result = self
                .call(&RuntimeCallFunctionOn {
                    function_declaration: opts.js.clone(),
                    object_id: Some(ctx),
                    arguments: opts.arguments(),
                    return_by_value: Some(opts.by_value),
                    await_promise: Some(opts.await_promise),
                    user_gesture: opts.user_gesture.then_some(true),
                })
                .await;

            let result = match result {
                Err(e) if is_stale_context(&e) => {
                    trace!("stale execution context, retrying");
                    self.reset_js_context().await;
                    continue;
                }
                other => other?,
            };

            if let Some(exception) = result.exception_details {
                return Err(Error::script(exception.message()));
            }
            return Ok(result.result);
        }
    }

    /// Evaluates a cached helper function with arguments.
    ///
    /// The helper is injected once per execution context; later calls
    /// reuse the remote function object.
    pub(crate) async fn call_helper(
        &self,
        name: &'static str,
        source: &str,
        args: Vec<Value>,
    ) -> Result<RemoteObject> {
        let helper = self.helper(name, source).await?;

        let result = self
            .call(&RuntimeCallFunctionOn {
                function_declaration: "function(...args) { return this(...args) }".to_string(),
                object_id: Some(helper),
                arguments: Some(
                    args.into_iter()
                        .map(|v| CallArgument {
                            value: Some(v),
                            object_id: None,
                        })
                        .collect(),
                ),
                return_by_value: Some(true),
                await_promise: Some(true),
                user_gesture: None,
            })
            .await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::script(exception.message()));
        }
        Ok(result.result)
    }

    /// Resolves (injecting if needed) a helper in the current context.
    async fn helper(&self, name: &'static str, source: &str) -> Result<RemoteObjectId> {
        let ctx = self.js_context().await?;

        {
            let helpers = self.helpers.lock().await;
            if let Some(id) = helpers.get(&ctx).and_then(|m| m.get(name)) {
                return Ok(id.clone());
            }
        }

        let result = self
            .call(&RuntimeCallFunctionOn {
                function_declaration: format!("function() {{ return ({source}) }}"),
                object_id: Some(ctx.clone()),
                arguments: None,
                return_by_value: Some(false),
                await_promise: None,
                user_gesture: None,
            })
            .await?;

        let id = result
            .result
            .object_id
            .ok_or_else(|| Error::protocol(format!("helper {name} injection returned no object")))?;

        self.helpers
            .lock()
            .await
            .entry(ctx)
            .or_default()
            .insert(name, id.clone());

        trace!(helper = name, "injected helper");
        Ok(id)
    }
}

// ============================================================================
// Page - Context Handle
// ============================================================================

impl Page {
    /// The current execution context's `window` object id, resolved
    /// lazily.
    pub(crate) async fn js_context(&self) -> Result<RemoteObjectId> {
        let mut slot = self.js_ctx.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let id = match &self.host_element {
            // An iframe view resolves the window of its host's realm.
            Some(host) => self.window_of(host.object_id()).await?,
            None => {
                let result = self
                    .call(&RuntimeEvaluate {
                        expression: "window".to_string(),
                        object_group: None,
                        return_by_value: Some(false),
                        await_promise: None,
                    })
                    .await?;
                result
                    .result
                    .object_id
                    .ok_or_else(|| Error::protocol("window has no object id"))?
            }
        };

        *slot = Some(id.clone());
        Ok(id)
    }

    /// Clears the context handle through the root slot, dropping cached
    /// helpers of the abandoned context. The next evaluation
    /// re-initializes it.
    pub(crate) async fn unset_js_context(&self) {
        let mut slot = self.root_js_ctx.lock().await;
        if let Some(old) = slot.take() {
            self.helpers.lock().await.remove(&old);
        }
    }

    /// Clears this handle's own context slot, which for an iframe-pinned
    /// clone differs from the root's.
    pub(crate) async fn reset_js_context(&self) {
        let mut slot = self.js_ctx.lock().await;
        if let Some(old) = slot.take() {
            self.helpers.lock().await.remove(&old);
        }
    }

    /// The `window` of the realm a remote object lives in.
    pub(crate) async fn window_of(&self, object_id: &RemoteObjectId) -> Result<RemoteObjectId> {
        let result = self
            .call(&RuntimeCallFunctionOn {
                function_declaration: "function() { return window }".to_string(),
                object_id: Some(object_id.clone()),
                arguments: None,
                return_by_value: Some(false),
                await_promise: None,
                user_gesture: None,
            })
            .await?;

        result
            .result
            .object_id
            .ok_or_else(|| Error::protocol("realm window has no object id"))
    }

    /// An alias addressing the root frame's context, regardless of any
    /// iframe pinning on this handle.
    pub(crate) fn root_view(&self) -> Page {
        let mut page = self.clone();
        page.js_ctx = Arc::clone(&self.root_js_ctx);
        page.host_element = None;
        page
    }
}

// ============================================================================
// Page - Remote Objects
// ============================================================================

impl Page {
    /// Creates an element handle from a remote object.
    ///
    /// When the object lives in a different execution context than this
    /// page's current one (an iframe boundary), the element binds to a
    /// clone of the page whose context slot points at the object's realm,
    /// so helper injection follows the element.
    pub async fn element_from_object(&self, object: RemoteObject) -> Result<Element> {
        let object_id = object
            .object_id
            .clone()
            .ok_or_else(|| Error::protocol("element object has no object id"))?;

        let object_window = self.window_of(&object_id).await?;
        let page_window = self.js_context().await?;

        let page = if object_window == page_window {
            self.clone()
        } else {
            let mut clone = self.clone();
            clone.js_ctx = Arc::new(AsyncMutex::new(Some(object_window)));
            clone
        };

        Ok(Element::new(page, object))
    }

    /// Serializes a remote object to JSON, dereferencing it when held by
    /// reference.
    pub async fn object_to_json(&self, object: &RemoteObject) -> Result<Value> {
        let Some(object_id) = object.object_id.clone() else {
            return Ok(object.value.clone());
        };

        let result = self
            .call(&RuntimeCallFunctionOn {
                function_declaration: "function() { return this }".to_string(),
                object_id: Some(object_id),
                arguments: None,
                return_by_value: Some(true),
                await_promise: None,
                user_gesture: None,
            })
            .await?;
        Ok(result.result.value)
    }

    /// Releases a remote object reference held by the browser.
    pub async fn release_object(&self, object: &RemoteObject) -> Result<()> {
        if let Some(object_id) = object.object_id.clone() {
            self.call(&RuntimeReleaseObject { object_id }).await?;
        }
        Ok(())
    }
}

/// Remote errors meaning the execution context is gone, observed when a
/// navigation races an evaluation.
fn is_stale_context(err: &Error) -> bool {
    matches!(
        err,
        Error::Remote { message, .. }
            if message.contains("Cannot find context")
                || message.contains("Execution context was destroyed")
                || message.contains("Could not find object with given id")
    )
}

// ============================================================================
// Tests
// ============================================================================
