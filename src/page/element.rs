//! Remote element handles.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use crate::error::{Error, Result};
use crate::identifiers::RemoteObjectId;
use crate::protocol::methods::{
    CallArgument, DomDescribeNode, DomGetContentQuads, DomScrollIntoViewIfNeeded, MouseButton,
    NodeDescription, Point, Rect, RemoteObject, RuntimeCallFunctionOn,
};

use super::Page;
use super::evaluate::Eval;

// ============================================================================
// Element
// ============================================================================

/// Handle to a DOM element held as a remote object.
///
/// The element is bound to the page (or page clone) whose execution
/// context it lives in; see
/// [`Page::element_from_object`].
#[derive(Clone)]
pub struct Element {
    page: Page,
    id: RemoteObjectId,
    object: RemoteObject,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("object_id", &self.id)
            .field("description", &self.object.description)
            .finish_non_exhaustive()
    }
}

impl Element {
    pub(crate) fn new(page: Page, object: RemoteObject) -> Self {
        let id = object.object_id.clone().unwrap_or_default();
        Self { page, id, object }
    }

    /// The page this element is bound to.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The element's remote object id.
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> &RemoteObjectId {
        &self.id
    }

    /// The underlying remote object.
    #[inline]
    #[must_use]
    pub fn object(&self) -> &RemoteObject {
        &self.object
    }
}

// ============================================================================
// Element - Evaluation
// ============================================================================

impl Element {
    /// Evaluates a function declaration with this element as `this`.
    pub async fn eval_on(&self, opts: &Eval) -> Result<RemoteObject> {
        let result = self
            .page
            .call(&RuntimeCallFunctionOn {
                function_declaration: opts.js.clone(),
                object_id: Some(self.id.clone()),
                arguments: Some(
                    opts.args
                        .iter()
                        .map(|v| CallArgument {
                            value: Some(v.clone()),
                            object_id: None,
                        })
                        .collect(),
                ),
                return_by_value: Some(opts.by_value),
                await_promise: Some(opts.await_promise),
                user_gesture: opts.user_gesture.then_some(true),
            })
            .await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::script(exception.message()));
        }
        Ok(result.result)
    }

    /// The element's visible text.
    pub async fn text(&self) -> Result<String> {
        let res = self
            .eval_on(&Eval::new(
                "function() { return this.innerText !== undefined ? this.innerText : this.textContent }",
            ))
            .await?;
        Ok(res.value.as_str().unwrap_or_default().to_string())
    }

    /// The element's outer HTML.
    pub async fn html(&self) -> Result<String> {
        let res = self
            .eval_on(&Eval::new("function() { return this.outerHTML }"))
            .await?;
        Ok(res.value.as_str().unwrap_or_default().to_string())
    }

    /// Focuses the element.
    pub async fn focus(&self) -> Result<()> {
        self.eval_on(&Eval::new("function() { this.focus() }"))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Element - Geometry & Interaction
// ============================================================================

impl Element {
    /// Describes the element's DOM node.
    pub async fn describe(&self) -> Result<NodeDescription> {
        let res = self
            .page
            .call(&DomDescribeNode {
                object_id: Some(self.id.clone()),
                depth: None,
            })
            .await?;
        Ok(res.node)
    }

    /// A page handle addressing this element's content document.
    ///
    /// The element must be an `<iframe>`. The returned page shares the
    /// session and devices but addresses the iframe's browsing context
    /// and resolves its execution context through this element.
    pub async fn frame(&self) -> Result<Page> {
        let node = self.describe().await?;
        let frame_id = node
            .frame_id
            .ok_or_else(|| Error::protocol("element has no content frame"))?;

        let mut page = self.page.clone();
        page.frame_id = frame_id;
        page.js_ctx = Arc::new(AsyncMutex::new(None));
        page.host_element = Some(Arc::new(self.clone()));
        Ok(page)
    }

    /// Scrolls the element into view if needed.
    pub async fn scroll_into_view(&self) -> Result<()> {
        self.page
            .call(&DomScrollIntoViewIfNeeded {
                object_id: Some(self.id.clone()),
            })
            .await?;
        Ok(())
    }

    /// The element's bounding box: the smallest axis-aligned rectangle
    /// enclosing all of its content quads.
    ///
    /// Useful for layout and visibility checks independent of clicking.
    ///
    /// # Errors
    ///
    /// Fails when the element has no visible box.
    pub async fn bounding_box(&self) -> Result<Rect> {
        let quads = self.content_quads().await?;

        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for quad in &quads {
            for point in quad.chunks_exact(2) {
                min.x = min.x.min(point[0]);
                min.y = min.y.min(point[1]);
                max.x = max.x.max(point[0]);
                max.y = max.y.max(point[1]);
            }
        }

        Ok(Rect {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        })
    }

    /// The center of the element's first content quad.
    ///
    /// # Errors
    ///
    /// Fails when the element has no visible box.
    pub async fn click_point(&self) -> Result<Point> {
        let quads = self.content_quads().await?;
        let quad = &quads[0];

        Ok(Point::new(
            (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0,
            (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0,
        ))
    }

    /// The element's content quads, filtered to well-formed ones.
    async fn content_quads(&self) -> Result<Vec<Vec<f64>>> {
        let res = self
            .page
            .call(&DomGetContentQuads {
                object_id: Some(self.id.clone()),
            })
            .await?;

        let quads: Vec<Vec<f64>> = res.quads.into_iter().filter(|q| q.len() == 8).collect();
        if quads.is_empty() {
            return Err(Error::protocol("element has no visible content quad"));
        }
        Ok(quads)
    }

    /// Scrolls the element into view and clicks its center.
    pub async fn click(&self, button: MouseButton, click_count: u32) -> Result<()> {
        self.scroll_into_view().await?;
        let point = self.click_point().await?;

        let mouse = self.page.mouse();
        mouse.move_to(point).await?;
        mouse.click(button, click_count).await
    }

    /// Releases the element's remote object.
    pub async fn release(&self) -> Result<()> {
        self.page.release_object(&self.object).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::core::tests::stub_page_with;
    use super::*;

    use serde_json::json;

    use crate::transport::pipe::AutoReply;

    async fn stub_element() -> (Element, crate::transport::pipe::AutoPipe) {
        let (page, auto) = stub_page_with(|call| match call.method.as_str() {
            "Runtime.callFunctionOn" => {
                let decl = call.params["functionDeclaration"].as_str().unwrap_or("");
                if decl.contains("innerText") {
                    AutoReply::Result(json!({
                        "result": { "type": "string", "value": "Submit" }
                    }))
                } else {
                    AutoReply::Result(json!({ "result": { "type": "undefined" } }))
                }
            }
            "DOM.getContentQuads" => AutoReply::Result(json!({
                "quads": [[10.0, 20.0, 30.0, 20.0, 30.0, 40.0, 10.0, 40.0]]
            })),
            "DOM.describeNode" => AutoReply::Result(json!({
                "node": { "nodeName": "IFRAME", "backendNodeId": 7, "frameId": "F2" }
            })),
            _ => AutoReply::Result(json!({})),
        })
        .await;

        let element = Element::new(
            page,
            RemoteObject {
                kind: "object".into(),
                object_id: Some(RemoteObjectId::from("EL1")),
                subtype: Some("node".into()),
                ..Default::default()
            },
        );
        (element, auto)
    }

    #[tokio::test]
    async fn test_text_targets_element_receiver() {
        let (element, auto) = stub_element().await;

        let text = element.text().await.expect("text");
        assert_eq!(text, "Submit");

        let call = auto.wait_for_call("Runtime.callFunctionOn").await;
        assert_eq!(call.params["objectId"], "EL1");
    }

    #[tokio::test]
    async fn test_click_point_is_quad_center() {
        let (element, _auto) = stub_element().await;

        let point = element.click_point().await.expect("point");
        assert_eq!(point, Point::new(20.0, 30.0));
    }

    #[tokio::test]
    async fn test_bounding_box_encloses_quads() {
        let (element, _auto) = stub_element().await;

        let rect = element.bounding_box().await.expect("box");
        assert_eq!(
            rect,
            Rect {
                x: 10.0,
                y: 20.0,
                width: 20.0,
                height: 20.0
            }
        );
    }

    #[tokio::test]
    async fn test_frame_view_addresses_content_frame() {
        let (element, _auto) = stub_element().await;

        let frame = element.frame().await.expect("frame");
        assert_eq!(frame.frame_id().as_str(), "F2");
        assert!(frame.is_iframe());
        assert!(frame.js_ctx.lock().await.is_none());

        // Devices stay shared with the host page.
        assert!(Arc::ptr_eq(&frame.devices, &element.page().devices));
    }
}
