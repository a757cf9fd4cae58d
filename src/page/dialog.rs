//! JavaScript dialogs and the file chooser.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use crate::error::Result;
use crate::protocol::events::{PageFileChooserOpened, PageJavascriptDialogOpening};
use crate::protocol::methods::{
    DomSetFileInputFiles, PageEnable, PageHandleJavaScriptDialog,
    PageSetInterceptFileChooserDialog,
};

use super::Page;
use super::core::DomainGuard;

// ============================================================================
// DialogHandle
// ============================================================================

/// Responder for a JavaScript dialog.
///
/// Holds the `Page` domain acquisition for the duration; answering
/// restores it.
pub struct DialogHandle {
    page: Page,
    guard: DomainGuard,
}

impl DialogHandle {
    /// Accepts or dismisses the dialog. `prompt_text` fills a `prompt`
    /// dialog when accepting.
    pub async fn answer(self, accept: bool, prompt_text: &str) -> Result<()> {
        let result = self
            .page
            .call(&PageHandleJavaScriptDialog {
                accept,
                prompt_text: (!prompt_text.is_empty()).then(|| prompt_text.to_string()),
            })
            .await;

        self.guard.release().await;
        result.map(drop)
    }
}

// ============================================================================
// Page - Dialogs
// ============================================================================

impl Page {
    /// Prepares handling of the next JavaScript dialog (alert, confirm,
    /// prompt or beforeunload).
    ///
    /// Returns `(wait, handle)`: `wait` resolves with the opening event,
    /// `handle` answers it. A modal dialog blocks page JS, so trigger the
    /// dialog from another task:
    ///
    /// ```ignore
    /// let (wait, handle) = page.handle_dialog().await?;
    /// tokio::spawn({ let page = page.clone(); async move {
    ///     let _ = page.eval("() => alert('hi')").await;
    /// }});
    /// let dialog = wait.await?;
    /// handle.answer(true, "").await?;
    /// ```
    pub async fn handle_dialog(
        &self,
    ) -> Result<(
        impl Future<Output = Result<PageJavascriptDialogOpening>> + use<>,
        DialogHandle,
    )> {
        let guard = self.enable_domain(&PageEnable {}, "Page.disable").await?;
        let wait = self.wait_event::<PageJavascriptDialogOpening>();

        Ok((
            wait,
            DialogHandle {
                page: self.clone(),
                guard,
            },
        ))
    }

    /// Intercepts the next file chooser dialog.
    ///
    /// The returned [`FileChooser`] waits for the chooser to open, then
    /// assigns files to its input element and restores interception.
    pub async fn handle_file_dialog(&self) -> Result<FileChooser> {
        self.call(&PageSetInterceptFileChooserDialog { enabled: true })
            .await?;

        let wait = self.wait_event::<PageFileChooserOpened>();

        Ok(FileChooser {
            page: self.clone(),
            wait: Box::pin(wait),
        })
    }
}

// ============================================================================
// FileChooser
// ============================================================================

/// Pending file chooser interception.
pub struct FileChooser {
    page: Page,
    wait: Pin<Box<dyn Future<Output = Result<PageFileChooserOpened>> + Send>>,
}

impl FileChooser {
    /// Waits for the chooser to open and assigns `paths` to its input
    /// element. Relative paths are made absolute; the browser rejects
    /// relative file paths.
    pub async fn set_files(self, paths: &[&str]) -> Result<()> {
        let opened = self.wait.await?;

        self.page
            .call(&PageSetInterceptFileChooserDialog { enabled: false })
            .await?;

        self.page
            .call(&DomSetFileInputFiles {
                files: paths.iter().map(|p| absolute(p)).collect(),
                backend_node_id: opened.backend_node_id,
                object_id: None,
            })
            .await?;
        Ok(())
    }
}

fn absolute(path: &str) -> String {
    std::path::absolute(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::core::tests::stub_page;
    use super::*;

    use serde_json::json;

    use crate::identifiers::SessionId;

    fn session() -> SessionId {
        SessionId::from("S1")
    }

    #[tokio::test]
    async fn test_handle_dialog_round_trip() {
        let (page, auto) = stub_page().await;

        let (wait, handle) = page.handle_dialog().await.expect("arm");

        auto.event(Some(&session()), "Page.javascriptDialogOpening", json!({
            "url": "about:blank",
            "message": "sure?",
            "type": "confirm",
            "hasBrowserHandler": false
        }));

        let dialog = wait.await.expect("dialog");
        assert_eq!(dialog.message, "sure?");
        assert_eq!(dialog.kind, "confirm");

        handle.answer(true, "").await.expect("answer");

        let answered = auto.wait_for_call("Page.handleJavaScriptDialog").await;
        assert_eq!(answered.params["accept"], true);

        // The attachment still holds the Page domain; restore must not
        // disable it.
        assert!(auto.calls_of("Page.disable").is_empty());
    }

    #[tokio::test]
    async fn test_file_chooser_intercept_cycle() {
        let (page, auto) = stub_page().await;

        let chooser = page.handle_file_dialog().await.expect("arm");

        let enabled = auto
            .wait_for_call("Page.setInterceptFileChooserDialog")
            .await;
        assert_eq!(enabled.params["enabled"], true);

        auto.event(Some(&session()), "Page.fileChooserOpened", json!({
            "frameId": "T1",
            "mode": "selectSingle",
            "backendNodeId": 42
        }));

        chooser.set_files(&["upload.txt"]).await.expect("set files");

        let toggles = auto
            .wait_for_calls("Page.setInterceptFileChooserDialog", 2)
            .await;
        assert_eq!(toggles[1].params["enabled"], false);

        let set = auto.wait_for_call("DOM.setFileInputFiles").await;
        assert_eq!(set.params["backendNodeId"], 42);
        let file = set.params["files"][0].as_str().expect("file");
        assert!(file.ends_with("upload.txt"));
        assert!(std::path::Path::new(file).is_absolute());
    }
}
