use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Top-level to embedded message. `content` present means "replace the whole
/// document", absent means "navigate in place".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMessage {
    pub pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FrameMessage {
    pub fn navigate(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            content: None,
        }
    }

    pub fn replace(pathname: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            content: Some(content.into()),
        }
    }

    pub fn replaces_document(&self) -> bool {
        self.content.is_some()
    }
}

/// Embedded to top-level request: navigate to `RouterEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentMessage {
    #[serde(rename = "RouterEvent")]
    pub router_event: String,
}

/// What the top-level page can do to the embedded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCommand {
    /// Overwrite the document directly (same-origin access, no message).
    Write { content: String },
    /// Deliver a message through the frame's message listener.
    Post(FrameMessage),
}

/// The embedded context's handle on its parent window.
#[derive(Debug, Clone)]
pub struct ParentPort {
    tx: mpsc::UnboundedSender<ParentMessage>,
}

impl ParentPort {
    pub fn new(tx: mpsc::UnboundedSender<ParentMessage>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ParentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Ask the parent to navigate to `path`.
    pub fn goto_route(&self, path: &str) {
        tracing::debug!(target: "frame", path = %path, "requesting parent navigation");
        let message = ParentMessage {
            router_event: path.to_string(),
        };
        if let Err(err) = self.tx.send(message) {
            tracing::warn!(target: "frame", error = %err, "parent window is gone");
        }
    }
}
