//! Awaitable confirmation requests.
//!
//! The workspace never shows dialogs itself. When it needs a yes/no answer
//! (discarding unsaved edits) it hands a [`ConfirmRequest`] to a [`Confirm`]
//! implementation and suspends until the front end answers.

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

/// A yes/no question for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
}

impl ConfirmRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// The unsaved-changes prompt for the buffer open on `key`.
    pub fn discard_changes(key: &str) -> Self {
        Self::new(
            "Unsaved changes",
            format!("{} has unsaved changes. Discard them?", key),
        )
    }
}

/// Answers confirmation requests. `true` means proceed.
pub trait Confirm: Send + Sync {
    fn confirm(&self, request: ConfirmRequest) -> BoxFuture<'_, bool>;
}

/// Fixed answer, for tests and non-interactive use.
#[derive(Clone, Copy, Debug)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, request: ConfirmRequest) -> BoxFuture<'_, bool> {
        log::debug!("auto-answering '{}': {}", request.title, self.0);
        futures::future::ready(self.0).boxed()
    }
}

/// A request waiting for the front end.
pub struct PendingConfirmation {
    pub request: ConfirmRequest,
    reply: oneshot::Sender<bool>,
}

impl PendingConfirmation {
    pub fn answer(self, accepted: bool) {
        let _ = self.reply.send(accepted);
    }
}

/// Forwards requests over a channel; the receiving side answers each one.
///
/// A request nobody answers (receiver gone, or the pending value dropped)
/// counts as declined.
#[derive(Clone)]
pub struct ChannelConfirm {
    tx: async_channel::Sender<PendingConfirmation>,
}

impl ChannelConfirm {
    pub fn new() -> (Self, async_channel::Receiver<PendingConfirmation>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl Confirm for ChannelConfirm {
    fn confirm(&self, request: ConfirmRequest) -> BoxFuture<'_, bool> {
        async move {
            let (reply, answer) = oneshot::channel();
            if self
                .tx
                .send(PendingConfirmation { request, reply })
                .await
                .is_err()
            {
                log::warn!("No one is listening for confirmations, declining");
                return false;
            }
            answer.await.unwrap_or(false)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_confirm_relays_answer() {
        let (confirm, rx) = ChannelConfirm::new();
        let responder = tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            assert_eq!(pending.request.title, "Unsaved changes");
            pending.answer(true);
        });
        assert!(confirm.confirm(ConfirmRequest::discard_changes("/a")).await);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_declines() {
        let (confirm, rx) = ChannelConfirm::new();
        drop(rx);
        assert!(!confirm.confirm(ConfirmRequest::discard_changes("/a")).await);
    }

    #[tokio::test]
    async fn unanswered_request_declines() {
        let (confirm, rx) = ChannelConfirm::new();
        let responder = tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            drop(pending);
        });
        assert!(!confirm.confirm(ConfirmRequest::new("t", "m")).await);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn auto_confirm_is_fixed() {
        assert!(AutoConfirm(true).confirm(ConfirmRequest::new("t", "m")).await);
        assert!(!AutoConfirm(false).confirm(ConfirmRequest::new("t", "m")).await);
    }
}
