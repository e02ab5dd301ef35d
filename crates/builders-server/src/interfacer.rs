//! A player reached over a WebSocket.
//!
//! Prompts go out on the connection's outgoing channel. The answer comes back
//! as a `Respond` message, which fulfills the single pending promise.

use crate::protocol::ServerMessage;
use async_trait::async_trait;
use builders_core::{InputError, UserInterfacer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

pub struct SocketInterfacer {
    player_id: Uuid,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    response: Mutex<Option<oneshot::Sender<String>>>,
    closed: AtomicBool,
}

impl SocketInterfacer {
    pub fn new(player_id: Uuid, outgoing: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            player_id,
            outgoing,
            response: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Answer the pending prompt. Returns false if nothing was waiting.
    pub fn fulfill(&self, text: String) -> bool {
        let pending = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match pending {
            Some(tx) => tx.send(text).is_ok(),
            None => false,
        }
    }

    /// The connection is gone. Fails the pending prompt and any future ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let dropped = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if dropped.is_some() {
            debug!(player_id = %self.player_id, "Failed pending prompt on close");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn arm(&self) -> Result<oneshot::Receiver<String>, InputError> {
        let mut slot = self.response.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_closed() {
            return Err(InputError::ChannelClosed);
        }
        // A sender whose receiver is gone belongs to a wait that was abandoned
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(InputError::AlreadyPending);
        }

        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }
}

#[async_trait]
impl UserInterfacer for SocketInterfacer {
    fn send(&self, message: &str) {
        let _ = self.outgoing.send(ServerMessage::Message {
            text: message.to_string(),
        });
    }

    async fn request_input(&self, dialog: &str) -> Result<String, InputError> {
        let rx = self.arm()?;

        self.outgoing
            .send(ServerMessage::Prompt {
                text: dialog.to_string(),
            })
            .map_err(|_| InputError::ChannelClosed)?;

        rx.await.map_err(|_| InputError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfacer() -> (SocketInterfacer, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SocketInterfacer::new(Uuid::new_v4(), tx), rx)
    }

    #[tokio::test]
    async fn test_prompt_is_fulfilled_by_response() {
        let (socket, mut outgoing) = interfacer();

        let (answer, _) = tokio::join!(socket.request_input("pick"), async {
            let prompt = outgoing.recv().await;
            assert!(matches!(prompt, Some(ServerMessage::Prompt { ref text }) if text == "pick"));
            assert!(socket.fulfill("3".into()));
        });

        assert_eq!(answer, Ok("3".to_string()));
    }

    #[tokio::test]
    async fn test_close_fails_pending_prompt() {
        let (socket, mut outgoing) = interfacer();

        let (answer, _) = tokio::join!(socket.request_input("pick"), async {
            outgoing.recv().await;
            socket.close();
        });

        assert_eq!(answer, Err(InputError::ChannelClosed));
        assert_eq!(
            socket.request_input("again").await,
            Err(InputError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_second_request_while_pending_is_rejected() {
        let (socket, mut outgoing) = interfacer();

        let (first, second) = tokio::join!(socket.request_input("one"), async {
            outgoing.recv().await;
            let second = socket.request_input("two").await;
            socket.fulfill("0".into());
            second
        });

        assert_eq!(first, Ok("0".to_string()));
        assert_eq!(second, Err(InputError::AlreadyPending));
    }

    #[test]
    fn test_fulfill_without_prompt() {
        let (socket, _outgoing) = interfacer();
        assert!(!socket.fulfill("1".into()));
    }

    #[tokio::test]
    async fn test_abandoned_prompt_can_be_replaced() {
        let (socket, mut outgoing) = interfacer();

        {
            let abandoned = socket.request_input("first");
            tokio::pin!(abandoned);
            // Poll once so the prompt is armed, then drop the wait
            assert!(futures_util::poll!(abandoned.as_mut()).is_pending());
        }
        outgoing.recv().await;

        let (answer, _) = tokio::join!(socket.request_input("second"), async {
            outgoing.recv().await;
            socket.fulfill("4".into());
        });
        assert_eq!(answer, Ok("4".to_string()));
    }
}
