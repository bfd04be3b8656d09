//! In-process transport: two crossed unbounded channels of generic
//! values.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Notify;

use osprey_session::Transport;
use osprey_wire::{Message, TransportError, Value};

/// Close state shared by both halves of a pair: closing either side
/// tears the whole link down, like a TCP connection.
struct Link {
    closed: AtomicBool,
    notify: Notify,
}

impl Link {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn wait_closed(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

/// One endpoint of an in-memory transport pair.
pub struct MemTransport {
    tx: mpsc::UnboundedSender<Value>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
    link: Arc<Link>,
}

/// Create a connected transport pair.
pub fn pair() -> (MemTransport, MemTransport) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let link = Arc::new(Link {
        closed: AtomicBool::new(false),
        notify: Notify::new(),
    });
    (
        MemTransport {
            tx: a_tx,
            rx: tokio::sync::Mutex::new(b_rx),
            link: link.clone(),
        },
        MemTransport {
            tx: b_tx,
            rx: tokio::sync::Mutex::new(a_rx),
            link,
        },
    )
}

impl MemTransport {
    /// Deliver a raw, unclassified frame to the peer. Lets tests
    /// inject malformed traffic below the message layer.
    pub fn send_raw(&self, frame: Value) -> Result<(), TransportError> {
        if self.link.is_closed() {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.link.is_closed()
    }
}

impl Transport for MemTransport {
    fn send(
        &self,
        message: Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let result = self.send_raw(message.into_value());
        async move { result }
    }

    fn recv(&self) -> impl Future<Output = Result<Value, TransportError>> + Send {
        async move {
            let mut rx = self.rx.lock().await;
            tokio::select! {
                _ = self.link.wait_closed() => Err(TransportError::Closed),
                frame = rx.recv() => frame.ok_or(TransportError::Closed),
            }
        }
    }

    fn close(&self) {
        self.link.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frames_cross_the_pair() {
        let (a, b) = pair();
        a.send(Message::Notify {
            method: "ping".into(),
            args: vec![json!(1)],
        })
        .await
        .unwrap();
        let frame = b.recv().await.unwrap();
        assert_eq!(frame, json!([2, "ping", [1]]));
    }

    #[tokio::test]
    async fn close_fails_both_sides() {
        let (a, b) = pair();
        a.close();
        assert!(matches!(b.recv().await, Err(TransportError::Closed)));
        assert!(matches!(
            b.send(Message::Notify {
                method: "m".into(),
                args: vec![],
            })
            .await,
            Err(TransportError::Closed)
        ));
        // Idempotent.
        a.close();
        b.close();
    }

    #[tokio::test]
    async fn raw_injection_bypasses_classification() {
        let (a, b) = pair();
        a.send_raw(json!("garbage")).unwrap();
        assert_eq!(b.recv().await.unwrap(), json!("garbage"));
    }
}
