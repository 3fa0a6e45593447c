//! Input queue and shutdown flag shared by the two contexts.
//!
//! The display produces completed lines, the worker consumes them. This is
//! the only structure written by one context and read by the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Display-side producer of completed lines.
#[derive(Clone)]
pub struct InputSender {
    tx: mpsc::UnboundedSender<String>,
}

impl InputSender {
    /// Queue a line; `false` once the worker has gone away.
    pub fn submit(&self, line: impl Into<String>) -> bool {
        self.tx.send(line.into()).is_ok()
    }
}

/// Worker-side consumer.
pub struct InputQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Line(String),
    /// Nothing arrived within the timeout
    Idle,
    /// Every sender is gone
    Closed,
}

impl InputQueue {
    pub async fn poll(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(line)) => Polled::Line(line),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Idle,
        }
    }
}

pub fn queue() -> (InputSender, InputQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InputSender { tx }, InputQueue { rx })
}

/// Cooperative shutdown signal, flipped by exit keywords, Ctrl-C or a lost display.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_arrive_in_order() {
        let (tx, mut rx) = queue();
        assert!(tx.submit("first"));
        assert!(tx.submit(String::from("second")));

        let timeout = Duration::from_millis(50);
        assert_eq!(rx.poll(timeout).await, Polled::Line("first".into()));
        assert_eq!(rx.poll(timeout).await, Polled::Line("second".into()));
        assert_eq!(rx.poll(timeout).await, Polled::Idle);
    }

    #[tokio::test]
    async fn test_closed_when_senders_dropped() {
        let (tx, mut rx) = queue();
        let tx2 = tx.clone();
        tx2.submit("late");
        drop(tx);
        drop(tx2);

        let timeout = Duration::from_millis(50);
        assert_eq!(rx.poll(timeout).await, Polled::Line("late".into()));
        assert_eq!(rx.poll(timeout).await, Polled::Closed);
    }

    #[test]
    fn test_submit_after_worker_gone() {
        let (tx, rx) = queue();
        drop(rx);
        assert!(!tx.submit("nobody listens"));
    }

    #[test]
    fn test_shutdown_flag_is_shared() {
        let flag = ShutdownFlag::new();
        let other = flag.clone();
        assert!(!other.is_triggered());
        flag.trigger();
        assert!(other.is_triggered());
    }
}
