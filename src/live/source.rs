use async_trait::async_trait;
use futures::Stream;

use crate::prelude::Pin;
use crate::Result;

/// Stream of raw text frames from a push endpoint
pub type PushStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Transport behind the live update channel
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Connects to `endpoint` and yields every frame the server pushes.
    /// The stream ends when the server closes the connection.
    async fn connect(&self, endpoint: &str) -> Result<PushStream>;
}

/// Push source fed from memory, for tests and local replay
#[derive(Clone, Default)]
pub struct MemoryPushSource {
    inner: std::sync::Arc<std::sync::Mutex<Vec<futures::channel::mpsc::UnboundedReceiver<String>>>>,
}

impl MemoryPushSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a connection; each `connect` call takes the oldest queued one.
    /// Frames sent on the returned sender are delivered to that connection.
    pub fn queue_connection(&self) -> futures::channel::mpsc::UnboundedSender<String> {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        if let Ok(mut pending) = self.inner.lock() {
            pending.push(rx);
        }
        tx
    }

    pub fn pending_connections(&self) -> usize {
        self.inner.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PushSource for MemoryPushSource {
    async fn connect(&self, endpoint: &str) -> Result<PushStream> {
        use futures::StreamExt;

        let next = self
            .inner
            .lock()
            .ok()
            .and_then(|mut pending| (!pending.is_empty()).then(|| pending.remove(0)));
        match next {
            Some(rx) => Ok(Box::pin(rx.map(Ok))),
            None => Err(crate::MapError::Channel(format!(
                "no connection available for {}",
                endpoint
            ))),
        }
    }
}
