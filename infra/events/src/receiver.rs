use crate::bus::BusEvent;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// An extension trait for tap receivers to provide a more ergonomic API.
pub trait EventReceiverExt {
    /// Receive the next event, returning `None` when the bus is gone.
    ///
    /// A lagging receiver skips the overwritten events and continues from the oldest
    /// one still buffered.
    fn recv_event(&mut self) -> impl Future<Output = Option<Arc<BusEvent>>> + Send;

    /// Receive the next event named `name`, discarding others.
    fn recv_named<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Future<Output = Option<Arc<BusEvent>>> + Send + 'a
    where
        Self: Send,
    {
        async move {
            loop {
                let event = self.recv_event().await?;
                if event.name == name {
                    return Some(event);
                }
            }
        }
    }
}

impl EventReceiverExt for broadcast::Receiver<Arc<BusEvent>> {
    async fn recv_event(&mut self) -> Option<Arc<BusEvent>> {
        let mut skipped = 0u64;

        loop {
            match self.recv().await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(
                            event = %event.name,
                            skipped = skipped,
                            "Bus tap lagged; continuing from latest message"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(skipped = n, total_skipped = skipped, "Bus tap lagged; accumulating skipped events");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
