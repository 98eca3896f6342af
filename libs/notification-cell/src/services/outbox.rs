use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::models::NotificationEvent;
use crate::services::dispatcher::NotificationDispatcher;

/// Producer half of the notification outbox. Cloned into every service that
/// emits events; enqueueing never blocks and never fails the caller.
#[derive(Clone)]
pub struct NotificationOutbox {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl NotificationOutbox {
    pub fn channel(dispatcher: Arc<NotificationDispatcher>) -> (Self, OutboxWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, OutboxWorker { receiver, dispatcher })
    }

    pub fn enqueue(&self, event: NotificationEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            warn!("Notification outbox closed, dropping {} event", name);
        }
    }
}

/// Consumer half. Dispatches events one at a time in arrival order.
pub struct OutboxWorker {
    receiver: mpsc::UnboundedReceiver<NotificationEvent>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl OutboxWorker {
    /// Runs until every producer is dropped or shutdown is signalled. Events
    /// already queued at shutdown are still dispatched.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Notification outbox worker started");

        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(event) => self.process(event).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let drained = self.drain_pending().await;
                        info!("Shutdown signal received, drained {} pending events", drained);
                        break;
                    }
                }
            }
        }

        info!("Notification outbox worker stopped");
    }

    /// Dispatches whatever is queued right now and returns the count.
    pub async fn drain_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.process(event).await;
            processed += 1;
        }
        processed
    }

    #[instrument(skip(self, event), fields(event = %event.name()))]
    async fn process(&self, event: NotificationEvent) {
        match self.dispatcher.dispatch_event(&event).await {
            Ok(count) => debug!("Stored {} notifications", count),
            Err(e) => error!("Failed to dispatch {} notifications for appointment {}: {}",
                             event.name(), event.appointment().appointment_id, e),
        }
    }
}
