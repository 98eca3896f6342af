use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use directory_cell::ParticipantDirectory;

use crate::models::{
    Notification, NotificationDraft, NotificationError, NotificationEvent, PushMessage, PushOutcome,
};
use crate::services::push::PushProvider;
use crate::services::store::NotificationStore;
use crate::services::templates;

/// Persists notifications and fans out device pushes.
///
/// The inbox write is the contract: if storing fails the dispatch fails.
/// Push delivery is attempted afterwards and its failures are only logged.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn ParticipantDirectory>,
    push: Arc<dyn PushProvider>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn ParticipantDirectory>,
        push: Arc<dyn PushProvider>,
    ) -> Self {
        Self { store, directory, push }
    }

    /// Renders the event for each audience and dispatches every draft.
    /// Returns how many notifications were stored.
    pub async fn dispatch_event(&self, event: &NotificationEvent) -> Result<usize, NotificationError> {
        let mut stored = 0;
        for draft in templates::render(event) {
            stored += self.dispatch(&draft).await?.len();
        }
        debug!("Dispatched {} notifications for {}", stored, event.name());
        Ok(stored)
    }

    pub async fn dispatch(&self, draft: &NotificationDraft) -> Result<Vec<Notification>, NotificationError> {
        let now = Utc::now();
        let mut persisted = Vec::with_capacity(draft.recipients.len());

        for recipient in &draft.recipients {
            let notification = self.store.insert(draft.to_notification(*recipient, now)).await?;
            persisted.push(notification);
        }

        join_all(persisted.iter().map(|n| self.deliver_push(n))).await;

        Ok(persisted)
    }

    async fn deliver_push(&self, notification: &Notification) {
        let token = match self.directory
            .device_token(notification.recipient_type.into(), notification.recipient_id)
            .await
        {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No device token for {} {}", notification.recipient_type, notification.recipient_id);
                return;
            }
            Err(e) => {
                warn!("Device token lookup failed for {} {}: {}",
                      notification.recipient_type, notification.recipient_id, e);
                return;
            }
        };

        let message = PushMessage {
            device_token: token,
            title: notification.title.clone(),
            body: notification.message.clone(),
            data: notification.data.clone(),
        };

        match self.push.send(&message).await {
            PushOutcome::Delivered => info!("Push delivered for notification {}", notification.id),
            PushOutcome::Failed(reason) => {
                warn!("Push failed for notification {}: {}", notification.id, reason)
            }
        }
    }
}
