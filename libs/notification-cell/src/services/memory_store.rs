use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Notification, NotificationError, Recipient};
use crate::services::store::NotificationStore;

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification regardless of recipient, oldest first.
    pub async fn all(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError> {
        self.rows.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationError> {
        let rows = self.rows.read().await;
        let mut owned: Vec<Notification> = rows.iter()
            .filter(|n| n.recipient() == recipient)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn unread_count(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|n| n.recipient() == recipient && !n.is_read).count())
    }

    async fn mark_read(&self, recipient: Recipient, id: Uuid) -> Result<Notification, NotificationError> {
        let mut rows = self.rows.write().await;
        let row = rows.iter_mut()
            .find(|n| n.id == id && n.recipient() == recipient)
            .ok_or(NotificationError::NotFound)?;

        if !row.is_read {
            row.is_read = true;
            row.read_at = Some(Utc::now());
        }
        Ok(row.clone())
    }

    async fn mark_all_read(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let now = Utc::now();
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows.iter_mut().filter(|n| n.recipient() == recipient && !n.is_read) {
            row.is_read = true;
            row.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, recipient: Recipient, id: Uuid) -> Result<(), NotificationError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|n| !(n.id == id && n.recipient() == recipient));

        if rows.len() == before {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    async fn clear_read(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|n| !(n.is_read && n.recipient() == recipient));
        Ok(before - rows.len())
    }
}
