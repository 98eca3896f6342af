use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{all_rows, first_row, SupabaseClient};

use crate::models::{Notification, NotificationError, Recipient};

/// Persistent inbox storage. Every operation is scoped to one recipient so a
/// caller can never touch someone else's notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError>;

    /// Newest first.
    async fn list_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationError>;

    async fn unread_count(&self, recipient: Recipient) -> Result<usize, NotificationError>;

    async fn mark_read(&self, recipient: Recipient, id: Uuid) -> Result<Notification, NotificationError>;

    async fn mark_all_read(&self, recipient: Recipient) -> Result<usize, NotificationError>;

    async fn delete(&self, recipient: Recipient, id: Uuid) -> Result<(), NotificationError>;

    async fn clear_read(&self, recipient: Recipient) -> Result<usize, NotificationError>;
}

pub struct SupabaseNotificationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn scoped_path(recipient: Recipient) -> String {
        format!(
            "/rest/v1/notifications?recipient_type=eq.{}&recipient_id=eq.{}",
            recipient.recipient_type, recipient.recipient_id
        )
    }
}

#[async_trait]
impl NotificationStore for SupabaseNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError> {
        let body = serde_json::to_value(&notification)
            .map_err(|e| NotificationError::ValidationError(e.to_string()))?;

        let rows = self.supabase
            .mutate_returning(Method::POST, "/rest/v1/notifications", Some(body))
            .await?;

        // Some PostgREST setups drop the representation on insert; the local copy is authoritative then.
        Ok(first_row(rows)?.unwrap_or(notification))
    }

    async fn list_for(&self, recipient: Recipient) -> Result<Vec<Notification>, NotificationError> {
        let path = format!("{}&order=created_at.desc", Self::scoped_path(recipient));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(all_rows(rows)?)
    }

    async fn unread_count(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let path = format!("{}&is_read=eq.false&select=id", Self::scoped_path(recipient));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.len())
    }

    async fn mark_read(&self, recipient: Recipient, id: Uuid) -> Result<Notification, NotificationError> {
        let path = format!("{}&id=eq.{}", Self::scoped_path(recipient), id);
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "is_read": true,
                "read_at": Utc::now().to_rfc3339(),
            })))
            .await?;

        first_row(rows)?.ok_or(NotificationError::NotFound)
    }

    async fn mark_all_read(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let path = format!("{}&is_read=eq.false", Self::scoped_path(recipient));
        let rows = self.supabase
            .mutate_returning(Method::PATCH, &path, Some(json!({
                "is_read": true,
                "read_at": Utc::now().to_rfc3339(),
            })))
            .await?;

        debug!("Marked {} notifications read for {} {}", rows.len(), recipient.recipient_type, recipient.recipient_id);
        Ok(rows.len())
    }

    async fn delete(&self, recipient: Recipient, id: Uuid) -> Result<(), NotificationError> {
        let path = format!("{}&id=eq.{}", Self::scoped_path(recipient), id);
        let rows = self.supabase.mutate_returning(Method::DELETE, &path, None).await?;

        if rows.is_empty() {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    async fn clear_read(&self, recipient: Recipient) -> Result<usize, NotificationError> {
        let path = format!("{}&is_read=eq.true", Self::scoped_path(recipient));
        let rows = self.supabase.mutate_returning(Method::DELETE, &path, None).await?;
        Ok(rows.len())
    }
}
