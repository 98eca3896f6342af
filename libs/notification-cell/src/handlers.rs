use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use directory_cell::ParticipantDirectory;
use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_utils::extractor::{ValidJson, ValidPath};

use crate::models::{DeviceTokenRequest, Recipient};
use crate::services::NotificationStore;

pub struct NotificationState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn NotificationStore>,
    pub directory: Arc<dyn ParticipantDirectory>,
}

// ==============================================================================
// INBOX HANDLERS
// ==============================================================================

pub async fn list_notifications(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    let notifications = state.store.list_for(recipient).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(json!({
        "success": true,
        "message": "Notifications retrieved",
        "notifications": notifications,
        "total": notifications.len(),
        "unread_count": unread_count,
    })))
}

pub async fn unread_count(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    let count = state.store.unread_count(recipient).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Unread count retrieved",
        "unread_count": count,
    })))
}

pub async fn mark_read(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(notification_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    let notification = state.store.mark_read(recipient, notification_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification marked as read",
        "notification": notification,
    })))
}

pub async fn mark_all_read(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    let updated = state.store.mark_all_read(recipient).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} notifications marked as read", updated),
        "updated": updated,
    })))
}

pub async fn delete_notification(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
    ValidPath(notification_id): ValidPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    state.store.delete(recipient, notification_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Notification deleted",
    })))
}

pub async fn clear_read(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let recipient = Recipient::for_principal(&principal)?;
    let deleted = state.store.clear_read(recipient).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} read notifications cleared", deleted),
        "deleted": deleted,
    })))
}

// ==============================================================================
// DEVICE REGISTRATION
// ==============================================================================

pub async fn register_device_token(
    State(state): State<Arc<NotificationState>>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<DeviceTokenRequest>,
) -> Result<Json<Value>, AppError> {
    let token = request.device_token.trim();
    if token.is_empty() {
        return Err(AppError::ValidationError("device_token is required".to_string()));
    }

    state.directory
        .set_device_token(principal.role, principal.id, token)
        .await?;

    info!("Registered device token for {} {}", principal.role, principal.id);

    Ok(Json(json!({
        "success": true,
        "message": "Device token registered",
    })))
}
