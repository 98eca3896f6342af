use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use directory_cell::{MemoryDirectory, ParticipantDirectory, UserProfile};
use notification_cell::{
    notification_routes, MemoryNotificationStore, Notification, NotificationKind, NotificationState,
    NotificationStore, RecipientType,
};
use shared_models::auth::Role;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct Harness {
    app: Router,
    store: Arc<MemoryNotificationStore>,
    directory: Arc<MemoryDirectory>,
    config: TestConfig,
}

fn harness() -> Harness {
    let config = TestConfig::default();
    let store = Arc::new(MemoryNotificationStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let state = Arc::new(NotificationState {
        config: Arc::new(config.to_memory_config()),
        store: store.clone(),
        directory: directory.clone(),
    });

    Harness { app: notification_routes(state), store, directory, config }
}

fn notification_for(user: &TestUser, read: bool) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        recipient_type: RecipientType::User,
        recipient_id: user.id,
        title: "Appointment Confirmed".to_string(),
        message: "See you soon".to_string(),
        kind: NotificationKind::AppointmentConfirmed,
        icon: None,
        link: None,
        is_read: read,
        read_at: if read { Some(Utc::now()) } else { None },
        data: json!({}),
        created_at: Utc::now(),
    }
}

async fn send(h: &Harness, user: &TestUser, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer(user, &h.config.jwt_secret))
        .header("Content-Type", "application/json");
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn inbox_requires_authentication() {
    let h = harness();
    let response = h.app.clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unread_count_and_mark_all_read() {
    let h = harness();
    let user = TestUser::patient("asha@example.com");
    h.store.insert(notification_for(&user, false)).await.unwrap();
    h.store.insert(notification_for(&user, false)).await.unwrap();
    h.store.insert(notification_for(&TestUser::patient("other@example.com"), false)).await.unwrap();

    let (status, body) = send(&h, &user, "GET", "/unread-count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 2);

    let (_, body) = send(&h, &user, "PUT", "/read-all", None).await;
    assert_eq!(body["updated"], 2);

    let (_, body) = send(&h, &user, "GET", "/unread-count", None).await;
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn cannot_touch_another_recipients_notification() {
    let h = harness();
    let owner = TestUser::patient("owner@example.com");
    let intruder = TestUser::patient("intruder@example.com");
    let notification = h.store.insert(notification_for(&owner, false)).await.unwrap();

    let (status, body) = send(&h, &intruder, "PUT", &format!("/{}/read", notification.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&h, &intruder, "DELETE", &format!("/{}", notification.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h, &owner, "PUT", &format!("/{}/read", notification.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["is_read"], true);
}

#[tokio::test]
async fn clear_read_keeps_unread() {
    let h = harness();
    let user = TestUser::patient("asha@example.com");
    h.store.insert(notification_for(&user, true)).await.unwrap();
    h.store.insert(notification_for(&user, false)).await.unwrap();

    let (_, body) = send(&h, &user, "DELETE", "/clear-read", None).await;
    assert_eq!(body["deleted"], 1);

    let (_, body) = send(&h, &user, "GET", "/", None).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn device_token_registration() {
    let h = harness();
    let user = TestUser::patient("asha@example.com");
    h.directory.insert_user(UserProfile {
        id: user.id,
        name: "Asha".to_string(),
        email: None,
        phone: None,
        device_token: None,
    }).await;

    let (status, _) = send(&h, &user, "PUT", "/device-token", Some(json!({ "device_token": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h, &user, "PUT", "/device-token", Some(json!({ "device_token": "fcm-123" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.directory.device_token(Role::User, user.id).await.unwrap().as_deref(), Some("fcm-123"));

    let admin = TestUser::admin("root@example.com");
    let (status, _) = send(&h, &admin, "GET", "/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
