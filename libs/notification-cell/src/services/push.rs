use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{PushMessage, PushOutcome};

/// Delivers a single device push. Failures are reported in the outcome and
/// never raised; push is best-effort.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, message: &PushMessage) -> PushOutcome;
}

/// Firebase Cloud Messaging over the legacy HTTP endpoint.
/// POST {base_url}/fcm/send
pub struct FcmPushProvider {
    client: Client,
    base_url: String,
    server_key: String,
}

impl FcmPushProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.push_api_url.trim_end_matches('/').to_string(),
            server_key: config.push_server_key.clone(),
        }
    }

    fn payload(message: &PushMessage) -> Value {
        json!({
            "to": message.device_token,
            "priority": "high",
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
        })
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    async fn send(&self, message: &PushMessage) -> PushOutcome {
        let url = format!("{}/fcm/send", self.base_url);
        debug!("Sending push to {}", url);

        let response = match self.client
            .post(&url)
            .header("Authorization", format!("key={}", self.server_key))
            .header("Content-Type", "application/json")
            .json(&Self::payload(message))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return PushOutcome::Failed(e.to_string()),
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            warn!("Push provider rejected request: {} - {}", status, body);
            return PushOutcome::Failed(format!("HTTP {}", status));
        }

        // FCM answers 200 even for per-token failures.
        if body["failure"].as_u64().unwrap_or(0) > 0 {
            let reason = body["results"][0]["error"].as_str().unwrap_or("unknown").to_string();
            return PushOutcome::Failed(reason);
        }

        PushOutcome::Delivered
    }
}

/// Used when no push credentials are configured. Notifications still land in
/// the inbox.
pub struct DisabledPushProvider;

#[async_trait]
impl PushProvider for DisabledPushProvider {
    async fn send(&self, _message: &PushMessage) -> PushOutcome {
        PushOutcome::Failed("push delivery not configured".to_string())
    }
}
