use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub push_api_url: String,
    pub push_server_key: String,
    pub clinic_utc_offset_minutes: i32,
    pub reminder_sweep_interval_seconds: u64,
    pub daily_reminder_time: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_backend: parse_or_default("STORAGE_BACKEND", StorageBackend::Supabase),
            push_api_url: env::var("PUSH_API_URL")
                .unwrap_or_else(|_| {
                    warn!("PUSH_API_URL not set, using default");
                    "https://fcm.googleapis.com".to_string()
                }),
            push_server_key: env::var("PUSH_SERVER_KEY")
                .unwrap_or_else(|_| {
                    warn!("PUSH_SERVER_KEY not set, push delivery disabled");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_or_default("CLINIC_UTC_OFFSET_MINUTES", 0),
            reminder_sweep_interval_seconds: parse_or_default("REMINDER_SWEEP_INTERVAL_SECONDS", 60),
            daily_reminder_time: env::var("DAILY_REMINDER_TIME")
                .unwrap_or_else(|_| {
                    warn!("DAILY_REMINDER_TIME not set, using default");
                    "09:00".to_string()
                }),
            server_port: parse_or_default("SERVER_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        match self.storage_backend {
            StorageBackend::Memory => !self.supabase_jwt_secret.is_empty(),
            StorageBackend::Supabase => {
                !self.supabase_url.is_empty()
                    && !self.supabase_service_key.is_empty()
                    && !self.supabase_jwt_secret.is_empty()
            }
        }
    }

    pub fn is_push_configured(&self) -> bool {
        !self.push_api_url.is_empty() && !self.push_server_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            supabase_jwt_secret: String::new(),
            storage_backend: StorageBackend::Supabase,
            push_api_url: "https://fcm.googleapis.com".to_string(),
            push_server_key: String::new(),
            clinic_utc_offset_minutes: 0,
            reminder_sweep_interval_seconds: 60,
            daily_reminder_time: "09:00".to_string(),
            server_port: 3000,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {:?}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {:?}", key, default);
            default
        }
    }
}
