use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use appointment_cell::{
    AppointmentBookingService, AppointmentLifecycleService, AppointmentStore,
    MemoryAppointmentStore, ReminderScheduler, SupabaseAppointmentStore,
};
use directory_cell::{MemoryDirectory, ParticipantDirectory, SupabaseDirectory};
use notification_cell::{
    DisabledPushProvider, FcmPushProvider, MemoryNotificationStore, NotificationDispatcher,
    NotificationOutbox, NotificationStore, PushProvider, SupabaseNotificationStore,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_models::time::{ClinicClock, WallTime};
use slot_cell::{MemorySlotStore, SlotService, SlotStore, SupabaseSlotStore};

struct Backends {
    directory: Arc<dyn ParticipantDirectory>,
    slots: Arc<dyn SlotStore>,
    appointments: Arc<dyn AppointmentStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl Backends {
    fn for_config(config: &AppConfig) -> Self {
        match config.storage_backend {
            StorageBackend::Supabase => {
                let supabase = Arc::new(SupabaseClient::new(config));
                Self {
                    directory: Arc::new(SupabaseDirectory::new(supabase.clone())),
                    slots: Arc::new(SupabaseSlotStore::new(supabase.clone())),
                    appointments: Arc::new(SupabaseAppointmentStore::new(supabase.clone())),
                    notifications: Arc::new(SupabaseNotificationStore::new(supabase)),
                }
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage, all data is lost on restart");
                Self {
                    directory: Arc::new(MemoryDirectory::new()),
                    slots: Arc::new(MemorySlotStore::new()),
                    appointments: Arc::new(MemoryAppointmentStore::new()),
                    notifications: Arc::new(MemoryNotificationStore::new()),
                }
            }
        }
    }
}

/// Everything the process shares: stores, services and the background tasks
/// that deliver notifications and send reminders.
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub clock: ClinicClock,
    pub directory: Arc<dyn ParticipantDirectory>,
    pub notifications: Arc<dyn NotificationStore>,
    pub slots: SlotService,
    pub booking: AppointmentBookingService,
    pub lifecycle: AppointmentLifecycleService,
    pub reminders: Arc<ReminderScheduler>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AppContext {
    /// Builds the stores for the configured backend and starts the outbox
    /// worker and reminder scheduler.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let clock = ClinicClock::from_offset_minutes(config.clinic_utc_offset_minutes)
            .with_context(|| format!("invalid CLINIC_UTC_OFFSET_MINUTES: {}", config.clinic_utc_offset_minutes))?;
        let daily_at = WallTime::parse(&config.daily_reminder_time)
            .with_context(|| format!("invalid DAILY_REMINDER_TIME: {}", config.daily_reminder_time))?;

        let backends = Backends::for_config(&config);

        let push: Arc<dyn PushProvider> = if config.is_push_configured() {
            Arc::new(FcmPushProvider::new(&config))
        } else {
            warn!("Push delivery disabled, notifications are stored only");
            Arc::new(DisabledPushProvider)
        };
        let dispatcher = Arc::new(NotificationDispatcher::new(
            backends.notifications.clone(),
            backends.directory.clone(),
            push,
        ));
        let (outbox, worker) = NotificationOutbox::channel(dispatcher);

        let reminders = Arc::new(ReminderScheduler::new(
            backends.appointments.clone(),
            backends.directory.clone(),
            outbox.clone(),
            clock,
            Duration::from_secs(config.reminder_sweep_interval_seconds),
            daily_at,
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(worker.run(shutdown_rx.clone())),
            tokio::spawn(reminders.clone().run(shutdown_rx)),
        ];

        info!("Application context ready ({:?} storage, clinic offset {} minutes)",
              config.storage_backend, config.clinic_utc_offset_minutes);

        Ok(Self {
            clock,
            slots: SlotService::new(backends.slots.clone(), backends.directory.clone()),
            booking: AppointmentBookingService::new(
                backends.appointments.clone(),
                backends.slots.clone(),
                backends.directory.clone(),
                outbox.clone(),
            ),
            lifecycle: AppointmentLifecycleService::new(
                backends.appointments,
                backends.slots,
                backends.directory.clone(),
                outbox,
            ),
            directory: backends.directory,
            notifications: backends.notifications,
            reminders,
            config: Arc::new(config),
            shutdown,
            tasks,
        })
    }

    /// Signals the background tasks and waits for them; queued notifications
    /// are dispatched before the outbox worker exits.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        info!("Background tasks stopped");
    }
}
