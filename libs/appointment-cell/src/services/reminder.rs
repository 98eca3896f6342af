use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use directory_cell::ParticipantDirectory;
use notification_cell::{NotificationEvent, NotificationOutbox, ReminderLead};
use shared_models::time::{ClinicClock, DayRange, WallTime};

use crate::models::{Appointment, AppointmentError, AppointmentFilter, AppointmentStatus};
use crate::services::participants::describe;
use crate::services::store::AppointmentStore;

/// Minutes-to-start window for the short reminder. Wider than one sweep
/// interval so a late tick still lands inside it.
pub const SHORT_REMINDER_WINDOW: RangeInclusive<i64> = 29..=31;

/// Periodic reminder sweeps: a short sweep every interval for appointments
/// starting in about thirty minutes, and a daily sweep for tomorrow's list.
/// Each reminder is claimed in storage before it is enqueued, so overlapping
/// sweeps or several instances send it at most once.
pub struct ReminderScheduler {
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn ParticipantDirectory>,
    outbox: NotificationOutbox,
    clock: ClinicClock,
    sweep_interval: Duration,
    daily_at: WallTime,
}

impl ReminderScheduler {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn ParticipantDirectory>,
        outbox: NotificationOutbox,
        clock: ClinicClock,
        sweep_interval: Duration,
        daily_at: WallTime,
    ) -> Self {
        Self {
            appointments,
            directory,
            outbox,
            clock,
            sweep_interval: sweep_interval.max(Duration::from_secs(1)),
            daily_at,
        }
    }

    async fn active_on(&self, day: DayRange) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            day: Some(day),
            statuses: AppointmentStatus::ACTIVE.to_vec(),
            ..Default::default()
        };
        self.appointments.list(&filter).await
    }

    async fn send(&self, appointment: Appointment, lead: ReminderLead, now: DateTime<Utc>) -> bool {
        match self.appointments.claim_reminder(appointment.id, lead, now).await {
            Ok(true) => {
                let details = describe(self.directory.as_ref(), appointment).await;
                self.outbox.enqueue(NotificationEvent::Reminder { lead, appointment: details.snapshot() });
                true
            }
            Ok(false) => {
                debug!("Reminder for appointment {} already claimed", appointment.id);
                false
            }
            Err(e) => {
                warn!("Could not claim reminder for appointment {}: {}", appointment.id, e);
                false
            }
        }
    }

    /// Reminds today's appointments whose start falls inside the short window.
    pub async fn run_minute_sweep(&self, now: DateTime<Utc>) -> Result<usize, AppointmentError> {
        let today = self.clock.today(now);
        let mut sent = 0;

        for appointment in self.active_on(DayRange::for_date(today)).await? {
            if appointment.reminder_30m_sent_at.is_some() {
                continue;
            }
            let due = self.clock
                .minutes_until(now, appointment.appointment_date, appointment.start_time)
                .is_some_and(|minutes| SHORT_REMINDER_WINDOW.contains(&minutes));
            if due && self.send(appointment, ReminderLead::ThirtyMinutes, now).await {
                sent += 1;
            }
        }

        if sent > 0 {
            info!("Sent {} thirty-minute reminders", sent);
        }
        Ok(sent)
    }

    /// Reminds every active appointment scheduled for tomorrow.
    pub async fn run_daily_sweep(&self, now: DateTime<Utc>) -> Result<usize, AppointmentError> {
        let tomorrow = self.clock.tomorrow(now);
        let mut sent = 0;

        for appointment in self.active_on(DayRange::for_date(tomorrow)).await? {
            if appointment.reminder_24h_sent_at.is_some() {
                continue;
            }
            if self.send(appointment, ReminderLead::TwentyFourHours, now).await {
                sent += 1;
            }
        }

        info!("Sent {} reminders for {}", sent, tomorrow);
        Ok(sent)
    }

    /// Next instant the daily sweep should fire, strictly after `now`.
    pub fn next_daily_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.clock.today(now);
        match self.clock.instant(today, self.daily_at) {
            Some(at) if at > now => at,
            _ => self.clock
                .instant(self.clock.tomorrow(now), self.daily_at)
                .unwrap_or(now + chrono::Duration::days(1)),
        }
    }

    fn until(&self, at: DateTime<Utc>) -> Instant {
        Instant::now() + (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Runs both sweeps until shutdown is signalled.
    #[instrument(skip_all)]
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Reminder scheduler started (every {:?}, daily at {})", self.sweep_interval, self.daily_at);

        let mut ticker = time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let daily = time::sleep_until(self.until(self.next_daily_run(Utc::now())));
        tokio::pin!(daily);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_minute_sweep(Utc::now()).await {
                        error!("Thirty-minute reminder sweep failed: {}", e);
                    }
                }
                _ = &mut daily => {
                    if let Err(e) = self.run_daily_sweep(Utc::now()).await {
                        error!("Daily reminder sweep failed: {}", e);
                    }
                    daily.as_mut().reset(self.until(self.next_daily_run(Utc::now())));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reminder scheduler stopped");
    }
}
