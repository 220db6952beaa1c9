use std::path::PathBuf;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    format::format_date,
    models::{format_hhmm, Booking},
    store::Storage,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub storage: Storage,
    pub events: broadcast::Sender<BookingEvent>,
    pub push: PushConfig,
    pub static_dir: PathBuf,
}

impl AppState {
    /// Fans a booking change out to open dashboards. Nobody listening is fine.
    pub fn publish(&self, kind: &str, booking: &Booking) {
        let _ = self.events.send(BookingEvent::from_booking(kind, booking));
    }
}

#[derive(Clone, Debug)]
pub struct PushConfig {
    pub public_key: String,
    pub private_key: String,
    pub subject: String,
}

impl PushConfig {
    pub fn enabled(&self) -> bool {
        !(self.public_key.trim().is_empty() || self.private_key.trim().is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BookingEvent {
    pub kind: String,
    pub booking_id: String,
    pub status: String,
    pub client_name: String,
    pub service_name: String,
    pub professional_name: String,
    pub date: String,
    pub time: String,
}

impl BookingEvent {
    pub fn from_booking(kind: &str, booking: &Booking) -> Self {
        Self {
            kind: kind.to_string(),
            booking_id: booking.id.clone(),
            status: booking.status.as_str().to_string(),
            client_name: booking.client_name.clone(),
            service_name: booking.service_name.clone(),
            professional_name: booking.professional_name.clone(),
            date: format_date(booking.date),
            time: format_hhmm(booking.time),
        }
    }

    /// One-line summary used as the push notification body.
    pub fn summary(&self) -> String {
        format!(
            "{} - {} em {} às {}",
            self.client_name, self.service_name, self.date, self.time
        )
    }
}

#[cfg(test)]
pub async fn test_state() -> AppState {
    use std::sync::Arc;

    use crate::store::SqliteStore;

    let db = crate::db::memory_pool().await.expect("in-memory database");
    let (events, _) = broadcast::channel(16);
    AppState {
        storage: Storage::new(Arc::new(SqliteStore::new(db.clone()))),
        db,
        events,
        push: PushConfig {
            public_key: String::new(),
            private_key: String::new(),
            subject: String::new(),
        },
        static_dir: std::env::temp_dir().join("regua-maxima-static"),
    }
}
