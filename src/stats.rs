use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::Serialize;

use crate::{
    error::AppError,
    format::phone_digits,
    models::{Booking, BookingStatus, Professional},
    store::Storage,
};

pub const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub professionals: usize,
    pub clients: usize,
    pub today: usize,
    pub last_seven_days: usize,
    pub this_month: usize,
    pub upcoming: Vec<Booking>,
}

/// Dashboard counters. Everything except the professional count looks at
/// scheduled bookings only.
pub fn summarize(professionals: &[Professional], bookings: &[Booking], now: NaiveDateTime) -> Overview {
    let today = now.date();
    let week_ago = today - Duration::days(7);
    let month_start = today.with_day(1).unwrap_or(today);

    let scheduled: Vec<&Booking> = bookings
        .iter()
        .filter(|booking| booking.status == BookingStatus::Scheduled)
        .collect();

    let clients: HashSet<String> = scheduled
        .iter()
        .map(|booking| phone_digits(&booking.client_phone))
        .filter(|digits| !digits.is_empty())
        .collect();

    let mut upcoming: Vec<Booking> = scheduled
        .iter()
        .filter(|booking| booking.date.and_time(booking.time) >= now)
        .map(|booking| (*booking).clone())
        .collect();
    upcoming.sort_by_key(|booking| (booking.date, booking.time));
    upcoming.truncate(UPCOMING_LIMIT);

    Overview {
        professionals: professionals.len(),
        clients: clients.len(),
        today: scheduled.iter().filter(|booking| booking.date == today).count(),
        last_seven_days: scheduled.iter().filter(|booking| booking.date >= week_ago).count(),
        this_month: scheduled.iter().filter(|booking| booking.date >= month_start).count(),
        upcoming,
    }
}

pub async fn overview(storage: &Storage, now: NaiveDateTime) -> Result<Overview, AppError> {
    let session = storage.session().await;
    let professionals: Vec<Professional> = session.list().await?;
    let bookings: Vec<Booking> = session.list().await?;
    Ok(summarize(&professionals, &bookings, now))
}
