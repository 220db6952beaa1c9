use serde::Deserialize;

use crate::{
    error::AppError,
    models::{Booking, BookingStatus},
    store::Storage,
};

/// Dashboard list filters; empty values and `all` mean "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
}

impl BookingFilter {
    fn status(&self) -> Option<BookingStatus> {
        self.status.as_deref().and_then(BookingStatus::parse)
    }

    fn date(&self) -> Option<&str> {
        self.date.as_deref().map(str::trim).filter(|date| !date.is_empty())
    }

    fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    fn matches(&self, booking: &Booking) -> bool {
        if self.status().is_some_and(|status| booking.status != status) {
            return false;
        }
        if let Some(date) = self.date() {
            if booking.date.format("%Y-%m-%d").to_string() != date {
                return false;
            }
        }
        match self.search() {
            Some(term) => {
                booking.client_name.to_lowercase().contains(&term)
                    || booking.client_phone.contains(&term)
                    || booking.service_name.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Applies the filter and orders by date and time, newest first.
pub fn filter_bookings(bookings: Vec<Booking>, filter: &BookingFilter) -> Vec<Booking> {
    let mut matching: Vec<Booking> = bookings
        .into_iter()
        .filter(|booking| filter.matches(booking))
        .collect();
    matching.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
    matching
}

/// Moves a scheduled booking to `next`. Nothing else about it changes.
pub async fn set_status(
    storage: &Storage,
    id: &str,
    next: BookingStatus,
) -> Result<Booking, AppError> {
    let session = storage.session().await;
    let mut bookings: Vec<Booking> = session.list().await?;
    let booking = bookings
        .iter_mut()
        .find(|booking| booking.id == id)
        .ok_or(AppError::NotFound("booking"))?;

    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: next,
        });
    }
    booking.status = next;
    let updated = booking.clone();
    session.replace(&bookings).await?;

    log::info!("Booking {id} is now {next}");
    Ok(updated)
}

pub async fn cancel(storage: &Storage, id: &str) -> Result<Booking, AppError> {
    set_status(storage, id, BookingStatus::Cancelled).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::store::MemoryStore;

    fn booking(id: &str, date: (i32, u32, u32), time: (u32, u32), client: &str, service: &str) -> Booking {
        Booking {
            id: id.into(),
            client_name: client.into(),
            client_phone: "(11) 98765-4321".into(),
            professional_id: "1".into(),
            professional_name: "Pablo Silva".into(),
            service_id: "svc_cut".into(),
            service_name: service.into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            price: 35.0,
            status: BookingStatus::Scheduled,
            created_at: None,
        }
    }

    fn sample() -> Vec<Booking> {
        vec![
            booking("agd_20261019_001", (2026, 10, 19), (9, 0), "Ana Lima", "Corte de cabelo"),
            booking("agd_20261019_002", (2026, 10, 19), (14, 0), "Bruno Reis", "Barba/Acabamento"),
            booking("agd_20261020_001", (2026, 10, 20), (8, 0), "Carla Dias", "Sobrancelha"),
        ]
    }

    #[test]
    fn sorts_newest_first() {
        let ids: Vec<String> = filter_bookings(sample(), &BookingFilter::default())
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["agd_20261020_001", "agd_20261019_002", "agd_20261019_001"]);
    }

    #[test]
    fn filters_by_status_date_and_search() {
        let mut bookings = sample();
        bookings[1].status = BookingStatus::Cancelled;

        let filter = BookingFilter {
            status: Some("cancelled".into()),
            ..BookingFilter::default()
        };
        assert_eq!(filter_bookings(bookings.clone(), &filter).len(), 1);

        let filter = BookingFilter {
            status: Some("all".into()),
            date: Some("2026-10-19".into()),
            ..BookingFilter::default()
        };
        assert_eq!(filter_bookings(bookings.clone(), &filter).len(), 2);

        let filter = BookingFilter {
            search: Some("BARBA".into()),
            ..BookingFilter::default()
        };
        assert_eq!(filter_bookings(bookings.clone(), &filter)[0].client_name, "Bruno Reis");

        let filter = BookingFilter {
            search: Some("98765".into()),
            ..BookingFilter::default()
        };
        assert_eq!(filter_bookings(bookings, &filter).len(), 3);
    }

    #[actix_web::test]
    async fn cancelling_touches_only_the_status_of_one_booking() {
        let storage = Storage::new(Arc::new(MemoryStore::default()));
        let session = storage.session().await;
        session.replace(&sample()).await.unwrap();
        drop(session);

        let cancelled = cancel(&storage, "agd_20261019_002").await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let stored: Vec<Booking> = storage.list().await.unwrap();
        let mut expected = sample();
        expected[1].status = BookingStatus::Cancelled;
        assert_eq!(stored, expected);
    }

    #[actix_web::test]
    async fn terminal_states_do_not_move() {
        let storage = Storage::new(Arc::new(MemoryStore::default()));
        storage.session().await.replace(&sample()).await.unwrap();

        set_status(&storage, "agd_20261020_001", BookingStatus::Completed).await.unwrap();
        let err = cancel(&storage, "agd_20261020_001").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Cancelled
            }
        ));
        assert!(matches!(cancel(&storage, "nope").await, Err(AppError::NotFound(_))));
    }
}
