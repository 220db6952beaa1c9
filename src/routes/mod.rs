pub mod admin;
pub mod api;
pub mod events;
pub mod public;
pub mod pwa;

use actix_web::web;
use chrono::{Local, NaiveDateTime};

use crate::{models::Booking, push, state::AppState};

/// Public pages and lookups are registered before the authenticated `/admin`
/// and `/api` scopes, which would otherwise claim their paths.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(pwa::configure)
        .configure(events::configure)
        .configure(api::configure)
        .configure(public::configure)
        .configure(admin::configure);
}

pub const BOOKING_CREATED: &str = "booking_created";
pub const BOOKING_UPDATED: &str = "booking_updated";

/// Wall-clock time of the shop; slots and promotions are all local dates.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Tells open dashboards about a booking change. New bookings also go out as
/// a push notification.
pub async fn announce(state: &AppState, kind: &str, booking: &Booking) {
    state.publish(kind, booking);
    if kind == BOOKING_CREATED {
        let body = crate::state::BookingEvent::from_booking(kind, booking).summary();
        let delivered = push::notify_dashboards(state, &body).await;
        log::debug!("Booking {} pushed to {delivered} dashboards", booking.id);
    }
}

/// Empty form fields arrive as `Some("")`.
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts `35`, `35.5` and the Brazilian `35,50`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let normalized = raw.trim().trim_start_matches("R$").trim().replace(',', ".");
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_accept_both_decimal_marks() {
        assert_eq!(parse_price("35"), Some(35.0));
        assert_eq!(parse_price(" R$ 35,50 "), Some(35.5));
        assert_eq!(parse_price("12.25"), Some(12.25));
        assert_eq!(parse_price("caro"), None);
        assert_eq!(parse_price("NaN"), None);
    }

    #[test]
    fn blank_fields_are_absent() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(Some(" svc_cut ".into())), Some("svc_cut".into()));
        assert_eq!(present(None), None);
    }
}
