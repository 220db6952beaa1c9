use actix_web::HttpResponse;
use askama::Template;

use crate::{
    format::{format_brl, format_date, phone_digits},
    models::{format_hhmm, BarbershopProfile, Booking, BookingStatus},
};

pub fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("Template render error: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Shop identity shown in page headers and on the contact page.
#[derive(Clone, Debug)]
pub struct ShopView {
    pub name: String,
    pub description: String,
    pub logo: String,
    pub instagram: String,
    pub instagram_link: String,
    pub whatsapp: String,
    pub whatsapp_link: String,
    pub has_whatsapp: bool,
}

impl From<&BarbershopProfile> for ShopView {
    fn from(profile: &BarbershopProfile) -> Self {
        let digits = phone_digits(&profile.whatsapp);
        let handle = profile.instagram.trim().trim_start_matches('@');
        Self {
            name: profile.name.clone(),
            description: profile.description.clone(),
            logo: profile.logo.clone(),
            instagram: profile.instagram.clone(),
            instagram_link: format!("https://instagram.com/{handle}"),
            whatsapp: profile.whatsapp.clone(),
            whatsapp_link: format!("https://wa.me/55{digits}"),
            has_whatsapp: digits.len() >= 10 && digits.chars().any(|digit| digit != '0'),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BookingView {
    pub id: String,
    pub client_name: String,
    pub client_phone: String,
    pub professional_name: String,
    pub service_name: String,
    pub date: String,
    pub date_iso: String,
    pub time: String,
    pub price: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub scheduled: bool,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.clone(),
            client_name: booking.client_name.clone(),
            client_phone: booking.client_phone.clone(),
            professional_name: booking.professional_name.clone(),
            service_name: booking.service_name.clone(),
            date: format_date(booking.date),
            date_iso: booking.date.format("%Y-%m-%d").to_string(),
            time: format_hhmm(booking.time),
            price: format_brl(booking.price),
            status: booking.status.as_str(),
            status_label: booking.status.label(),
            scheduled: booking.status == BookingStatus::Scheduled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_links_strip_formatting() {
        let shop = ShopView::from(&BarbershopProfile {
            whatsapp: "(11) 98765-4321".into(),
            ..BarbershopProfile::default()
        });
        assert_eq!(shop.whatsapp_link, "https://wa.me/5511987654321");
        assert_eq!(shop.instagram_link, "https://instagram.com/reguamaxima");
        assert!(shop.has_whatsapp);
        assert!(!ShopView::from(&BarbershopProfile::default()).has_whatsapp);
    }
}
