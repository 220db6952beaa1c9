//! JSON surface of the dashboard plus the two public lookups the booking
//! page needs.

use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    auth::dashboard_validator,
    bookings::{self, BookingFilter},
    calendar::{clamp_anchor, CalendarCursor, CalendarView, DateCell},
    catalog::{self, ProfessionalDraft, ProfessionalPatch, ServiceDraft, ServicePatch},
    error::AppError,
    models::{
        format_hhmm, parse_hhmm, BarbershopProfile, Booking, BookingStatus, Professional,
        PromotionStatus, Service, WorkingHours,
    },
    promotions::{self, PromotionDraft, PromotionPatch},
    routes::{announce, local_now, BOOKING_CREATED, BOOKING_UPDATED},
    schedule, settings,
    state::AppState,
    stats,
    store::Saved,
    wizard::{self, BookingWizard},
};

/// A saved record plus the size warning of the write, when there is one.
#[derive(Serialize)]
struct SavedBody<T: Serialize> {
    #[serde(flatten)]
    record: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl<T: Serialize> SavedBody<T> {
    fn new(record: T, saved: Saved) -> Self {
        Self {
            record,
            warning: saved.warning(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Registered ahead of the authenticated scope so they stay public.
    cfg.service(web::resource("/api/availability").route(web::get().to(availability)))
        .service(web::resource("/api/calendar").route(web::get().to(calendar)))
        .service(
            web::scope("/api")
                .wrap(HttpAuthentication::basic(dashboard_validator))
                .service(
                    web::resource("/bookings")
                        .route(web::get().to(list_bookings))
                        .route(web::post().to(create_booking)),
                )
                .service(
                    web::resource("/bookings/{id}")
                        .route(web::get().to(get_booking))
                        .route(web::patch().to(update_booking))
                        .route(web::delete().to(cancel_booking)),
                )
                .service(
                    web::resource("/services")
                        .route(web::get().to(list_services))
                        .route(web::post().to(create_service)),
                )
                .service(
                    web::resource("/services/{id}")
                        .route(web::patch().to(update_service))
                        .route(web::delete().to(delete_service)),
                )
                .service(
                    web::resource("/professionals")
                        .route(web::get().to(list_professionals))
                        .route(web::post().to(create_professional)),
                )
                .service(
                    web::resource("/professionals/{id}")
                        .route(web::patch().to(update_professional))
                        .route(web::delete().to(delete_professional)),
                )
                .service(
                    web::resource("/promotions")
                        .route(web::get().to(list_promotions))
                        .route(web::post().to(create_promotion)),
                )
                .service(
                    web::resource("/promotions/{id}")
                        .route(web::patch().to(update_promotion))
                        .route(web::delete().to(delete_promotion)),
                )
                .service(
                    web::resource("/settings/hours")
                        .route(web::get().to(get_hours))
                        .route(web::put().to(put_hours)),
                )
                .service(
                    web::resource("/settings/profile")
                        .route(web::get().to(get_profile))
                        .route(web::put().to(put_profile)),
                )
                .service(web::resource("/stats/overview").route(web::get().to(overview))),
        );
}

async fn list_bookings(
    state: web::Data<AppState>,
    query: web::Query<BookingFilter>,
) -> Result<HttpResponse, AppError> {
    let all: Vec<Booking> = state.storage.list().await?;
    Ok(HttpResponse::Ok().json(bookings::filter_bookings(all, &query)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewBooking {
    professional_id: String,
    service_id: String,
    date: NaiveDate,
    time: String,
    client_name: String,
    client_phone: String,
}

async fn create_booking(
    state: web::Data<AppState>,
    payload: web::Json<NewBooking>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let time = parse_hhmm(&payload.time)
        .ok_or_else(|| AppError::validation("Horário inválido, use HH:MM."))?;
    let mut wizard = BookingWizard::new();
    wizard.select_professional(payload.professional_id);
    wizard.select_service(payload.service_id);
    wizard.set_date(payload.date);
    wizard.set_time(time);
    wizard.set_client(&payload.client_name, &payload.client_phone);
    while wizard.advance() {}
    if !wizard.is_ready() {
        return Err(AppError::validation(format!(
            "Complete a etapa \"{}\".",
            wizard.step().label()
        )));
    }
    let booking = wizard::confirm(&state.storage, &wizard, local_now()).await?;
    announce(&state, BOOKING_CREATED, &booking).await;
    Ok(HttpResponse::Created().json(booking))
}

async fn get_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = state
        .storage
        .get::<Booking>(&path.into_inner())
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    Ok(HttpResponse::Ok().json(booking))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: BookingStatus,
}

async fn update_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> Result<HttpResponse, AppError> {
    let booking = bookings::set_status(&state.storage, &path.into_inner(), payload.status).await?;
    announce(&state, BOOKING_UPDATED, &booking).await;
    Ok(HttpResponse::Ok().json(booking))
}

/// Bookings are never removed; deleting one cancels it.
async fn cancel_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = bookings::cancel(&state.storage, &path.into_inner()).await?;
    announce(&state, BOOKING_UPDATED, &booking).await;
    Ok(HttpResponse::Ok().json(booking))
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services: Vec<Service> = state.storage.list().await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn create_service(
    state: web::Data<AppState>,
    payload: web::Json<ServiceDraft>,
) -> Result<HttpResponse, AppError> {
    let service = catalog::save_service(&state.storage, None, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(service))
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ServicePatch>,
) -> Result<HttpResponse, AppError> {
    let service =
        catalog::patch_service(&state.storage, &path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(service))
}

async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    catalog::delete_service(&state.storage, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_professionals(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let professionals: Vec<Professional> = state.storage.list().await?;
    Ok(HttpResponse::Ok().json(professionals))
}

async fn create_professional(
    state: web::Data<AppState>,
    payload: web::Json<ProfessionalDraft>,
) -> Result<HttpResponse, AppError> {
    let professional =
        catalog::save_professional(&state.storage, None, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(professional))
}

async fn update_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ProfessionalPatch>,
) -> Result<HttpResponse, AppError> {
    let professional =
        catalog::patch_professional(&state.storage, &path.into_inner(), payload.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(professional))
}

async fn delete_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    catalog::delete_professional(&state.storage, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
struct PromotionQuery {
    status: Option<String>,
    search: Option<String>,
}

async fn list_promotions(
    state: web::Data<AppState>,
    query: web::Query<PromotionQuery>,
) -> Result<HttpResponse, AppError> {
    let status = query.status.as_deref().and_then(PromotionStatus::parse);
    let all = promotions::list(&state.storage, local_now().date()).await?;
    Ok(HttpResponse::Ok().json(promotions::filter(all, status, query.search.as_deref())))
}

async fn create_promotion(
    state: web::Data<AppState>,
    payload: web::Json<PromotionDraft>,
) -> Result<HttpResponse, AppError> {
    let (promotion, saved) =
        promotions::save(&state.storage, None, payload.into_inner(), local_now().date()).await?;
    Ok(HttpResponse::Created().json(SavedBody::new(promotion, saved)))
}

async fn update_promotion(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<PromotionPatch>,
) -> Result<HttpResponse, AppError> {
    let (promotion, saved) = promotions::patch(
        &state.storage,
        &path.into_inner(),
        payload.into_inner(),
        local_now().date(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(SavedBody::new(promotion, saved)))
}

async fn delete_promotion(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    promotions::delete(&state.storage, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn get_hours(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let hours: WorkingHours = state.storage.document().await?;
    Ok(HttpResponse::Ok().json(hours))
}

async fn put_hours(
    state: web::Data<AppState>,
    payload: web::Json<WorkingHours>,
) -> Result<HttpResponse, AppError> {
    let hours = settings::save_hours(&state.storage, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(hours))
}

async fn get_profile(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile: BarbershopProfile = state.storage.document().await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn put_profile(
    state: web::Data<AppState>,
    payload: web::Json<BarbershopProfile>,
) -> Result<HttpResponse, AppError> {
    let (profile, saved) = settings::save_profile(&state.storage, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(SavedBody::new(profile, saved)))
}

async fn overview(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(stats::overview(&state.storage, local_now()).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityQuery {
    date: NaiveDate,
    service_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Availability {
    date: NaiveDate,
    service_id: String,
    duration: u32,
    slots: Vec<String>,
}

async fn availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let session = state.storage.session().await;
    let services: Vec<Service> = session.list().await?;
    let hours: WorkingHours = session.document().await?;
    let bookings: Vec<Booking> = session.list().await?;
    drop(session);

    let service = services
        .iter()
        .find(|service| service.id == query.service_id)
        .ok_or(AppError::NotFound("service"))?;
    let slots = schedule::available_slots(
        &hours,
        &bookings,
        &services,
        query.date,
        service.duration,
        local_now(),
    );

    Ok(HttpResponse::Ok().json(Availability {
        date: query.date,
        duration: service.duration,
        service_id: query.service_id,
        slots: slots.into_iter().map(format_hhmm).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarQuery {
    view: Option<String>,
    anchor: Option<NaiveDate>,
    service_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarPage {
    view: CalendarView,
    anchor: NaiveDate,
    can_go_previous: bool,
    previous_anchor: NaiveDate,
    next_anchor: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    week: Option<Vec<DateCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    month: Option<Vec<Vec<Option<DateCell>>>>,
}

async fn calendar(
    state: web::Data<AppState>,
    query: web::Query<CalendarQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let now = local_now();
    let today = now.date();
    let view = query
        .view
        .as_deref()
        .and_then(CalendarView::parse)
        .unwrap_or_default();
    let cursor = match query.anchor {
        Some(anchor) => CalendarCursor::at(view, clamp_anchor(anchor, today)),
        None => CalendarCursor::new(view, None, today),
    };

    let session = state.storage.session().await;
    let services: Vec<Service> = session.list().await?;
    let hours: WorkingHours = session.document().await?;
    let bookings: Vec<Booking> = session.list().await?;
    drop(session);

    let duration = match query.service_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => Some(
            services
                .iter()
                .find(|service| service.id == id)
                .ok_or(AppError::NotFound("service"))?
                .duration,
        ),
        None => None,
    };
    let has_slots = |date: NaiveDate| match duration {
        Some(duration) => {
            !schedule::available_slots(&hours, &bookings, &services, date, duration, now)
                .is_empty()
        }
        None => true,
    };

    let (week, month) = match view {
        CalendarView::Weekly => (Some(cursor.weekly_strip(today, has_slots)), None),
        CalendarView::Monthly => (None, Some(cursor.month_grid(today))),
    };
    Ok(HttpResponse::Ok().json(CalendarPage {
        view,
        anchor: cursor.anchor,
        can_go_previous: cursor.can_go_previous(today),
        previous_anchor: cursor.previous(today).anchor,
        next_anchor: cursor.next().anchor,
        week,
        month,
    }))
}
