use std::borrow::Cow;

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::header::Header;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use askama::Template;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::{
    auth::{authenticate_credentials, clear_logout_cookie, logout_cookie, AUTH_REALM},
    calendar::{clamp_anchor, CalendarCursor, CalendarView, DateCell},
    error::AppError,
    format::{format_brl, format_date, format_month, phone_digits, weekday_short},
    models::{
        format_hhmm, parse_hhmm, BarbershopProfile, Booking, BookingStatus, Professional, Promotion,
        Service, WorkingHours, ROLE_ADMIN,
    },
    promotions,
    routes::{announce, local_now, present, BOOKING_CREATED},
    schedule,
    state::AppState,
    templates::{render, BookingView, ShopView},
    wizard::{self, BookingWizard, Selection, WizardStep},
};

pub const CLIENT_NAME_COOKIE: &str = "clientName";
pub const CLIENT_PHONE_COOKIE: &str = "clientPhone";
pub const JUST_BOOKED_COOKIE: &str = "justBooked";

#[derive(Clone, Debug)]
struct PromotionCard {
    title: String,
    description: String,
    image: String,
    has_image: bool,
    link: String,
    has_link: bool,
    period: String,
}

impl From<&Promotion> for PromotionCard {
    fn from(promotion: &Promotion) -> Self {
        let image = promotion.image.clone().unwrap_or_default();
        let link = promotion.link.clone().unwrap_or_default();
        Self {
            title: promotion.title.clone(),
            description: promotion.description.clone(),
            has_image: !image.is_empty(),
            image,
            has_link: !link.is_empty(),
            link,
            period: format!(
                "{} a {}",
                promotion.start_date.format("%d/%m"),
                promotion.end_date.format("%d/%m/%Y")
            ),
        }
    }
}

#[derive(Clone, Debug)]
struct ServiceCard {
    name: String,
    price: String,
    duration: u32,
    image: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    shop: ShopView,
    promotions: Vec<PromotionCard>,
    services: Vec<ServiceCard>,
    client_first_name: String,
    has_client: bool,
    scheduled_count: usize,
    just_booked: bool,
}

#[derive(Template)]
#[template(path = "contact.html")]
struct ContactTemplate {
    shop: ShopView,
}

#[derive(Clone, Debug)]
struct StepView {
    number: usize,
    label: &'static str,
    current: bool,
    done: bool,
}

#[derive(Clone, Debug)]
struct ChoiceView {
    id: String,
    title: String,
    detail: String,
    image: String,
    selected: bool,
}

#[derive(Clone, Debug, Default)]
struct DayView {
    iso: String,
    day: u32,
    weekday: &'static str,
    blank: bool,
    disabled: bool,
    selected: bool,
    today: bool,
    has_slots: bool,
}

impl DayView {
    fn blank() -> Self {
        Self {
            blank: true,
            disabled: true,
            ..Self::default()
        }
    }

    fn from_cell(cell: &DateCell, today: NaiveDate, selected: Option<NaiveDate>) -> Self {
        let has_slots = cell.has_slots.unwrap_or(true);
        Self {
            iso: cell.iso.clone(),
            day: cell.date.day(),
            weekday: weekday_short(cell.date.weekday()),
            blank: false,
            disabled: !cell.selectable() || !has_slots,
            selected: selected == Some(cell.date),
            today: cell.date == today,
            has_slots,
        }
    }
}

#[derive(Clone, Debug)]
struct SlotView {
    value: String,
    selected: bool,
}

#[derive(Clone, Debug, Default)]
struct ReviewView {
    professional: String,
    service: String,
    price: String,
    duration: u32,
    date: String,
    time: String,
    client: String,
    phone: String,
}

#[derive(Template)]
#[template(path = "book.html")]
struct BookTemplate {
    shop: ShopView,
    step: usize,
    step_label: &'static str,
    steps: Vec<StepView>,
    professional_id: String,
    service_id: String,
    date: String,
    time: String,
    full_name: String,
    phone: String,
    view: &'static str,
    anchor: String,
    professionals: Vec<ChoiceView>,
    services: Vec<ChoiceView>,
    period_label: String,
    can_go_previous: bool,
    weekly: bool,
    week: Vec<DayView>,
    month: Vec<Vec<DayView>>,
    slots: Vec<SlotView>,
    date_label: String,
    review: ReviewView,
    error: String,
    has_error: bool,
}

#[derive(Template)]
#[template(path = "book_success.html")]
struct BookSuccessTemplate {
    shop: ShopView,
    booking: BookingView,
}

/// The wizard round-trips through this form: hidden fields carry earlier
/// choices, buttons name the action.
#[derive(Debug, Default, Deserialize)]
struct WizardForm {
    #[serde(default)]
    step: usize,
    professional_id: Option<String>,
    service_id: Option<String>,
    date: Option<String>,
    time: Option<String>,
    full_name: Option<String>,
    phone: Option<String>,
    view: Option<String>,
    anchor: Option<String>,
    pick_date: Option<String>,
    action: Option<String>,
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    present(raw).and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
}

impl WizardForm {
    fn selection(&self) -> Selection {
        Selection {
            professional_id: present(self.professional_id.clone()),
            service_id: present(self.service_id.clone()),
            date: parse_date(self.date.clone()),
            time: present(self.time.clone()).and_then(|raw| parse_hhmm(&raw)),
            full_name: self.full_name.clone().unwrap_or_default().trim().to_string(),
            phone: self.phone.clone().unwrap_or_default().trim().to_string(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/contact").route(web::get().to(contact)))
        .service(
            web::resource("/book")
                .route(web::get().to(start_booking))
                .route(web::post().to(booking_step)),
        )
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

fn client_cookie(name: &'static str, value: &str) -> Cookie<'static> {
    Cookie::build(name, urlencoding::encode(value).into_owned())
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365))
        .finish()
}

fn read_cookie(req: &HttpRequest, name: &str) -> Option<String> {
    let cookie = req.cookie(name)?;
    let value = urlencoding::decode(cookie.value())
        .map(Cow::into_owned)
        .ok()?;
    present(Some(value))
}

async fn home(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let today = local_now().date();
    let profile: BarbershopProfile = state.storage.document().await?;
    let current = promotions::list_current(&state.storage, today).await?;
    let services: Vec<Service> = state.storage.list().await?;

    let client_name = read_cookie(&req, CLIENT_NAME_COOKIE);
    let scheduled_count = match read_cookie(&req, CLIENT_PHONE_COOKIE) {
        Some(phone) => {
            let digits = phone_digits(&phone);
            let bookings: Vec<Booking> = state.storage.list().await?;
            bookings
                .iter()
                .filter(|booking| {
                    booking.status == BookingStatus::Scheduled
                        && booking.date >= today
                        && phone_digits(&booking.client_phone) == digits
                })
                .count()
        }
        None => 0,
    };
    let just_booked = req.cookie(JUST_BOOKED_COOKIE).is_some();

    let mut response = render(HomeTemplate {
        shop: ShopView::from(&profile),
        promotions: current.iter().map(PromotionCard::from).collect(),
        services: services
            .into_iter()
            .map(|service| ServiceCard {
                price: format_brl(service.price),
                name: service.name,
                duration: service.duration,
                image: service.image,
            })
            .collect(),
        client_first_name: client_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
            .unwrap_or_default()
            .to_string(),
        has_client: client_name.is_some(),
        scheduled_count,
        just_booked,
    });
    if just_booked {
        let flash = Cookie::build(JUST_BOOKED_COOKIE, "").path("/").finish();
        if let Err(err) = response.add_removal_cookie(&flash) {
            log::warn!("Could not clear booking flash: {err}");
        }
    }
    Ok(response)
}

async fn contact(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile: BarbershopProfile = state.storage.document().await?;
    Ok(render(ContactTemplate {
        shop: ShopView::from(&profile),
    }))
}

/// A returning client finds their name and phone already filled in.
async fn start_booking(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let now = local_now();
    let mut wizard = BookingWizard::new();
    wizard.set_client(
        &read_cookie(&req, CLIENT_NAME_COOKIE).unwrap_or_default(),
        &read_cookie(&req, CLIENT_PHONE_COOKIE).unwrap_or_default(),
    );
    let cursor = CalendarCursor::new(CalendarView::Weekly, None, now.date());
    render_wizard(&state, &wizard, cursor, None, now).await
}

async fn booking_step(
    state: web::Data<AppState>,
    form: web::Form<WizardForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let now = local_now();
    let today = now.date();

    let mut wizard = BookingWizard::resume(WizardStep::from_index(form.step), form.selection());
    let view = form
        .view
        .as_deref()
        .and_then(CalendarView::parse)
        .unwrap_or_default();
    let mut cursor = match parse_date(form.anchor.clone()) {
        Some(anchor) => CalendarCursor::at(view, clamp_anchor(anchor, today)),
        None => {
            let selected = wizard.selection().date.map(|date| clamp_anchor(date, today));
            CalendarCursor::new(view, selected, today)
        }
    };

    if let Some(picked) = parse_date(form.pick_date.clone()).filter(|date| *date >= today) {
        wizard.set_date(picked);
        cursor = cursor.follow(clamp_anchor(picked, today));
    }

    let mut error = None;
    match form.action.as_deref().unwrap_or_default() {
        "next" => {
            if !wizard.advance() {
                error = Some(step_hint(wizard.step()));
            }
        }
        "back" => wizard.back(),
        "prev_period" => cursor = cursor.previous(today),
        "next_period" => cursor = cursor.next(),
        "view_weekly" | "view_monthly" => {
            let view = if form.action.as_deref() == Some("view_monthly") {
                CalendarView::Monthly
            } else {
                CalendarView::Weekly
            };
            let focus = wizard.selection().date.unwrap_or(cursor.anchor);
            cursor = CalendarCursor::at(view, clamp_anchor(focus, today));
        }
        "confirm" => return confirm_booking(&state, wizard, cursor, now).await,
        _ => {}
    }

    render_wizard(&state, &wizard, cursor, error, now).await
}

fn step_hint(step: WizardStep) -> String {
    match step {
        WizardStep::Professional => "Escolha um profissional para continuar.",
        WizardStep::Service => "Escolha um serviço para continuar.",
        WizardStep::DateTime => "Escolha uma data e um horário disponíveis.",
        WizardStep::ClientInfo => {
            "Informe nome e sobrenome e um telefone com DDD (10 ou 11 dígitos)."
        }
        WizardStep::Review => "Revise os dados do agendamento.",
    }
    .to_string()
}

async fn confirm_booking(
    state: &AppState,
    wizard: BookingWizard,
    cursor: CalendarCursor,
    now: NaiveDateTime,
) -> Result<HttpResponse, AppError> {
    match wizard::confirm(&state.storage, &wizard, now).await {
        Ok(booking) => {
            announce(state, BOOKING_CREATED, &booking).await;
            let profile: BarbershopProfile = state.storage.document().await?;
            let mut response = render(BookSuccessTemplate {
                shop: ShopView::from(&profile),
                booking: BookingView::from(&booking),
            });
            let cookies = [
                client_cookie(CLIENT_NAME_COOKIE, &booking.client_name),
                client_cookie(CLIENT_PHONE_COOKIE, &booking.client_phone),
                Cookie::build(JUST_BOOKED_COOKIE, "1")
                    .path("/")
                    .same_site(SameSite::Lax)
                    .max_age(Duration::minutes(5))
                    .finish(),
            ];
            for cookie in &cookies {
                if let Err(err) = response.add_cookie(cookie) {
                    log::warn!("Could not set cookie {}: {err}", cookie.name());
                }
            }
            Ok(response)
        }
        Err(AppError::SlotUnavailable { .. }) => {
            let mut selection = wizard.selection().clone();
            selection.time = None;
            let wizard = BookingWizard::resume(WizardStep::DateTime, selection);
            let message = "Esse horário não está mais disponível. Escolha outro.".to_string();
            render_wizard(state, &wizard, cursor, Some(message), now).await
        }
        Err(err @ (AppError::Validation(_) | AppError::NotFound(_))) => {
            let step = wizard.first_incomplete().unwrap_or(WizardStep::Professional);
            let wizard = BookingWizard::resume(step, wizard.selection().clone());
            let message = match err {
                AppError::NotFound(_) => {
                    "O profissional ou serviço escolhido não está mais disponível.".to_string()
                }
                other => other.to_string(),
            };
            render_wizard(state, &wizard, cursor, Some(message), now).await
        }
        Err(err) => Err(err),
    }
}

async fn render_wizard(
    state: &AppState,
    wizard: &BookingWizard,
    cursor: CalendarCursor,
    error: Option<String>,
    now: NaiveDateTime,
) -> Result<HttpResponse, AppError> {
    let today = now.date();
    let session = state.storage.session().await;
    let professionals: Vec<Professional> = session.list().await?;
    let services: Vec<Service> = session.list().await?;
    let hours: WorkingHours = session.document().await?;
    let bookings: Vec<Booking> = session.list().await?;
    let profile: BarbershopProfile = session.document().await?;
    drop(session);

    let selection = wizard.selection();
    let service = selection
        .service_id
        .as_deref()
        .and_then(|id| services.iter().find(|service| service.id == id));
    let professional = selection
        .professional_id
        .as_deref()
        .and_then(|id| professionals.iter().find(|professional| professional.id == id));
    let slots_on = |date: NaiveDate| match service {
        Some(service) => {
            schedule::available_slots(&hours, &bookings, &services, date, service.duration, now)
        }
        None => Vec::new(),
    };

    let step = wizard.step();
    let steps = WizardStep::ALL
        .into_iter()
        .map(|candidate| StepView {
            number: candidate.index() + 1,
            label: candidate.label(),
            current: candidate == step,
            done: candidate < step,
        })
        .collect();

    let week = if cursor.view == CalendarView::Weekly {
        cursor
            .weekly_strip(today, |date| service.is_none() || !slots_on(date).is_empty())
            .iter()
            .map(|cell| DayView::from_cell(cell, today, selection.date))
            .collect()
    } else {
        Vec::new()
    };
    let month = if cursor.view == CalendarView::Monthly {
        cursor
            .month_grid(today)
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(cell) => DayView::from_cell(cell, today, selection.date),
                        None => DayView::blank(),
                    })
                    .collect()
            })
            .collect()
    } else {
        Vec::new()
    };
    let period_label = match cursor.view {
        CalendarView::Weekly => {
            let end = cursor
                .anchor
                .checked_add_signed(chrono::Duration::days(6))
                .unwrap_or(cursor.anchor);
            format!("{} a {}", cursor.anchor.format("%d/%m"), end.format("%d/%m/%Y"))
        }
        CalendarView::Monthly => format_month(cursor.anchor),
    };

    let slots = match selection.date {
        Some(date) => slots_on(date)
            .into_iter()
            .map(|slot| SlotView {
                value: format_hhmm(slot),
                selected: selection.time == Some(slot),
            })
            .collect(),
        None => Vec::new(),
    };

    let review = ReviewView {
        professional: professional.map(|p| p.name.clone()).unwrap_or_default(),
        service: service.map(|s| s.name.clone()).unwrap_or_default(),
        price: service.map(|s| format_brl(s.price)).unwrap_or_default(),
        duration: service.map(|s| s.duration).unwrap_or_default(),
        date: selection.date.map(format_date).unwrap_or_default(),
        time: selection.time.map(format_hhmm).unwrap_or_default(),
        client: selection.full_name.clone(),
        phone: crate::format::format_phone(&selection.phone),
    };

    let template = BookTemplate {
        shop: ShopView::from(&profile),
        step: step.index(),
        step_label: step.label(),
        steps,
        professional_id: selection.professional_id.clone().unwrap_or_default(),
        service_id: selection.service_id.clone().unwrap_or_default(),
        date: selection
            .date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        time: selection.time.map(format_hhmm).unwrap_or_default(),
        full_name: selection.full_name.clone(),
        phone: selection.phone.clone(),
        view: cursor.view.as_str(),
        anchor: cursor.anchor.format("%Y-%m-%d").to_string(),
        professionals: professionals
            .iter()
            .map(|p| ChoiceView {
                id: p.id.clone(),
                title: p.name.clone(),
                detail: p.specialty.clone(),
                image: p.image.clone(),
                selected: selection.professional_id.as_deref() == Some(p.id.as_str()),
            })
            .collect(),
        services: services
            .iter()
            .map(|s| ChoiceView {
                id: s.id.clone(),
                title: s.name.clone(),
                detail: format!("{} · {} min", format_brl(s.price), s.duration),
                image: s.image.clone(),
                selected: selection.service_id.as_deref() == Some(s.id.as_str()),
            })
            .collect(),
        period_label,
        can_go_previous: cursor.can_go_previous(today),
        weekly: cursor.view == CalendarView::Weekly,
        week,
        month,
        slots,
        date_label: selection.date.map(format_date).unwrap_or_default(),
        review,
        has_error: error.is_some(),
        error: error.unwrap_or_default(),
    };
    Ok(render(template))
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let Ok(auth) = Authorization::<Basic>::parse(&req) else {
        return auth_challenge();
    };
    let credentials = auth.into_scheme();
    let password = credentials.password().unwrap_or_default();
    let user = match authenticate_credentials(&state, credentials.user_id(), password).await {
        Some(user) if user.role == ROLE_ADMIN => user,
        _ => return auth_challenge(),
    };

    let requested = query.next.as_deref().unwrap_or_default();
    let redirect = if requested.starts_with("/admin") {
        requested
    } else {
        "/admin/dashboard"
    };
    log::info!("{} signed in to the dashboard", user.display_name);

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, redirect))
        .cookie(clear_logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{AUTH_REALM}\"")))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}
