use std::collections::HashMap;

use actix_web::{http::header, middleware::from_fn, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    auth::{dashboard_validator, logout_guard, AuthUser},
    bookings::{self, BookingFilter},
    catalog::{self, ProfessionalDraft, ServiceDraft},
    error::AppError,
    format::format_brl,
    models::{
        BarbershopProfile, Booking, BookingStatus, DaySchedule, Priority, Professional, Promotion,
        PromotionStatus, Service, StickerFavorites, WorkingHours, weekday_key, weekday_label,
    },
    promotions::{self, PromotionDraft},
    push::{self, PushSubscriptionInput},
    routes::{announce, local_now, parse_price, present, BOOKING_UPDATED},
    settings,
    state::AppState,
    stats, stickers,
    templates::{render, BookingView},
};

/// One-shot message shown above a form after a POST.
#[derive(Clone, Debug, Default)]
struct Flash {
    kind: &'static str,
    message: String,
}

impl Flash {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }

    fn is_set(&self) -> bool {
        !self.message.is_empty()
    }
}

/// Form-level failures are shown to the user; anything else is a real error.
fn flash_or_fail(err: AppError) -> Result<Flash, AppError> {
    match err {
        AppError::Validation(message) => Ok(Flash::error(message)),
        AppError::NotFound(entity) => Ok(Flash::error(format!("Registro não encontrado ({entity})."))),
        AppError::InvalidTransition { .. } => Ok(Flash::error(
            "Somente agendamentos marcados podem ser alterados.",
        )),
        other => Err(other),
    }
}

#[derive(Clone, Debug)]
struct StatCard {
    label: &'static str,
    value: usize,
}

#[derive(Clone, Debug)]
struct FilterOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct DashboardTemplate {
    active: &'static str,
    admin_name: String,
    stats: Vec<StatCard>,
    upcoming: Vec<BookingView>,
    vapid_public_key: String,
    push_enabled: bool,
}

#[derive(Template)]
#[template(path = "admin_bookings.html")]
struct BookingsTemplate {
    active: &'static str,
    bookings: Vec<BookingView>,
    statuses: Vec<FilterOption>,
    date_filter: String,
    search: String,
}

#[derive(Template)]
#[template(path = "admin_booking_detail.html")]
struct BookingDetailTemplate {
    active: &'static str,
    booking: BookingView,
    flash: Flash,
}

#[derive(Clone, Debug)]
struct ServiceRow {
    id: String,
    name: String,
    price: String,
    price_input: String,
    duration: u32,
    image: String,
}

#[derive(Template)]
#[template(path = "admin_services.html")]
struct ServicesTemplate {
    active: &'static str,
    services: Vec<ServiceRow>,
    flash: Flash,
}

#[derive(Template)]
#[template(path = "admin_staff.html")]
struct StaffTemplate {
    active: &'static str,
    professionals: Vec<Professional>,
    flash: Flash,
}

#[derive(Clone, Debug)]
struct DayRow {
    key: &'static str,
    label: &'static str,
    schedule: DaySchedule,
}

#[derive(Template)]
#[template(path = "admin_hours.html")]
struct HoursTemplate {
    active: &'static str,
    days: Vec<DayRow>,
    flash: Flash,
}

#[derive(Template)]
#[template(path = "admin_profile.html")]
struct ProfileTemplate {
    active: &'static str,
    profile: BarbershopProfile,
    flash: Flash,
}

#[derive(Clone, Debug)]
struct PromotionRow {
    id: String,
    title: String,
    description: String,
    image: String,
    link: String,
    start_date: String,
    end_date: String,
    period: String,
    status: &'static str,
    status_label: &'static str,
    priority: &'static str,
    priority_label: &'static str,
    view_count: u64,
}

impl From<&Promotion> for PromotionRow {
    fn from(promotion: &Promotion) -> Self {
        Self {
            id: promotion.id.clone(),
            title: promotion.title.clone(),
            description: promotion.description.clone(),
            image: promotion.image.clone().unwrap_or_default(),
            link: promotion.link.clone().unwrap_or_default(),
            start_date: promotion.start_date.format("%Y-%m-%d").to_string(),
            end_date: promotion.end_date.format("%Y-%m-%d").to_string(),
            period: format!(
                "{} a {}",
                promotion.start_date.format("%d/%m/%Y"),
                promotion.end_date.format("%d/%m/%Y")
            ),
            status: promotion.status.as_str(),
            status_label: promotion.status.label(),
            priority: promotion.priority.as_str(),
            priority_label: promotion.priority.label(),
            view_count: promotion.view_count,
        }
    }
}

#[derive(Template)]
#[template(path = "admin_promotions.html")]
struct PromotionsTemplate {
    active: &'static str,
    promotions: Vec<PromotionRow>,
    statuses: Vec<FilterOption>,
    priorities: Vec<FilterOption>,
    search: String,
    flash: Flash,
}

#[derive(Template)]
#[template(path = "admin_promotion_preview.html")]
struct PromotionPreviewTemplate {
    active: &'static str,
    promotion: PromotionRow,
}

#[derive(Clone, Debug)]
struct CategoryTab {
    key: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin_stickers.html")]
struct StickersTemplate {
    active: &'static str,
    tabs: Vec<CategoryTab>,
    current: String,
    stickers: Vec<stickers::Sticker>,
    showing_favorites: bool,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(dashboard_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/bookings").route(web::get().to(list_bookings)))
            .service(web::resource("/bookings/{id}").route(web::get().to(booking_detail)))
            .service(web::resource("/bookings/{id}/cancel").route(web::post().to(cancel_booking)))
            .service(
                web::resource("/bookings/{id}/complete").route(web::post().to(complete_booking)),
            )
            .service(
                web::resource("/services")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(web::resource("/services/{id}").route(web::post().to(update_service)))
            .service(web::resource("/services/{id}/delete").route(web::post().to(delete_service)))
            .service(
                web::resource("/staff")
                    .route(web::get().to(list_staff))
                    .route(web::post().to(create_professional)),
            )
            .service(web::resource("/staff/{id}").route(web::post().to(update_professional)))
            .service(
                web::resource("/staff/{id}/delete").route(web::post().to(delete_professional)),
            )
            .service(
                web::resource("/hours")
                    .route(web::get().to(show_hours))
                    .route(web::post().to(save_hours)),
            )
            .service(
                web::resource("/profile")
                    .route(web::get().to(show_profile))
                    .route(web::post().to(save_profile)),
            )
            .service(
                web::resource("/promotions")
                    .route(web::get().to(list_promotions))
                    .route(web::post().to(create_promotion)),
            )
            .service(web::resource("/promotions/{id}").route(web::post().to(update_promotion)))
            .service(
                web::resource("/promotions/{id}/delete").route(web::post().to(delete_promotion)),
            )
            .service(
                web::resource("/promotions/{id}/preview").route(web::get().to(preview_promotion)),
            )
            .service(web::resource("/stickers").route(web::get().to(sticker_gallery)))
            .service(web::resource("/stickers/favorite").route(web::post().to(toggle_sticker)))
            .service(
                web::resource("/stickers/favorites/clear").route(web::post().to(clear_stickers)),
            )
            .service(web::resource("/push/subscribe").route(web::post().to(subscribe_push))),
    );
}

fn see_other(location: impl Into<String>) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location.into()))
        .finish()
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let overview = stats::overview(&state.storage, local_now()).await?;
    let stats = vec![
        StatCard {
            label: "Profissionais",
            value: overview.professionals,
        },
        StatCard {
            label: "Clientes",
            value: overview.clients,
        },
        StatCard {
            label: "Hoje",
            value: overview.today,
        },
        StatCard {
            label: "Últimos 7 dias",
            value: overview.last_seven_days,
        },
        StatCard {
            label: "Este mês",
            value: overview.this_month,
        },
    ];

    Ok(render(DashboardTemplate {
        active: "dashboard",
        admin_name: auth.display_name.clone(),
        stats,
        upcoming: overview.upcoming.iter().map(BookingView::from).collect(),
        vapid_public_key: state.push.public_key.clone(),
        push_enabled: state.push.enabled(),
    }))
}

async fn list_bookings(
    state: web::Data<AppState>,
    query: web::Query<BookingFilter>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner();
    let all: Vec<Booking> = state.storage.list().await?;
    let matching = bookings::filter_bookings(all, &filter);

    let current = filter.status.clone().unwrap_or_default();
    let mut statuses = vec![FilterOption {
        value: "all",
        label: "Todos",
        selected: BookingStatus::parse(&current).is_none(),
    }];
    statuses.extend(BookingStatus::ALL.into_iter().map(|status| FilterOption {
        value: status.as_str(),
        label: status.label(),
        selected: status.as_str() == current,
    }));

    Ok(render(BookingsTemplate {
        active: "bookings",
        bookings: matching.iter().map(BookingView::from).collect(),
        statuses,
        date_filter: filter.date.unwrap_or_default(),
        search: filter.search.unwrap_or_default(),
    }))
}

async fn booking_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let booking = state
        .storage
        .get::<Booking>(&id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    Ok(render(BookingDetailTemplate {
        active: "bookings",
        booking: BookingView::from(&booking),
        flash: Flash::default(),
    }))
}

async fn change_status(
    state: &AppState,
    id: &str,
    next: BookingStatus,
) -> Result<HttpResponse, AppError> {
    let flash = match bookings::set_status(&state.storage, id, next).await {
        Ok(booking) => {
            announce(state, BOOKING_UPDATED, &booking).await;
            Flash::success(format!("Agendamento {}.", next.label().to_lowercase()))
        }
        Err(err) => flash_or_fail(err)?,
    };
    let booking = state
        .storage
        .get::<Booking>(id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    Ok(render(BookingDetailTemplate {
        active: "bookings",
        booking: BookingView::from(&booking),
        flash,
    }))
}

async fn cancel_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    change_status(&state, &path.into_inner(), BookingStatus::Cancelled).await
}

async fn complete_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    change_status(&state, &path.into_inner(), BookingStatus::Completed).await
}

#[derive(Deserialize)]
struct ServiceForm {
    name: String,
    price: String,
    duration: String,
    image: Option<String>,
}

impl ServiceForm {
    fn into_draft(self) -> Result<ServiceDraft, AppError> {
        let price =
            parse_price(&self.price).ok_or_else(|| AppError::validation("Preço inválido."))?;
        let duration = self
            .duration
            .trim()
            .parse::<u32>()
            .map_err(|_| AppError::validation("Duração inválida."))?;
        Ok(ServiceDraft {
            name: self.name,
            price,
            duration,
            image: present(self.image),
        })
    }
}

async fn services_page(state: &AppState, flash: Flash) -> Result<HttpResponse, AppError> {
    let services: Vec<Service> = state.storage.list().await?;
    Ok(render(ServicesTemplate {
        active: "services",
        services: services
            .into_iter()
            .map(|service| ServiceRow {
                price: format_brl(service.price),
                price_input: format!("{:.2}", service.price),
                id: service.id,
                name: service.name,
                duration: service.duration,
                image: service.image,
            })
            .collect(),
        flash,
    }))
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    services_page(&state, Flash::default()).await
}

async fn store_service(
    state: &AppState,
    id: Option<&str>,
    form: ServiceForm,
) -> Result<HttpResponse, AppError> {
    let saved = match form.into_draft() {
        Ok(draft) => catalog::save_service(&state.storage, id, draft).await,
        Err(err) => Err(err),
    };
    let flash = match saved {
        Ok(service) => Flash::success(format!("Serviço {} salvo.", service.name)),
        Err(err) => flash_or_fail(err)?,
    };
    services_page(state, flash).await
}

async fn create_service(
    state: web::Data<AppState>,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse, AppError> {
    store_service(&state, None, form.into_inner()).await
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse, AppError> {
    store_service(&state, Some(&path.into_inner()), form.into_inner()).await
}

async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let flash = match catalog::delete_service(&state.storage, &path.into_inner()).await {
        Ok(()) => Flash::success("Serviço removido."),
        Err(err) => flash_or_fail(err)?,
    };
    services_page(&state, flash).await
}

#[derive(Deserialize)]
struct ProfessionalForm {
    name: String,
    specialty: Option<String>,
    image: Option<String>,
}

async fn staff_page(state: &AppState, flash: Flash) -> Result<HttpResponse, AppError> {
    let professionals: Vec<Professional> = state.storage.list().await?;
    Ok(render(StaffTemplate {
        active: "staff",
        professionals,
        flash,
    }))
}

async fn list_staff(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    staff_page(&state, Flash::default()).await
}

async fn store_professional(
    state: &AppState,
    id: Option<&str>,
    form: ProfessionalForm,
) -> Result<HttpResponse, AppError> {
    let draft = ProfessionalDraft {
        name: form.name,
        specialty: present(form.specialty),
        image: present(form.image),
    };
    let flash = match catalog::save_professional(&state.storage, id, draft).await {
        Ok(professional) => Flash::success(format!("{} salvo.", professional.name)),
        Err(err) => flash_or_fail(err)?,
    };
    staff_page(state, flash).await
}

async fn create_professional(
    state: web::Data<AppState>,
    form: web::Form<ProfessionalForm>,
) -> Result<HttpResponse, AppError> {
    store_professional(&state, None, form.into_inner()).await
}

async fn update_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ProfessionalForm>,
) -> Result<HttpResponse, AppError> {
    store_professional(&state, Some(&path.into_inner()), form.into_inner()).await
}

async fn delete_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let flash = match catalog::delete_professional(&state.storage, &path.into_inner()).await {
        Ok(()) => Flash::success("Profissional removido."),
        Err(err) => flash_or_fail(err)?,
    };
    staff_page(&state, flash).await
}

fn hours_template(hours: &WorkingHours, flash: Flash) -> HoursTemplate {
    HoursTemplate {
        active: "hours",
        days: WorkingHours::WEEK
            .into_iter()
            .map(|weekday| DayRow {
                key: weekday_key(weekday),
                label: weekday_label(weekday),
                schedule: hours.day(weekday).clone(),
            })
            .collect(),
        flash,
    }
}

async fn show_hours(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let hours: WorkingHours = state.storage.document().await?;
    Ok(render(hours_template(&hours, Flash::default())))
}

/// Fields are named `<weekday>_<field>`; an unchecked `enabled` box is absent.
fn hours_from_form(form: &HashMap<String, String>) -> WorkingHours {
    let mut hours = WorkingHours::default();
    for weekday in WorkingHours::WEEK {
        let key = weekday_key(weekday);
        let field = |name: &str| {
            form.get(&format!("{key}_{name}"))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        *hours.day_mut(weekday) = DaySchedule {
            enabled: form.contains_key(&format!("{key}_enabled")),
            open_time: field("open"),
            close_time: field("close"),
            break_start: field("break_start"),
            break_end: field("break_end"),
        };
    }
    hours
}

async fn save_hours(
    state: web::Data<AppState>,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let submitted = hours_from_form(&form);
    match settings::save_hours(&state.storage, submitted.clone()).await {
        Ok(hours) => Ok(render(hours_template(&hours, Flash::success("Horários salvos.")))),
        Err(err) => {
            let flash = flash_or_fail(err)?;
            Ok(render(hours_template(&submitted, flash)))
        }
    }
}

async fn show_profile(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile: BarbershopProfile = state.storage.document().await?;
    Ok(render(ProfileTemplate {
        active: "profile",
        profile,
        flash: Flash::default(),
    }))
}

#[derive(Deserialize)]
struct ProfileForm {
    name: String,
    logo: String,
    instagram: String,
    whatsapp: String,
    description: String,
}

async fn save_profile(
    state: web::Data<AppState>,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let submitted = BarbershopProfile {
        name: form.name,
        logo: form.logo.trim().to_string(),
        instagram: form.instagram.trim().to_string(),
        whatsapp: form.whatsapp.trim().to_string(),
        description: form.description.trim().to_string(),
    };
    let (profile, flash) = match settings::save_profile(&state.storage, submitted.clone()).await {
        Ok((profile, saved)) => {
            let message = saved
                .warning()
                .unwrap_or_else(|| "Perfil atualizado.".to_string());
            (profile, Flash::success(message))
        }
        Err(err) => (submitted, flash_or_fail(err)?),
    };
    Ok(render(ProfileTemplate {
        active: "profile",
        profile,
        flash,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct PromotionQuery {
    status: Option<String>,
    search: Option<String>,
}

async fn promotions_page(
    state: &AppState,
    query: PromotionQuery,
    flash: Flash,
) -> Result<HttpResponse, AppError> {
    let today = local_now().date();
    let status = query.status.as_deref().and_then(PromotionStatus::parse);
    let all = promotions::list(&state.storage, today).await?;
    let matching = promotions::filter(all, status, query.search.as_deref());

    let mut statuses = vec![FilterOption {
        value: "all",
        label: "Todas",
        selected: status.is_none(),
    }];
    statuses.extend(PromotionStatus::ALL.into_iter().map(|candidate| FilterOption {
        value: candidate.as_str(),
        label: candidate.label(),
        selected: status == Some(candidate),
    }));

    Ok(render(PromotionsTemplate {
        active: "promotions",
        promotions: matching.iter().map(PromotionRow::from).collect(),
        statuses,
        priorities: Priority::ALL
            .into_iter()
            .map(|priority| FilterOption {
                value: priority.as_str(),
                label: priority.label(),
                selected: priority == Priority::default(),
            })
            .collect(),
        search: query.search.unwrap_or_default(),
        flash,
    }))
}

async fn list_promotions(
    state: web::Data<AppState>,
    query: web::Query<PromotionQuery>,
) -> Result<HttpResponse, AppError> {
    promotions_page(&state, query.into_inner(), Flash::default()).await
}

#[derive(Deserialize)]
struct PromotionForm {
    title: String,
    description: Option<String>,
    image: Option<String>,
    link: Option<String>,
    start_date: String,
    end_date: String,
    priority: Option<String>,
}

impl PromotionForm {
    fn into_draft(self) -> Result<PromotionDraft, AppError> {
        let date = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| AppError::validation("Informe datas válidas de início e término."))
        };
        Ok(PromotionDraft {
            start_date: date(&self.start_date)?,
            end_date: date(&self.end_date)?,
            title: self.title,
            description: self.description.unwrap_or_default(),
            image: present(self.image),
            priority: self
                .priority
                .as_deref()
                .and_then(Priority::parse)
                .unwrap_or_default(),
            link: present(self.link),
        })
    }
}

async fn store_promotion(
    state: &AppState,
    id: Option<&str>,
    form: PromotionForm,
) -> Result<HttpResponse, AppError> {
    let today = local_now().date();
    let saved = match form.into_draft() {
        Ok(draft) => promotions::save(&state.storage, id, draft, today).await,
        Err(err) => Err(err),
    };
    let flash = match saved {
        Ok((promotion, saved)) => Flash::success(
            saved
                .warning()
                .unwrap_or_else(|| format!("Promoção {} salva.", promotion.title)),
        ),
        Err(err) => flash_or_fail(err)?,
    };
    promotions_page(state, PromotionQuery::default(), flash).await
}

async fn create_promotion(
    state: web::Data<AppState>,
    form: web::Form<PromotionForm>,
) -> Result<HttpResponse, AppError> {
    store_promotion(&state, None, form.into_inner()).await
}

async fn update_promotion(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<PromotionForm>,
) -> Result<HttpResponse, AppError> {
    store_promotion(&state, Some(&path.into_inner()), form.into_inner()).await
}

async fn delete_promotion(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let flash = match promotions::delete(&state.storage, &path.into_inner()).await {
        Ok(()) => Flash::success("Promoção removida."),
        Err(err) => flash_or_fail(err)?,
    };
    promotions_page(&state, PromotionQuery::default(), flash).await
}

async fn preview_promotion(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut promotion = promotions::record_view(&state.storage, &path.into_inner()).await?;
    promotion.status =
        promotions::status_on(promotion.start_date, promotion.end_date, local_now().date());
    Ok(render(PromotionPreviewTemplate {
        active: "promotions",
        promotion: PromotionRow::from(&promotion),
    }))
}

const FAVORITES_TAB: &str = "favoritos";

#[derive(Deserialize)]
struct StickerQuery {
    category: Option<String>,
}

async fn sticker_gallery(
    state: web::Data<AppState>,
    query: web::Query<StickerQuery>,
) -> Result<HttpResponse, AppError> {
    let favorites: StickerFavorites = state.storage.document().await?;
    let requested = query.into_inner().category.unwrap_or_default();
    let showing_favorites = requested == FAVORITES_TAB;
    let category = stickers::category(&requested).unwrap_or(stickers::CATEGORIES[0]);

    let items = if showing_favorites {
        favorites
            .0
            .iter()
            .map(|url| stickers::Sticker {
                name: url.rsplit('/').next().unwrap_or_default().to_string(),
                url: url.clone(),
                favorite: true,
            })
            .collect()
    } else {
        stickers::list(&state.static_dir, category, &favorites).map_err(|err| {
            log::error!("Could not read stickers for {}: {err}", category.key);
            AppError::validation("Não foi possível carregar as figurinhas.")
        })?
    };

    let current = if showing_favorites {
        FAVORITES_TAB
    } else {
        category.key
    };
    Ok(render(StickersTemplate {
        active: "stickers",
        tabs: stickers::CATEGORIES
            .into_iter()
            .map(|tab| CategoryTab {
                key: tab.key,
                label: tab.label,
                selected: !showing_favorites && tab.key == category.key,
            })
            .collect(),
        current: current.to_string(),
        stickers: items,
        showing_favorites,
    }))
}

#[derive(Deserialize)]
struct FavoriteForm {
    url: String,
    category: Option<String>,
}

async fn toggle_sticker(
    state: web::Data<AppState>,
    form: web::Form<FavoriteForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    stickers::toggle_favorite(&state.storage, &form.url).await?;
    let category = present(form.category).unwrap_or_else(|| stickers::CATEGORIES[0].key.to_string());
    Ok(see_other(format!(
        "/admin/stickers?category={}",
        urlencoding::encode(&category)
    )))
}

async fn clear_stickers(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    stickers::clear_favorites(&state.storage).await?;
    Ok(see_other(format!("/admin/stickers?category={FAVORITES_TAB}")))
}

async fn subscribe_push(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<PushSubscriptionInput>,
) -> Result<HttpResponse, AppError> {
    push::store_subscription(&state.db, &auth.id, payload.into_inner()).await?;
    log::info!("{} enabled push notifications", auth.display_name);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use chrono::{Datelike, Duration, Weekday};

    use super::*;
    use crate::{routes, state::test_state};

    // "admin:navalha"
    const CREDENTIALS: &str = "Basic YWRtaW46bmF2YWxoYQ==";

    async fn admin_state() -> AppState {
        let state = test_state().await;
        crate::db::create_user(&state.db, "admin", "Pablo Silva", "navalha")
            .await
            .unwrap();
        state
    }

    fn get(uri: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, CREDENTIALS))
    }

    fn post(uri: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, CREDENTIALS))
    }

    #[actix_web::test]
    async fn dashboard_requires_credentials() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(admin_state().await))
                .configure(routes::configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/admin/dashboard").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, get("/admin/dashboard").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            get("/admin/dashboard")
                .cookie(actix_web::cookie::Cookie::new("rm_logged_out", "1"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn booking_a_new_service_shows_up_in_the_dashboard() {
        let state = admin_state().await;
        let storage = state.storage.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure),
        )
        .await;

        let req = post("/admin/services")
            .set_form([("name", "Corte"), ("price", "35,00"), ("duration", "45")])
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(String::from_utf8_lossy(&body).contains("Serviço Corte salvo."));

        let services: Vec<Service> = storage.list().await.unwrap();
        let corte = services.iter().find(|s| s.name == "Corte").unwrap();
        assert_eq!((corte.price, corte.duration), (35.0, 45));

        let mut monday = local_now().date() + Duration::days(1);
        while monday.weekday() != Weekday::Mon {
            monday += Duration::days(1);
        }
        let monday = monday.format("%Y-%m-%d").to_string();
        let req = test::TestRequest::post()
            .uri("/book")
            .set_form([
                ("step", "4"),
                ("professional_id", "1"),
                ("service_id", corte.id.as_str()),
                ("date", monday.as_str()),
                ("time", "09:30"),
                ("full_name", "Carla Dias"),
                ("phone", "(21) 3333-4444"),
                ("action", "confirm"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = get("/admin/bookings?status=scheduled").to_request();
        let body = String::from_utf8_lossy(&test::call_and_read_body(&app, req).await).to_string();
        assert_eq!(body.matches("data-booking-id=").count(), 1);
        assert!(body.contains("Carla Dias"));
        assert!(body.contains("R$ 35,00"));
    }

    #[actix_web::test]
    async fn cancelling_from_the_detail_page() {
        let state = admin_state().await;
        let storage = state.storage.clone();
        let mut events = state.events.subscribe();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure),
        )
        .await;

        let booking: Booking = serde_json::from_value(serde_json::json!({
            "id": "agd_20991019_001", "clientName": "Ana Lima", "clientPhone": "(11) 98765-4321",
            "professionalId": "1", "professionalName": "Pablo Silva", "serviceId": "svc_cut",
            "serviceName": "Corte de cabelo", "date": "2099-10-19", "time": "09:00",
            "price": 35, "status": "scheduled"
        }))
        .unwrap();
        storage.save(booking).await.unwrap();

        let req = post("/admin/bookings/agd_20991019_001/cancel").to_request();
        let body = String::from_utf8_lossy(&test::call_and_read_body(&app, req).await).to_string();
        assert!(body.contains("Cancelado"));
        assert_eq!(events.try_recv().unwrap().status, "cancelled");

        let req = post("/admin/bookings/agd_20991019_001/complete").to_request();
        let body = String::from_utf8_lossy(&test::call_and_read_body(&app, req).await).to_string();
        assert!(body.contains("Somente agendamentos marcados podem ser alterados."));

        let resp = test::call_service(&app, get("/admin/bookings/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_hours_are_reported_and_not_saved() {
        let state = admin_state().await;
        let storage = state.storage.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure),
        )
        .await;

        let req = post("/admin/hours")
            .set_form([
                ("monday_enabled", "on"),
                ("monday_open", "18:00"),
                ("monday_close", "08:00"),
            ])
            .to_request();
        let body = String::from_utf8_lossy(&test::call_and_read_body(&app, req).await).to_string();
        assert!(body.contains("Segunda-feira"));
        let hours: WorkingHours = storage.document().await.unwrap();
        assert_eq!(hours, WorkingHours::default());

        let req = post("/admin/hours")
            .set_form([
                ("tuesday_enabled", "on"),
                ("tuesday_open", "09:00"),
                ("tuesday_close", "19:00"),
            ])
            .to_request();
        test::call_service(&app, req).await;
        let hours: WorkingHours = storage.document().await.unwrap();
        assert!(!hours.monday.enabled);
        assert_eq!(hours.tuesday.close_time, "19:00");
        assert!(hours.tuesday.break_start.is_empty());
    }

    #[actix_web::test]
    async fn hours_form_reads_every_day() {
        let form: HashMap<String, String> = [
            ("saturday_enabled", "on"),
            ("saturday_open", " 08:00 "),
            ("saturday_close", "12:00"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let hours = hours_from_form(&form);
        assert!(hours.saturday.enabled);
        assert_eq!(hours.saturday.open_time, "08:00");
        assert!(WorkingHours::WEEK
            .into_iter()
            .filter(|day| *day != Weekday::Sat)
            .all(|day| !hours.day(day).enabled));
    }
}
