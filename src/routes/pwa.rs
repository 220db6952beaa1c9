use actix_files::NamedFile;
use actix_web::{http::header, web, HttpResponse, Responder, Result};
use askama::Template;

use crate::{error::AppError, models::BarbershopProfile, state::AppState, templates::render};

#[derive(Template)]
#[template(path = "offline.html")]
struct OfflineTemplate {
    shop_name: String,
    logo: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/sw.js").route(web::get().to(service_worker)))
        .service(web::resource("/manifest.webmanifest").route(web::get().to(manifest)))
        .service(web::resource("/admin/offline").route(web::get().to(offline)));
}

/// Served from the root so the worker may control every page.
async fn service_worker(state: web::Data<AppState>) -> Result<impl Responder> {
    let file = NamedFile::open_async(state.static_dir.join("sw.js")).await?;
    Ok(file
        .customize()
        .insert_header(("Service-Worker-Allowed", "/"))
        .insert_header((header::CACHE_CONTROL, "no-cache")))
}

async fn manifest(state: web::Data<AppState>) -> Result<impl Responder> {
    let file = NamedFile::open_async(state.static_dir.join("manifest.webmanifest")).await?;
    Ok(file
        .customize()
        .insert_header((header::CONTENT_TYPE, "application/manifest+json")))
}

async fn offline(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile: BarbershopProfile = state.storage.document().await?;
    Ok(render(OfflineTemplate {
        shop_name: profile.name,
        logo: profile.logo,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};

    use super::*;
    use crate::state::test_state;

    async fn state_with_assets() -> AppState {
        let mut state = test_state().await;
        let dir = std::env::temp_dir().join(format!("regua-pwa-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("sw.js"), "self.addEventListener('fetch', () => {});").unwrap();
        std::fs::write(dir.join("manifest.webmanifest"), r#"{"name":"Régua Máxima"}"#).unwrap();
        state.static_dir = dir;
        state
    }

    #[actix_web::test]
    async fn worker_and_manifest_carry_their_headers() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_assets().await))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/sw.js").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("Service-Worker-Allowed").unwrap(), "/");
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/manifest.webmanifest").to_request(),
        )
        .await;
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/manifest+json"
        );
    }

    #[actix_web::test]
    async fn offline_page_needs_no_login() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state().await))
                .configure(crate::routes::configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/admin/offline").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(String::from_utf8_lossy(&body).contains("Você está offline"));
    }
}
