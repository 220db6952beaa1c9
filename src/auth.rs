use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorUnauthorized,
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{
    models::{UserRow, ROLE_ADMIN},
    state::AppState,
};

pub const AUTH_REALM: &str = "Regua Maxima";
const LOGOUT_COOKIE: &str = "rm_logged_out";

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn authenticate_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Option<AuthUser> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, username, display_name, role, password_hash, active, created_at
           FROM users
           WHERE username = ? AND active = 1
           LIMIT 1"#,
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .unwrap_or_else(|err| {
        log::error!("User lookup failed: {err}");
        None
    })?;

    if !verify_password(password, &user.password_hash) {
        log::warn!("Rejected dashboard login for {username}");
        return None;
    }

    Some(AuthUser {
        id: user.id,
        display_name: user.display_name,
        role: user.role,
    })
}

/// Guards the dashboard and the management API: valid credentials of an
/// active admin account.
pub async fn dashboard_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Err((ErrorUnauthorized("Unauthorized"), req));
    };
    let password = credentials.password().unwrap_or_default();
    match authenticate_credentials(&state, credentials.user_id(), password).await {
        Some(user) if user.role == ROLE_ADMIN => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Some(_) => Err((ErrorUnauthorized("Admin access required"), req)),
        None => Err((ErrorUnauthorized("Unauthorized"), req)),
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn session_cookie(req: &HttpRequest, value: &'static str, max_age: Duration) -> Cookie<'static> {
    let mut builder = Cookie::build(LOGOUT_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age);
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    session_cookie(req, "1", Duration::days(365))
}

pub fn clear_logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    session_cookie(req, "", Duration::seconds(0))
}

pub fn is_logged_out(req: &HttpRequest) -> bool {
    req.cookie(LOGOUT_COOKIE).is_some()
}

/// Browsers keep replaying basic credentials, so a logout is remembered in a
/// cookie and every dashboard request is turned away until the next login.
pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    if is_logged_out(req.request()) {
        let body = r#"<!doctype html>
<html lang="pt-BR">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Sessão encerrada</title>
    <link rel="stylesheet" href="/static/app.css" />
  </head>
  <body class="centered">
    <div class="card">
      <h1>Você saiu do painel</h1>
      <p>Sua sessão foi encerrada.</p>
      <p><a href="/login?next=/admin/dashboard">Entrar novamente</a> ou <a href="/">voltar ao início</a>.</p>
    </div>
  </body>
</html>"#;
        let response = HttpResponse::Unauthorized()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .content_type("text/html; charset=utf-8")
            .body(body);
        return Ok(req.into_response(response));
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}
