mod auth;
mod bookings;
mod calendar;
mod catalog;
mod config;
mod db;
mod error;
mod format;
mod models;
mod promotions;
mod push;
mod routes;
mod schedule;
mod settings;
mod state;
mod stats;
mod stickers;
mod store;
mod templates;
mod wizard;

use std::str::FromStr;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::broadcast;

use crate::{
    config::Config,
    state::AppState,
    store::{SqliteStore, Storage},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    db::ensure_sqlite_dir(&config.database_url)?;

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_admin(&pool, &config.admin).await?;

    if !config.push.enabled() {
        log::info!("VAPID keys not set; push notifications are disabled");
    }

    let storage = Storage::new(Arc::new(SqliteStore::new(pool.clone())))
        .with_quota(config.storage_quota);
    let (events, _) = broadcast::channel(64);
    let state = AppState {
        db: pool,
        storage,
        events,
        push: config.push.clone(),
        static_dir: config.static_dir.clone(),
    };

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting Régua Máxima on http://{address}");

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", static_dir.clone()).prefer_utf8(true))
            .service(Files::new("/assets", static_dir.join("assets")))
            .configure(routes::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
