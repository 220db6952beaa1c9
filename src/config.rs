use std::{env, path::PathBuf};

use crate::{state::PushConfig, store::DEFAULT_QUOTA_BYTES};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub storage_quota: usize,
    pub push: PushConfig,
    pub admin: AdminSeed,
}

/// Credentials for the dashboard account created on an empty database.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            database_url: text("DATABASE_URL", "sqlite://./data/regua-maxima.db"),
            port: lookup("PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            static_dir: PathBuf::from(text("STATIC_DIR", "./static")),
            storage_quota: lookup("STORAGE_QUOTA_BYTES")
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_QUOTA_BYTES),
            push: PushConfig {
                public_key: text("VAPID_PUBLIC_KEY", ""),
                private_key: text("VAPID_PRIVATE_KEY", ""),
                subject: text("VAPID_SUBJECT", "mailto:contato@reguamaxima.com.br"),
            },
            admin: AdminSeed {
                username: text("ADMIN_USER", "admin"),
                password: text("ADMIN_PASSWORD", "admin"),
                display_name: text("ADMIN_DISPLAY_NAME", "Pablo Silva"),
            },
        }
    }
}
