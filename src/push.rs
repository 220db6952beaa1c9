use serde::Deserialize;
use sqlx::SqlitePool;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::{
    auth::new_id,
    state::{AppState, PushConfig},
};

/// The JSON a browser hands out from `PushManager.subscribe()`.
#[derive(Debug, Deserialize)]
pub struct PushSubscriptionInput {
    pub endpoint: String,
    pub keys: PushKeys,
}

#[derive(Debug, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PushSubscriptionRow {
    endpoint: String,
    p256dh: String,
    auth: String,
}

/// Registers a dashboard device. Re-subscribing the same endpoint refreshes
/// its keys.
pub async fn store_subscription(
    pool: &SqlitePool,
    user_id: &str,
    subscription: PushSubscriptionInput,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO push_subscriptions (id, endpoint, p256dh, auth, user_id, created_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(endpoint) DO UPDATE SET
             p256dh = excluded.p256dh,
             auth = excluded.auth,
             user_id = excluded.user_id"#,
    )
    .bind(new_id())
    .bind(subscription.endpoint)
    .bind(subscription.keys.p256dh)
    .bind(subscription.keys.auth)
    .bind(user_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn remove_subscription(pool: &SqlitePool, endpoint: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = ?")
        .bind(endpoint)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Sends `body` as a plain-text push to every registered dashboard and
/// returns how many were delivered. The service worker shows it under the
/// shop's name.
pub async fn notify_dashboards(state: &AppState, body: &str) -> usize {
    if !state.push.enabled() {
        return 0;
    }

    let rows = match sqlx::query_as::<_, PushSubscriptionRow>(
        "SELECT endpoint, p256dh, auth FROM push_subscriptions",
    )
    .fetch_all(&state.db)
    .await
    {
        Ok(rows) => rows,
        Err(err) => {
            log::warn!("Could not load push subscriptions: {err}");
            return 0;
        }
    };

    let mut delivered = 0;
    for row in rows {
        let endpoint = row.endpoint.clone();
        match send_push(&state.push, row, body).await {
            Ok(()) => delivered += 1,
            Err(WebPushError::EndpointNotValid { .. } | WebPushError::EndpointNotFound { .. }) => {
                log::info!("Dropping expired push endpoint {endpoint}");
                if let Err(err) = remove_subscription(&state.db, &endpoint).await {
                    log::warn!("Could not drop push endpoint: {err}");
                }
            }
            Err(err) => log::warn!("Push send failed: {err}"),
        }
    }
    delivered
}

async fn send_push(
    config: &PushConfig,
    row: PushSubscriptionRow,
    payload: &str,
) -> Result<(), WebPushError> {
    let subscription = SubscriptionInfo::new(row.endpoint, row.p256dh, row.auth);
    let mut builder = WebPushMessageBuilder::new(&subscription);
    builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());

    let mut vapid =
        VapidSignatureBuilder::from_base64(&config.private_key, URL_SAFE_NO_PAD, &subscription)?;
    vapid.add_claim("sub", config.subject.clone());
    builder.set_vapid_signature(vapid.build()?);

    let client = IsahcWebPushClient::new()?;
    client.send(builder.build()?).await?;
    Ok(())
}
