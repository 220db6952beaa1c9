//! Promotional banners: dated campaigns shown to clients on the home page.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    catalog::fresh_id,
    error::AppError,
    models::{Priority, Promotion, PromotionStatus, TargetAudience},
    store::{Saved, Storage},
};

/// Both ends of the campaign are inclusive.
pub fn status_on(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> PromotionStatus {
    if today < start {
        PromotionStatus::Scheduled
    } else if today > end {
        PromotionStatus::Expired
    } else {
        PromotionStatus::Active
    }
}

fn refresh(mut promotion: Promotion, today: NaiveDate) -> Promotion {
    promotion.status = status_on(promotion.start_date, promotion.end_date, today);
    promotion
}

/// Every promotion with its status recomputed for `today`, newest start first.
pub async fn list(storage: &Storage, today: NaiveDate) -> Result<Vec<Promotion>, AppError> {
    let mut promotions: Vec<Promotion> = storage
        .list::<Promotion>()
        .await?
        .into_iter()
        .map(|promotion| refresh(promotion, today))
        .collect();
    promotions.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(promotions)
}

/// Keeps promotions in `status` whose title or description contains `search`,
/// ignoring case. Either criterion may be absent.
pub fn filter(
    promotions: Vec<Promotion>,
    status: Option<PromotionStatus>,
    search: Option<&str>,
) -> Vec<Promotion> {
    let term = search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);
    promotions
        .into_iter()
        .filter(|promotion| status.map_or(true, |status| promotion.status == status))
        .filter(|promotion| match &term {
            Some(term) => {
                promotion.title.to_lowercase().contains(term)
                    || promotion.description.to_lowercase().contains(term)
            }
            None => true,
        })
        .collect()
}

/// Active promotions a client may see, highest priority first.
pub async fn list_current(storage: &Storage, today: NaiveDate) -> Result<Vec<Promotion>, AppError> {
    let active = filter(list(storage, today).await?, Some(PromotionStatus::Active), None);
    let mut current: Vec<Promotion> = active
        .into_iter()
        .filter(|promotion| promotion.target_audience != TargetAudience::Barbers)
        .collect();
    current.sort_by_key(|promotion| priority_rank(promotion.priority));
    Ok(current)
}

fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub link: Option<String>,
}

impl PromotionDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Informe o título da promoção."));
        }
        if self.start_date > self.end_date {
            return Err(AppError::validation(
                "A data de início deve ser anterior ou igual à data de término.",
            ));
        }
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Fields left out keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub link: Option<String>,
}

impl PromotionPatch {
    fn over(self, current: &Promotion) -> PromotionDraft {
        PromotionDraft {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self.description.unwrap_or_else(|| current.description.clone()),
            image: self.image.or_else(|| current.image.clone()),
            start_date: self.start_date.unwrap_or(current.start_date),
            end_date: self.end_date.unwrap_or(current.end_date),
            priority: self.priority.unwrap_or(current.priority),
            link: self.link.or_else(|| current.link.clone()),
        }
    }
}

/// Creates or edits a promotion. Promotions created from the dashboard always
/// target clients, and an edit keeps the view count already collected.
pub async fn save(
    storage: &Storage,
    id: Option<&str>,
    draft: PromotionDraft,
    today: NaiveDate,
) -> Result<(Promotion, Saved), AppError> {
    store(storage, id, today, |_| Ok(draft)).await
}

pub async fn patch(
    storage: &Storage,
    id: &str,
    patch: PromotionPatch,
    today: NaiveDate,
) -> Result<(Promotion, Saved), AppError> {
    store(storage, Some(id), today, |current| {
        current
            .map(|current| patch.over(current))
            .ok_or(AppError::NotFound("promotion"))
    })
    .await
}

async fn store<F>(
    storage: &Storage,
    id: Option<&str>,
    today: NaiveDate,
    build: F,
) -> Result<(Promotion, Saved), AppError>
where
    F: FnOnce(Option<&Promotion>) -> Result<PromotionDraft, AppError>,
{
    let session = storage.session().await;
    let mut promotions: Vec<Promotion> = session.list().await?;
    let existing = match id {
        Some(id) => Some(
            promotions
                .iter()
                .position(|promotion| promotion.id == id)
                .ok_or(AppError::NotFound("promotion"))?,
        ),
        None => None,
    };
    let draft = build(existing.map(|index| &promotions[index]))?;
    draft.validate()?;

    let promotion = Promotion {
        id: match existing {
            Some(index) => promotions[index].id.clone(),
            None => fresh_id("pr", &promotions),
        },
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        image: trimmed(draft.image),
        start_date: draft.start_date,
        end_date: draft.end_date,
        target_audience: TargetAudience::Clients,
        priority: draft.priority,
        status: status_on(draft.start_date, draft.end_date, today),
        link: trimmed(draft.link),
        view_count: existing.map_or(0, |index| promotions[index].view_count),
    };

    match existing {
        Some(index) => promotions[index] = promotion.clone(),
        None => promotions.insert(0, promotion.clone()),
    }
    let saved = session.replace(&promotions).await?;
    if let Some(warning) = saved.warning() {
        log::warn!("{warning}");
    }
    log::info!("Saved promotion {} ({})", promotion.id, promotion.status.as_str());
    Ok((promotion, saved))
}

pub async fn delete(storage: &Storage, id: &str) -> Result<(), AppError> {
    if storage.delete::<Promotion>(id).await? {
        log::info!("Deleted promotion {id}");
        Ok(())
    } else {
        Err(AppError::NotFound("promotion"))
    }
}

pub async fn record_view(storage: &Storage, id: &str) -> Result<Promotion, AppError> {
    storage
        .update::<Promotion, _>(id, |promotion| promotion.view_count += 1)
        .await?
        .ok_or(AppError::NotFound("promotion"))
}
