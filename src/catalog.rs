//! Services and staff managed from the dashboard.

use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{Professional, Service, DEFAULT_PROFESSIONAL_IMAGE, DEFAULT_SERVICE_IMAGE, DEFAULT_SPECIALTY},
    store::{Record, Storage},
};

/// A service cannot outlast a whole day.
pub const MAX_SERVICE_DURATION: u32 = 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    pub price: f64,
    pub duration: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl ServiceDraft {
    fn into_service(self, id: String) -> Result<Service, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Informe o nome do serviço."));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::validation("O preço não pode ser negativo."));
        }
        if self.duration == 0 {
            return Err(AppError::validation("A duração deve ser maior que zero."));
        }
        if self.duration > MAX_SERVICE_DURATION {
            return Err(AppError::validation("A duração não pode passar de 24 horas."));
        }
        Ok(Service {
            id,
            name: name.to_string(),
            price: self.price,
            duration: self.duration,
            image: non_empty(self.image).unwrap_or_else(|| DEFAULT_SERVICE_IMAGE.to_string()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfessionalDraft {
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProfessionalDraft {
    fn into_professional(self, id: String) -> Result<Professional, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Informe o nome do profissional."));
        }
        Ok(Professional {
            id,
            name: name.to_string(),
            specialty: non_empty(self.specialty).unwrap_or_else(|| DEFAULT_SPECIALTY.to_string()),
            image: non_empty(self.image).unwrap_or_else(|| DEFAULT_PROFESSIONAL_IMAGE.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `<prefix>_<unix millis>`, bumped until no existing record uses it.
pub fn fresh_id<T: Record>(prefix: &str, existing: &[T]) -> String {
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let id = format!("{prefix}_{stamp}");
        if !existing.iter().any(|record| record.id() == id) {
            return id;
        }
        stamp += 1;
    }
}

/// Fields left out keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<u32>,
    pub image: Option<String>,
}

impl ServicePatch {
    fn over(self, current: &Service) -> ServiceDraft {
        ServiceDraft {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            price: self.price.unwrap_or(current.price),
            duration: self.duration.unwrap_or(current.duration),
            image: self.image.or_else(|| Some(current.image.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessionalPatch {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub image: Option<String>,
}

impl ProfessionalPatch {
    fn over(self, current: &Professional) -> ProfessionalDraft {
        ProfessionalDraft {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            specialty: self.specialty.or_else(|| Some(current.specialty.clone())),
            image: self.image.or_else(|| Some(current.image.clone())),
        }
    }
}

/// Creates when `id` is `None`, otherwise rebuilds the record with that id
/// from its current value.
async fn upsert<T, F>(
    storage: &Storage,
    entity: &'static str,
    prefix: &str,
    id: Option<&str>,
    build: F,
) -> Result<T, AppError>
where
    T: Record,
    F: FnOnce(String, Option<&T>) -> Result<T, AppError>,
{
    let session = storage.session().await;
    let mut records: Vec<T> = session.list().await?;
    let record = match id {
        Some(id) => {
            let index = records
                .iter()
                .position(|record| record.id() == id)
                .ok_or(AppError::NotFound(entity))?;
            let record = build(id.to_string(), Some(&records[index]))?;
            records[index] = record.clone();
            record
        }
        None => {
            let record = build(fresh_id(prefix, &records), None)?;
            records.push(record.clone());
            record
        }
    };
    session.replace(&records).await?;
    Ok(record)
}

pub async fn save_service(
    storage: &Storage,
    id: Option<&str>,
    draft: ServiceDraft,
) -> Result<Service, AppError> {
    let service = upsert(storage, "service", "svc", id, |id, _| draft.into_service(id)).await?;
    log::info!("Saved service {} ({})", service.id, service.name);
    Ok(service)
}

pub async fn patch_service(storage: &Storage, id: &str, patch: ServicePatch) -> Result<Service, AppError> {
    let service = upsert(storage, "service", "svc", Some(id), |id, current: Option<&Service>| {
        let current = current.ok_or(AppError::NotFound("service"))?;
        patch.over(current).into_service(id)
    })
    .await?;
    log::info!("Updated service {}", service.id);
    Ok(service)
}

pub async fn save_professional(
    storage: &Storage,
    id: Option<&str>,
    draft: ProfessionalDraft,
) -> Result<Professional, AppError> {
    let professional = upsert(storage, "professional", "pro", id, |id, _| {
        draft.into_professional(id)
    })
    .await?;
    log::info!("Saved professional {} ({})", professional.id, professional.name);
    Ok(professional)
}

pub async fn patch_professional(
    storage: &Storage,
    id: &str,
    patch: ProfessionalPatch,
) -> Result<Professional, AppError> {
    let professional = upsert(
        storage,
        "professional",
        "pro",
        Some(id),
        |id, current: Option<&Professional>| {
            let current = current.ok_or(AppError::NotFound("professional"))?;
            patch.over(current).into_professional(id)
        },
    )
    .await?;
    log::info!("Updated professional {}", professional.id);
    Ok(professional)
}

/// Existing bookings keep the names they were made with.
pub async fn delete_service(storage: &Storage, id: &str) -> Result<(), AppError> {
    if !storage.delete::<Service>(id).await? {
        return Err(AppError::NotFound("service"));
    }
    log::info!("Deleted service {id}");
    Ok(())
}

pub async fn delete_professional(storage: &Storage, id: &str) -> Result<(), AppError> {
    if !storage.delete::<Professional>(id).await? {
        return Err(AppError::NotFound("professional"));
    }
    log::info!("Deleted professional {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn storage() -> Storage {
        Storage::new(Arc::new(MemoryStore::default()))
    }

    fn corte() -> ServiceDraft {
        ServiceDraft {
            name: " Corte ".into(),
            price: 35.0,
            duration: 45,
            image: None,
        }
    }

    #[actix_web::test]
    async fn creates_and_edits_services() {
        let storage = storage();
        let created = save_service(&storage, None, corte()).await.unwrap();
        assert!(created.id.starts_with("svc_"));
        assert_eq!(created.name, "Corte");
        assert_eq!(created.image, DEFAULT_SERVICE_IMAGE);

        let services: Vec<Service> = storage.list().await.unwrap();
        assert_eq!(services.len(), 7);

        let edited = save_service(
            &storage,
            Some(&created.id),
            ServiceDraft { price: 40.0, ..corte() },
        )
        .await
        .unwrap();
        assert_eq!(edited.id, created.id);
        assert_eq!(storage.get::<Service>(&created.id).await.unwrap().unwrap().price, 40.0);
    }

    #[actix_web::test]
    async fn rejects_invalid_services() {
        let storage = storage();
        for draft in [
            ServiceDraft { name: "  ".into(), ..corte() },
            ServiceDraft { price: -1.0, ..corte() },
            ServiceDraft { duration: 0, ..corte() },
            ServiceDraft { duration: MAX_SERVICE_DURATION + 1, ..corte() },
            ServiceDraft { duration: u32::MAX, ..corte() },
        ] {
            let err = save_service(&storage, None, draft).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        let err = save_service(&storage, Some("svc_missing"), corte()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("service")));

        let draft = ServiceDraft {
            duration: MAX_SERVICE_DURATION,
            ..corte()
        };
        let whole_day = save_service(&storage, None, draft).await.unwrap();
        assert_eq!(whole_day.duration, MAX_SERVICE_DURATION);
    }

    #[actix_web::test]
    async fn patching_cannot_stretch_a_service_past_a_day() {
        let storage = storage();
        let err = patch_service(
            &storage,
            "svc_cut",
            ServicePatch {
                duration: Some(u32::MAX),
                ..ServicePatch::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storage.get::<Service>("svc_cut").await.unwrap().unwrap().duration, 45);
    }

    #[actix_web::test]
    async fn professionals_default_their_specialty() {
        let storage = storage();
        let draft = ProfessionalDraft {
            name: "Rafael Costa".into(),
            specialty: Some(String::new()),
            image: None,
        };
        let created = save_professional(&storage, None, draft).await.unwrap();
        assert_eq!(created.specialty, DEFAULT_SPECIALTY);
        assert!(created.id.starts_with("pro_"));
        let all: Vec<Professional> = storage.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[actix_web::test]
    async fn patches_keep_untouched_fields() {
        let storage = storage();
        let patched = patch_service(
            &storage,
            "svc_cut",
            ServicePatch {
                price: Some(38.0),
                ..ServicePatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(patched.name, "Corte de cabelo");
        assert_eq!(patched.duration, 45);
        assert_eq!(patched.price, 38.0);

        let err = patch_professional(&storage, "nobody", ProfessionalPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("professional")));

        delete_service(&storage, "svc_cut").await.unwrap();
        assert!(matches!(
            delete_service(&storage, "svc_cut").await,
            Err(AppError::NotFound("service"))
        ));
    }

    #[test]
    fn fresh_ids_skip_collisions() {
        let first = fresh_id::<Service>("svc", &[]);
        let taken = vec![Service {
            id: first.clone(),
            name: "x".into(),
            price: 0.0,
            duration: 1,
            image: String::new(),
        }];
        assert_ne!(fresh_id("svc", &taken), first);
    }
}
