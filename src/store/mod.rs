//! Typed persistence over a string key-value backend.
//!
//! Every entity lives under one key as a JSON document, the same layout the
//! browser build kept in local storage. Reads validate each record against
//! its type; writes replace the whole document.

#[cfg(test)]
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub mod keys {
    pub const BOOKINGS: &str = "userBookings";
    pub const SERVICES: &str = "barbershop_services";
    pub const PROFESSIONALS: &str = "barbershop_professionals";
    pub const HOURS: &str = "barbershop_hours";
    pub const PROFILE: &str = "barbershop_profile";
    pub const PROMOTIONS: &str = "barber_promotions";
    pub const STICKER_FAVORITES: &str = "sticker_favorites";
}

pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;
const LARGE_PAYLOAD_BYTES: usize = 3 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("could not encode `{key}`: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{key}` needs {bytes} bytes but the storage quota is {quota} bytes")]
    QuotaExceeded {
        key: &'static str,
        bytes: usize,
        quota: usize,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// An entity stored as one element of a JSON array.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KEY: &'static str;

    fn id(&self) -> &str;

    /// Demo data written back the first time the key is read.
    fn seed() -> Vec<Self> {
        Vec::new()
    }
}

/// A singleton stored as one JSON object.
pub trait Document: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    const KEY: &'static str;
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saved {
    pub bytes: usize,
}

impl Saved {
    pub fn warning(&self) -> Option<String> {
        (self.bytes > LARGE_PAYLOAD_BYTES).then(|| {
            format!(
                "Dados estão usando {}KB. Considere reduzir o tamanho das imagens.",
                (self.bytes + 512) / 1024
            )
        })
    }
}

#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
    lock: Arc<Mutex<()>>,
    quota: usize,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
            quota: DEFAULT_QUOTA_BYTES,
        }
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    /// Opens a critical section. Reads and writes made through the session
    /// cannot interleave with any other session.
    pub async fn session(&self) -> Session<'_> {
        Session {
            storage: self,
            _guard: self.lock.lock().await,
        }
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        self.session().await.list().await
    }

    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>, StoreError> {
        let records: Vec<T> = self.list().await?;
        Ok(records.into_iter().find(|record| record.id() == id))
    }

    /// Replaces the record with the same id, or appends it.
    pub async fn save<T: Record>(&self, record: T) -> Result<Saved, StoreError> {
        let session = self.session().await;
        let mut records: Vec<T> = session.list().await?;
        match records.iter().position(|existing| existing.id() == record.id()) {
            Some(index) => records[index] = record,
            None => records.push(record),
        }
        session.replace(&records).await
    }

    /// Applies `change` to the record with `id` and writes the result.
    /// Returns `None` without writing when no record matches.
    pub async fn update<T, F>(&self, id: &str, change: F) -> Result<Option<T>, StoreError>
    where
        T: Record,
        F: FnOnce(&mut T),
    {
        let session = self.session().await;
        let mut records: Vec<T> = session.list().await?;
        let Some(record) = records.iter_mut().find(|record| record.id() == id) else {
            return Ok(None);
        };
        change(record);
        let updated = record.clone();
        session.replace(&records).await?;
        Ok(Some(updated))
    }

    pub async fn delete<T: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let session = self.session().await;
        let mut records: Vec<T> = session.list().await?;
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        session.replace(&records).await?;
        Ok(true)
    }

    pub async fn document<D: Document>(&self) -> Result<D, StoreError> {
        self.session().await.document().await
    }

    pub async fn put_document<D: Document>(&self, document: &D) -> Result<Saved, StoreError> {
        self.session().await.put_document(document).await
    }

    /// Drops a key entirely; the next read starts from its seed or default.
    pub async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.backend.remove(key).await
    }

    async fn persist<V: Serialize + ?Sized>(
        &self,
        key: &'static str,
        value: &V,
    ) -> Result<Saved, StoreError> {
        let encoded =
            serde_json::to_string(value).map_err(|source| StoreError::Encode { key, source })?;
        let bytes = encoded.len();
        if bytes > self.quota {
            log::warn!("Refusing to write {key}: {bytes} bytes exceeds quota {}", self.quota);
            return Err(StoreError::QuotaExceeded {
                key,
                bytes,
                quota: self.quota,
            });
        }
        self.backend.write(key, &encoded).await?;
        Ok(Saved { bytes })
    }
}

pub struct Session<'a> {
    storage: &'a Storage,
    _guard: MutexGuard<'a, ()>,
}

impl Session<'_> {
    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        match self.storage.backend.read(T::KEY).await? {
            Some(raw) => Ok(parse_records(T::KEY, &raw)),
            None => {
                let seed = T::seed();
                if !seed.is_empty() {
                    self.storage.persist(T::KEY, &seed).await?;
                }
                Ok(seed)
            }
        }
    }

    pub async fn replace<T: Record>(&self, records: &[T]) -> Result<Saved, StoreError> {
        self.storage.persist(T::KEY, records).await
    }

    pub async fn document<D: Document>(&self) -> Result<D, StoreError> {
        match self.storage.backend.read(D::KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable {}: {err}", D::KEY);
                D::default()
            })),
            None => {
                let document = D::default();
                self.storage.persist(D::KEY, &document).await?;
                Ok(document)
            }
        }
    }

    pub async fn put_document<D: Document>(&self, document: &D) -> Result<Saved, StoreError> {
        self.storage.persist(D::KEY, document).await
    }
}

/// Decodes a JSON array record by record. An unreadable document counts as
/// empty; records that do not fit `T` are dropped.
fn parse_records<T: Record>(key: &str, raw: &str) -> Vec<T> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(err) => {
            log::warn!("Ignoring unreadable {key}: {err}");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(err) => {
                log::warn!("Rejecting record #{index} in {key}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarbershopProfile, Professional, Service};

    fn memory() -> (Arc<MemoryStore>, Storage) {
        let backend = Arc::new(MemoryStore::default());
        let storage = Storage::new(backend.clone());
        (backend, storage)
    }

    #[actix_web::test]
    async fn first_read_writes_seed_back() {
        let (backend, storage) = memory();
        let services: Vec<Service> = storage.list().await.unwrap();
        assert_eq!(services.len(), 6);

        let raw = backend.read(keys::SERVICES).await.unwrap().unwrap();
        let stored: Vec<Service> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, services);
    }

    #[actix_web::test]
    async fn unreadable_blob_is_treated_as_empty() {
        let (backend, storage) = memory();
        backend.write(keys::PROFESSIONALS, "{not json").await.unwrap();
        let professionals: Vec<Professional> = storage.list().await.unwrap();
        assert!(professionals.is_empty());
    }

    #[actix_web::test]
    async fn malformed_records_are_rejected_individually() {
        let (backend, storage) = memory();
        backend
            .write(
                keys::SERVICES,
                r#"[{"id":"a","name":"Corte","price":35,"duration":45},{"id":"b","name":"Barba"}]"#,
            )
            .await
            .unwrap();
        let services: Vec<Service> = storage.list().await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id, "a");
    }

    #[actix_web::test]
    async fn save_replaces_by_id_and_delete_filters() {
        let (_, storage) = memory();
        let mut service = Service {
            id: "svc_1".into(),
            name: "Corte".into(),
            price: 35.0,
            duration: 45,
            image: String::new(),
        };
        storage.save(service.clone()).await.unwrap();
        service.price = 40.0;
        storage.save(service.clone()).await.unwrap();

        let services: Vec<Service> = storage.list().await.unwrap();
        assert_eq!(services.iter().filter(|s| s.id == "svc_1").count(), 1);
        assert_eq!(storage.get::<Service>("svc_1").await.unwrap().unwrap().price, 40.0);

        assert!(storage.delete::<Service>("svc_1").await.unwrap());
        assert!(!storage.delete::<Service>("svc_1").await.unwrap());
        assert!(storage.get::<Service>("svc_1").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn update_of_missing_record_does_not_write() {
        let (_, storage) = memory();
        let updated = storage
            .update::<Professional, _>("nobody", |p| p.name.clear())
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[actix_web::test]
    async fn documents_fall_back_to_defaults() {
        let (backend, storage) = memory();
        let profile: BarbershopProfile = storage.document().await.unwrap();
        assert_eq!(profile.name, "Régua Máxima");
        assert!(backend.read(keys::PROFILE).await.unwrap().is_some());

        backend.write(keys::PROFILE, "[]").await.unwrap();
        let profile: BarbershopProfile = storage.document().await.unwrap();
        assert_eq!(profile, BarbershopProfile::default());
    }

    #[actix_web::test]
    async fn quota_rejects_oversized_writes() {
        let backend = Arc::new(MemoryStore::default());
        let storage = Storage::new(backend.clone()).with_quota(64);
        let profile = BarbershopProfile {
            description: "x".repeat(128),
            ..BarbershopProfile::default()
        };
        let err = storage.put_document(&profile).await.unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert!(backend.read(keys::PROFILE).await.unwrap().is_none());
    }

    #[test]
    fn large_payloads_carry_a_warning() {
        assert!(Saved { bytes: 1024 }.warning().is_none());
        let warning = Saved { bytes: 4 * 1024 * 1024 }.warning().unwrap();
        assert!(warning.contains("4096KB"));
    }
}
