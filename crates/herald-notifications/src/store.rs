use async_trait::async_trait;
use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::record::{DeliveryRecord, NewDeliveryRecord};
use crate::types::{NotifiableRef, ReadFilter};

/// Storage trait for delivery records written by the database channel
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Persist a new record, assigning its id and timestamps
    async fn create(&self, record: NewDeliveryRecord) -> Result<DeliveryRecord, StoreError>;

    /// Get a record by ID
    async fn get(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StoreError>;

    /// Overwrite an existing record
    async fn update(&self, record: &DeliveryRecord) -> Result<(), StoreError>;

    /// Records addressed to `notifiable`, oldest first, narrowed by read state
    async fn find_by_notifiable(
        &self,
        notifiable: &NotifiableRef,
        filter: ReadFilter,
    ) -> Result<Vec<DeliveryRecord>, StoreError>;

    /// Count of records addressed to `notifiable` matching `filter`
    async fn count_by_notifiable(
        &self,
        notifiable: &NotifiableRef,
        filter: ReadFilter,
    ) -> Result<usize, StoreError> {
        Ok(self.find_by_notifiable(notifiable, filter).await?.len())
    }

    /// Mark a record as read. Already-read records are left untouched.
    async fn mark_as_read(&self, id: Uuid) -> Result<DeliveryRecord, StoreError> {
        let mut record = self.get(id).await?.ok_or(StoreError::not_found(id))?;
        if record.mark_as_read(OffsetDateTime::now_utc()) {
            self.update(&record).await?;
        }
        Ok(record)
    }

    /// Mark a record as unread. Already-unread records are left untouched.
    async fn mark_as_unread(&self, id: Uuid) -> Result<DeliveryRecord, StoreError> {
        let mut record = self.get(id).await?.ok_or(StoreError::not_found(id))?;
        if record.mark_as_unread(OffsetDateTime::now_utc()) {
            self.update(&record).await?;
        }
        Ok(record)
    }

    /// Name of this backend for logging
    fn backend_name(&self) -> &'static str;
}

/// In-memory delivery store.
///
/// Keeps records in insertion order, which is also creation order. Suitable
/// for tests and for embedding applications that do not persist
/// notifications.
#[derive(Debug, Default)]
pub struct InMemoryDeliveryStore {
    records: RwLock<IndexMap<Uuid, DeliveryRecord>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records, across all recipients.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn create(&self, record: NewDeliveryRecord) -> Result<DeliveryRecord, StoreError> {
        let record = record.into_record(Uuid::new_v4(), OffsetDateTime::now_utc());
        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(&record.id)
            .ok_or(StoreError::not_found(record.id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn find_by_notifiable(
        &self,
        notifiable: &NotifiableRef,
        filter: ReadFilter,
    ) -> Result<Vec<DeliveryRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| &r.notifiable == notifiable && filter.matches(r.is_read()))
            .cloned()
            .collect())
    }

    async fn count_by_notifiable(
        &self,
        notifiable: &NotifiableRef,
        filter: ReadFilter,
    ) -> Result<usize, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| &r.notifiable == notifiable && filter.matches(r.is_read()))
            .count())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
