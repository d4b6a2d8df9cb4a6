pub mod fake;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Material, MaterialDownload, MaterialSummary};

pub use fake::FakeMaterialStore;
pub use postgres::PgMaterialStore;

/// The mutable subset of a material, as resolved by the service before the
/// write. `filename: None` keeps the stored value; `description` and
/// `release_at` are the literal values to store, `None` meaning NULL.
#[derive(Debug, Clone, Default)]
pub struct MaterialChanges {
    pub filename: Option<String>,
    pub description: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
}

/// Persistence abstraction for material records.
///
/// `Tx` is a transaction handle: writes made through it become visible to
/// other callers on `commit` and are discarded on `rollback`. Every
/// transactional method threads the handle so that the existence check and
/// the mutation of update/delete are atomic with respect to other
/// transactions.
#[async_trait]
pub trait MaterialStore: Send + Sync + 'static {
    type Tx: Send;

    /// Materials of a competition, sorted by filename ascending, without the
    /// file payload. `include_hidden` bypasses the release-date filter.
    async fn list(
        &self,
        competition_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<MaterialSummary>, StoreError>;

    /// Composite-key lookup, no visibility filter.
    async fn find_summary(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<MaterialSummary>, StoreError>;

    /// Composite-key lookup restricted to the download fields, applying the
    /// release-date filter unless `include_hidden`.
    async fn find_download(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
        include_hidden: bool,
    ) -> Result<Option<MaterialDownload>, StoreError>;

    /// Persist a new material. `description` and `release_at` start unset.
    async fn insert(
        &self,
        competition_id: Uuid,
        filename: &str,
        datafile: &[u8],
    ) -> Result<Material, StoreError>;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Existence check by composite key inside the transaction, locking the
    /// row against concurrent mutation until commit/rollback.
    async fn find_for_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError>;

    async fn apply_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
        changes: &MaterialChanges,
    ) -> Result<MaterialSummary, StoreError>;

    async fn delete(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<(), StoreError>;
}

/// Forwarding impl so a shared store can be injected as `Arc<S>`.
#[async_trait]
impl<T: MaterialStore + ?Sized> MaterialStore for Arc<T> {
    type Tx = T::Tx;

    async fn list(
        &self,
        competition_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<MaterialSummary>, StoreError> {
        (**self).list(competition_id, include_hidden).await
    }

    async fn find_summary(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<MaterialSummary>, StoreError> {
        (**self).find_summary(competition_id, material_id).await
    }

    async fn find_download(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
        include_hidden: bool,
    ) -> Result<Option<MaterialDownload>, StoreError> {
        (**self)
            .find_download(competition_id, material_id, include_hidden)
            .await
    }

    async fn insert(
        &self,
        competition_id: Uuid,
        filename: &str,
        datafile: &[u8],
    ) -> Result<Material, StoreError> {
        (**self).insert(competition_id, filename, datafile).await
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        (**self).commit(tx).await
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        (**self).rollback(tx).await
    }

    async fn find_for_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        (**self)
            .find_for_update(tx, competition_id, material_id)
            .await
    }

    async fn apply_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
        changes: &MaterialChanges,
    ) -> Result<MaterialSummary, StoreError> {
        (**self)
            .apply_update(tx, competition_id, material_id, changes)
            .await
    }

    async fn delete(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<(), StoreError> {
        (**self).delete(tx, competition_id, material_id).await
    }
}
