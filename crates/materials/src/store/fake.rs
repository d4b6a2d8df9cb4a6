use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Material, MaterialDownload, MaterialSummary, is_released};
use crate::store::{MaterialChanges, MaterialStore};

// Mirrors the varchar(255) filename column so constraint rejection is
// testable without Postgres.
const FILENAME_MAX: usize = 255;

fn filename_too_long() -> StoreError {
    StoreError::ConstraintViolation("value too long for type character varying(255)".to_string())
}

enum PendingOp {
    Put(Material),
    Delete(Uuid),
}

/// A buffered transaction: operations staged here become visible only when
/// the store commits them.
pub struct FakeTx {
    pending: Vec<PendingOp>,
}

/// In-memory [`MaterialStore`] for tests.
#[derive(Clone)]
pub struct FakeMaterialStore {
    rows: Arc<Mutex<HashMap<Uuid, Material>>>,
    calls: Arc<AtomicUsize>,
    fail_commits: Arc<AtomicBool>,
}

impl FakeMaterialStore {
    pub fn new() -> Self {
        FakeMaterialStore {
            rows: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_commits: Arc::new(AtomicBool::new(false)),
        }
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of store calls made so far, transaction control included.
    pub fn fake_call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Seed a row, bypassing the service.
    pub fn fake_add(&self, material: Material) {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(material.id, material);
    }

    pub fn fake_get(&self, material_id: Uuid) -> Option<Material> {
        let rows = self.rows.lock().unwrap();
        rows.get(&material_id).cloned()
    }

    pub fn fake_len(&self) -> usize {
        let rows = self.rows.lock().unwrap();
        rows.len()
    }

    /// Make every subsequent commit fail, leaving staged writes unapplied.
    pub fn fake_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl Default for FakeMaterialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MaterialStore for FakeMaterialStore {
    type Tx = FakeTx;

    async fn list(
        &self,
        competition_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<MaterialSummary>, StoreError> {
        self.count_call();
        let now = Utc::now();
        let rows = self.rows.lock().unwrap();

        let mut materials: Vec<MaterialSummary> = rows
            .values()
            .filter(|m| m.competition_id == competition_id)
            .filter(|m| include_hidden || is_released(m.release_at, now))
            .map(Material::summary)
            .collect();
        materials.sort_by(|a, b| a.filename.cmp(&b.filename));

        Ok(materials)
    }

    async fn find_summary(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<MaterialSummary>, StoreError> {
        self.count_call();
        let rows = self.rows.lock().unwrap();

        Ok(rows
            .get(&material_id)
            .filter(|m| m.competition_id == competition_id)
            .map(Material::summary))
    }

    async fn find_download(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
        include_hidden: bool,
    ) -> Result<Option<MaterialDownload>, StoreError> {
        self.count_call();
        let now = Utc::now();
        let rows = self.rows.lock().unwrap();

        Ok(rows
            .get(&material_id)
            .filter(|m| m.competition_id == competition_id)
            .filter(|m| include_hidden || m.is_released_at(now))
            .map(Material::download))
    }

    async fn insert(
        &self,
        competition_id: Uuid,
        filename: &str,
        datafile: &[u8],
    ) -> Result<Material, StoreError> {
        self.count_call();
        if filename.len() > FILENAME_MAX {
            return Err(filename_too_long());
        }

        let now = Utc::now();
        let material = Material {
            id: Uuid::new_v4(),
            competition_id,
            filename: filename.to_string(),
            description: None,
            release_at: None,
            datafile: datafile.to_vec(),
            created_at: now,
            updated_at: now,
        };

        let mut rows = self.rows.lock().unwrap();
        rows.insert(material.id, material.clone());
        Ok(material)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.count_call();
        Ok(FakeTx {
            pending: Vec::new(),
        })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        self.count_call();
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("commit failed".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        for op in tx.pending {
            match op {
                PendingOp::Put(material) => {
                    rows.insert(material.id, material);
                }
                PendingOp::Delete(id) => {
                    rows.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        self.count_call();
        drop(tx.pending);
        Ok(())
    }

    async fn find_for_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let _ = tx;
        self.count_call();
        let rows = self.rows.lock().unwrap();

        Ok(rows
            .get(&material_id)
            .filter(|m| m.competition_id == competition_id)
            .map(|m| m.id))
    }

    async fn apply_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
        changes: &MaterialChanges,
    ) -> Result<MaterialSummary, StoreError> {
        self.count_call();
        if let Some(filename) = &changes.filename {
            if filename.len() > FILENAME_MAX {
                return Err(filename_too_long());
            }
        }

        let rows = self.rows.lock().unwrap();
        let current = rows
            .get(&material_id)
            .filter(|m| m.competition_id == competition_id)
            .ok_or_else(|| StoreError::Connection("row vanished mid-transaction".to_string()))?;

        let mut updated = current.clone();
        if let Some(filename) = &changes.filename {
            updated.filename = filename.clone();
        }
        updated.description = changes.description.clone();
        updated.release_at = changes.release_at;
        updated.updated_at = Utc::now();

        let summary = updated.summary();
        tx.pending.push(PendingOp::Put(updated));
        Ok(summary)
    }

    async fn delete(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<(), StoreError> {
        self.count_call();
        let rows = self.rows.lock().unwrap();
        if rows
            .get(&material_id)
            .is_some_and(|m| m.competition_id == competition_id)
        {
            tx.pending.push(PendingOp::Delete(material_id));
        }
        Ok(())
    }
}
