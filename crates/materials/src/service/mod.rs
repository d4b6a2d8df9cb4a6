
use tracing::debug;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dto::{UpdateMaterialRequest, UploadedFile};
use crate::error::{MaterialError, Result};
use crate::models::{Material, MaterialDownload, MaterialSummary};
use crate::store::{MaterialChanges, MaterialStore};

/// Lifecycle operations for competition materials: a stateless façade over a
/// [`MaterialStore`]. Identifiers arrive as strings from the transport layer
/// and are validated before any store contact.
pub struct MaterialsService<S> {
    store: S,
}

fn parse_id(value: &str, param: &'static str) -> Result<Uuid> {
    if value.is_empty() {
        return Err(MaterialError::InvalidArgument(param));
    }
    Uuid::parse_str(value).map_err(|_| MaterialError::InvalidArgument(param))
}

fn invalid_patch(errors: ValidationErrors) -> MaterialError {
    let field = errors
        .field_errors()
        .keys()
        .next()
        .copied()
        .unwrap_or("patch");
    MaterialError::InvalidArgument(field)
}

impl<S: MaterialStore> MaterialsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Materials of a competition, sorted by filename ascending, without the
    /// file payload. Unless `include_hidden`, materials whose `release_at`
    /// lies in the future are filtered out.
    pub async fn list_materials(
        &self,
        competition_id: &str,
        include_hidden: bool,
    ) -> Result<Vec<MaterialSummary>> {
        let competition_id = parse_id(competition_id, "competition_id")?;

        debug!(%competition_id, include_hidden, "list_materials");

        Ok(self.store.list(competition_id, include_hidden).await?)
    }

    /// Composite-key lookup. Direct-by-id access never applies the
    /// release-date filter: whoever may call this may see the record.
    pub async fn get_material(
        &self,
        competition_id: &str,
        material_id: &str,
    ) -> Result<MaterialSummary> {
        let competition_id = parse_id(competition_id, "competition_id")?;
        let material_id = parse_id(material_id, "material_id")?;

        debug!(%competition_id, %material_id, "get_material");

        self.store
            .find_summary(competition_id, material_id)
            .await?
            .ok_or(MaterialError::NotFound(material_id))
    }

    /// Filename and raw payload of a material. A record that exists but is
    /// still unreleased is indistinguishable from an absent one unless
    /// `include_hidden`.
    pub async fn get_material_download(
        &self,
        competition_id: &str,
        material_id: &str,
        include_hidden: bool,
    ) -> Result<MaterialDownload> {
        let competition_id = parse_id(competition_id, "competition_id")?;
        let material_id = parse_id(material_id, "material_id")?;

        debug!(%competition_id, %material_id, include_hidden, "get_material_download");

        self.store
            .find_download(competition_id, material_id, include_hidden)
            .await?
            .ok_or(MaterialError::NotFound(material_id))
    }

    /// Persist a new material. `description` and `release_at` start unset.
    pub async fn create_material(
        &self,
        competition_id: &str,
        filename: &str,
        file: &UploadedFile,
    ) -> Result<Material> {
        let competition_id = parse_id(competition_id, "competition_id")?;
        if filename.is_empty() {
            return Err(MaterialError::InvalidArgument("filename"));
        }
        if file.buffer.is_empty() {
            return Err(MaterialError::InvalidArgument("file"));
        }

        debug!(%competition_id, filename, file_len = file.buffer.len(), "create_material");

        self.store
            .insert(competition_id, filename, &file.buffer)
            .await
            .map_err(MaterialError::from_write)
    }

    /// Replace the mutable subset of a material. The existence check and the
    /// write run in one transaction; an omitted `release_at` or
    /// `description` clears the stored value, an omitted `filename` keeps
    /// the stored one.
    pub async fn update_material(
        &self,
        competition_id: &str,
        material_id: &str,
        patch: &UpdateMaterialRequest,
    ) -> Result<MaterialSummary> {
        let competition_id = parse_id(competition_id, "competition_id")?;
        let material_id = parse_id(material_id, "material_id")?;
        patch.validate().map_err(invalid_patch)?;

        debug!(%competition_id, %material_id, "update_material");

        let mut tx = self.store.begin().await?;
        let result = self
            .update_in_tx(&mut tx, competition_id, material_id, patch)
            .await;
        match result {
            Ok(updated) => {
                self.store.commit(tx).await?;
                Ok(updated)
            }
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    async fn update_in_tx(
        &self,
        tx: &mut S::Tx,
        competition_id: Uuid,
        material_id: Uuid,
        patch: &UpdateMaterialRequest,
    ) -> Result<MaterialSummary> {
        self.store
            .find_for_update(tx, competition_id, material_id)
            .await?
            .ok_or(MaterialError::NotFound(material_id))?;

        let changes = MaterialChanges {
            filename: patch.filename.clone(),
            description: patch.description.clone(),
            release_at: patch.release_at,
        };

        self.store
            .apply_update(tx, competition_id, material_id, &changes)
            .await
            .map_err(MaterialError::from_write)
    }

    /// Delete a material. The existence check and the delete run in one
    /// transaction.
    pub async fn remove_material(&self, competition_id: &str, material_id: &str) -> Result<()> {
        let competition_id = parse_id(competition_id, "competition_id")?;
        let material_id = parse_id(material_id, "material_id")?;

        debug!(%competition_id, %material_id, "remove_material");

        let mut tx = self.store.begin().await?;
        let result = self.remove_in_tx(&mut tx, competition_id, material_id).await;
        match result {
            Ok(()) => {
                self.store.commit(tx).await?;
                Ok(())
            }
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    async fn remove_in_tx(
        &self,
        tx: &mut S::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<()> {
        self.store
            .find_for_update(tx, competition_id, material_id)
            .await?
            .ok_or(MaterialError::NotFound(material_id))?;

        Ok(self.store.delete(tx, competition_id, material_id).await?)
    }
}
