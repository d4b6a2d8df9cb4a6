use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub buffer: Vec<u8>,
}

/// Request payload for updating a material.
///
/// The update contract is a full replace of the mutable subset, not a sparse
/// patch: an absent `release_at` or `description` clears the stored value to
/// NULL, while an absent `filename` keeps the stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub release_at: Option<DateTime<Utc>>,
}
