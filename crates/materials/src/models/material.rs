use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A file resource scoped to a competition, with optional scheduled release.
/// The full row, including the raw payload, is only handed out on creation
/// and download; lookups use the projections below.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Material {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub filename: String,
    pub description: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub datafile: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing/lookup projection, without the file payload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaterialSummary {
    pub id: Uuid,
    pub filename: String,
    pub release_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Download projection: just enough to serve the file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaterialDownload {
    pub id: Uuid,
    pub filename: String,
    pub datafile: Vec<u8>,
}

/// Release-date visibility rule: a material is visible when `release_at` is
/// unset or not in the future. Evaluated at query time, so visibility can
/// change without a write.
pub fn is_released(release_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    release_at.map_or(true, |ts| ts <= now)
}

impl Material {
    pub fn is_released_at(&self, now: DateTime<Utc>) -> bool {
        is_released(self.release_at, now)
    }

    pub fn summary(&self) -> MaterialSummary {
        MaterialSummary {
            id: self.id,
            filename: self.filename.clone(),
            release_at: self.release_at,
            description: self.description.clone(),
        }
    }

    pub fn download(&self) -> MaterialDownload {
        MaterialDownload {
            id: self.id,
            filename: self.filename.clone(),
            datafile: self.datafile.clone(),
        }
    }
}
