use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{Material, MaterialDownload, MaterialSummary};
use crate::store::{MaterialChanges, MaterialStore};

/// Release-date visibility filter, shared verbatim by the list and download
/// queries. NOW() is evaluated by the database at query time.
const RELEASED_SQL: &str = "(release_at IS NULL OR release_at <= NOW())";

/// Postgres-backed [`MaterialStore`].
pub struct PgMaterialStore {
    pool: PgPool,
}

impl PgMaterialStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration and probe connectivity.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(&config.database_url)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                StoreError::Connection(e.to_string())
            })?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            error!("Database connectivity test failed: {}", e);
            return Err(StoreError::Connection(format!(
                "Database is not accessible: {}",
                e
            )));
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map write failures caused by schema-level constraints (unique, foreign
/// key, check, value-too-long) to [`StoreError::ConstraintViolation`] with
/// the database's message.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if matches!(
            db_err.code().as_deref(),
            Some("23505" | "23503" | "23514" | "22001")
        ) {
            return StoreError::ConstraintViolation(db_err.message().to_string());
        }
    }
    StoreError::from(e)
}

#[async_trait]
impl MaterialStore for PgMaterialStore {
    type Tx = Transaction<'static, Postgres>;

    async fn list(
        &self,
        competition_id: Uuid,
        include_hidden: bool,
    ) -> Result<Vec<MaterialSummary>, StoreError> {
        let mut sql = String::from(
            "SELECT id, filename, release_at, description \
             FROM materials WHERE competition_id = $1",
        );
        if !include_hidden {
            sql.push_str(" AND ");
            sql.push_str(RELEASED_SQL);
        }
        sql.push_str(" ORDER BY filename ASC");

        let materials = sqlx::query_as::<_, MaterialSummary>(&sql)
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(materials)
    }

    async fn find_summary(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<MaterialSummary>, StoreError> {
        let material = sqlx::query_as::<_, MaterialSummary>(
            "SELECT id, filename, release_at, description \
             FROM materials WHERE competition_id = $1 AND id = $2",
        )
        .bind(competition_id)
        .bind(material_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(material)
    }

    async fn find_download(
        &self,
        competition_id: Uuid,
        material_id: Uuid,
        include_hidden: bool,
    ) -> Result<Option<MaterialDownload>, StoreError> {
        let mut sql = String::from(
            "SELECT id, filename, datafile \
             FROM materials WHERE competition_id = $1 AND id = $2",
        );
        if !include_hidden {
            sql.push_str(" AND ");
            sql.push_str(RELEASED_SQL);
        }

        let material = sqlx::query_as::<_, MaterialDownload>(&sql)
            .bind(competition_id)
            .bind(material_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(material)
    }

    async fn insert(
        &self,
        competition_id: Uuid,
        filename: &str,
        datafile: &[u8],
    ) -> Result<Material, StoreError> {
        let material = sqlx::query_as::<_, Material>(
            "INSERT INTO materials (competition_id, filename, datafile) \
             VALUES ($1, $2, $3) \
             RETURNING id, competition_id, filename, description, release_at, \
                       datafile, created_at, updated_at",
        )
        .bind(competition_id)
        .bind(filename)
        .bind(datafile)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(material)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        Ok(tx.rollback().await?)
    }

    async fn find_for_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM materials \
             WHERE competition_id = $1 AND id = $2 \
             FOR UPDATE",
        )
        .bind(competition_id)
        .bind(material_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(id)
    }

    async fn apply_update(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
        changes: &MaterialChanges,
    ) -> Result<MaterialSummary, StoreError> {
        let material = sqlx::query_as::<_, MaterialSummary>(
            "UPDATE materials \
             SET filename = COALESCE($3, filename), \
                 description = $4, \
                 release_at = $5, \
                 updated_at = NOW() \
             WHERE competition_id = $1 AND id = $2 \
             RETURNING id, filename, release_at, description",
        )
        .bind(competition_id)
        .bind(material_id)
        .bind(changes.filename.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.release_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(material)
    }

    async fn delete(
        &self,
        tx: &mut Self::Tx,
        competition_id: Uuid,
        material_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM materials WHERE competition_id = $1 AND id = $2")
            .bind(competition_id)
            .bind(material_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}
