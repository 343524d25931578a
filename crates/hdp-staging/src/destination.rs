//! Destination capability
//!
//! The staging layer never owns the business schema; it only needs a way to
//! durably persist one package's payload by kind. That capability is injected
//! as a [`Destination`] trait object so the drain processor can be exercised
//! against scripted fakes in tests and against Postgres in production.

use async_trait::async_trait;
use hdp_common::checksum::digest_bytes;
use hdp_common::types::{ChecksumAlgorithm, PackageKind};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Failure of a single destination store call. Always retryable from the
/// staging layer's point of view; the destination must never report success
/// for a partial write.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("destination call timed out after {0:?}")]
    Timeout(Duration),

    #[error("destination rejected payload: {0}")]
    Rejected(String),
}

/// Durably persists one package's payload by kind
///
/// Implementations must be idempotent-safe: a retried call with the same
/// payload must not create duplicate records.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn store(
        &self,
        kind: PackageKind,
        payload: &Value,
    ) -> std::result::Result<(), DestinationError>;
}

/// Postgres-backed destination
///
/// Writes payloads into a single inbox relation keyed by content digest, so
/// at-least-once redelivery converges (`ON CONFLICT DO NOTHING`). Downstream
/// jobs own fanning the inbox out into the real relational schema.
pub struct PostgresDestination {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresDestination {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Connect using a database URL (typically `DATABASE_URL`)
    pub async fn connect(database_url: &str, timeout: Duration) -> sqlx::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool, timeout))
    }

    /// Create the inbox relation if it does not exist yet
    pub async fn ensure_schema(&self) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ingest_inbox (
                payload_digest TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload JSONB NOT NULL,
                received_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    #[instrument(skip(self, payload), fields(kind = %kind))]
    async fn store(
        &self,
        kind: PackageKind,
        payload: &Value,
    ) -> std::result::Result<(), DestinationError> {
        let digest = digest_bytes(payload.to_string().as_bytes(), ChecksumAlgorithm::Sha256);

        let insert = sqlx::query(
            r#"
            INSERT INTO ingest_inbox (payload_digest, kind, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (payload_digest) DO NOTHING
            "#,
        )
        .bind(&digest)
        .bind(kind.as_str())
        .bind(payload)
        .execute(&self.pool);

        match tokio::time::timeout(self.timeout, insert).await {
            Err(_) => Err(DestinationError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(result)) => {
                debug!(digest = %digest, inserted = result.rows_affected(), "Payload stored");
                Ok(())
            },
        }
    }
}
