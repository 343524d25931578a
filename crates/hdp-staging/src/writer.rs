//! Ingestion writer
//!
//! The only path by which new data enters staging: wrap the payload as a
//! checksummed package and durably write it into `pending`. Submission
//! returns as soon as the write lands; callers may only assume the data can
//! no longer be lost by a crash, not that it has reached the destination.

use crate::package;
use crate::store::{StagingDir, StagingStore};
use hdp_common::types::PackageKind;
use hdp_common::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct IngestionWriter {
    store: Arc<StagingStore>,
}

impl IngestionWriter {
    pub fn new(store: Arc<StagingStore>) -> Self {
        Self { store }
    }

    /// Stage one payload for asynchronous persistence, returning the package
    /// id once the durable write succeeds
    ///
    /// No dedup happens here: duplicate submissions for the same correlation
    /// key produce distinct packages, and the destination's idempotency
    /// converges them.
    #[instrument(skip(self, payload), fields(kind = %kind, correlation_key = %correlation_key))]
    pub fn submit(
        &self,
        kind: PackageKind,
        correlation_key: &str,
        payload: Value,
    ) -> Result<String> {
        let mut package = package::encode(kind, correlation_key, payload);
        while self.store.exists(StagingDir::Pending, &package.file_name()) {
            package.restamp();
        }
        let id = package.id();
        self.store.write(StagingDir::Pending, &package)?;
        info!(package_id = %id, "Package staged");
        Ok(id)
    }
}
