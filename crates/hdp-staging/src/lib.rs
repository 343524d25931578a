//! HDP Staging Library
//!
//! Durable file-staged ingestion: externally-sourced health records are
//! wrapped into self-describing, checksummed packages, written to disk
//! before any database interaction, and asynchronously drained into the
//! relational destination with bounded retries.
//!
//! # Architecture
//!
//! - **package**: the package codec (metadata + payload + checksum)
//! - **store**: four-directory state machine with atomic transitions
//! - **writer**: the only entry path into staging
//! - **drain**: validates pending packages, offers them to the destination,
//!   routes them to `completed`/`failed`, and retries under a bounded budget
//! - **scheduler**: background cadence, manual trigger, cumulative stats
//! - **retention**: age-based purge of resolved packages
//! - **destination**: injected persistence capability + Postgres adapter
//! - **service**: facade wiring it all together for the API layer and CLI
//!
//! # Example
//!
//! ```no_run
//! use hdp_staging::{StagingConfig, StagingService};
//! use hdp_staging::destination::PostgresDestination;
//! use hdp_common::types::PackageKind;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StagingConfig::from_env()?;
//!     let destination = PostgresDestination::connect(
//!         "postgresql://localhost/hdp",
//!         Duration::from_secs(30),
//!     )
//!     .await?;
//!     let service = StagingService::new(config, Arc::new(destination))?;
//!
//!     let id = service.submit(
//!         PackageKind::MeasurementBatch,
//!         "patient-42",
//!         serde_json::json!({"value": 140}),
//!     )?;
//!     println!("staged {id}");
//!
//!     service.start();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod destination;
pub mod drain;
pub mod package;
pub mod retention;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod writer;

pub use config::StagingConfig;
pub use destination::{Destination, DestinationError, PostgresDestination};
pub use drain::{DrainProcessor, PassOutcome};
pub use package::{PackageMetadata, StagedPackage};
pub use retention::{PurgeOutcome, Retention, MIN_RETENTION_DAYS};
pub use scheduler::{Scheduler, SchedulerStats};
pub use service::{PackageListing, StagingService, StatusSummary};
pub use store::{PackageRef, StagingDir, StagingStore};
pub use writer::IngestionWriter;
