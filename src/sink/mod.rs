//! Warehouse sink abstraction
//!
//! The orchestrator only talks to the warehouse through these traits, so the
//! real Snowflake client can be swapped for a fake one in tests. The
//! connector abstracts the named-profile credential lookup, which is
//! otherwise process-wide external configuration.

pub mod snowflake;

use crate::stage::StagedTable;
use crate::Result;
use async_trait::async_trait;

pub use snowflake::{SnowflakeConnector, SnowflakeSink};

/// An open, authenticated session against the remote warehouse.
#[async_trait]
pub trait WarehouseSink: Send {
    /// Select the active database for all subsequent writes.
    async fn use_database(&mut self, database: &str) -> Result<()>;

    /// Select the active schema for all subsequent writes.
    async fn use_schema(&mut self, schema: &str) -> Result<()>;

    /// Create-or-replace the named warehouse table from a staged table.
    async fn create_or_replace(&mut self, table: &StagedTable) -> Result<()>;

    /// Release the session. Best-effort; callers log and ignore failures.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a [`WarehouseSink`] from a named, pre-configured credential profile.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    type Sink: WarehouseSink;

    async fn connect(&self, profile: &str) -> Result<Self::Sink>;
}
