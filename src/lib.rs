//! snowdeploy - bulk CSV-to-Snowflake deployment
//!
//! Loads every CSV file in a directory into a fresh in-memory DuckDB store
//! (schema inference included), then publishes each staged table to a target
//! Snowflake database/schema with create-or-replace semantics. One linear
//! run, no retries; the boolean outcome is backed by a structured failure
//! reason for callers that want it.

pub mod deploy;
pub mod error;
pub mod profile;
pub mod sink;
pub mod stage;

pub use deploy::{
    deploy, deploy_with_connector, DeployFailure, DeployReport, DeployRequest, DEFAULT_PROFILE,
};
pub use error::{Error, Result};
pub use stage::{StagedTable, StagingStore};
