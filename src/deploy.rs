//! Deployment orchestrator
//!
//! Sequences one linear run: open the warehouse session, stage every CSV in
//! the source directory into an in-memory DuckDB store, then ship each staged
//! table to the warehouse with create-or-replace semantics. The first failing
//! phase aborts the rest; cleanup always runs.

use crate::sink::{SinkConnector, SnowflakeConnector, WarehouseSink};
use crate::stage::StagingStore;
use crate::Error;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Profile used when the caller does not name one.
pub const DEFAULT_PROFILE: &str = "cursor-pat";

/// Extension matched when enumerating source files.
const SOURCE_EXTENSION: &str = "csv";

/// One deployment invocation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub source_dir: PathBuf,
    pub database: String,
    pub schema: String,
    pub profile: String,
}

impl DeployRequest {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        database: impl Into<String>,
        schema: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            database: database.into(),
            schema: schema.into(),
            profile: profile.into(),
        }
    }
}

/// Why a deployment run failed.
#[derive(Debug, Error)]
pub enum DeployFailure {
    #[error("no input files matched")]
    NoInputFiles,

    #[error("connection failed: {0}")]
    Connection(Error),

    #[error("load failed: {0}")]
    Load(Error),

    #[error("write failed: {0}")]
    Write(Error),
}

/// Outcome of one deployment run. Carries the structured failure reason while
/// preserving the plain success/failure contract via [`DeployReport::succeeded`].
#[derive(Debug)]
pub struct DeployReport {
    pub failure: Option<DeployFailure>,
}

impl DeployReport {
    fn success() -> Self {
        Self { failure: None }
    }

    fn failed(failure: DeployFailure) -> Self {
        Self {
            failure: Some(failure),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Deploy every CSV in `source_dir` to the given Snowflake database/schema.
///
/// Resolves `profile` from the default `connections.toml` location. Returns
/// true only if the whole run completed; the cause of a failure is logged,
/// not returned. Callers wanting the structured reason use
/// [`deploy_with_connector`].
pub async fn deploy(
    source_dir: impl Into<PathBuf>,
    database: &str,
    schema: &str,
    profile: &str,
) -> bool {
    let request = DeployRequest::new(source_dir, database, schema, profile);
    let report = deploy_with_connector(&request, &SnowflakeConnector::new()).await;
    report.succeeded()
}

/// Run one deployment against any [`SinkConnector`].
pub async fn deploy_with_connector<C: SinkConnector>(
    request: &DeployRequest,
    connector: &C,
) -> DeployReport {
    info!(
        "Starting deployment of '{}' to {}.{}",
        request.source_dir.display(),
        request.database,
        request.schema
    );

    let mut sink = match connector.connect(&request.profile).await {
        Ok(sink) => sink,
        Err(e) => {
            error!("Warehouse connection failed: {e}");
            return DeployReport::failed(DeployFailure::Connection(e));
        }
    };

    let outcome = run_phases(&mut sink, request).await;

    // Cleanup is unconditional and best-effort; a close failure never changes
    // the run's outcome.
    if let Err(e) = sink.close().await {
        warn!("Failed to close warehouse session: {e}");
    }

    match outcome {
        Ok(()) => {
            info!("Deployment finished successfully");
            DeployReport::success()
        }
        Err(failure) => {
            error!("Deployment failed: {failure}");
            DeployReport::failed(failure)
        }
    }
}

async fn run_phases<S: WarehouseSink>(
    sink: &mut S,
    request: &DeployRequest,
) -> std::result::Result<(), DeployFailure> {
    sink.use_database(&request.database)
        .await
        .map_err(DeployFailure::Connection)?;
    sink.use_schema(&request.schema)
        .await
        .map_err(DeployFailure::Connection)?;
    info!(
        "Using warehouse context {}.{}",
        request.database, request.schema
    );

    let store = StagingStore::open_in_memory().map_err(DeployFailure::Load)?;
    let outcome = stage_and_publish(sink, &store, request).await;

    if let Err(e) = store.close() {
        warn!("Failed to close staging store: {e}");
    }
    outcome
}

async fn stage_and_publish<S: WarehouseSink>(
    sink: &mut S,
    store: &StagingStore,
    request: &DeployRequest,
) -> std::result::Result<(), DeployFailure> {
    let files = matching_files(&request.source_dir);
    if files.is_empty() {
        warn!(
            "No .{} files found in '{}'",
            SOURCE_EXTENSION,
            request.source_dir.display()
        );
        return Err(DeployFailure::NoInputFiles);
    }
    info!("Found {} CSV files to process", files.len());

    for file in &files {
        store.load_csv(file).map_err(DeployFailure::Load)?;
    }

    let tables = store.table_names().map_err(DeployFailure::Write)?;
    info!("Staged tables to deploy: {:?}", tables);

    for table in &tables {
        let staged = store.export(table).map_err(DeployFailure::Write)?;
        sink.create_or_replace(&staged)
            .await
            .map_err(DeployFailure::Write)?;
    }
    Ok(())
}

/// Regular files in `dir` with the source extension, non-recursive, in
/// whatever order the directory listing returns them. A missing or unreadable
/// directory yields zero matches rather than an error.
fn matching_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_matching_files_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("c.CSV"), "also ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = matching_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "a.csv");
    }

    #[test]
    fn test_missing_directory_yields_no_matches() {
        assert!(matching_files(Path::new("/no/such/directory")).is_empty());
    }
}
