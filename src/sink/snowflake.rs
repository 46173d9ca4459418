//! Snowflake warehouse sink
//!
//! Sessions are opened through `snowflake-api` from a named profile in
//! `connections.toml`. Staged tables arrive as Arrow record batches and are
//! rendered into `CREATE OR REPLACE TABLE` DDL plus chunked `INSERT`
//! statements; Snowflake casts the rendered literals via its AUTO formats.

use crate::profile::{default_profiles_path, load_profile, ConnectionProfile};
use crate::sink::{SinkConnector, WarehouseSink};
use crate::stage::{quote_ident, quote_literal, StagedTable};
use crate::{Error, Result};
use async_trait::async_trait;
use duckdb::arrow::array::Array;
use duckdb::arrow::datatypes::{DataType, Schema};
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::arrow::util::display::{ArrayFormatter, FormatOptions};
use snowflake_api::SnowflakeApi;
use std::path::PathBuf;
use tracing::{debug, info};

/// Rows per generated INSERT statement.
const INSERT_CHUNK_ROWS: usize = 500;

/// Opens [`SnowflakeSink`] sessions from named connection profiles.
pub struct SnowflakeConnector {
    profiles_path: Option<PathBuf>,
}

impl SnowflakeConnector {
    /// Resolve profiles from the default `connections.toml` location.
    pub fn new() -> Self {
        Self {
            profiles_path: None,
        }
    }

    /// Resolve profiles from an explicit file instead of the default path.
    pub fn with_profiles_path(path: impl Into<PathBuf>) -> Self {
        Self {
            profiles_path: Some(path.into()),
        }
    }
}

impl Default for SnowflakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SinkConnector for SnowflakeConnector {
    type Sink = SnowflakeSink;

    async fn connect(&self, profile: &str) -> Result<SnowflakeSink> {
        let path = match &self.profiles_path {
            Some(path) => path.clone(),
            None => default_profiles_path()
                .ok_or_else(|| Error::Other("cannot locate connections.toml".to_string()))?,
        };
        let resolved = load_profile(&path, profile)?;
        SnowflakeSink::open(profile, &resolved)
    }
}

/// An authenticated Snowflake session.
pub struct SnowflakeSink {
    api: SnowflakeApi,
}

impl SnowflakeSink {
    /// Open a session with password or key-pair authentication, whichever the
    /// profile carries. Database and schema are selected later via USE
    /// statements.
    pub fn open(name: &str, profile: &ConnectionProfile) -> Result<Self> {
        let api = if let Some(password) = &profile.password {
            SnowflakeApi::with_password_auth(
                &profile.account,
                profile.warehouse.as_deref(),
                None,
                None,
                &profile.user,
                profile.role.as_deref(),
                password,
            )?
        } else if let Some(key_path) = &profile.private_key_path {
            let pem = std::fs::read_to_string(key_path)?;
            SnowflakeApi::with_certificate_auth(
                &profile.account,
                profile.warehouse.as_deref(),
                None,
                None,
                &profile.user,
                profile.role.as_deref(),
                &pem,
            )?
        } else {
            return Err(Error::InvalidProfile(
                name.to_string(),
                "neither password nor private_key_path is set".to_string(),
            ));
        };
        info!("Connected to Snowflake account '{}'", profile.account);
        Ok(Self { api })
    }
}

#[async_trait]
impl WarehouseSink for SnowflakeSink {
    async fn use_database(&mut self, database: &str) -> Result<()> {
        self.api.exec(&format!("USE DATABASE {database}")).await?;
        Ok(())
    }

    async fn use_schema(&mut self, schema: &str) -> Result<()> {
        self.api.exec(&format!("USE SCHEMA {schema}")).await?;
        Ok(())
    }

    async fn create_or_replace(&mut self, table: &StagedTable) -> Result<()> {
        let ddl = create_table_sql(&table.name, &table.schema);
        debug!("{}", ddl);
        self.api.exec(&ddl).await?;

        for batch in &table.batches {
            for statement in insert_statements(&table.name, batch, INSERT_CHUNK_ROWS)? {
                self.api.exec(&statement).await?;
            }
        }
        info!(
            "Deployed table '{}' ({} rows)",
            table.name,
            table.num_rows()
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.api.close_session().await?;
        Ok(())
    }
}

/// Snowflake column type for an Arrow field.
fn sql_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "BIGINT".to_string(),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "DOUBLE".to_string(),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            format!("NUMBER({precision},{scale})")
        }
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Time32(_) | DataType::Time64(_) => "TIME".to_string(),
        DataType::Timestamp(_, None) => "TIMESTAMP_NTZ".to_string(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP_TZ".to_string(),
        DataType::Binary | DataType::LargeBinary => "BINARY".to_string(),
        _ => "VARCHAR".to_string(),
    }
}

/// Whether values of this type are rendered as bare literals (everything else
/// is single-quoted and cast by Snowflake).
fn is_bare_literal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _)
    )
}

/// Non-finite float renderings from Arrow's formatter.
fn is_non_finite(rendered: &str) -> bool {
    matches!(rendered, "NaN" | "inf" | "-inf")
}

/// Render `CREATE OR REPLACE TABLE` DDL for an exported schema.
pub fn create_table_sql(name: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| format!("{} {}", quote_ident(field.name()), sql_type(field.data_type())))
        .collect();
    format!(
        "CREATE OR REPLACE TABLE {} ({})",
        quote_ident(name),
        columns.join(", ")
    )
}

/// Render one record batch as INSERT statements of at most `chunk_rows` rows.
pub fn insert_statements(
    name: &str,
    batch: &RecordBatch,
    chunk_rows: usize,
) -> Result<Vec<String>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let options = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let bare: Vec<bool> = batch
        .schema()
        .fields()
        .iter()
        .map(|field| is_bare_literal(field.data_type()))
        .collect();

    let mut statements = Vec::new();
    let mut rows = Vec::with_capacity(chunk_rows.min(batch.num_rows()));
    for row in 0..batch.num_rows() {
        let mut values = Vec::with_capacity(batch.num_columns());
        for (col, formatter) in formatters.iter().enumerate() {
            if batch.column(col).is_null(row) {
                values.push("NULL".to_string());
            } else {
                let rendered = formatter.value(row).try_to_string()?;
                if bare[col] && !is_non_finite(&rendered) {
                    values.push(rendered);
                } else {
                    // Snowflake only accepts NaN/inf/-inf as quoted literals,
                    // cast on insert.
                    values.push(quote_literal(&rendered));
                }
            }
        }
        rows.push(format!("({})", values.join(", ")));

        if rows.len() == chunk_rows {
            statements.push(format!(
                "INSERT INTO {} VALUES {}",
                quote_ident(name),
                rows.join(", ")
            ));
            rows.clear();
        }
    }
    if !rows.is_empty() {
        statements.push(format!(
            "INSERT INTO {} VALUES {}",
            quote_ident(name),
            rows.join(", ")
        ));
    }
    Ok(statements)
}
