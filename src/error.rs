use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Staging store error: {0}")]
    Staging(#[from] duckdb::Error),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] snowflake_api::SnowflakeApiError),

    #[error("Invalid connections file: {0}")]
    ProfileParse(#[from] toml::de::Error),

    #[error("Connection profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid connection profile '{0}': {1}")]
    InvalidProfile(String, String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] duckdb::arrow::error::ArrowError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
