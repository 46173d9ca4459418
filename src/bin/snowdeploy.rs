//! snowdeploy CLI - deploy a directory of CSV files to Snowflake
//!
//! Usage:
//!   snowdeploy [SOURCE_DIR] --database DB --schema SCHEMA [--profile NAME]

use clap::Parser;
use snowdeploy::DEFAULT_PROFILE;
use std::path::PathBuf;

/// Deploy a directory of CSV files to a Snowflake database/schema
#[derive(Parser)]
#[command(name = "snowdeploy")]
#[command(version = "0.1.0")]
#[command(about = "Bulk-load CSV files into Snowflake via an in-memory DuckDB stage", long_about = None)]
struct Cli {
    /// Directory containing the CSV files to deploy
    #[arg(value_name = "SOURCE_DIR", default_value = "data")]
    source_dir: PathBuf,

    /// Target Snowflake database
    #[arg(long, default_value = "UTILITY_ANALYTICS")]
    database: String,

    /// Target Snowflake schema
    #[arg(long, default_value = "CALL_CENTER")]
    schema: String,

    /// Connection profile name from connections.toml
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let success = snowdeploy::deploy(
        &cli.source_dir,
        &cli.database,
        &cli.schema,
        &cli.profile,
    )
    .await;

    // The outcome is the printed message; the process exits normally either
    // way so scheduled wrappers read the log, not the exit code.
    if success {
        println!("Deployment completed successfully.");
    } else {
        println!("Deployment failed. Check the log output above for the cause.");
    }
}
