//! Named connection-profile resolution
//!
//! Profiles follow the Snowflake `connections.toml` convention: one TOML
//! table per profile, resolved from `$SNOWFLAKE_HOME/connections.toml` or
//! `~/.snowflake/connections.toml`. The file location is injectable so tests
//! can point at a fixture instead of user-level configuration.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Credentials and session defaults for one named Snowflake connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    pub account: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    /// PEM private key for key-pair authentication, used when no password
    /// is configured.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Default `connections.toml` location, honoring `SNOWFLAKE_HOME`.
pub fn default_profiles_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SNOWFLAKE_HOME") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join("connections.toml"));
        }
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".snowflake/connections.toml"))
}

/// Load one named profile from a `connections.toml` file.
pub fn load_profile(path: &Path, name: &str) -> Result<ConnectionProfile> {
    let contents = std::fs::read_to_string(path)?;
    let mut profiles: HashMap<String, ConnectionProfile> = toml::from_str(&contents)?;
    profiles
        .remove(name)
        .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("connections.toml");
        std::fs::write(
            &path,
            r#"
[cursor-pat]
account = "xy12345.us-east-1"
user = "loader"
password = "hunter2"
warehouse = "LOAD_WH"

[keypair]
account = "xy12345.us-east-1"
user = "svc_loader"
private_key_path = "/keys/rsa_key.p8"
role = "SYSADMIN"
"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_password_profile() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let profile = load_profile(&path, "cursor-pat").unwrap();
        assert_eq!(profile.account, "xy12345.us-east-1");
        assert_eq!(profile.user, "loader");
        assert_eq!(profile.password.as_deref(), Some("hunter2"));
        assert_eq!(profile.warehouse.as_deref(), Some("LOAD_WH"));
        assert!(profile.role.is_none());
    }

    #[test]
    fn test_load_keypair_profile() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        let profile = load_profile(&path, "keypair").unwrap();
        assert!(profile.password.is_none());
        assert_eq!(
            profile.private_key_path,
            Some(PathBuf::from("/keys/rsa_key.p8"))
        );
    }

    #[test]
    fn test_unknown_profile_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir);

        match load_profile(&path, "missing") {
            Err(Error::ProfileNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("expected ProfileNotFound, got: {:?}", other.err()),
        }
    }
}
