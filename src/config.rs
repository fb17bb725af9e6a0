//! Runtime configuration, read from the deployment's secret store.

use anyhow::{anyhow, Result};
use shuttle_runtime::SecretStore;

pub const DEFAULT_DATABASE: &str = "cinema-booking";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// MongoDB connection string. Transactions need a replica set or sharded
    /// deployment.
    pub mongodb_uri: String,
    pub database: String,
    /// Origin allowed by CORS.
    pub app_url: String,
}

impl AppConfig {
    pub fn from_secrets(secrets: &SecretStore) -> Result<Self> {
        Self::from_lookup(|key| secrets.get(key))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required =
            |key: &str| lookup(key).ok_or_else(|| anyhow!("secret `{key}` was not found"));

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?,
            app_url: required("APP_URL")?,
            database: lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
        })
    }
}
