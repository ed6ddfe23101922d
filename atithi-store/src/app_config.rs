use atithi_core::document::UploadPolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub records: RecordStoreConfig,
    pub uploads: UploadPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    pub admin_email: String,
    pub admin_password: String,
}

/// Hosted object store (Cloudinary-style unsigned upload endpoint)
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default = "default_media_base")]
    pub api_base: String,
    pub cloud_name: String,
    pub upload_preset: String,
    pub folder: String,
}

fn default_media_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

/// Hosted document database (Firestore-style REST endpoint)
#[derive(Debug, Deserialize, Clone)]
pub struct RecordStoreConfig {
    #[serde(default = "default_records_base")]
    pub api_base: String,
    pub project_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_records_base() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_collection() -> String {
    "guests".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of ATITHI)
            // Eg.. `ATITHI_SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("ATITHI").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
