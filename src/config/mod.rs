//! Configuration module for the DigiGov backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default upload size cap (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Root directory for per-user document uploads
    pub upload_dir: PathBuf,
    /// Directory holding legacy users/complaints/documents JSON files to import once
    pub legacy_dir: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// IP geolocation endpoint returning `{"loc": "lat,lng"}`
    pub geolocation_url: String,
    /// Maximum accepted multipart body size in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let db_path = env::var("DIGIGOV_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let upload_dir = env::var("DIGIGOV_UPLOAD_DIR")
            .unwrap_or_else(|_| "./uploads".to_string())
            .into();

        let legacy_dir = env::var("DIGIGOV_LEGACY_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let bind_addr = env::var("DIGIGOV_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()
            .map_err(|e| format!("Invalid DIGIGOV_BIND_ADDR format: {}", e))?;

        let log_level = env::var("DIGIGOV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let geolocation_url = env::var("DIGIGOV_GEOLOCATION_URL")
            .unwrap_or_else(|_| "https://ipinfo.io/json".to_string());

        let max_upload_bytes = match env::var("DIGIGOV_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid DIGIGOV_MAX_UPLOAD_BYTES: {}", e))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            db_path,
            upload_dir,
            legacy_dir,
            bind_addr,
            log_level,
            geolocation_url,
            max_upload_bytes,
        })
    }
}
