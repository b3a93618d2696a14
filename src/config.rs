//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. Secrets come from the environment as well; on
//! Cloud Run they are injected through secret bindings.

use std::env;

/// Credentials for the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// GCP project hosting Firestore
    pub gcp_project_id: String,
    /// Firebase project ID (audience of ID tokens)
    pub firebase_project_id: String,
    /// Server port
    pub port: u16,
    /// How long a cached role hint stays valid
    pub role_cache_ttl_secs: u64,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Media host credentials; uploads are disabled when absent
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            firebase_project_id: "test-project".to_string(),
            port: 8080,
            role_cache_ttl_secs: 3600,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            cloudinary: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| gcp_project_id.clone()),
            gcp_project_id,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            role_cache_ttl_secs: env::var("ROLE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            cloudinary: cloudinary_from_env()?,
        })
    }
}

/// Read Cloudinary credentials. All three variables must be set together.
fn cloudinary_from_env() -> Result<Option<CloudinaryConfig>, ConfigError> {
    let cloud_name = env::var("CLOUDINARY_CLOUD_NAME").ok();
    let api_key = env::var("CLOUDINARY_API_KEY").ok();
    let api_secret = env::var("CLOUDINARY_API_SECRET")
        .ok()
        .map(|v| v.trim().to_string());

    match (cloud_name, api_key, api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Some(CloudinaryConfig {
            cloud_name,
            api_key,
            api_secret,
        })),
        (None, None, None) => Ok(None),
        (None, _, _) => Err(ConfigError::Missing("CLOUDINARY_CLOUD_NAME")),
        (_, None, _) => Err(ConfigError::Missing("CLOUDINARY_API_KEY")),
        (_, _, None) => Err(ConfigError::Missing("CLOUDINARY_API_SECRET")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
