//! Application configuration loaded from environment variables.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

/// Application configuration, built once in `main` and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub port: u16,

    /// Public base URL, used for redirect payloads and upload links.
    /// e.g., "https://qr.example.com"
    pub base_url: String,

    /// Path of the redb database file.
    pub database_url: String,

    /// HMAC secret used to verify bearer tokens.
    pub jwt_secret: String,

    /// Directory where uploaded files are written and served from.
    pub upload_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `PORT`: Server port (default: 3000)
    /// - `BASE_URL`: Public base URL (default: "http://localhost:{PORT}")
    /// - `DATABASE_URL`: Database file path (default: "qr_studio.db")
    /// - `JWT_SECRET`: Token verification secret (default: "dev_secret")
    /// - `UPLOAD_DIR`: Upload directory (default: "public/uploads")
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => 3000,
        };

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "qr_studio.db".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev_secret".to_string());

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/uploads"));

        tracing::info!(
            port,
            base_url = %base_url,
            database_url = %database_url,
            upload_dir = %upload_dir.display(),
            "configuration loaded"
        );

        Ok(Self {
            port,
            base_url,
            database_url,
            jwt_secret,
            upload_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &["PORT", "BASE_URL", "DATABASE_URL", "JWT_SECRET", "UPLOAD_DIR"];

    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
        for (k, v) in vars {
            std::env::set_var(k, v);
        }

        f();

        for (k, v) in &saved {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.port, 3000);
            assert_eq!(config.base_url, "http://localhost:3000");
            assert_eq!(config.database_url, "qr_studio.db");
            assert_eq!(config.jwt_secret, "dev_secret");
            assert_eq!(config.upload_dir, PathBuf::from("public/uploads"));
        });
    }

    #[test]
    fn config_base_url_follows_port() {
        with_env_vars(&[("PORT", "8080")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.base_url, "http://localhost:8080");
        });
    }

    #[test]
    fn config_base_url_trailing_slash_stripped() {
        with_env_vars(&[("BASE_URL", "https://qr.example.com/")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.base_url, "https://qr.example.com");
        });
    }

    #[test]
    fn config_invalid_port() {
        with_env_vars(&[("PORT", "not-a-port")], || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::InvalidPort(p)) if p == "not-a-port"
            ));
        });
    }
}
