//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` but can be specified via `-f` flag or `DOCGATE_CONFIG`. Environment
//! variables prefixed with `DOCGATE_` override YAML values; nested fields use double underscores,
//! e.g. `DOCGATE_STORAGE__UPLOADS_DIR=/srv/uploads`.
//!
//! Every field has a default, so the server runs with no config file at all:
//!
//! ```bash
//! # Override the listen port
//! DOCGATE_PORT=8080
//!
//! # Point at a viewer running elsewhere
//! DOCGATE_VIEWER__URL="http://viewer.internal:9980/loleaflet/dist/loleaflet.html"
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "DOCGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Loaded from YAML and environment variables; all fields have defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Document storage configuration
    pub storage: StorageConfig,
    /// External document viewer configuration
    pub viewer: ViewerConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Document storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory where uploaded documents are stored. Created at startup if missing.
    pub uploads_dir: PathBuf,
    /// Maximum upload size in bytes, enforced before the body is read in full.
    /// Default: 100MB
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            max_file_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// External document viewer configuration.
///
/// The viewer is an independently running collaborator (Collabora Online style).
/// docgate never talks to it directly - it only hands clients URLs that point
/// the viewer at a stored document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Base URL of the viewer page. The document's absolute path is appended
    /// as a `file_path` query parameter.
    pub url: Url,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:9980/loleaflet/dist/loleaflet.html").expect("default viewer URL is valid"),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard", serialize_with = "serialize_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn serialize_wildcard<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("*")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageConfig::default(),
            viewer: ViewerConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("DOCGATE_").split("__"))
    }

    /// Check invariants figment cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.max_file_size == 0 {
            anyhow::bail!("storage.max_file_size must be greater than zero");
        }
        if !matches!(self.viewer.url.scheme(), "http" | "https") {
            anyhow::bail!("viewer.url must be an http(s) URL, got '{}'", self.viewer.url);
        }
        Ok(())
    }

    /// Get the full bind address as host:port
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args {
            config: "/nonexistent/config.yaml".to_string(),
            validate: false,
        }
    }

    #[test]
    fn defaults_match_original_deployment() {
        let config = Config::load(&default_args()).expect("defaults should load");
        assert_eq!(config.port, 3000);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(
            config.viewer.url.as_str(),
            "http://localhost:9980/loleaflet/dist/loleaflet.html"
        );
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 8080
                storage:
                  uploads_dir: /srv/docs
                viewer:
                  url: "https://viewer.example.com/browser/dist/cool.html"
                "#,
            )?;
            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 8080);
            assert_eq!(config.storage.uploads_dir, PathBuf::from("/srv/docs"));
            assert_eq!(config.viewer.url.host_str(), Some("viewer.example.com"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 8080")?;
            jail.set_env("DOCGATE_PORT", "9090");
            jail.set_env("DOCGATE_STORAGE__MAX_FILE_SIZE", "1024");
            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.port, 9090);
            assert_eq!(config.storage.max_file_size, 1024);
            Ok(())
        });
    }

    #[test]
    fn zero_max_file_size_is_rejected() {
        let mut config = Config::default();
        config.storage.max_file_size = 0;
        assert!(config.validate().is_err());
    }
}
