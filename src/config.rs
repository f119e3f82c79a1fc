use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scopes requested at authorization time. Must cover profile info plus
/// direct upload and publish.
pub const DEFAULT_SCOPE: &str = "user.info.basic,video.upload,video.publish";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tiktok: TikTokConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokConfig {
    pub client_key: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: String,
    /// Base for the user-facing authorize page (https://www.tiktok.com).
    pub auth_base_url: String,
    /// Base for the REST API (https://open.tiktokapis.com).
    pub api_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding downloaded and synthesized files, served at /files.
    pub files_dir: String,
    /// External base URL used to build file links returned by /extract.
    pub public_base_url: Option<String>,
    /// Downloader binary invoked by the media fetcher.
    pub downloader: String,
    /// Optional external command that turns deal JSON into a short video.
    pub synthesizer_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the single-document token record.
    pub tokens_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            tiktok: TikTokConfig {
                client_key: None,
                client_secret: None,
                redirect_uri: None,
                scope: DEFAULT_SCOPE.to_string(),
                auth_base_url: "https://www.tiktok.com".to_string(),
                api_base_url: "https://open.tiktokapis.com".to_string(),
            },
            media: MediaConfig {
                files_dir: "files".to_string(),
                public_base_url: None,
                downloader: "yt-dlp".to_string(),
                synthesizer_command: None,
            },
            storage: StorageConfig {
                tokens_path: "tokens.json".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("TTPROXY")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config.with_flat_env_overrides())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(
            Environment::with_prefix("TTPROXY")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config.with_flat_env_overrides())
    }

    /// Apply the documented flat environment variables on top of whatever the
    /// layered sources produced. These names predate the TTPROXY_* scheme and
    /// remain the primary deployment interface.
    fn with_flat_env_overrides(self) -> Self {
        self.with_flat_overrides(|name| std::env::var(name).ok())
    }

    fn with_flat_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("PUBLIC_BASE_URL") {
            self.media.public_base_url = Some(value);
        }
        if let Some(value) = lookup("TIKTOK_CLIENT_KEY") {
            self.tiktok.client_key = Some(value);
        }
        if let Some(value) = lookup("TIKTOK_CLIENT_SECRET") {
            self.tiktok.client_secret = Some(value);
        }
        if let Some(value) = lookup("TIKTOK_REDIRECT_URI") {
            self.tiktok.redirect_uri = Some(value);
        }
        if let Some(value) = lookup("TOKENS_PATH") {
            self.storage.tokens_path = value;
        }
        if let Some(value) = lookup("FILES_DIR") {
            self.media.files_dir = value;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.tiktok.scope, DEFAULT_SCOPE);
        assert_eq!(config.tiktok.auth_base_url, "https://www.tiktok.com");
        assert_eq!(config.tiktok.api_base_url, "https://open.tiktokapis.com");
        assert_eq!(config.media.files_dir, "files");
        assert_eq!(config.media.downloader, "yt-dlp");
        assert_eq!(config.storage.tokens_path, "tokens.json");
        assert_eq!(config.logging.level, "info");
        assert!(config.tiktok.client_key.is_none());
    }

    #[test]
    fn test_config_load_from_yaml_file() {
        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 4000
tiktok:
  client_key: "file-key"
  client_secret: "file-secret"
  redirect_uri: "https://example.com/tiktok/callback"
media:
  files_dir: "media"
storage:
  tokens_path: "/var/lib/ttproxy/tokens.json"
logging:
  level: "warn"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.tiktok.client_key.as_deref(), Some("file-key"));
        assert_eq!(
            config.tiktok.redirect_uri.as_deref(),
            Some("https://example.com/tiktok/callback")
        );
        assert_eq!(config.media.files_dir, "media");
        assert_eq!(config.storage.tokens_path, "/var/lib/ttproxy/tokens.json");
        assert_eq!(config.logging.level, "warn");
        // Untouched fields keep their defaults.
        assert_eq!(config.tiktok.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let config = Config::load_from_file("nonexistent.yaml").unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_flat_overrides_replace_layered_values() {
        let mut config = Config::default();
        config.tiktok.client_key = Some("from-file".to_string());

        let config = config.with_flat_overrides(|name| match name {
            "TIKTOK_CLIENT_KEY" => Some("from-env".to_string()),
            "TOKENS_PATH" => Some("/tmp/env-tokens.json".to_string()),
            _ => None,
        });

        assert_eq!(config.tiktok.client_key.as_deref(), Some("from-env"));
        assert_eq!(config.storage.tokens_path, "/tmp/env-tokens.json");
    }

    #[test]
    fn test_flat_overrides_leave_unset_values_alone() {
        let mut config = Config::default();
        config.tiktok.client_key = Some("from-file".to_string());

        let config = config.with_flat_overrides(|_| None);

        assert_eq!(config.tiktok.client_key.as_deref(), Some("from-file"));
        assert_eq!(config.storage.tokens_path, "tokens.json");
        assert!(config.media.public_base_url.is_none());
    }
}
