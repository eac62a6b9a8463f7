use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use medidoc_core::service::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded blobs.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Server used by `--remote` when no URL is given on the command line.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Config {
    /// Defaults rooted at `data_dir`, for tests and first runs.
    pub fn minimal(data_dir: &Path) -> Self {
        Self {
            db: DbConfig {
                path: data_dir.join("medidoc.sqlite"),
            },
            storage: StorageConfig {
                root: data_dir.join("uploads"),
            },
            server: ServerConfig::default(),
            upload: UploadConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if let Some(url) = &config.client.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "client.base_url must start with http:// or https:// (got '{}')",
                url
            );
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, body: &str) -> PathBuf {
        let path = tmp.path().join("medidoc.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_applied() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[db]
path = "./data/medidoc.sqlite"

[storage]
root = "./data/uploads"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:5000");
        assert_eq!(cfg.upload.max_bytes, 50 * 1024 * 1024);
        assert!(cfg.client.base_url.is_none());
    }

    #[test]
    fn test_zero_max_bytes_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[db]
path = "x.sqlite"
[storage]
root = "uploads"
[upload]
max_bytes = 0
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_bytes"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[db]
path = "x.sqlite"
[storage]
root = "uploads"
[client]
base_url = "localhost:5000"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_storage_section_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "[db]\npath = \"x.sqlite\"\n");
        assert!(load_config(&path).is_err());
    }
}
