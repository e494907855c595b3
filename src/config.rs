//! Configuration for school-cms

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::blob_store::UploadConstraints;

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("school-cms")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and uploaded images
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Base URL that media references are resolved against
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Bearer token for /admin/api routes. Admin routes are closed when unset.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Page size used when a listing request does not ask for one
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    /// School name written into the settings row on first start
    #[serde(default = "default_school_name")]
    pub default_school_name: String,

    /// Size limit for thumbnails, banners, logos and portraits
    #[serde(default = "default_thumbnail_max_bytes")]
    pub thumbnail_max_bytes: u64,

    /// Size limit for preview and gallery images
    #[serde(default = "default_preview_max_bytes")]
    pub preview_max_bytes: u64,
}

fn default_http_port() -> u16 {
    8080
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_per_page() -> u32 {
    10
}

fn default_school_name() -> String {
    "SMK Negeri".to_string()
}

fn default_thumbnail_max_bytes() -> u64 {
    2 * 1024 * 1024
}

fn default_preview_max_bytes() -> u64 {
    4 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            http_port: default_http_port(),
            public_base_url: default_public_base_url(),
            admin_token: None,
            default_per_page: default_per_page(),
            default_school_name: default_school_name(),
            thumbnail_max_bytes: default_thumbnail_max_bytes(),
            preview_max_bytes: default_preview_max_bytes(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Validate, then write `config.toml` into the data directory unless one
    /// exists. The admin token is left out. Returns whether a file was written.
    pub fn write_default_if_missing(&self) -> Result<bool, std::io::Error> {
        self.validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let path = self.config_path();
        if path.exists() {
            return Ok(false);
        }
        let written = Config {
            admin_token: None,
            ..self.clone()
        };
        written.save(&path)?;
        Ok(true)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.default_per_page == 0 || self.default_per_page > crate::db::pagination::MAX_PER_PAGE {
            return Err(format!(
                "default_per_page must be between 1 and {}",
                crate::db::pagination::MAX_PER_PAGE
            ));
        }
        if url::Url::parse(&self.public_base_url).is_err() {
            return Err(format!("public_base_url '{}' is not a valid URL", self.public_base_url));
        }
        if matches!(self.admin_token.as_deref(), Some(t) if t.len() < 16) {
            return Err("admin_token must be at least 16 characters".to_string());
        }
        Ok(())
    }

    /// Get uploaded images directory
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Constraints for thumbnail-class image fields
    pub fn thumbnail_constraints(&self) -> UploadConstraints {
        UploadConstraints::images(self.thumbnail_max_bytes)
    }

    /// Constraints for preview-class image fields
    pub fn preview_constraints(&self) -> UploadConstraints {
        UploadConstraints::images(self.preview_max_bytes)
    }

    /// Constraints for gallery images (previews that may also be GIFs)
    pub fn gallery_constraints(&self) -> UploadConstraints {
        UploadConstraints::images(self.preview_max_bytes).allow("image/gif")
    }
}
