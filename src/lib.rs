//! nobelium-rs: a static blog generator backed by a Notion database
//!
//! Posts live as rows of a Notion database. Each build fetches the rows and
//! every post's block map, post-processes the blocks, renders them with Tera
//! templates and writes a static site.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod notion;
pub mod server;
pub mod snapshot;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "blog.config.yml";

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Fetched content snapshots
    pub snapshot_dir: PathBuf,
    /// Local static files copied verbatim (favicon, images)
    pub assets_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            config::SiteConfig::default()
        };
        config.apply_env_overrides();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let snapshot_dir = base_dir.join(&config.snapshot_dir);
        let assets_dir = base_dir.join(&config.assets_dir);

        Self {
            config,
            base_dir,
            public_dir,
            snapshot_dir,
            assets_dir,
        }
    }

    /// Path of the configuration file
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Generate the static site
    pub async fn generate(&self, options: &commands::generate::GenerateOptions) -> Result<()> {
        commands::generate::run(self, options).await
    }

    /// Clean the public directory, and the snapshot when asked
    pub fn clean(&self, include_snapshot: bool) -> Result<()> {
        commands::clean::run(self, include_snapshot)
    }
}
