//! Site configuration (blog.config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable overriding `notion_page_id`
pub const ENV_PAGE_ID: &str = "NOTION_PAGE_ID";
/// Environment variable overriding `notion_access_token`
pub const ENV_ACCESS_TOKEN: &str = "NOTION_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub link: String,
    pub since: Option<i32>,
    pub lang: String,
    pub timezone: String,
    pub appearance: Appearance,
    pub font: String,
    pub light_background: String,
    pub dark_background: String,

    // URL
    /// Sub-path the blog is served under, e.g. "/blog". Empty for the root.
    pub path: String,
    pub posts_per_page: usize,
    pub sort_by_date: bool,

    // Notion
    pub notion_page_id: String,
    pub notion_access_token: Option<String>,
    pub notion_api_base: String,
    pub request_timeout_secs: u64,
    /// Keep only the first N blocks of every post. Zero or unset disables it.
    pub block_slice: Option<i64>,

    // Header
    pub auto_collapsed_nav_bar: bool,
    pub favicon: String,
    pub favicon_dark: String,
    #[serde(default = "default_nav_links")]
    pub nav_links: Vec<NavLink>,

    // Directories
    pub public_dir: String,
    pub snapshot_dir: String,
    pub assets_dir: String,

    // Code highlighting
    pub highlight_theme: String,

    #[serde(default)]
    pub comment: CommentConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Nobelium".to_string(),
            description: "A blog built with nobelium-rs".to_string(),
            author: "John Doe".to_string(),
            email: String::new(),
            link: "https://example.com".to_string(),
            since: None,
            lang: "zh-CN".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            appearance: Appearance::Auto,
            font: "sans-serif".to_string(),
            light_background: "#ffffff".to_string(),
            dark_background: "#18181B".to_string(),

            path: String::new(),
            posts_per_page: 7,
            sort_by_date: true,

            notion_page_id: String::new(),
            notion_access_token: None,
            notion_api_base: "https://www.notion.so/api/v3".to_string(),
            request_timeout_secs: 30,
            block_slice: None,

            auto_collapsed_nav_bar: false,
            favicon: "/favicon.png".to_string(),
            favicon_dark: "/favicon.png".to_string(),
            nav_links: default_nav_links(),

            public_dir: "public".to_string(),
            snapshot_dir: ".notion-snapshot".to_string(),
            assets_dir: "public_assets".to_string(),

            highlight_theme: "InspiredGitHub".to_string(),

            comment: CommentConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `NOTION_PAGE_ID` / `NOTION_ACCESS_TOKEN` from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(ENV_PAGE_ID).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using {} from environment", ENV_PAGE_ID);
            self.notion_page_id = id.trim().to_string();
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.notion_access_token = Some(token.trim().to_string());
        }
    }

    /// The truncation limit, if one is configured and positive
    pub fn block_limit(&self) -> Option<usize> {
        self.block_slice
            .filter(|n| *n > 0)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// The configured sub-path, normalised to "" or "/segment"
    pub fn base_path(&self) -> String {
        let trimmed = self.path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Color scheme of the generated site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Light,
    Dark,
    Auto,
}

/// A header navigation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub name: String,
    pub to: String,
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub external: bool,
}

impl NavLink {
    fn new(name: &str, to: &str, external: bool) -> Self {
        Self {
            name: name.to_string(),
            to: to.to_string(),
            show: true,
            external,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_nav_links() -> Vec<NavLink> {
    vec![
        NavLink::new("博客", "/", false),
        NavLink::new("关于", "/about", false),
        NavLink::new("订阅", "/feed", true),
        NavLink::new("搜寻", "/search", false),
    ]
}

/// Comment widget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    pub provider: Option<CommentProvider>,
    pub utterances: UtterancesConfig,
    pub cusdis: CusdisConfig,
}

/// Supported comment providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentProvider {
    Utterances,
    Cusdis,
}

/// utterances.es configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtterancesConfig {
    pub repo: String,
    pub issue_term: String,
}

impl Default for UtterancesConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "title".to_string(),
        }
    }
}

/// cusdis.com configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CusdisConfig {
    pub app_id: String,
    pub host: String,
    pub script_src: String,
}

impl Default for CusdisConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            host: "https://cusdis.com".to_string(),
            script_src: "https://cusdis.com/js/cusdis.umd.js".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Nobelium");
        assert_eq!(config.posts_per_page, 7);
        assert_eq!(config.nav_links.len(), 4);
        assert!(config.nav_links[2].external);
        assert_eq!(config.block_limit(), None);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
author: Test User
email: me@example.com
path: /blog/
block_slice: 20
appearance: dark
comment:
  provider: utterances
  utterances:
    repo: me/blog-comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.author, "Test User");
        assert_eq!(config.base_path(), "/blog");
        assert_eq!(config.block_limit(), Some(20));
        assert_eq!(config.appearance, Appearance::Dark);
        assert_eq!(config.comment.provider, Some(CommentProvider::Utterances));
        assert_eq!(config.comment.utterances.issue_term, "title");
        // Nav links fall back to the defaults when omitted
        assert_eq!(config.nav_links[0].to, "/");
    }

    #[test]
    fn test_block_limit_ignores_non_positive() {
        let mut config = SiteConfig::default();
        config.block_slice = Some(0);
        assert_eq!(config.block_limit(), None);
        config.block_slice = Some(-3);
        assert_eq!(config.block_limit(), None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(|key| match key {
            ENV_PAGE_ID => Some(" abc123 ".to_string()),
            ENV_ACCESS_TOKEN => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.notion_page_id, "abc123");
        assert_eq!(config.notion_access_token, None);
    }

    #[test]
    fn test_nav_link_defaults() {
        let yaml = r#"
nav_links:
  - name: Home
    to: /
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.nav_links.len(), 1);
        assert!(config.nav_links[0].show);
        assert!(!config.nav_links[0].external);
    }
}
