//! Initialize a new blog

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const SAMPLE_CONFIG: &str = r##"# nobelium-rs configuration

# Site
title: Nobelium
description: This gonna be an awesome website.
author: Nobelium
email: hi@example.com
link: https://example.com
since: 2021
lang: zh-CN
timezone: Asia/Shanghai
appearance: auto
font: sans-serif
light_background: "#ffffff"
dark_background: "#18181B"

# URL
path: ""
posts_per_page: 7
sort_by_date: true

# Notion
# The id of the post database. NOTION_PAGE_ID overrides it.
notion_page_id: ""
# token_v2 cookie for private workspaces. NOTION_ACCESS_TOKEN overrides it.
# notion_access_token: ""
request_timeout_secs: 30
# Keep only the first N blocks of every post
# block_slice: 100

# Header
auto_collapsed_nav_bar: false
favicon: /favicon.png
favicon_dark: /favicon.png
nav_links:
  - { name: 博客, to: / }
  - { name: 关于, to: /about }
  - { name: 订阅, to: /feed, external: true }
  - { name: 搜寻, to: /search }

# Directories
public_dir: public
snapshot_dir: .notion-snapshot
assets_dir: public_assets

highlight_theme: InspiredGitHub

# Comments: utterances or cusdis
comment:
  # provider: utterances
  utterances:
    repo: ""
    issue_term: title
  cusdis:
    app_id: ""
    host: https://cusdis.com
    script_src: https://cusdis.com/js/cusdis.umd.js
"##;

const GITIGNORE: &str = "public/\n.notion-snapshot/\n";

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("public_assets"))?;
    fs::write(&config_path, SAMPLE_CONFIG)?;

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(gitignore, GITIGNORE)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_site() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("blog");
        init_site(&dir).unwrap();

        assert!(dir.join("public_assets").is_dir());
        assert!(dir.join(".gitignore").exists());

        let config = SiteConfig::load(dir.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.posts_per_page, 7);
        assert_eq!(config.light_background, "#ffffff");
        assert_eq!(config.dark_background, "#18181B");
        assert_eq!(config.comment.cusdis.script_src, "https://cusdis.com/js/cusdis.umd.js");
        assert_eq!(config.nav_links.len(), 4);
        assert!(config.nav_links[2].external);
        assert_eq!(config.block_limit(), None);

        // Refuses to overwrite
        assert!(init_site(&dir).is_err());
    }
}
