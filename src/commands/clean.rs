//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::snapshot::SnapshotStore;
use crate::Blog;

/// Clean the public directory, and the fetched snapshot when asked
pub fn run(blog: &Blog, include_snapshot: bool) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    if include_snapshot {
        SnapshotStore::new(&blog.snapshot_dir).clear()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    #[test]
    fn test_clean() {
        let temp = TempDir::new().unwrap();
        let blog = Blog::with_config(temp.path(), SiteConfig::default());
        fs::create_dir_all(blog.public_dir.join("hello")).unwrap();
        fs::create_dir_all(&blog.snapshot_dir).unwrap();

        run(&blog, false).unwrap();
        assert!(!blog.public_dir.exists());
        assert!(blog.snapshot_dir.exists());

        run(&blog, true).unwrap();
        assert!(!blog.snapshot_dir.exists());
    }
}
