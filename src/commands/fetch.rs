//! Fetch content from Notion into the local snapshot

use anyhow::Result;

use crate::notion::ContentSource;
use crate::snapshot::{detect_changes, ChangeSet, Manifest, SnapshotStore};
use crate::Blog;

/// Fetch every post and page and write them to the snapshot directory
pub async fn run(blog: &Blog) -> Result<ChangeSet> {
    let start = std::time::Instant::now();

    let source = ContentSource::for_blog(blog, false)?;
    let store = SnapshotStore::new(&blog.snapshot_dir);
    let changes = write_snapshot(&source, &store).await?;

    tracing::info!("Snapshot updated: {}", changes.summary());
    tracing::info!("Fetched in {:.2}s", start.elapsed().as_secs_f64());
    Ok(changes)
}

/// Copy posts and block maps from `source` into `store`, returning what
/// changed since the store's previous manifest. Posts whose blocks cannot
/// be loaded are left out.
pub async fn write_snapshot(source: &ContentSource, store: &SnapshotStore) -> Result<ChangeSet> {
    let posts = source.all_posts(true).await?;
    tracing::info!("Fetching {} posts and pages", posts.len());

    let previous = store.load_manifest();
    let mut manifest = Manifest::new();
    let mut saved = Vec::with_capacity(posts.len());

    for post in posts {
        match source.post_blocks(&post.id).await {
            Ok(block_map) => {
                tracing::debug!("Fetched {} ({} blocks)", post.slug, block_map.len());
                store.save_blocks(&post.id, &block_map)?;
                manifest.record(&post, &block_map)?;
                saved.push(post);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", post.slug, e);
            }
        }
    }

    for id in previous.posts.keys() {
        if !manifest.posts.contains_key(id) {
            store.remove_blocks(id)?;
        }
    }

    store.save_posts(&saved)?;
    store.save_manifest(&manifest)?;

    Ok(detect_changes(&previous, &manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Block, BlockMap, BlockRecord, Post};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn seed(store: &SnapshotStore, posts: &[(&str, &str, &str)]) {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let list: Vec<Post> = posts
            .iter()
            .map(|(id, slug, _)| Post::new(id, slug, slug, date))
            .collect();
        store.save_posts(&list).unwrap();
        for (id, _, text) in posts {
            let mut map = BlockMap::default();
            map.block.insert(
                id.to_string(),
                BlockRecord::new(Block::new(id, "text").with_property("title", text)),
            );
            store.save_blocks(id, &map).unwrap();
        }
    }

    #[tokio::test]
    async fn test_write_snapshot_reports_changes() {
        let temp = TempDir::new().unwrap();
        let upstream = SnapshotStore::new(temp.path().join("upstream"));
        let local = SnapshotStore::new(temp.path().join("local"));

        seed(&upstream, &[("p1", "one", "a"), ("p2", "two", "b")]);
        let source = ContentSource::Snapshot(upstream.clone());
        let first = write_snapshot(&source, &local).await.unwrap();
        assert_eq!(first.added, vec!["one", "two"]);
        assert_eq!(local.load_posts().unwrap().len(), 2);

        seed(&upstream, &[("p1", "one", "edited"), ("p3", "three", "c")]);
        let second = write_snapshot(&source, &local).await.unwrap();
        assert_eq!(second.added, vec!["three"]);
        assert_eq!(second.changed, vec!["one"]);
        assert_eq!(second.removed, vec!["two"]);
        assert!(local.load_blocks("p2").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_write_snapshot_skips_unloadable_posts() {
        let temp = TempDir::new().unwrap();
        let upstream = SnapshotStore::new(temp.path().join("upstream"));
        let local = SnapshotStore::new(temp.path().join("local"));

        seed(&upstream, &[("p1", "one", "a")]);
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        upstream
            .save_posts(&[
                Post::new("p1", "one", "one", date),
                Post::new("p9", "ghost", "ghost", date),
            ])
            .unwrap();

        let changes = write_snapshot(&ContentSource::Snapshot(upstream), &local)
            .await
            .unwrap();
        assert_eq!(changes.added, vec!["one"]);
        assert_eq!(local.load_posts().unwrap().len(), 1);
    }
}
