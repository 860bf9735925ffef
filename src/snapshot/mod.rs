//! On-disk snapshots of fetched Notion content
//!
//! `fetch` writes the post list and every post's block map here so that
//! `generate --offline` can rebuild the site without network access. A
//! manifest records a content hash per post, which is how `fetch` reports
//! what changed since the previous snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::{BlockMap, Post};
use crate::notion::NotionError;

const MANIFEST_FILE: &str = "manifest.json";
const POSTS_FILE: &str = "posts.json";
const BLOCKS_DIR: &str = "blocks";

/// A snapshotted post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub slug: String,
    /// Hash of the serialized raw block map
    pub content_hash: u64,
}

/// Index of a snapshot directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Entries keyed by post id
    pub posts: HashMap<String, SnapshotEntry>,
}

impl Manifest {
    /// Current snapshot format version
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            fetched_at: Some(Utc::now()),
            posts: HashMap::new(),
        }
    }

    /// Record a post and the hash of its block map
    pub fn record(&mut self, post: &Post, block_map: &BlockMap) -> Result<(), NotionError> {
        let raw = serde_json::to_string(block_map)?;
        self.posts.insert(
            post.id.clone(),
            SnapshotEntry {
                slug: post.slug.clone(),
                content_hash: hash_content(&raw),
            },
        );
        Ok(())
    }
}

/// Reads and writes a snapshot directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a post list has been written
    pub fn exists(&self) -> bool {
        self.dir.join(POSTS_FILE).exists()
    }

    /// Load the manifest, or an empty one if missing or from another version
    pub fn load_manifest(&self) -> Manifest {
        let path = self.dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(manifest) = serde_json::from_str::<Manifest>(&content) {
                if manifest.version == Manifest::VERSION {
                    return manifest;
                }
                tracing::info!("Snapshot version mismatch, ignoring old manifest");
            }
        }
        Manifest::default()
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<(), NotionError> {
        self.write_json(&self.dir.join(MANIFEST_FILE), manifest)
    }

    pub fn save_posts(&self, posts: &[Post]) -> Result<(), NotionError> {
        self.write_json(&self.dir.join(POSTS_FILE), &posts)
    }

    pub fn load_posts(&self) -> Result<Vec<Post>, NotionError> {
        let content = fs::read_to_string(self.dir.join(POSTS_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_blocks(&self, post_id: &str, block_map: &BlockMap) -> Result<(), NotionError> {
        self.write_json(&self.blocks_path(post_id), block_map)
    }

    /// Load a post's block map; a missing file means the post is unknown
    pub fn load_blocks(&self, post_id: &str) -> Result<BlockMap, NotionError> {
        let path = self.blocks_path(post_id);
        if !path.exists() {
            return Err(NotionError::NotFound(post_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Delete the block map of a post that no longer exists
    pub fn remove_blocks(&self, post_id: &str) -> Result<(), NotionError> {
        let path = self.blocks_path(post_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Delete the snapshot directory
    pub fn clear(&self) -> Result<(), NotionError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
            tracing::info!("Deleted: {:?}", self.dir);
        }
        Ok(())
    }

    fn blocks_path(&self, post_id: &str) -> PathBuf {
        let file = post_id.replace(['/', '\\'], "_");
        self.dir.join(BLOCKS_DIR).join(format!("{}.json", file))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), NotionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}

/// Differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if !self.has_changes() {
            return "no changes".to_string();
        }

        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("{} added", self.added.len()));
        }
        if !self.changed.is_empty() {
            parts.push(format!("{} changed", self.changed.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("{} removed", self.removed.len()));
        }
        parts.push(format!("{} unchanged", self.unchanged));
        parts.join(", ")
    }
}

/// Compare two manifests by post slug
pub fn detect_changes(old: &Manifest, new: &Manifest) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (id, entry) in &new.posts {
        match old.posts.get(id) {
            None => changes.added.push(entry.slug.clone()),
            Some(prev) if prev.content_hash != entry.content_hash => {
                changes.changed.push(entry.slug.clone())
            }
            Some(_) => changes.unchanged += 1,
        }
    }
    for (id, entry) in &old.posts {
        if !new.posts.contains_key(id) {
            changes.removed.push(entry.slug.clone());
        }
    }

    changes.added.sort();
    changes.changed.sort();
    changes.removed.sort();
    changes
}

/// Calculate a hash for string content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Block, BlockRecord};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn post(id: &str, slug: &str) -> Post {
        Post::new(id, slug, slug, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn blocks(text: &str) -> BlockMap {
        let mut map = BlockMap::default();
        map.block.insert(
            "b".to_string(),
            BlockRecord::new(Block::new("b", "text").with_property("title", text)),
        );
        map
    }

    #[test]
    fn test_round_trip_on_disk() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snap"));
        assert!(!store.exists());

        let posts = vec![post("p1", "hello")];
        store.save_posts(&posts).unwrap();
        store.save_blocks("p1", &blocks("hi")).unwrap();

        assert!(store.exists());
        assert_eq!(store.load_posts().unwrap(), posts);
        assert_eq!(store.load_blocks("p1").unwrap(), blocks("hi"));

        store.remove_blocks("p1").unwrap();
        assert!(store.load_blocks("p1").unwrap_err().is_not_found());
        store.remove_blocks("p1").unwrap();
    }

    #[test]
    fn test_block_files_stay_in_blocks_dir() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snap"));
        for id in ["../../escaped", "..", "a\\b"] {
            store.save_blocks(id, &blocks("x")).unwrap();
            let path = store.blocks_path(id);
            assert_eq!(path.parent().unwrap(), temp.path().join("snap").join(BLOCKS_DIR));
            assert!(path.exists());
        }
        assert!(!temp.path().join("escaped.json").exists());
    }

    #[test]
    fn test_missing_blocks_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let err = store.load_blocks("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_manifest_version_mismatch_ignored() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        let mut manifest = Manifest::new();
        manifest.record(&post("p1", "a"), &blocks("x")).unwrap();
        store.save_manifest(&manifest).unwrap();
        assert_eq!(store.load_manifest().posts.len(), 1);

        manifest.version = 99;
        store.save_manifest(&manifest).unwrap();
        assert!(store.load_manifest().posts.is_empty());
    }

    #[test]
    fn test_detect_changes() {
        let mut old = Manifest::new();
        old.record(&post("1", "same"), &blocks("a")).unwrap();
        old.record(&post("2", "edited"), &blocks("b")).unwrap();
        old.record(&post("3", "gone"), &blocks("c")).unwrap();

        let mut new = Manifest::new();
        new.record(&post("1", "same"), &blocks("a")).unwrap();
        new.record(&post("2", "edited"), &blocks("B")).unwrap();
        new.record(&post("4", "fresh"), &blocks("d")).unwrap();

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.added, vec!["fresh"]);
        assert_eq!(changes.changed, vec!["edited"]);
        assert_eq!(changes.removed, vec!["gone"]);
        assert_eq!(changes.unchanged, 1);
        assert_eq!(changes.summary(), "1 added, 1 changed, 1 removed, 1 unchanged");
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("snap"));
        store.save_posts(&[]).unwrap();
        store.clear().unwrap();
        assert!(!store.dir().exists());
    }
}
