//! Content backend - fetches posts and block maps from Notion

mod client;
mod error;
pub mod ids;
pub mod posts;

pub use client::NotionClient;
pub use error::NotionError;

use chrono::Utc;

use crate::content::{BlockMap, Post};
use crate::snapshot::SnapshotStore;
use crate::Blog;

/// Where posts and block maps come from
#[derive(Clone)]
pub enum ContentSource {
    /// Live Notion workspace
    Notion {
        client: NotionClient,
        database_id: String,
        sort_by_date: bool,
    },
    /// Previously fetched snapshot on disk
    Snapshot(SnapshotStore),
}

impl ContentSource {
    /// Pick the source for a build
    pub fn for_blog(blog: &Blog, offline: bool) -> Result<Self, NotionError> {
        if offline {
            tracing::info!("Reading content from snapshot {:?}", blog.snapshot_dir);
            return Ok(ContentSource::Snapshot(SnapshotStore::new(&blog.snapshot_dir)));
        }
        if blog.config.notion_page_id.trim().is_empty() {
            return Err(NotionError::MissingPageId);
        }
        Ok(ContentSource::Notion {
            client: NotionClient::new(&blog.config)?,
            database_id: ids::to_uuid(&blog.config.notion_page_id),
            sort_by_date: blog.config.sort_by_date,
        })
    }

    /// All visible posts, and pages too when `include_pages` is set
    pub async fn all_posts(&self, include_pages: bool) -> Result<Vec<Post>, NotionError> {
        match self {
            ContentSource::Notion {
                client,
                database_id,
                sort_by_date,
            } => {
                let page = client.get_page(database_id).await?;
                let (collection_id, view_id, schema) = posts::database_info(&page, database_id)
                    .ok_or_else(|| NotionError::NotADatabase(database_id.clone()))?;

                let (ids, rows) = client.query_collection(&collection_id, &view_id).await?;
                let rows = posts::rows_to_posts(&schema, &ids, &rows);
                tracing::debug!("Database returned {} rows", rows.len());

                Ok(posts::filter_posts(rows, include_pages, *sort_by_date, Utc::now()))
            }
            ContentSource::Snapshot(store) => {
                // Snapshots are already sorted at fetch time
                let posts = store.load_posts()?;
                Ok(posts::filter_posts(posts, include_pages, false, Utc::now()))
            }
        }
    }

    /// The raw block map of one post
    pub async fn post_blocks(&self, post_id: &str) -> Result<BlockMap, NotionError> {
        match self {
            ContentSource::Notion { client, .. } => client.get_page(post_id).await,
            ContentSource::Snapshot(store) => store.load_blocks(post_id),
        }
    }

    /// Resolve a slug to its post, or `NotFound`
    pub async fn find_post(&self, slug: &str) -> Result<Post, NotionError> {
        let posts = self.all_posts(true).await?;
        crate::content::find_by_slug(&posts, slug)
            .cloned()
            .ok_or_else(|| NotionError::NotFound(slug.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Block, BlockRecord, PostKind};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn snapshot_with_posts(dir: &std::path::Path) -> SnapshotStore {
        let store = SnapshotStore::new(dir);
        let date = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut about = Post::new("p2", "about", "About", date);
        about.kind = PostKind::Page;
        store
            .save_posts(&[Post::new("p1", "hello", "Hello", date), about])
            .unwrap();

        let mut map = BlockMap::default();
        map.block
            .insert("p1".to_string(), BlockRecord::new(Block::new("p1", "page")));
        store.save_blocks("p1", &map).unwrap();
        store
    }

    #[tokio::test]
    async fn test_snapshot_source_filters_pages() {
        let temp = TempDir::new().unwrap();
        let source = ContentSource::Snapshot(snapshot_with_posts(temp.path()));

        assert_eq!(source.all_posts(false).await.unwrap().len(), 1);
        assert_eq!(source.all_posts(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_post() {
        let temp = TempDir::new().unwrap();
        let source = ContentSource::Snapshot(snapshot_with_posts(temp.path()));

        let post = source.find_post("about").await.unwrap();
        assert_eq!(post.id, "p2");

        let err = source.find_post("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_snapshot_blocks() {
        let temp = TempDir::new().unwrap();
        let source = ContentSource::Snapshot(snapshot_with_posts(temp.path()));
        assert_eq!(source.post_blocks("p1").await.unwrap().len(), 1);
        assert!(source.post_blocks("p2").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_page_id() {
        let temp = TempDir::new().unwrap();
        let blog = Blog::with_config(temp.path(), crate::config::SiteConfig::default());
        let err = ContentSource::for_blog(&blog, false).err().unwrap();
        assert!(matches!(err, NotionError::MissingPageId));
    }
}
