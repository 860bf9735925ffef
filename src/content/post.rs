//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::config::SiteConfig;
use crate::helpers::url_for;

/// Kind of a database row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostKind {
    Post,
    Page,
}

impl PostKind {
    /// Parse the `type` column, e.g. "Post" or "Page"
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Post" => Some(PostKind::Post),
            "Page" => Some(PostKind::Page),
            _ => None,
        }
    }
}

/// A blog post or standalone page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Notion page id of the row
    pub id: String,

    /// Unique URL identifier
    pub slug: String,

    pub title: String,

    #[serde(default)]
    pub summary: String,

    /// Publication date
    pub date: DateTime<Utc>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(rename = "type")]
    pub kind: PostKind,

    #[serde(default)]
    pub status: String,

    /// Render without the narrow content column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_width: Option<bool>,
}

impl Post {
    /// Create a published post with minimal required fields
    pub fn new(id: &str, slug: &str, title: &str, date: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            slug: slug.to_string(),
            title: title.to_string(),
            summary: String::new(),
            date,
            tags: Vec::new(),
            kind: PostKind::Post,
            status: "Published".to_string(),
            full_width: None,
        }
    }

    /// Whether the row should appear on the site at `now`
    pub fn is_visible(&self, now: DateTime<Utc>, include_pages: bool) -> bool {
        let kind_ok = match self.kind {
            PostKind::Post => true,
            PostKind::Page => include_pages,
        };
        kind_ok && self.status == "Published" && !self.slug.is_empty() && self.date <= now
    }

    /// Whether the slug is a single path segment, so the post's output
    /// directory stays inside the public directory
    pub fn has_safe_slug(&self) -> bool {
        let slug = self.slug.as_str();
        let mut components = Path::new(slug).components();
        !slug.contains(['/', '\\'])
            && matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none()
    }

    pub fn is_full_width(&self) -> bool {
        self.full_width.unwrap_or(false)
    }

    /// Site-relative URL of the post
    pub fn url(&self, config: &SiteConfig) -> String {
        url_for(config, &self.slug)
    }
}

/// Find a post by slug, the way a page request resolves its route
pub fn find_by_slug<'a>(posts: &'a [Post], slug: &str) -> Option<&'a Post> {
    posts.iter().find(|p| p.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> Post {
        Post::new(
            "id-1",
            "hello-world",
            "Hello",
            Utc.with_ymd_and_hms(2023, 5, 30, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_visibility() {
        let now = Utc::now();
        let mut post = sample();
        assert!(post.is_visible(now, false));

        post.kind = PostKind::Page;
        assert!(!post.is_visible(now, false));
        assert!(post.is_visible(now, true));

        post.status = "Draft".to_string();
        assert!(!post.is_visible(now, true));
    }

    #[test]
    fn test_future_post_hidden() {
        let now = Utc::now();
        let mut post = sample();
        post.date = now + Duration::days(1);
        assert!(!post.is_visible(now, false));
    }

    #[test]
    fn test_safe_slug() {
        let mut post = sample();
        assert!(post.has_safe_slug());

        for slug in ["../../escaped", "..", ".", "a/b", "a\\b", "/etc", ""] {
            post.slug = slug.to_string();
            assert!(!post.has_safe_slug(), "{:?}", slug);
        }

        post.slug = "c++-notes..v2".to_string();
        assert!(post.has_safe_slug());
    }

    #[test]
    fn test_url_and_lookup() {
        let mut config = SiteConfig::default();
        config.path = "blog".to_string();
        let posts = vec![sample()];
        assert_eq!(posts[0].url(&config), "/blog/hello-world");
        assert!(find_by_slug(&posts, "hello-world").is_some());
        assert!(find_by_slug(&posts, "missing").is_none());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Post");
        assert!(json.get("fullWidth").is_none());
        let back: Post = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
