//! List helper functions for tag navigation and pagination

use std::collections::HashMap;

use super::html::html_escape;
use super::url::{encode_uri_component, url_for};
use crate::config::SiteConfig;
use crate::content::Post;

/// Count posts per tag, most used first, ties by name
pub fn tag_counts(posts: &[Post]) -> Vec<(String, usize)> {
    let mut tags: HashMap<&str, usize> = HashMap::new();

    for post in posts {
        for tag in &post.tags {
            *tags.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(String, usize)> = tags
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Directory name of a tag page under `tag/`
pub fn tag_dir_name(tag: &str) -> String {
    let name = tag.trim().replace(['/', '\\'], "-");
    if name.trim_matches('.').is_empty() {
        // "", "." and ".." would point at `tag/` itself or above it
        return "-".repeat(name.len().max(1));
    }
    name
}

/// Site-relative URL of a tag page
pub fn tag_url(config: &SiteConfig, tag: &str) -> String {
    url_for(
        config,
        &format!("tag/{}", encode_uri_component(&tag_dir_name(tag))),
    )
}

/// Generate the tag list shown above post listings
pub fn list_tags(config: &SiteConfig, posts: &[Post], current: Option<&str>) -> String {
    let tags = tag_counts(posts);
    if tags.is_empty() {
        return String::new();
    }

    let mut html = r#"<ul class="tag-list">"#.to_string();

    for (name, count) in tags {
        let selected = current == Some(name.as_str());
        // The selected tag links back to the unfiltered listing
        let url = if selected {
            url_for(config, "search")
        } else {
            tag_url(config, &name)
        };
        let class = if selected {
            "tag-list-item selected"
        } else {
            "tag-list-item"
        };

        html.push_str(&format!(
            r#"<li class="{}"><a href="{}">{} ({})</a></li>"#,
            class,
            url,
            html_escape(&name),
            count
        ));
    }

    html.push_str("</ul>");
    html
}

/// URL of index page `page` (1-based)
pub fn page_url(config: &SiteConfig, page: usize) -> String {
    if page <= 1 {
        url_for(config, "/")
    } else {
        url_for(config, &format!("page/{}", page))
    }
}

/// Generate the previous/next pager of the index
pub fn paginator(
    config: &SiteConfig,
    current: usize,
    total: usize,
    prev_text: &str,
    next_text: &str,
) -> String {
    if total <= 1 {
        return String::new();
    }

    let mut html = r#"<nav class="pagination">"#.to_string();

    if current > 1 {
        html.push_str(&format!(
            r#"<a class="pagination-prev" rel="prev" href="{}">← {}</a>"#,
            page_url(config, current - 1),
            prev_text
        ));
    } else {
        html.push_str(r#"<span class="pagination-prev"></span>"#);
    }

    if current < total {
        html.push_str(&format!(
            r#"<a class="pagination-next" rel="next" href="{}">{} →</a>"#,
            page_url(config, current + 1),
            next_text
        ));
    } else {
        html.push_str(r#"<span class="pagination-next"></span>"#);
    }

    html.push_str("</nav>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tagged(slug: &str, tags: &[&str]) -> Post {
        let mut post = Post::new(slug, slug, slug, Utc::now());
        post.tags = tags.iter().map(|t| t.to_string()).collect();
        post
    }

    #[test]
    fn test_tag_counts() {
        let posts = vec![
            tagged("a", &["rust", "web"]),
            tagged("b", &["rust"]),
            tagged("c", &["notion", "web"]),
        ];
        let counts = tag_counts(&posts);
        assert_eq!(
            counts,
            vec![
                ("rust".to_string(), 2),
                ("web".to_string(), 2),
                ("notion".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_list_tags() {
        let config = SiteConfig::default();
        let posts = vec![tagged("a", &["C++"]), tagged("b", &["rust"])];

        let html = list_tags(&config, &posts, Some("rust"));
        assert!(html.contains(r#"href="/tag/C%2B%2B""#));
        assert!(html.contains(r#"class="tag-list-item selected"><a href="/search">rust (1)"#));
        assert_eq!(list_tags(&config, &[], None), "");
    }

    #[test]
    fn test_tag_url_sanitizes_separators() {
        let config = SiteConfig::default();
        assert_eq!(tag_dir_name("a/b"), "a-b");
        assert_eq!(tag_dir_name(".."), "--");
        assert_eq!(tag_dir_name(" "), "-");
        assert_eq!(tag_dir_name("../x"), "..-x");
        assert_eq!(tag_url(&config, "a/b"), "/tag/a-b");
    }

    #[test]
    fn test_paginator() {
        let config = SiteConfig::default();
        assert_eq!(paginator(&config, 1, 1, "Prev", "Next"), "");

        let first = paginator(&config, 1, 3, "Prev", "Next");
        assert!(first.contains(r#"href="/page/2""#));
        assert!(!first.contains("rel=\"prev\""));

        let second = paginator(&config, 2, 3, "Prev", "Next");
        assert!(second.contains(r#"rel="prev" href="/""#));
        assert!(second.contains(r#"href="/page/3""#));

        let last = paginator(&config, 3, 3, "Prev", "Next");
        assert!(!last.contains("rel=\"next\""));
    }
}
