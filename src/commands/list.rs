//! List site content

use anyhow::Result;

use crate::content::{Post, PostKind};
use crate::helpers::{in_timezone, tag_counts};
use crate::notion::ContentSource;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str, offline: bool) -> Result<()> {
    let source = ContentSource::for_blog(blog, offline)?;
    let all = source.all_posts(true).await?;

    for line in format_listing(blog, &all, content_type)? {
        println!("{}", line);
    }
    Ok(())
}

/// Lines printed by `list`
pub fn format_listing(blog: &Blog, all: &[Post], content_type: &str) -> Result<Vec<String>> {
    let of_kind = |kind: PostKind| all.iter().filter(move |p| p.kind == kind);
    let timezone = &blog.config.timezone;
    let mut lines = Vec::new();

    match content_type {
        "post" | "posts" => {
            let posts: Vec<&Post> = of_kind(PostKind::Post).collect();
            lines.push(format!("Posts ({}):", posts.len()));
            for post in posts {
                lines.push(format!(
                    "  {} - {} [{}]",
                    in_timezone(&post.date, timezone).format("%Y-%m-%d"),
                    post.title,
                    post.slug
                ));
            }
        }
        "page" | "pages" => {
            let pages: Vec<&Post> = of_kind(PostKind::Page).collect();
            lines.push(format!("Pages ({}):", pages.len()));
            for page in pages {
                lines.push(format!("  {} [{}]", page.title, page.slug));
            }
        }
        "tag" | "tags" => {
            let posts: Vec<Post> = of_kind(PostKind::Post).cloned().collect();
            let tags = tag_counts(&posts);
            lines.push(format!("Tags ({}):", tags.len()));
            for (tag, count) in tags {
                lines.push(format!("  {} ({})", tag, count));
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, page, tag", content_type);
        }
    }

    Ok(lines)
}
