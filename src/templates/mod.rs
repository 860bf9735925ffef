//! Built-in templates using the Tera template engine
//!
//! The theme is embedded in the binary: page templates, partials and the
//! bundled stylesheet and header script.

mod header;

pub use header::{
    menu_icon_stroke, resolve_favicon, sticky_class, visible_links, width_class, HeaderData,
    HeaderLink, FULL_WIDTH, NARROW_WIDTH,
};

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::{Appearance, SiteConfig};
use crate::content::Post;
use crate::helpers::{full_date, in_timezone, strip_html, tag_url};

/// Static files written next to the generated pages
pub const ASSETS: [(&str, &str); 3] = [
    ("css/style.css", include_str!("nobelium/assets/style.css")),
    ("js/header.js", include_str!("nobelium/assets/header.js")),
    ("js/search.js", include_str!("nobelium/assets/search.js")),
];

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Block bodies are pre-rendered HTML
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("nobelium/layout.html")),
            ("index.html", include_str!("nobelium/index.html")),
            ("post.html", include_str!("nobelium/post.html")),
            ("search.html", include_str!("nobelium/search.html")),
            ("404.html", include_str!("nobelium/404.html")),
            (
                "partials/head.html",
                include_str!("nobelium/partials/head.html"),
            ),
            (
                "partials/header.html",
                include_str!("nobelium/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("nobelium/partials/footer.html"),
            ),
            (
                "partials/post_entry.html",
                include_str!("nobelium/partials/post_entry.html"),
            ),
            (
                "partials/comments.html",
                include_str!("nobelium/partials/comments.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "…".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Site-wide values every page sees
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub lang: String,
    pub link: String,
    /// "" or "/segment"
    pub base_path: String,
    /// "light", "dark" or "auto"
    pub appearance: &'static str,
    pub font: String,
    pub light_background: String,
    pub dark_background: String,
    /// Footer year range, e.g. "2021 - 2024"
    pub copyright_years: String,
}

impl SiteData {
    pub fn new(config: &SiteConfig, current_year: i32) -> Self {
        let copyright_years = match config.since {
            Some(since) if since < current_year => format!("{} - {}", since, current_year),
            _ => current_year.to_string(),
        };

        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            lang: config.lang.clone(),
            link: config.link.trim_end_matches('/').to_string(),
            base_path: config.base_path(),
            appearance: match config.appearance {
                Appearance::Light => "light",
                Appearance::Dark => "dark",
                Appearance::Auto => "auto",
            },
            font: config.font.clone(),
            light_background: config.light_background.clone(),
            dark_background: config.dark_background.clone(),
            copyright_years,
        }
    }
}

/// A tag link of a post entry
#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub url: String,
}

/// A post as the templates see it
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub summary: String,
    /// Display date in the site timezone
    pub date: String,
    /// ISO 8601 date for `<time datetime>`
    pub date_iso: String,
    pub tags: Vec<TagLink>,
    pub full_width: bool,
}

impl PostData {
    pub fn from_post(config: &SiteConfig, post: &Post) -> Self {
        let local = in_timezone(&post.date, &config.timezone);
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            url: post.url(config),
            summary: post.summary.clone(),
            date: full_date(&local),
            date_iso: local.to_rfc3339(),
            tags: post
                .tags
                .iter()
                .map(|tag| TagLink {
                    name: tag.clone(),
                    url: tag_url(config, tag),
                })
                .collect(),
            full_width: post.is_full_width(),
        }
    }
}

/// Previous/next links of an index page
#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub total: usize,
    /// Pre-rendered pager
    pub html: String,
}

/// Comment widget settings for `partials/comments.html`
#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    /// "utterances", "cusdis" or "" when disabled
    pub provider: &'static str,
    pub repo: String,
    pub issue_term: String,
    pub app_id: String,
    pub host: String,
    pub script_src: String,
    /// Identifies the thread of the current page
    pub page_id: String,
    pub page_url: String,
    pub page_title: String,
}

impl CommentData {
    pub fn new(config: &SiteConfig, post: &Post, page_url: &str) -> Self {
        use crate::config::CommentProvider;

        let comment = &config.comment;
        let provider = match comment.provider {
            Some(CommentProvider::Utterances) if !comment.utterances.repo.is_empty() => {
                "utterances"
            }
            Some(CommentProvider::Cusdis) if !comment.cusdis.app_id.is_empty() => "cusdis",
            Some(provider) => {
                tracing::warn!("Comment provider {:?} is not fully configured", provider);
                ""
            }
            None => "",
        };

        Self {
            provider,
            repo: comment.utterances.repo.clone(),
            issue_term: comment.utterances.issue_term.clone(),
            app_id: comment.cusdis.app_id.clone(),
            host: comment.cusdis.host.clone(),
            script_src: comment.cusdis.script_src.clone(),
            page_id: post.id.clone(),
            page_url: page_url.to_string(),
            page_title: post.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommentProvider;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_templates_load() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_truncate_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(5));
        let out = truncate_chars_filter(&tera::Value::from("你好世界，再见"), &args).unwrap();
        assert_eq!(out, tera::Value::from("你好世界，…"));

        let out = truncate_chars_filter(&tera::Value::from("short"), &args).unwrap();
        assert_eq!(out, tera::Value::from("short"));
    }

    #[test]
    fn test_post_data_uses_timezone() {
        let mut config = SiteConfig::default();
        config.timezone = "Asia/Shanghai".to_string();
        let mut post = Post::new(
            "p1",
            "late",
            "Late",
            Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
        );
        post.tags = vec!["C#".to_string()];

        let data = PostData::from_post(&config, &post);
        assert_eq!(data.date, "March 2, 2024");
        assert_eq!(data.url, "/late");
        assert_eq!(data.tags[0].url, "/tag/C%23");
    }

    #[test]
    fn test_copyright_years() {
        let mut config = SiteConfig::default();
        assert_eq!(SiteData::new(&config, 2024).copyright_years, "2024");
        config.since = Some(2021);
        assert_eq!(SiteData::new(&config, 2024).copyright_years, "2021 - 2024");
    }

    #[test]
    fn test_comment_provider_requires_settings() {
        let mut config = SiteConfig::default();
        let post = Post::new("p1", "a", "A", Utc::now());
        assert_eq!(CommentData::new(&config, &post, "/a").provider, "");

        config.comment.provider = Some(CommentProvider::Cusdis);
        assert_eq!(CommentData::new(&config, &post, "/a").provider, "");

        config.comment.cusdis.app_id = "app".to_string();
        assert_eq!(CommentData::new(&config, &post, "/a").provider, "cusdis");
    }
}
