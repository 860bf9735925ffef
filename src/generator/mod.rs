//! Generator module - builds the static site from Notion content
//!
//! Every post's block map is fetched, post-processed and rendered through
//! the built-in Tera templates. A post that fails to fetch or render is
//! logged and skipped so one broken page never takes the whole site down.

mod feed;

use anyhow::{Context as _, Result};
use chrono::{Datelike, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::content::{process_post, BlockMap, BlockRenderer, Post, PostKind};
use crate::helpers::{
    css, favicon_tag, feed_tag, full_url_for, gravatar, in_timezone, js, list_tags, meta_generator,
    open_graph, page_url, paginator, tag_counts, tag_dir_name, url_for,
};
use crate::i18n::I18n;
use crate::notion::ContentSource;
use crate::templates::{
    CommentData, HeaderData, PaginationData, PostData, SiteData, TemplateRenderer, ASSETS,
};
use crate::Blog;

/// Directory holding per-site translation overrides
const LOCALES_DIR: &str = "locales";

/// What a build produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Post and page slugs written
    pub written: Vec<String>,
    /// Slugs that failed and were skipped
    pub failed: Vec<String>,
}

impl BuildReport {
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("{} pages written", self.written.len())
        } else {
            format!(
                "{} pages written, {} failed ({})",
                self.written.len(),
                self.failed.len(),
                self.failed.join(", ")
            )
        }
    }
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    i18n: I18n,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let mut i18n = I18n::with_builtin(&blog.config.lang)?;
        i18n.load_languages(blog.base_dir.join(LOCALES_DIR))?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            i18n,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self, source: &ContentSource) -> Result<BuildReport> {
        fs::create_dir_all(&self.blog.public_dir)?;

        let all = source.all_posts(true).await?;
        let posts: Vec<Post> = all
            .iter()
            .filter(|p| p.kind == PostKind::Post)
            .cloned()
            .collect();
        tracing::info!(
            "Loaded {} posts and {} pages",
            posts.len(),
            all.len() - posts.len()
        );

        let blocks = self.block_renderer(&all);
        let mut report = BuildReport::default();
        let mut bodies: HashMap<String, String> = HashMap::new();

        for post in &all {
            match self.build_post(source, &blocks, post).await {
                Ok(body) => {
                    report.written.push(post.slug.clone());
                    bodies.insert(post.id.clone(), body);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {:#}", post.slug, e);
                    report.failed.push(post.slug.clone());
                }
            }
        }

        // Listings only show posts whose page was written
        let posts: Vec<Post> = posts
            .into_iter()
            .filter(|p| bodies.contains_key(&p.id))
            .collect();

        self.generate_index_pages(&posts)?;
        self.generate_tag_pages(&posts)?;
        self.generate_search_page(&posts)?;
        self.generate_search_index(&posts)?;
        self.generate_atom_feed(&posts, &bodies)?;
        self.generate_not_found()?;
        self.write_assets()?;
        self.copy_public_assets()?;

        Ok(report)
    }

    /// Generate the page of a single post or page. An unknown slug is an
    /// error wrapping [`crate::notion::NotionError::NotFound`].
    pub async fn generate_post(&self, source: &ContentSource, slug: &str) -> Result<()> {
        fs::create_dir_all(&self.blog.public_dir)?;

        let post = source.find_post(slug).await?;
        let all = source.all_posts(true).await?;
        let blocks = self.block_renderer(&all);

        self.build_post(source, &blocks, &post).await?;
        self.write_assets()?;
        Ok(())
    }

    /// Block renderer that resolves links between posts
    fn block_renderer(&self, posts: &[Post]) -> BlockRenderer {
        let links = posts
            .iter()
            .map(|p| (p.id.clone(), p.url(&self.blog.config)))
            .collect();
        BlockRenderer::with_theme(&self.blog.config.highlight_theme).with_page_links(links)
    }

    /// Fetch, process, render and write one post. Returns the rendered body.
    async fn build_post(
        &self,
        source: &ContentSource,
        blocks: &BlockRenderer,
        post: &Post,
    ) -> Result<String> {
        let raw = source
            .post_blocks(&post.id)
            .await
            .with_context(|| format!("Failed to load blocks of {}", post.slug))?;

        let (body, html) = self.render_post(blocks, post, &raw)?;

        let output_path = self.post_output_path(post);
        write_file(&output_path, &html)?;
        tracing::debug!("Generated post: {:?}", output_path);

        Ok(body)
    }

    /// Render a post from its raw block map. Returns the body and the page.
    pub fn render_post(
        &self,
        blocks: &BlockRenderer,
        post: &Post,
        raw: &BlockMap,
    ) -> Result<(String, String)> {
        let config = &self.blog.config;
        let processed = process_post(raw, config);
        let body = blocks.render_page(&processed.block_map, &post.id);

        let data = PostData::from_post(config, post);
        let page_path = post.url(config);
        let page_url = full_url_for(config, &page_path);

        let mut context = self.create_base_context(
            &format!("{} - {}", post.title, config.title),
            &post.summary,
            &page_path,
            "article",
            HeaderData::new(config, Some(&post.title), data.full_width),
        );
        context.insert("post", &data);
        context.insert("is_post", &(post.kind == PostKind::Post));
        context.insert("body", &body);
        context.insert("avatar_url", &gravatar(&processed.email_hash, Some(80)));
        context.insert("back_url", &url_for(config, "/"));
        context.insert("comments", &CommentData::new(config, post, &page_url));

        let html = self.renderer.render("post.html", &context)?;
        Ok((body, html))
    }

    fn post_output_path(&self, post: &Post) -> PathBuf {
        self.blog.public_dir.join(&post.slug).join("index.html")
    }

    /// Create a base context with common variables
    fn create_base_context(
        &self,
        title: &str,
        description: &str,
        path: &str,
        og_type: &str,
        header: HeaderData,
    ) -> Context {
        let config = &self.blog.config;
        let now = in_timezone(&Utc::now(), &config.timezone);
        let canonical = full_url_for(config, path);

        let head = [
            favicon_tag(config, &config.favicon),
            feed_tag(config, "/feed", None),
            css(config, "style.css"),
            js(config, "header.js"),
            meta_generator(),
            open_graph(og_type, title, description, &canonical, &config.title),
        ]
        .join("\n");

        let mut context = Context::new();
        context.insert("site", &SiteData::new(config, now.year()));
        context.insert("header", &header);
        context.insert("t", &self.i18n.get_all_translations());
        context.insert("head", &head);
        context.insert("page_title", title);
        context.insert("page_description", description);
        context.insert("canonical_url", &canonical);
        context
    }

    /// Generate index pages with pagination
    fn generate_index_pages(&self, posts: &[Post]) -> Result<()> {
        let config = &self.blog.config;
        let per_page = if config.posts_per_page == 0 {
            posts.len().max(1)
        } else {
            config.posts_per_page
        };
        let chunks: Vec<&[Post]> = if posts.is_empty() {
            vec![&[]]
        } else {
            posts.chunks(per_page).collect()
        };
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            let current = i + 1;
            let path = page_url(config, current);
            let pagination = PaginationData {
                current,
                total,
                html: paginator(
                    config,
                    current,
                    total,
                    &self.i18n.get("PAGINATION.PREV"),
                    &self.i18n.get("PAGINATION.NEXT"),
                ),
            };
            let data: Vec<PostData> = chunk
                .iter()
                .map(|p| PostData::from_post(config, p))
                .collect();

            let mut context = self.create_base_context(
                &config.title,
                &config.description,
                &path,
                "website",
                HeaderData::new(config, None, false),
            );
            context.insert("posts", &data);
            context.insert("pagination", &pagination);

            let html = self.renderer.render("index.html", &context)?;
            let output_path = if current == 1 {
                self.blog.public_dir.join("index.html")
            } else {
                self.blog
                    .public_dir
                    .join("page")
                    .join(current.to_string())
                    .join("index.html")
            };
            write_file(&output_path, &html)?;
            tracing::debug!("Generated: {:?}", output_path);
        }

        tracing::info!("Generated {} index pages", total);
        Ok(())
    }

    /// Generate tag pages
    fn generate_tag_pages(&self, posts: &[Post]) -> Result<()> {
        let tags = tag_counts(posts);

        for (tag, _) in &tags {
            let tagged: Vec<Post> = posts
                .iter()
                .filter(|p| p.tags.contains(tag))
                .cloned()
                .collect();
            let output_path = self
                .blog
                .public_dir
                .join("tag")
                .join(tag_dir_name(tag))
                .join("index.html");
            self.render_search(posts, &tagged, Some(tag), &output_path)?;
        }

        tracing::info!("Generated {} tag pages", tags.len());
        Ok(())
    }

    /// Generate the search page listing every post
    fn generate_search_page(&self, posts: &[Post]) -> Result<()> {
        let output_path = self.blog.public_dir.join("search").join("index.html");
        self.render_search(posts, posts, None, &output_path)
    }

    fn render_search(
        &self,
        all: &[Post],
        shown: &[Post],
        tag: Option<&str>,
        output_path: &Path,
    ) -> Result<()> {
        let config = &self.blog.config;
        let title = match tag {
            Some(tag) => format!("#{} - {}", tag, config.title),
            None => format!("{} - {}", self.i18n.get("NAV.SEARCH"), config.title),
        };
        let path = output_path
            .strip_prefix(&self.blog.public_dir)
            .ok()
            .and_then(|p| p.parent())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let data: Vec<PostData> = shown
            .iter()
            .map(|p| PostData::from_post(config, p))
            .collect();

        let mut context = self.create_base_context(
            &title,
            &config.description,
            &path,
            "website",
            HeaderData::new(config, None, false),
        );
        context.insert("posts", &data);
        context.insert("current_tag", &tag);
        context.insert("tag_list", &list_tags(config, all, tag));

        let html = self.renderer.render("search.html", &context)?;
        write_file(output_path, &html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Generate search index (JSON)
    fn generate_search_index(&self, posts: &[Post]) -> Result<()> {
        let config = &self.blog.config;
        let search_data: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "title": p.title,
                    "url": p.url(config),
                    "summary": p.summary,
                    "tags": p.tags,
                    "date": in_timezone(&p.date, &config.timezone).format("%Y-%m-%d").to_string(),
                })
            })
            .collect();

        let output_path = self.blog.public_dir.join("search.json");
        let json = serde_json::to_string_pretty(&search_data)?;
        write_file(&output_path, &json)?;
        tracing::info!("Generated search.json");

        Ok(())
    }

    /// Generate the Atom feed served at `/feed`
    fn generate_atom_feed(&self, posts: &[Post], bodies: &HashMap<String, String>) -> Result<()> {
        let xml = feed::atom(&self.blog.config, posts, bodies, Utc::now());
        let output_path = self.blog.public_dir.join(feed::FEED_PATH);
        write_file(&output_path, &xml)?;
        tracing::info!("Generated {}", feed::FEED_PATH);
        Ok(())
    }

    /// Generate the page served for unknown paths
    fn generate_not_found(&self) -> Result<()> {
        let config = &self.blog.config;
        let title = format!("{} - {}", self.i18n.get("NOT_FOUND"), config.title);
        let context = self.create_base_context(
            &title,
            &config.description,
            "404.html",
            "website",
            HeaderData::new(config, None, false),
        );
        let html = self.renderer.render("404.html", &context)?;
        write_file(&self.blog.public_dir.join("404.html"), &html)?;
        Ok(())
    }

    /// Write the bundled stylesheet and scripts
    fn write_assets(&self) -> Result<()> {
        for (path, content) in ASSETS {
            write_file(&self.blog.public_dir.join(path), content)?;
        }
        Ok(())
    }

    /// Copy local static files (favicon, images) to public directory
    fn copy_public_assets(&self) -> Result<()> {
        let assets_dir = &self.blog.assets_dir;
        if !assets_dir.exists() {
            return Ok(());
        }

        let mut copied = 0;
        for entry in WalkDir::new(assets_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(assets_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        tracing::debug!("Copied {} files from {:?}", copied, assets_dir);
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
