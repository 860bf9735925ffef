//! Block map to HTML rendering with syntax highlighting

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::blocks::{Block, BlockMap};
use crate::helpers::{encode_uri_component, html_escape, strip_html};

/// Notion's image proxy, needed for uploads stored in private buckets
const IMAGE_PROXY: &str = "https://www.notion.so/image";

/// Renders a processed block map to HTML
pub struct BlockRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    /// Page id -> site URL, for links to other posts
    page_links: HashMap<String, String>,
}

impl BlockRenderer {
    /// Create a new block renderer
    pub fn new() -> Self {
        Self::with_theme("InspiredGitHub")
    }

    /// Create with a syntect theme
    pub fn with_theme(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            page_links: HashMap::new(),
        }
    }

    /// Resolve links to these page ids to site URLs
    pub fn with_page_links(mut self, links: HashMap<String, String>) -> Self {
        self.page_links = links;
        self
    }

    /// Render the content of page `page_id`
    pub fn render_page(&self, map: &BlockMap, page_id: &str) -> String {
        let mut html = String::new();
        let mut path = HashSet::from([page_id.to_string()]);
        match map.get(page_id) {
            Some(page) => self.render_children(map, &page.content, &mut html, &mut path),
            None => {
                // Root missing: render the page's direct children in map order
                tracing::debug!("Page block {} not in map, rendering by parent", page_id);
                let children: Vec<String> = map
                    .block
                    .iter()
                    .filter(|(_, record)| {
                        record
                            .value
                            .as_ref()
                            .and_then(|b| b.extra_str("parent_id"))
                            == Some(page_id)
                    })
                    .map(|(id, _)| id.clone())
                    .collect();
                self.render_children(map, &children, &mut html, &mut path);
            }
        }
        html
    }

    /// Render a list of sibling blocks, grouping consecutive list items.
    /// `path` holds the ids being rendered above this level; a child that
    /// is already on it would recurse forever and is skipped.
    fn render_children(
        &self,
        map: &BlockMap,
        ids: &[String],
        out: &mut String,
        path: &mut HashSet<String>,
    ) {
        let mut open_list: Option<&'static str> = None;

        for id in ids {
            // Blocks dropped by truncation or never fetched are skipped
            let Some(block) = map.get(id) else { continue };
            if path.contains(id) {
                tracing::warn!("Block {} contains itself, skipping", id);
                continue;
            }

            let list_tag = match block.kind.as_str() {
                "bulleted_list" => Some("ul"),
                "numbered_list" => Some("ol"),
                _ => None,
            };

            if open_list != list_tag {
                if let Some(tag) = open_list {
                    out.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list_tag {
                    let class = if tag == "ul" { "disc" } else { "numbered" };
                    out.push_str(&format!(r#"<{} class="notion-list notion-list-{}">"#, tag, class));
                }
                open_list = list_tag;
            }

            path.insert(id.clone());
            self.render_block(map, block, out, path);
            path.remove(id);
        }

        if let Some(tag) = open_list {
            out.push_str(&format!("</{}>", tag));
        }
    }

    fn render_block(
        &self,
        map: &BlockMap,
        block: &Block,
        out: &mut String,
        path: &mut HashSet<String>,
    ) {
        let title = self.rich_text(block.property("title"));
        let anchor = block.id.replace('-', "");

        match block.kind.as_str() {
            "text" => {
                if title.is_empty() {
                    out.push_str(r#"<div class="notion-blank">&nbsp;</div>"#);
                } else {
                    out.push_str(&format!(r#"<p class="notion-text">{}</p>"#, title));
                }
                self.render_indented(map, block, out, path);
            }
            "header" | "sub_header" | "sub_sub_header" => {
                let level = match block.kind.as_str() {
                    "header" => 1,
                    "sub_header" => 2,
                    _ => 3,
                };
                out.push_str(&format!(
                    r##"<h{level} id="{anchor}" class="notion-h notion-h{level}"><a class="notion-hash-link" href="#{anchor}">#</a>{title}</h{level}>"##
                ));
            }
            "bulleted_list" | "numbered_list" => {
                out.push_str("<li>");
                out.push_str(&title);
                if !block.content.is_empty() {
                    self.render_children(map, &block.content, out, path);
                }
                out.push_str("</li>");
            }
            "to_do" => {
                let checked = block.first_text("checked") == Some("Yes");
                out.push_str(&format!(
                    r#"<div class="notion-to-do"><input type="checkbox" disabled{}><span class="{}">{}</span></div>"#,
                    if checked { " checked" } else { "" },
                    if checked { "notion-to-do-checked" } else { "notion-to-do-item" },
                    title
                ));
                self.render_indented(map, block, out, path);
            }
            "quote" => {
                out.push_str(&format!(r#"<blockquote class="notion-quote">{}</blockquote>"#, title));
            }
            "callout" => {
                let icon = block.format_str("page_icon").unwrap_or("");
                out.push_str(&format!(
                    r#"<div class="notion-callout"><span class="notion-callout-icon">{}</span><div class="notion-callout-text">{}"#,
                    html_escape(icon),
                    title
                ));
                self.render_children(map, &block.content, out, path);
                out.push_str("</div></div>");
            }
            "toggle" => {
                out.push_str(&format!(r#"<details class="notion-toggle"><summary>{}</summary><div>"#, title));
                self.render_children(map, &block.content, out, path);
                out.push_str("</div></details>");
            }
            "divider" => out.push_str(r#"<hr class="notion-hr">"#),
            "code" => {
                let code = plain_text(block.property("title"));
                let lang = block.first_text("language").unwrap_or("plain text");
                out.push_str(&self.highlight_code(&code, lang));
            }
            "equation" => {
                let tex = plain_text(block.property("title"));
                out.push_str(&format!(
                    r#"<div class="notion-equation">$${}$$</div>"#,
                    html_escape(&tex)
                ));
            }
            "image" => {
                let src = block
                    .first_text("source")
                    .map(|s| image_url(s, &block.id))
                    .unwrap_or_default();
                let caption = self.rich_text(block.property("caption"));
                out.push_str(&format!(
                    r#"<figure class="notion-asset-wrapper notion-image"><img src="{}" alt="{}" loading="lazy">"#,
                    html_escape(&src),
                    html_escape(&strip_html(&caption))
                ));
                if !caption.is_empty() {
                    out.push_str(&format!("<figcaption>{}</figcaption>", caption));
                }
                out.push_str("</figure>");
            }
            "video" => {
                let src = media_source(block);
                if is_direct_media(&src) {
                    out.push_str(&format!(
                        r#"<figure class="notion-asset-wrapper notion-video"><video controls preload="metadata" src="{}"></video></figure>"#,
                        html_escape(&src)
                    ));
                } else {
                    out.push_str(&embed(&src, "notion-video"));
                }
            }
            "audio" => {
                let src = media_source(block);
                out.push_str(&format!(
                    r#"<div class="notion-audio"><audio controls preload="none" src="{}"></audio></div>"#,
                    html_escape(&src)
                ));
            }
            "pdf" => {
                let src = media_source(block);
                out.push_str(&embed(&src, "notion-pdf"));
            }
            "embed" => {
                out.push_str(&embed(&media_source(block), "notion-embed"));
            }
            "file" => {
                let src = block.first_text("source").unwrap_or("");
                let name = if title.is_empty() { html_escape(src) } else { title };
                out.push_str(&format!(
                    r#"<div class="notion-file"><a class="notion-file-link" href="{}" target="_blank" rel="noopener noreferrer">📎 {}</a></div>"#,
                    html_escape(src),
                    name
                ));
            }
            "bookmark" => {
                let link = block.first_text("link").unwrap_or("");
                let description = self.rich_text(block.property("description"));
                let label = if title.is_empty() { html_escape(link) } else { title };
                out.push_str(&format!(
                    r#"<div class="notion-bookmark"><a href="{}" target="_blank" rel="noopener noreferrer"><div class="notion-bookmark-title">{}</div>"#,
                    html_escape(link),
                    label
                ));
                if !description.is_empty() {
                    out.push_str(&format!(r#"<div class="notion-bookmark-description">{}</div>"#, description));
                }
                out.push_str(&format!(
                    r#"<div class="notion-bookmark-link">{}</div></a></div>"#,
                    html_escape(link)
                ));
            }
            "column_list" => {
                out.push_str(r#"<div class="notion-row">"#);
                self.render_children(map, &block.content, out, path);
                out.push_str("</div>");
            }
            "column" => {
                out.push_str(r#"<div class="notion-column">"#);
                self.render_children(map, &block.content, out, path);
                out.push_str("</div>");
            }
            "page" => {
                let href = self.page_href(&block.id);
                out.push_str(&format!(
                    r#"<a class="notion-page-link" href="{}">{}</a>"#,
                    html_escape(&href),
                    if title.is_empty() { "Untitled".to_string() } else { title }
                ));
            }
            other => {
                tracing::debug!("Unsupported block type {:?}, rendering children", other);
                self.render_children(map, &block.content, out, path);
            }
        }
    }

    fn render_indented(
        &self,
        map: &BlockMap,
        block: &Block,
        out: &mut String,
        path: &mut HashSet<String>,
    ) {
        if block.content.is_empty() {
            return;
        }
        out.push_str(r#"<div class="notion-indent">"#);
        self.render_children(map, &block.content, out, path);
        out.push_str("</div>");
    }

    fn page_href(&self, id: &str) -> String {
        self.page_links
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("https://www.notion.so/{}", id.replace('-', "")))
    }

    /// Render a Notion rich-text property (`[[text, [decorations]], ...]`)
    pub fn rich_text(&self, value: Option<&Value>) -> String {
        let Some(segments) = value.and_then(Value::as_array) else {
            return String::new();
        };

        let mut html = String::new();
        for segment in segments {
            let Some(text) = segment.get(0).and_then(Value::as_str) else {
                continue;
            };
            let mut piece = html_escape(text).replace('\n', "<br>");

            let decorations = segment.get(1).and_then(Value::as_array);
            for decoration in decorations.into_iter().flatten() {
                let kind = decoration.get(0).and_then(Value::as_str).unwrap_or("");
                let arg = decoration.get(1);
                piece = match kind {
                    "b" => format!("<b>{}</b>", piece),
                    "i" => format!("<em>{}</em>", piece),
                    "s" => format!("<s>{}</s>", piece),
                    "_" => format!(r#"<span class="notion-inline-underscore">{}</span>"#, piece),
                    "c" => format!(r#"<code class="notion-inline-code">{}</code>"#, piece),
                    "a" => {
                        let href = arg.and_then(Value::as_str).unwrap_or("#");
                        format!(
                            r#"<a class="notion-link" href="{}">{}</a>"#,
                            html_escape(href),
                            piece
                        )
                    }
                    "h" => {
                        let color = arg.and_then(Value::as_str).unwrap_or("default");
                        format!(r#"<span class="notion-{}">{}</span>"#, html_escape(color), piece)
                    }
                    "e" => {
                        let tex = arg.and_then(Value::as_str).unwrap_or("");
                        format!(r#"<span class="notion-inline-equation">${}$</span>"#, html_escape(tex))
                    }
                    "p" => {
                        let id = arg.and_then(Value::as_str).unwrap_or("");
                        format!(
                            r#"<a class="notion-link" href="{}">{}</a>"#,
                            html_escape(&self.page_href(id)),
                            piece
                        )
                    }
                    "d" => {
                        let date = arg
                            .and_then(|d| d.get("start_date"))
                            .and_then(Value::as_str)
                            .unwrap_or("");
                        format!(r#"<span class="notion-date">{}</span>"#, html_escape(date))
                    }
                    _ => piece,
                };
            }
            html.push_str(&piece);
        }
        html
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let token = syntax_token(lang);

        let syntax = self
            .syntax_set
            .find_syntax_by_token(token)
            .or_else(|| self.syntax_set.find_syntax_by_extension(token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let class = html_escape(&lang.to_lowercase().replace(' ', "-"));
        let Some(theme) = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
        else {
            return plain_code(code, &class);
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) => format!(
                r#"<div class="notion-code language-{}">{}</div>"#,
                class, highlighted
            ),
            Err(e) => {
                tracing::debug!("Highlighting failed for {}: {}", lang, e);
                plain_code(code, &class)
            }
        }
    }
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenated text of a rich-text property, decorations dropped
pub fn plain_text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|s| s.get(0).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn plain_code(code: &str, class: &str) -> String {
    format!(
        r#"<pre class="notion-code"><code class="language-{}">{}</code></pre>"#,
        class,
        html_escape(code)
    )
}

/// Map Notion / Prism language names onto syntect tokens
fn syntax_token(lang: &str) -> &str {
    match lang {
        "csharp" => "cs",
        "asm6502" => "asm",
        "plain text" | "Plain Text" => "txt",
        "shell" | "Shell" | "bash" | "Bash" => "sh",
        "javascript" | "JavaScript" => "js",
        "python" | "Python" => "py",
        "rust" | "Rust" => "rs",
        "markdown" | "Markdown" => "md",
        other => other,
    }
}

/// Source of a media block, preferring the embeddable `display_source`
fn media_source(block: &Block) -> String {
    block
        .first_text("source")
        .map(str::to_string)
        .filter(|s| s.starts_with("https://notion.so/signed/"))
        .or_else(|| block.format_str("display_source").map(str::to_string))
        .or_else(|| block.first_text("source").map(str::to_string))
        .unwrap_or_default()
}

fn is_direct_media(src: &str) -> bool {
    let path = src.split('?').next().unwrap_or(src).to_lowercase();
    src.starts_with("https://notion.so/signed/")
        || [".mp4", ".webm", ".mov", ".ogg"]
            .iter()
            .any(|ext| path.ends_with(ext))
}

fn embed(src: &str, class: &str) -> String {
    format!(
        r#"<figure class="notion-asset-wrapper {}"><iframe src="{}" loading="lazy" allowfullscreen frameborder="0"></iframe></figure>"#,
        class,
        html_escape(src)
    )
}

/// Route uploaded images through Notion's image proxy
fn image_url(source: &str, block_id: &str) -> String {
    if source.starts_with("attachment") || source.contains("amazonaws.com") {
        format!(
            "{}/{}?table=block&id={}",
            IMAGE_PROXY,
            encode_uri_component(source),
            block_id
        )
    } else {
        source.to_string()
    }
}
