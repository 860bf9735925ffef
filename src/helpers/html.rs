//! HTML helper functions

use super::url::{is_external, url_for};
use crate::config::SiteConfig;

/// Generate a CSS link tag
///
/// # Examples
/// ```ignore
/// css(&config, "style.css") // -> <link rel="stylesheet" href="/blog/css/style.css">
/// ```
pub fn css(config: &SiteConfig, path: &str) -> String {
    let path = if is_external(path) {
        path.to_string()
    } else {
        let path = if path.ends_with(".css") {
            path.to_string()
        } else {
            format!("{}.css", path)
        };
        url_for(config, &format!("css/{}", path.trim_start_matches('/')))
    };

    format!(r#"<link rel="stylesheet" href="{}">"#, path)
}

/// Generate a JavaScript script tag
///
/// # Examples
/// ```ignore
/// js(&config, "header.js") // -> <script src="/blog/js/header.js" defer></script>
/// ```
pub fn js(config: &SiteConfig, path: &str) -> String {
    let path = if is_external(path) {
        path.to_string()
    } else {
        let path = if path.ends_with(".js") {
            path.to_string()
        } else {
            format!("{}.js", path)
        };
        url_for(config, &format!("js/{}", path.trim_start_matches('/')))
    };

    format!(r#"<script src="{}" defer></script>"#, path)
}

/// Generate a favicon link tag
pub fn favicon_tag(config: &SiteConfig, path: &str) -> String {
    let href = if is_external(path) {
        path.to_string()
    } else {
        url_for(config, path)
    };
    format!(r#"<link rel="icon" href="{}">"#, href)
}

/// Generate a feed link tag
pub fn feed_tag(config: &SiteConfig, path: &str, title: Option<&str>) -> String {
    let href = url_for(config, path);
    let title = title.unwrap_or(&config.title);
    format!(
        r#"<link rel="alternate" href="{}" title="{}" type="application/atom+xml">"#,
        href,
        html_escape(title)
    )
}

/// Generate Open Graph meta tags
pub fn open_graph(
    og_type: &str,
    title: &str,
    description: &str,
    url: &str,
    site_name: &str,
) -> String {
    let mut tags = vec![
        format!(r#"<meta property="og:type" content="{}">"#, og_type),
        format!(
            r#"<meta property="og:title" content="{}">"#,
            html_escape(title)
        ),
        format!(r#"<meta property="og:url" content="{}">"#, url),
        format!(
            r#"<meta property="og:site_name" content="{}">"#,
            html_escape(site_name)
        ),
    ];

    if !description.is_empty() {
        tags.push(format!(
            r#"<meta property="og:description" content="{}">"#,
            html_escape(description)
        ));
    }

    tags.join("\n")
}

/// Generate meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="nobelium-rs {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Strip HTML tags from a string
pub fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

/// Truncate a string to a specified length
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");

    if s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s
            .chars()
            .take(length.saturating_sub(omission.chars().count()))
            .collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.path = "/blog".to_string();
        config
    }

    #[test]
    fn test_css() {
        let config = test_config();
        assert_eq!(
            css(&config, "style"),
            r#"<link rel="stylesheet" href="/blog/css/style.css">"#
        );
    }

    #[test]
    fn test_js() {
        let config = test_config();
        assert!(js(&config, "header").contains("/blog/js/header.js"));
        assert!(js(&config, "https://cdn.example.com/x.js").contains("https://cdn.example.com/x.js"));
    }

    #[test]
    fn test_favicon_tag() {
        let config = test_config();
        assert_eq!(
            favicon_tag(&config, "/favicon.png"),
            r#"<link rel="icon" href="/blog/favicon.png">"#
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>World</b></p>"), "Hello World");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello World", 8, None), "Hello...");
        assert_eq!(truncate("Hi", 10, None), "Hi");
    }
}
