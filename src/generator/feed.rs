//! Atom feed

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::SiteConfig;
use crate::content::Post;
use crate::helpers::full_url_for;

/// Written here so static hosts serve it at `/feed/`
pub const FEED_PATH: &str = "feed/index.xml";

/// Number of most recent posts in the feed
const FEED_LIMIT: usize = 10;

/// Build the feed document. `bodies` maps post ids to rendered HTML; posts
/// without a body fall back to their summary.
pub fn atom(
    config: &SiteConfig,
    posts: &[Post],
    bodies: &HashMap<String, String>,
    updated: DateTime<Utc>,
) -> String {
    let home = full_url_for(config, "/");
    let site = config.link.trim_end_matches('/');

    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    feed.push('\n');
    feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
    feed.push('\n');
    feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
    if !config.description.is_empty() {
        feed.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            escape_xml(&config.description)
        ));
    }
    feed.push_str(&format!(
        "  <link href=\"{}\" rel=\"self\"/>\n",
        full_url_for(config, "/feed")
    ));
    feed.push_str(&format!("  <link href=\"{}\"/>\n", home));
    feed.push_str(&format!("  <updated>{}</updated>\n", updated.to_rfc3339()));
    feed.push_str(&format!("  <id>{}</id>\n", home));
    feed.push_str(&format!(
        "  <author><name>{}</name></author>\n",
        escape_xml(&config.author)
    ));

    for post in posts.iter().take(FEED_LIMIT) {
        let link = full_url_for(config, &post.slug);
        feed.push_str("  <entry>\n");
        feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
        feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
        feed.push_str(&format!("    <id>{}</id>\n", link));
        feed.push_str(&format!(
            "    <updated>{}</updated>\n",
            post.date.to_rfc3339()
        ));
        if !post.summary.is_empty() {
            feed.push_str(&format!(
                "    <summary>{}</summary>\n",
                escape_xml(&post.summary)
            ));
        }

        let content = bodies
            .get(&post.id)
            .map(|body| convert_relative_urls_to_absolute(body, site))
            .unwrap_or_else(|| escape_xml(&post.summary));
        feed.push_str(&format!(
            "    <content type=\"html\"><![CDATA[{}]]></content>\n",
            strip_invalid_xml_chars(&content).replace("]]>", "]]]]><![CDATA[>")
        ));
        feed.push_str("  </entry>\n");
    }

    feed.push_str("</feed>\n");
    feed
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Make root-relative `href`/`src` attributes absolute
fn convert_relative_urls_to_absolute(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
        .replace("href='/", &format!("href='{}/", base_url))
        .replace("src='/", &format!("src='{}/", base_url))
}

/// Drop characters XML 1.0 does not allow
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}
