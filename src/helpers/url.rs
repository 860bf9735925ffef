//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters escaped by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Generate a URL under the configured sub-path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.base_path();
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about") // -> "https://example.com/blog/about"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.link.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Whether a link points off-site
pub fn is_external(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}

/// Percent-encode a string the way `encodeURIComponent` does
pub fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Gravatar URL for an already hashed email
pub fn gravatar(email_hash: &str, size: Option<u32>) -> String {
    let size = size.unwrap_or(80);
    format!("https://gravatar.com/avatar/{}?s={}", email_hash, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.link = "https://example.com/".to_string();
        config.path = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, "about"), "/blog/about");
        assert_eq!(url_for(&config, "/"), "/blog/");
        assert_eq!(url_for(&SiteConfig::default(), "/"), "/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/hello-world"),
            "https://example.com/blog/hello-world"
        );
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("attachment:xyz"), "attachment%3Axyz");
        assert_eq!(
            encode_uri_component("https://s3.amazonaws.com/a b.pdf?x=1&y=(2)"),
            "https%3A%2F%2Fs3.amazonaws.com%2Fa%20b.pdf%3Fx%3D1%26y%3D(2)"
        );
        assert_eq!(encode_uri_component("文件"), "%E6%96%87%E4%BB%B6");
    }

    #[test]
    fn test_gravatar() {
        assert_eq!(
            gravatar("abc", Some(40)),
            "https://gravatar.com/avatar/abc?s=40"
        );
    }
}
