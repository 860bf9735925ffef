//! Header and navigation bar data
//!
//! The header is static HTML. Sticky behaviour, the menu icon colour and
//! the mobile menu are driven by `js/header.js` through the data
//! attributes and classes computed here.

use serde::Serialize;

use crate::config::SiteConfig;
use crate::helpers::{is_external, url_for};

/// Width classes of a normal content column
pub const NARROW_WIDTH: &str = "max-w-3xl px-4";
/// Width classes of a full-width page
pub const FULL_WIDTH: &str = "px-4 md:px-24";

/// A rendered navigation entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderLink {
    pub name: String,
    pub href: String,
    /// Opens in a new tab
    pub external: bool,
}

/// Everything `partials/header.html` needs
#[derive(Debug, Clone, Serialize)]
pub struct HeaderData {
    pub site_title: String,
    pub site_description: String,
    /// Shown over the site title on post pages
    pub post_title: Option<String>,
    pub favicon: String,
    pub favicon_dark: String,
    pub sticky: bool,
    /// Nav class at page load, before the sentinel has been observed
    pub nav_class: &'static str,
    pub width_class: &'static str,
    pub menu_stroke: &'static str,
    pub links: Vec<HeaderLink>,
}

impl HeaderData {
    pub fn new(config: &SiteConfig, post_title: Option<&str>, full_width: bool) -> Self {
        let sticky = !config.auto_collapsed_nav_bar;
        Self {
            site_title: config.title.clone(),
            site_description: config.description.clone(),
            post_title: post_title
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string),
            favicon: asset_url(config, &resolve_favicon(config, false, false)),
            favicon_dark: asset_url(config, &resolve_favicon(config, true, false)),
            sticky,
            nav_class: sticky_class(sticky, true).unwrap_or(""),
            width_class: width_class(full_width),
            menu_stroke: menu_icon_stroke(false),
            links: visible_links(config),
        }
    }
}

/// The favicon to show. The dark variant is used only in dark mode and when
/// not falling back after a load error.
pub fn resolve_favicon(config: &SiteConfig, dark: bool, fallback: bool) -> String {
    if dark && !fallback {
        config.favicon_dark.clone()
    } else {
        config.favicon.clone()
    }
}

/// Column width classes for the header, the mobile menu and the post footer
pub fn width_class(full_width: bool) -> &'static str {
    if full_width {
        FULL_WIDTH
    } else {
        NARROW_WIDTH
    }
}

/// Stroke colour of the hamburger and close icons
pub fn menu_icon_stroke(dark: bool) -> &'static str {
    if dark {
        "#fff"
    } else {
        "#000"
    }
}

/// Class the nav bar receives when the sentinel above it is scrolled out
/// of view, or `None` when it stays put
pub fn sticky_class(sticky: bool, sentinel_visible: bool) -> Option<&'static str> {
    match (sticky, sentinel_visible) {
        (true, true) => None,
        (true, false) => Some("sticky-nav-full"),
        (false, _) => Some("remove-sticky"),
    }
}

/// Navigation links with hidden entries removed and site paths prefixed
pub fn visible_links(config: &SiteConfig) -> Vec<HeaderLink> {
    config
        .nav_links
        .iter()
        .filter(|link| link.show)
        .map(|link| HeaderLink {
            name: link.name.clone(),
            href: asset_url(config, &link.to),
            external: link.external,
        })
        .collect()
}

fn asset_url(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        path.to_string()
    } else {
        url_for(config, path)
    }
}
