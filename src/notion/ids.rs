//! Notion id normalisation

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref COMPACT_ID: Regex = Regex::new(r"([0-9a-fA-F]{32})(?:[?#].*)?$").unwrap();
}

/// Convert a page id or page URL into dashed UUID form.
///
/// Accepts `8-4-4-4-12` ids unchanged, 32-char compact ids, and URLs
/// ending in a compact id. Anything else is returned trimmed.
pub fn to_uuid(id: &str) -> String {
    let id = id.trim();
    if id.len() == 36 && id.matches('-').count() == 4 {
        return id.to_lowercase();
    }

    match COMPACT_ID.captures(id).and_then(|c| c.get(1)) {
        Some(hex) => {
            let h = hex.as_str().to_lowercase();
            format!(
                "{}-{}-{}-{}-{}",
                &h[0..8],
                &h[8..12],
                &h[12..16],
                &h[16..20],
                &h[20..32]
            )
        }
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_id() {
        assert_eq!(
            to_uuid("8c4f1d2e3b4a5c6d7e8f9a0b1c2d3e4f"),
            "8c4f1d2e-3b4a-5c6d-7e8f-9a0b1c2d3e4f"
        );
    }

    #[test]
    fn test_dashed_id_unchanged() {
        assert_eq!(
            to_uuid("8C4F1D2E-3B4A-5C6D-7E8F-9A0B1C2D3E4F"),
            "8c4f1d2e-3b4a-5c6d-7e8f-9a0b1c2d3e4f"
        );
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            to_uuid("https://www.notion.so/me/Blog-8c4f1d2e3b4a5c6d7e8f9a0b1c2d3e4f?v=1"),
            "8c4f1d2e-3b4a-5c6d-7e8f-9a0b1c2d3e4f"
        );
    }

    #[test]
    fn test_unknown_passthrough() {
        assert_eq!(to_uuid(" b1 "), "b1");
    }
}
