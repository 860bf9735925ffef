//! Block post-processing
//!
//! Turns a freshly fetched block map into the map handed to the renderer:
//!
//! - keeps only the first N blocks when a truncation limit is configured
//! - rewrites code-block language names to syntax highlighter identifiers
//! - routes private attachment URLs through Notion's signed-URL endpoint
//!
//! The input map is never modified; a new map is built instead.

use crate::config::SiteConfig;
use crate::helpers::encode_uri_component;

use super::blocks::{Block, BlockMap, BlockRecord};

/// Endpoint that proxies private attachments with a fresh signature
pub const SIGNED_URL_ENDPOINT: &str = "https://notion.so/signed";

/// Block types whose `source` may point at a private attachment
const MEDIA_TYPES: [&str; 4] = ["file", "pdf", "video", "audio"];

/// Display name -> highlighter identifier
const LANGUAGE_ALIASES: [(&str, &str); 3] =
    [("C++", "cpp"), ("C#", "csharp"), ("Assembly", "asm6502")];

/// Knobs for [`process_blocks`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Keep at most this many blocks
    pub block_limit: Option<usize>,
}

impl From<&SiteConfig> for ProcessOptions {
    fn from(config: &SiteConfig) -> Self {
        Self {
            block_limit: config.block_limit(),
        }
    }
}

/// A post's processed block map plus the owner's avatar hash
#[derive(Debug, Clone)]
pub struct ProcessedPost {
    pub block_map: BlockMap,
    pub email_hash: String,
}

/// Process a post's block map with the site configuration
pub fn process_post(block_map: &BlockMap, config: &SiteConfig) -> ProcessedPost {
    ProcessedPost {
        block_map: process_blocks(block_map, &ProcessOptions::from(config)),
        email_hash: contact_hash(&config.email),
    }
}

/// Build a sanitized copy of `block_map`
pub fn process_blocks(block_map: &BlockMap, options: &ProcessOptions) -> BlockMap {
    let limit = options.block_limit.unwrap_or(usize::MAX);

    let block = block_map
        .block
        .iter()
        .take(limit)
        .map(|(id, record)| (id.clone(), process_record(id, record)))
        .collect();

    if block_map.len() > limit {
        tracing::debug!(
            "Truncated block map from {} to {} blocks",
            block_map.len(),
            limit
        );
    }

    BlockMap {
        block,
        collection: block_map.collection.clone(),
        collection_view: block_map.collection_view.clone(),
        extra: block_map.extra.clone(),
    }
}

fn process_record(key: &str, record: &BlockRecord) -> BlockRecord {
    let mut record = record.clone();
    if let Some(block) = record.value.as_mut() {
        normalize_code_language(block);
        resign_attachment(key, block);
    }
    record
}

/// Highlighter identifier for a Notion language display name
pub fn language_alias(language: &str) -> Option<&'static str> {
    LANGUAGE_ALIASES
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, alias)| *alias)
}

/// Rewrite `language[0][0]` of code blocks when it has a known alias
pub fn normalize_code_language(block: &mut Block) {
    if block.kind != "code" {
        return;
    }
    if let Some(alias) = block.first_text("language").and_then(language_alias) {
        block.set_first_text("language", alias);
    }
}

/// Whether a media block's source must go through the signed-URL endpoint
pub fn needs_signing(kind: &str, source: &str) -> bool {
    if !MEDIA_TYPES.contains(&kind) || source.is_empty() {
        return false;
    }
    source.starts_with("attachment") || source.find("amazonaws.com").is_some_and(|pos| pos > 0)
}

/// Signed-URL form of an attachment source
pub fn signed_url(source: &str, block_id: &str) -> String {
    format!(
        "{}/{}?table=block&id={}",
        SIGNED_URL_ENDPOINT,
        encode_uri_component(source),
        block_id
    )
}

/// Rewrite `source[0][0]` of media blocks that point at private storage.
/// `key` is the block's map key, used when the block carries no id.
pub fn resign_attachment(key: &str, block: &mut Block) {
    let Some(source) = block.first_text("source") else {
        return;
    };
    if !needs_signing(&block.kind, source) {
        return;
    }

    let id = if block.id.is_empty() { key } else { block.id.as_str() };
    let url = signed_url(source, id);
    block.set_first_text("source", &url);
}

/// Stable avatar lookup key for the owner's email
pub fn contact_hash(email: &str) -> String {
    format!("{:x}", md5::compute(email.as_bytes()))
        .trim()
        .to_lowercase()
}
