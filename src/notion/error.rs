//! Errors raised while fetching content

use thiserror::Error;

/// Errors from the Notion API or the snapshot store
#[derive(Debug, Error)]
pub enum NotionError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("notion_page_id is not configured")]
    MissingPageId,

    #[error("page {0} is not a database page")]
    NotADatabase(String),

    #[error("post not found: {0}")]
    NotFound(String),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot data is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

impl NotionError {
    /// Whether the error means "no such post", as opposed to a fetch failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, NotionError::NotFound(_))
    }
}
