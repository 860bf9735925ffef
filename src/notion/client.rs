//! HTTP client for Notion's page API

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::ids::to_uuid;
use super::NotionError;
use crate::config::SiteConfig;
use crate::content::BlockMap;

/// Page size for `loadPageChunk`
const CHUNK_LIMIT: usize = 100;
/// Upper bound on chunks fetched for one page
const MAX_CHUNKS: usize = 10;
/// Rounds of fetching blocks referenced but not yet loaded
const MAX_MISSING_ROUNDS: usize = 5;
/// Ids per `syncRecordValues` request
const SYNC_BATCH: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageChunk {
    #[serde(default)]
    record_map: BlockMap,
    #[serde(default)]
    cursor: Option<Cursor>,
}

#[derive(Debug, Default, Deserialize)]
struct Cursor {
    #[serde(default)]
    stack: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordValues {
    #[serde(default)]
    record_map: BlockMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionQuery {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    record_map: BlockMap,
}

/// Client for the unofficial v3 API used by notion.so itself
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl NotionClient {
    /// Build a client from the site configuration
    pub fn new(config: &SiteConfig) -> Result<Self, NotionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("nobelium-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| NotionError::Http {
                endpoint: config.notion_api_base.clone(),
                source,
            })?;

        Ok(Self {
            http,
            api_base: config.notion_api_base.trim_end_matches('/').to_string(),
            token: config.notion_access_token.clone(),
        })
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, NotionError> {
        let url = format!("{}/{}", self.api_base, endpoint);
        tracing::debug!("POST {}", url);

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::COOKIE, format!("token_v2={}", token));
        }

        let http_err = |source| NotionError::Http {
            endpoint: endpoint.to_string(),
            source,
        };
        let response = request.send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotionError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(http_err)?;
        serde_json::from_str(&text).map_err(|source| NotionError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Load all chunks of a page's record map
    pub async fn load_page_chunk(&self, page_id: &str) -> Result<BlockMap, NotionError> {
        let page_id = to_uuid(page_id);
        let mut map = BlockMap::default();
        let mut cursor = json!({ "stack": [] });

        for chunk_number in 0..MAX_CHUNKS {
            let chunk: PageChunk = self
                .post(
                    "loadPageChunk",
                    json!({
                        "pageId": page_id,
                        "limit": CHUNK_LIMIT,
                        "cursor": cursor,
                        "chunkNumber": chunk_number,
                        "verticalColumns": false,
                    }),
                )
                .await?;
            map.merge(chunk.record_map);

            match next_cursor(&page_id, chunk_number, chunk.cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(map)
    }

    /// Fetch individual blocks by id
    pub async fn sync_record_values(&self, ids: &[String]) -> Result<BlockMap, NotionError> {
        let mut map = BlockMap::default();
        for batch in ids.chunks(SYNC_BATCH) {
            let requests: Vec<Value> = batch
                .iter()
                .map(|id| json!({ "pointer": { "table": "block", "id": id }, "version": -1 }))
                .collect();
            let values: RecordValues = self
                .post("syncRecordValues", json!({ "requests": requests }))
                .await?;
            map.merge(values.record_map);
        }
        Ok(map)
    }

    /// A page's complete record map, including children the chunks left out
    pub async fn get_page(&self, page_id: &str) -> Result<BlockMap, NotionError> {
        let mut map = self.load_page_chunk(page_id).await?;

        for _ in 0..MAX_MISSING_ROUNDS {
            let missing = map.missing_children();
            if missing.is_empty() {
                break;
            }
            tracing::debug!("Fetching {} missing blocks", missing.len());
            let fetched = self.sync_record_values(&missing).await?;
            if fetched.is_empty() {
                break;
            }
            map.merge(fetched);
        }

        Ok(map)
    }

    /// Query a database view, returning row ids in view order plus their records
    pub async fn query_collection(
        &self,
        collection_id: &str,
        view_id: &str,
    ) -> Result<(Vec<String>, BlockMap), NotionError> {
        let query: CollectionQuery = self
            .post(
                "queryCollection",
                json!({
                    "collection": { "id": collection_id },
                    "collectionView": { "id": view_id },
                    "loader": {
                        "type": "reducer",
                        "reducers": {
                            "collection_group_results": { "type": "results", "limit": 999 }
                        },
                        "searchQuery": "",
                        "userTimeZone": "UTC"
                    }
                }),
            )
            .await?;

        Ok((result_block_ids(&query.result), query.record_map))
    }
}

/// Cursor for the chunk after `chunk_number`, or `None` when the page is
/// complete or the chunk limit has been reached
fn next_cursor(page_id: &str, chunk_number: usize, cursor: Option<Cursor>) -> Option<Value> {
    let stack = cursor.map(|c| c.stack).filter(|stack| !stack.is_empty())?;
    if chunk_number + 1 >= MAX_CHUNKS {
        tracing::warn!(
            "Page {} has more than {} chunks, the rest is not fetched",
            page_id,
            MAX_CHUNKS
        );
        return None;
    }
    Some(json!({ "stack": stack }))
}

/// Row ids from either the reducer or the legacy result shape
fn result_block_ids(result: &Value) -> Vec<String> {
    let ids = result
        .pointer("/reducerResults/collection_group_results/blockIds")
        .or_else(|| result.get("blockIds"))
        .and_then(Value::as_array);

    ids.map(|ids| {
        ids.iter()
            .filter_map(|id| id.as_str().map(str::to_string))
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_block_ids_reducer_shape() {
        let result = json!({
            "reducerResults": { "collection_group_results": { "blockIds": ["a", "b"] } }
        });
        assert_eq!(result_block_ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_result_block_ids_legacy_shape() {
        let result = json!({ "blockIds": ["x", 3, "y"] });
        assert_eq!(result_block_ids(&result), vec!["x", "y"]);
        assert!(result_block_ids(&Value::Null).is_empty());
    }

    #[test]
    fn test_page_chunk_decoding() {
        let raw = r#"{
            "recordMap": { "block": { "a": { "role": "reader", "value": { "id": "a", "type": "page" } } } },
            "cursor": { "stack": [] }
        }"#;
        let chunk: PageChunk = serde_json::from_str(raw).unwrap();
        assert_eq!(chunk.record_map.len(), 1);
        assert!(chunk.cursor.unwrap().stack.is_empty());
    }

    #[test]
    fn test_next_cursor_stops_at_chunk_limit() {
        let cursor = || Some(Cursor { stack: vec![json!([{ "id": "x" }])] });

        assert_eq!(
            next_cursor("p", 0, cursor()),
            Some(json!({ "stack": [[{ "id": "x" }]] }))
        );
        assert!(next_cursor("p", MAX_CHUNKS - 2, cursor()).is_some());
        assert_eq!(next_cursor("p", MAX_CHUNKS - 1, cursor()), None);
        assert_eq!(next_cursor("p", 0, Some(Cursor::default())), None);
        assert_eq!(next_cursor("p", 0, None), None);
    }

    #[test]
    fn test_client_from_config() {
        let mut config = SiteConfig::default();
        config.notion_api_base = "http://localhost:9/api/v3/".to_string();
        let client = NotionClient::new(&config).unwrap();
        assert_eq!(client.api_base, "http://localhost:9/api/v3");
    }
}
