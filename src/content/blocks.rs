//! Block map model
//!
//! A block map is the record map returned by the Notion page API: a `block`
//! table keyed by block id plus the collection tables used by database pages.
//! Every field is optional on the wire, so deserialization here is lenient:
//! a field with an unexpected shape is kept as raw JSON instead of failing
//! the whole map, and is written back unchanged.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Block identifier -> block record, in the order the backend returned them
pub type BlockTable = IndexMap<String, BlockRecord>;

/// A page's record map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMap {
    #[serde(default)]
    pub block: BlockTable,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub collection: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub collection_view: IndexMap<String, Value>,

    /// Other tables (notion_user, space, ...) passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlockMap {
    /// Look up a block value by id
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.block.get(id).and_then(|record| record.value.as_ref())
    }

    /// Number of block records
    pub fn len(&self) -> usize {
        self.block.len()
    }

    /// Whether the map holds no blocks
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    /// Merge another record map into this one. Existing blocks are replaced.
    pub fn merge(&mut self, other: BlockMap) {
        self.block.extend(other.block);
        self.collection.extend(other.collection);
        self.collection_view.extend(other.collection_view);
        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }

    /// Child ids referenced by some block but absent from the map
    pub fn missing_children(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for record in self.block.values() {
            let Some(block) = &record.value else { continue };
            for child in &block.content {
                if !self.block.contains_key(child) && !missing.contains(child) {
                    missing.push(child.clone());
                }
            }
        }
        missing
    }
}

/// A `{ role, value }` record wrapping a block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockRecord {
    pub role: Option<String>,

    /// The block, when `value` is a JSON object
    pub value: Option<Block>,

    /// Other record fields, and `role` / `value` when they could not be read
    pub extra: Map<String, Value>,
}

impl BlockRecord {
    pub fn new(block: Block) -> Self {
        Self {
            role: Some("reader".to_string()),
            value: Some(block),
            extra: Map::new(),
        }
    }
}

impl<'de> Deserialize<'de> for BlockRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Value::Object(mut fields) = Value::deserialize(deserializer)? else {
            tracing::debug!("Ignoring malformed block record");
            return Ok(Self::default());
        };

        let role = take_field(&mut fields, "role", |v| v.as_str().map(str::to_string));
        let value = take_field(&mut fields, "value", |v| match v {
            Value::Object(block) => Some(Block::from_fields(block.clone())),
            _ => None,
        });
        if value.is_none() && fields.contains_key("value") {
            tracing::debug!("Ignoring malformed block value");
        }

        Ok(Self {
            role,
            value,
            extra: fields,
        })
    }
}

impl Serialize for BlockRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(role) = &self.role {
            map.serialize_entry("role", role)?;
        }
        if let Some(value) = &self.value {
            map.serialize_entry("value", value)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Typed keys that were missing from the block object as received
#[derive(Debug, Clone, Copy, Default)]
struct AbsentKeys {
    id: bool,
    kind: bool,
    content: bool,
}

/// A single content block
///
/// Fields whose wire value has an unexpected shape keep their default here
/// and the original value stays in `extra`, so serializing a block gives
/// back what was read.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub id: String,

    /// The `type` field
    pub kind: String,

    /// Type-dependent property bag, e.g. `title`, `language`, `source`
    pub properties: Option<Value>,

    /// Ordered child block ids
    pub content: Vec<String>,

    pub format: Option<Value>,

    pub extra: Map<String, Value>,

    absent: AbsentKeys,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.properties == other.properties
            && self.content == other.content
            && self.format == other.format
            && self.extra == other.extra
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Ok(Self::from_fields(fields))
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.keeps("id", self.absent.id && self.id.is_empty()) {
            map.serialize_entry("id", &self.id)?;
        }
        if self.keeps("type", self.absent.kind && self.kind.is_empty()) {
            map.serialize_entry("type", &self.kind)?;
        }
        if let Some(properties) = &self.properties {
            map.serialize_entry("properties", properties)?;
        }
        if self.keeps("content", self.absent.content && self.content.is_empty()) {
            map.serialize_entry("content", &self.content)?;
        }
        if let Some(format) = &self.format {
            map.serialize_entry("format", format)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Block {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let absent = AbsentKeys {
            id: !fields.contains_key("id"),
            kind: !fields.contains_key("type"),
            content: !fields.contains_key("content"),
        };
        let id = take_field(&mut fields, "id", |v| v.as_str().map(str::to_string));
        let kind = take_field(&mut fields, "type", |v| v.as_str().map(str::to_string));
        let content = take_field(&mut fields, "content", |v| {
            v.as_array()?
                .iter()
                .map(|id| id.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        });
        let properties = take_field(&mut fields, "properties", non_null);
        let format = take_field(&mut fields, "format", non_null);

        Self {
            id: id.unwrap_or_default(),
            kind: kind.unwrap_or_default(),
            properties,
            content: content.unwrap_or_default(),
            format,
            extra: fields,
            absent,
        }
    }

    /// Whether a typed field is written back: not when the raw value sits in
    /// `extra`, nor when it was absent and is still empty
    fn keeps(&self, key: &str, still_absent: bool) -> bool {
        !self.extra.contains_key(key) && !still_absent
    }

    /// Builder helper: set a `[[text]]` property
    pub fn with_property(mut self, key: &str, text: &str) -> Self {
        self.set_first_text(key, text);
        self
    }

    /// Builder helper: set the child ids
    pub fn with_content(mut self, children: &[&str]) -> Self {
        self.content = children.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Raw property value
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }

    /// `properties[key][0][0]` as a string, if present
    pub fn first_text(&self, key: &str) -> Option<&str> {
        self.property(key)?.get(0)?.get(0)?.as_str()
    }

    /// Replace `properties[key][0][0]`, creating the nesting if needed
    pub fn set_first_text(&mut self, key: &str, text: &str) {
        let properties = self
            .properties
            .get_or_insert_with(|| Value::Object(Map::new()));
        let Some(properties) = properties.as_object_mut() else {
            return;
        };

        let slot = properties
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot.get_mut(0).and_then(|segment| segment.get_mut(0)) {
            Some(first) => *first = Value::String(text.to_string()),
            None => *slot = serde_json::json!([[text]]),
        }
    }

    /// A string field from the `format` object
    pub fn format_str(&self, key: &str) -> Option<&str> {
        self.format.as_ref()?.get(key)?.as_str()
    }

    /// A string field stored directly on the block (e.g. `parent_id`)
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key)?.as_str()
    }
}

/// Remove `key` from `fields` when `read` accepts its value; otherwise the
/// raw value stays behind
fn take_field<T>(
    fields: &mut Map<String, Value>,
    key: &str,
    read: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let parsed = read(fields.get(key)?)?;
    fields.remove(key);
    Some(parsed)
}

fn non_null(value: &Value) -> Option<Value> {
    (!value.is_null()).then(|| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record_map_keeps_order() {
        let raw = json!({
            "block": {
                "z": { "role": "reader", "value": { "id": "z", "type": "page", "content": ["a", "m"] } },
                "a": { "role": "reader", "value": { "id": "a", "type": "text" } },
                "m": { "role": "reader", "value": { "id": "m", "type": "code" } }
            },
            "notion_user": {}
        });
        let map: BlockMap = serde_json::from_value(raw).unwrap();
        let keys: Vec<_> = map.block.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(map.get("z").unwrap().content, vec!["a", "m"]);
        assert!(map.extra.contains_key("notion_user"));
    }

    #[test]
    fn test_malformed_fields_are_tolerated() {
        let raw = json!({
            "block": {
                "a": { "value": { "id": 42, "type": ["code"], "content": "nope" } },
                "b": { "value": "garbage" },
                "c": {}
            }
        });
        let map: BlockMap = serde_json::from_value(raw).unwrap();
        assert_eq!(map.len(), 3);
        let a = map.get("a").unwrap();
        assert_eq!(a.id, "");
        assert_eq!(a.kind, "");
        assert!(a.content.is_empty());
        assert!(map.get("b").is_none());
        assert!(map.get("c").is_none());
    }

    #[test]
    fn test_malformed_fields_survive_serialization() {
        let raw = json!({
            "block": {
                "a": { "value": "garbage" },
                "b": { "value": { "id": 42, "type": ["code"], "content": "nope" } },
                "c": { "role": "reader", "value": { "id": "c", "type": "text", "properties": null } },
                "d": { "role": 7, "value": null, "space_id": "s" },
                "e": { "value": { "id": "e", "type": "page", "content": ["x", 1] } }
            }
        });
        let map: BlockMap = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(map.get("c").unwrap().kind, "text");
        assert!(map.get("e").unwrap().content.is_empty());

        assert_eq!(serde_json::to_value(&map).unwrap(), raw);
    }

    #[test]
    fn test_built_blocks_serialize_typed_fields() {
        let block = Block::new("b1", "text");
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({ "id": "b1", "type": "text", "content": [] })
        );
    }

    #[test]
    fn test_first_text_safe_navigation() {
        let mut block = Block::new("b1", "code");
        assert_eq!(block.first_text("language"), None);

        block.properties = Some(json!({ "language": [] }));
        assert_eq!(block.first_text("language"), None);

        block.properties = Some(json!({ "language": [["Rust"]] }));
        assert_eq!(block.first_text("language"), Some("Rust"));
    }

    #[test]
    fn test_set_first_text() {
        let mut block = Block::new("b1", "code").with_property("title", "fn main() {}");
        block.set_first_text("language", "Rust");
        assert_eq!(block.first_text("language"), Some("Rust"));

        block.properties = Some(json!({ "language": [["C++", [["b"]]]] }));
        block.set_first_text("language", "cpp");
        assert_eq!(block.property("language").unwrap(), &json!([["cpp", [["b"]]]]));
    }

    #[test]
    fn test_missing_children() {
        let mut map = BlockMap::default();
        map.block.insert(
            "p".to_string(),
            BlockRecord::new(Block::new("p", "page").with_content(&["a", "b"])),
        );
        map.block
            .insert("a".to_string(), BlockRecord::new(Block::new("a", "text")));
        assert_eq!(map.missing_children(), vec!["b".to_string()]);
    }
}
