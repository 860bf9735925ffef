//! Mapping database rows onto posts
//!
//! A post database is a Notion collection whose schema names the columns
//! `title`, `slug`, `summary`, `date`, `tags`, `type`, `status` and
//! `fullWidth`. Row properties are keyed by opaque column ids, so every row
//! is decoded through the schema.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::content::{plain_text, Block, BlockMap, Post, PostKind};

/// Column name (lower-cased) -> (column id, column type)
pub type Schema = HashMap<String, (String, String)>;

/// Build the column lookup from a collection's `schema` object
pub fn parse_schema(schema: &Value) -> Schema {
    schema
        .as_object()
        .map(|columns| {
            columns
                .iter()
                .filter_map(|(id, column)| {
                    let name = column.get("name")?.as_str()?;
                    let kind = column.get("type").and_then(Value::as_str).unwrap_or("text");
                    Some((name.to_lowercase(), (id.clone(), kind.to_string())))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Collection id, first view id and schema of a database page
pub fn database_info(map: &BlockMap, page_id: &str) -> Option<(String, String, Schema)> {
    let page = map.get(page_id)?;
    let collection_id = page.extra_str("collection_id")?.to_string();
    let view_id = page
        .extra
        .get("view_ids")
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)?
        .to_string();

    let schema = map
        .collection
        .get(&collection_id)
        .and_then(|record| record.pointer("/value/schema"))
        .map(parse_schema)
        .unwrap_or_default();

    Some((collection_id, view_id, schema))
}

/// Decode the rows `ids` of `map` into posts. Rows without a usable
/// type or date are dropped.
pub fn rows_to_posts(schema: &Schema, ids: &[String], map: &BlockMap) -> Vec<Post> {
    ids.iter()
        .filter_map(|id| map.get(id))
        .filter_map(|row| row_to_post(schema, row))
        .collect()
}

fn column<'a>(schema: &Schema, row: &'a Block, name: &str) -> Option<&'a Value> {
    let (id, _) = schema.get(&name.to_lowercase())?;
    row.property(id)
}

fn column_text(schema: &Schema, row: &Block, name: &str) -> String {
    plain_text(column(schema, row, name)).trim().to_string()
}

fn row_to_post(schema: &Schema, row: &Block) -> Option<Post> {
    let text = |name: &str| column_text(schema, row, name);

    let kind = PostKind::parse(&text("type"))?;
    let date = column(schema, row, "date")
        .and_then(date_property)
        .or_else(|| created_time(row))?;

    let tags = text("tags")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let full_width = column(schema, row, "fullWidth").map(|_| text("fullWidth") == "Yes");

    Some(Post {
        id: row.id.clone(),
        slug: text("slug"),
        title: text("title"),
        summary: text("summary"),
        date,
        tags,
        kind,
        status: text("status"),
        full_width,
    })
}

/// Decode a date property: `[["‣", [["d", {"start_date": ..., "start_time": ...}]]]]`
fn date_property(value: &Value) -> Option<DateTime<Utc>> {
    let date = value.pointer("/0/1/0/1")?;
    let day = NaiveDate::parse_from_str(date.get("start_date")?.as_str()?, "%Y-%m-%d").ok()?;
    let time = date
        .get("start_time")
        .and_then(Value::as_str)
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(Utc.from_utc_datetime(&day.and_time(time)))
}

/// A row's creation timestamp (milliseconds since the epoch)
fn created_time(row: &Block) -> Option<DateTime<Utc>> {
    let millis = row.extra.get("created_time")?.as_i64()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Keep visible rows with usable slugs and order them newest first when
/// requested
pub fn filter_posts(
    posts: Vec<Post>,
    include_pages: bool,
    sort_by_date: bool,
    now: DateTime<Utc>,
) -> Vec<Post> {
    let mut posts: Vec<Post> = posts
        .into_iter()
        .filter(|p| p.is_visible(now, include_pages))
        .filter(|p| {
            if !p.has_safe_slug() {
                tracing::warn!("Skipping {:?}: slug {:?} is not a plain path segment", p.title, p.slug);
            }
            p.has_safe_slug()
        })
        .collect();
    if sort_by_date {
        posts.sort_by(|a, b| b.date.cmp(&a.date));
    }
    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BlockRecord;
    use serde_json::json;

    fn schema() -> Schema {
        parse_schema(&json!({
            "title": { "name": "title", "type": "title" },
            "s1": { "name": "slug", "type": "text" },
            "s2": { "name": "summary", "type": "text" },
            "d1": { "name": "date", "type": "date" },
            "t1": { "name": "tags", "type": "multi_select" },
            "ty": { "name": "type", "type": "select" },
            "st": { "name": "status", "type": "select" },
            "fw": { "name": "fullWidth", "type": "checkbox" }
        }))
    }

    fn row(id: &str, props: Value) -> Block {
        let mut block = Block::new(id, "page");
        block.properties = Some(props);
        block
    }

    fn map_of(rows: Vec<Block>) -> BlockMap {
        let mut map = BlockMap::default();
        for row in rows {
            map.block.insert(row.id.clone(), BlockRecord::new(row));
        }
        map
    }

    #[test]
    fn test_row_decoding() {
        let map = map_of(vec![row(
            "r1",
            json!({
                "title": [["Hello World"]],
                "s1": [["hello-world"]],
                "s2": [["A summary"]],
                "d1": [["‣", [["d", { "type": "date", "start_date": "2023-05-30", "start_time": "08:15" }]]]],
                "t1": [["rust,notion, blog"]],
                "ty": [["Post"]],
                "st": [["Published"]],
                "fw": [["Yes"]]
            }),
        )]);
        let posts = rows_to_posts(&schema(), &["r1".to_string()], &map);
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.summary, "A summary");
        assert_eq!(post.tags, vec!["rust", "notion", "blog"]);
        assert_eq!(post.kind, PostKind::Post);
        assert_eq!(post.full_width, Some(true));
        assert_eq!(post.date, Utc.with_ymd_and_hms(2023, 5, 30, 8, 15, 0).unwrap());
    }

    #[test]
    fn test_row_without_type_dropped_and_created_time_fallback() {
        let mut dated = row(
            "r2",
            json!({ "title": [["Page"]], "s1": [["about"]], "ty": [["Page"]], "st": [["Published"]] }),
        );
        dated.extra.insert("created_time".to_string(), json!(1_700_000_000_000i64));
        let untyped = row("r3", json!({ "title": [["No type"]] }));
        let map = map_of(vec![dated, untyped]);

        let ids = vec!["r2".to_string(), "r3".to_string(), "absent".to_string()];
        let posts = rows_to_posts(&schema(), &ids, &map);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].kind, PostKind::Page);
        assert_eq!(posts[0].full_width, None);
        assert_eq!(posts[0].date.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_database_info() {
        let mut page = Block::new("db", "collection_view_page");
        page.extra.insert("collection_id".to_string(), json!("col"));
        page.extra.insert("view_ids".to_string(), json!(["view"]));
        let mut map = map_of(vec![page]);
        map.collection.insert(
            "col".to_string(),
            json!({ "value": { "schema": { "abc": { "name": "Slug", "type": "text" } } } }),
        );

        let (collection, view, schema) = database_info(&map, "db").unwrap();
        assert_eq!(collection, "col");
        assert_eq!(view, "view");
        assert_eq!(schema.get("slug").unwrap().0, "abc");
        assert!(database_info(&map, "missing").is_none());
    }

    #[test]
    fn test_filter_and_sort() {
        let now = Utc::now();
        let old = Post::new("1", "old", "Old", Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let new = Post::new("2", "new", "New", Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let mut draft = Post::new("3", "draft", "Draft", old.date);
        draft.status = "Draft".to_string();

        let posts = filter_posts(vec![old, new, draft], false, true, now);
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old"]);
    }
}
