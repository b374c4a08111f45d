use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names of a canonical record, in stage-file / column order.
pub const COLUMNS: [&str; 12] = [
    "id",
    "url",
    "author",
    "title",
    "company",
    "location",
    "text",
    "likes",
    "comments",
    "scraped_at",
    "source",
    "matched_keywords",
];

/// Typed view over one untyped scraped post.
///
/// Every field is optional. Values of an unexpected JSON type are coerced when
/// there is an obvious reading (numbers to strings, `"1,204"` to a count) and
/// dropped otherwise, so building one never fails for an object input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub text: Option<String>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub scraped_at: Option<String>,
    pub source: Option<String>,
}

impl RawRecord {
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| obj.get(key).and_then(lenient_string);
        let count = |key: &str| obj.get(key).and_then(lenient_count);

        RawRecord {
            id: text("id"),
            url: text("url"),
            author: text("author"),
            company: text("company"),
            title: text("title"),
            location: text("location"),
            text: text("text"),
            likes: count("likes"),
            comments: count("comments"),
            scraped_at: text("scraped_at"),
            source: text("source"),
        }
    }
}

fn lenient_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Engagement counts as scraped: plain numbers, or UI strings such as
/// `"1,204"` and `"12 comments"`. Negative numbers clamp to zero.
fn lenient_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|_| 0))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.max(0.0).trunc() as u64)
            }),
        Value::String(s) => {
            let token = s.split_whitespace().next()?.replace(',', "");
            token.parse::<u64>().ok()
        }
        _ => None,
    }
}

/// The normalized post, one per raw input. Shape of every stage-file entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    pub id: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub text: String,
    pub likes: u64,
    pub comments: u64,
    pub scraped_at: String,
    pub source: String,
    pub matched_keywords: Vec<String>,
}

impl CanonicalRecord {
    /// A post with neither a title nor any text carries nothing to review.
    pub fn has_content(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty()) || !self.text.is_empty()
    }
}
