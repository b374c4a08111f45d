use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PipelineError, Result, Stage};
use crate::record::RawRecord;
use crate::stage;

pub type RawObject = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per line.
    Ndjson,
    /// A single JSON array of objects.
    Array,
}

/// Per-line result of NDJSON parsing. Bad lines are skipped, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Record(RawObject),
    Skipped,
}

/// Peek at the first non-empty line: an object opener that does not also
/// close an array means NDJSON. A one-line `[{...}]` therefore reads as an
/// array, but a one-line `{...}]` would be misread as NDJSON.
pub fn detect_format(content: &str) -> Format {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty());
    match first {
        Some(line) if line.starts_with('{') && !line.ends_with(']') => Format::Ndjson,
        _ => Format::Array,
    }
}

pub fn parse_line(line: &str) -> LineOutcome {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(obj)) => LineOutcome::Record(obj),
        _ => LineOutcome::Skipped,
    }
}

/// Load the raw objects of a JSON array or NDJSON file, in file order.
pub fn load_objects(path: &Path) -> Result<Vec<RawObject>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            stage: Stage::Raw,
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    parse_objects(path, &content)
}

/// Load raw posts as typed records.
pub fn load(path: &Path) -> Result<Vec<RawRecord>> {
    let objects = load_objects(path)?;
    Ok(objects.iter().map(RawRecord::from_object).collect())
}

fn parse_objects(path: &Path, content: &str) -> Result<Vec<RawObject>> {
    if content.trim().is_empty() {
        debug!(path = %path.display(), "raw file is empty");
        return Ok(Vec::new());
    }

    match detect_format(content) {
        Format::Ndjson => {
            let mut records = Vec::new();
            let mut skipped = 0usize;
            for (idx, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_line(line) {
                    LineOutcome::Record(obj) => records.push(obj),
                    LineOutcome::Skipped => {
                        skipped += 1;
                        debug!(path = %path.display(), line = idx + 1, "skipping malformed line");
                    }
                }
            }
            debug!(path = %path.display(), records = records.len(), skipped, "loaded NDJSON");
            Ok(records)
        }
        Format::Array => {
            let values: Vec<Value> =
                serde_json::from_str(content).map_err(|e| PipelineError::json(path, e))?;
            let total = values.len();
            let records: Vec<RawObject> = values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(obj) => Some(obj),
                    _ => None,
                })
                .collect();
            if records.len() < total {
                debug!(path = %path.display(), skipped = total - records.len(), "skipping non-object entries");
            }
            Ok(records)
        }
    }
}

/// Identity used to recognise a post seen before: first non-empty of
/// `id`, `url`, `text`.
pub fn dedup_key(obj: &RawObject) -> Option<String> {
    ["id", "url", "text"].iter().find_map(|key| {
        let key = match obj.get(*key)? {
            Value::String(s) => s.clone(),
            Value::Null => return None,
            other => other.to_string(),
        };
        (!key.is_empty()).then_some(key)
    })
}

/// Keys of everything already stored in a raw collection file. A missing
/// file has none.
pub fn seen_keys(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    Ok(load_objects(path)?.iter().filter_map(dedup_key).collect())
}

/// Append unseen objects from `batch` to the raw collection at `path`.
///
/// Objects without a key, or whose key is already in `seen`, are dropped;
/// accepted keys are added to `seen`. Returns the number appended. Nothing is
/// written when the batch holds nothing new. The file keeps its format: an
/// NDJSON file gains one line per object with its existing lines untouched,
/// anything else is (re)written as a JSON array.
pub fn append_raw(path: &Path, batch: Vec<RawObject>, seen: &mut HashSet<String>) -> Result<usize> {
    let fresh: Vec<RawObject> = batch
        .into_iter()
        .filter(|obj| match dedup_key(obj) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect();
    if fresh.is_empty() {
        return Ok(0);
    }
    let added = fresh.len();

    match existing(path)? {
        Existing::Lines(mut body) => {
            if !body.ends_with('\n') {
                body.push('\n');
            }
            for obj in &fresh {
                body.push_str(&serde_json::to_string(obj).map_err(|e| PipelineError::json(path, e))?);
                body.push('\n');
            }
            stage::replace_file(path, body.as_bytes())?;
            debug!(path = %path.display(), added, "appended raw posts as NDJSON lines");
        }
        Existing::Array(mut data) => {
            data.extend(fresh.into_iter().map(Value::Object));
            stage::write_json(path, &data)?;
            debug!(path = %path.display(), added, total = data.len(), "appended raw posts");
        }
    }
    Ok(added)
}

/// Current contents of a raw collection file.
enum Existing {
    /// NDJSON text, kept verbatim so skipped lines survive the append.
    Lines(String),
    Array(Vec<Value>),
}

/// Missing or blank files count as an empty array. An array that does not
/// parse is an error so it is never overwritten.
fn existing(path: &Path) -> Result<Existing> {
    if !path.exists() {
        return Ok(Existing::Array(Vec::new()));
    }
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(Existing::Array(Vec::new()));
    }
    match detect_format(&content) {
        Format::Ndjson => Ok(Existing::Lines(content)),
        Format::Array => serde_json::from_str(&content)
            .map(Existing::Array)
            .map_err(|e| PipelineError::json(path, e)),
    }
}
