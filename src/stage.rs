//! Stage files: the pretty JSON arrays persisted between pipeline steps.
//!
//! A stage file is both the contract between two steps and a checkpoint, so
//! a completed write is always a whole, parseable collection. Writes go to a
//! sibling temp file first and are renamed into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result, Stage};
use crate::record::CanonicalRecord;

pub fn write_stage(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    write_json(path, records)?;
    debug!(path = %path.display(), records = records.len(), "stage file written");
    Ok(())
}

pub fn read_stage(path: &Path, stage: Stage) -> Result<Vec<CanonicalRecord>> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            stage,
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| PipelineError::json(path, e))
}

/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::json(path, e))?;
    body.push(b'\n');
    replace_file(path, &body)
}

/// Replace the contents of `path` with `body` via a sibling temp file.
pub fn replace_file(path: &Path, body: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    let written = fs::File::create(&tmp).and_then(|mut f| {
        f.write_all(body)?;
        f.flush()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::io(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e))
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
        }
        _ => Ok(()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stage".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CanonicalRecord> {
        vec![
            CanonicalRecord {
                id: Some("post_1".into()),
                url: Some("https://linkedin.com/jobs/view/1".into()),
                author: Some("Zoë Müller".into()),
                title: None,
                company: Some("TechCorp".into()),
                location: Some("Bengaluru, India".into()),
                text: "Hiring a Rust engineer — remote".into(),
                likes: 120,
                comments: 5,
                scraped_at: "2025-09-02T12:30:00Z".into(),
                source: "linkedin".into(),
                matched_keywords: vec!["engineer".into()],
            },
            CanonicalRecord {
                text: "second".into(),
                scraped_at: "2025-09-02T12:31:00Z".into(),
                source: "linkedin_feed".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn round_trip_preserves_records_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed/parsed_posts.json");
        let records = sample();

        write_stage(&path, &records).unwrap();
        let back = read_stage(&path, Stage::Parsed).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn output_is_pretty_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_stage(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {\n    \"id\": \"post_1\""));
        assert!(text.contains("Zoë Müller"));
        assert!(text.contains("\"title\": null"));
        assert!(text.ends_with("]\n"));
        assert!(!dir.path().join(".out.json.tmp").exists());
    }

    #[test]
    fn empty_collection_is_still_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.json");
        write_stage(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
        assert!(read_stage(&path, Stage::Filtered).unwrap().is_empty());
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed.json");
        write_stage(&path, &sample()).unwrap();
        write_stage(&path, &sample()[1..]).unwrap();
        assert_eq!(read_stage(&path, Stage::Parsed).unwrap().len(), 1);
    }

    #[test]
    fn missing_stage_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_stage(&dir.path().join("nope.json"), Stage::Parsed).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { stage: Stage::Parsed, .. }));
        assert!(err.to_string().starts_with("No parsed posts found at"));
    }

    #[test]
    fn hand_edited_entries_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed.json");
        fs::write(&path, r#"[{"text": "hi", "likes": 3}]"#).unwrap();
        let back = read_stage(&path, Stage::Parsed).unwrap();
        assert_eq!(back[0].likes, 3);
        assert_eq!(back[0].comments, 0);
        assert!(back[0].matched_keywords.is_empty());
    }
}
