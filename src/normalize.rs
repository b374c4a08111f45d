use chrono::{DateTime, Utc};

use crate::keywords::KeywordList;
use crate::record::{CanonicalRecord, RawRecord};

pub const DEFAULT_SOURCE: &str = "linkedin";

/// Normalize one raw post, stamping `scraped_at` with the current time when
/// the raw post has none. Re-normalizing such a post later gives a different
/// timestamp; callers needing stable output must supply `scraped_at`.
pub fn normalize(raw: &RawRecord, keywords: &KeywordList) -> CanonicalRecord {
    normalize_at(raw, keywords, Utc::now())
}

/// One output per input, in input order.
pub fn normalize_all(raws: &[RawRecord], keywords: &KeywordList) -> Vec<CanonicalRecord> {
    raws.iter().map(|raw| normalize(raw, keywords)).collect()
}

/// Like [`normalize`] with an explicit clock for the `scraped_at` fallback.
pub fn normalize_at(raw: &RawRecord, keywords: &KeywordList, now: DateTime<Utc>) -> CanonicalRecord {
    let text = non_empty(&raw.text);
    let title = non_empty(&raw.title);

    let haystack = text.or(title).unwrap_or_default().to_lowercase();

    CanonicalRecord {
        id: raw.id.clone(),
        url: raw.url.clone(),
        author: non_empty(&raw.author).or(non_empty(&raw.company)).map(str::to_string),
        title: title.map(str::to_string),
        company: non_empty(&raw.company).map(str::to_string),
        location: non_empty(&raw.location).map(str::to_string),
        text: text.unwrap_or_default().to_string(),
        likes: raw.likes.unwrap_or(0),
        comments: raw.comments.unwrap_or(0),
        scraped_at: non_empty(&raw.scraped_at)
            .map(str::to_string)
            .unwrap_or_else(|| timestamp(now)),
        source: raw.source.clone().unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        matched_keywords: match_keywords(&haystack, keywords),
    }
}

/// Keywords occurring anywhere in `haystack` (already lowercased), in
/// keyword-list order. Plain substring test, so "AI" hits "email".
pub fn match_keywords(haystack: &str, keywords: &KeywordList) -> Vec<String> {
    keywords
        .as_slice()
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .cloned()
        .collect()
}

/// ISO-8601 UTC with microseconds and a trailing `Z`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawRecord {
        RawRecord::from_object(v.as_object().unwrap())
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 2, 12, 30, 0).unwrap()
    }

    #[test]
    fn substring_case_insensitive_match() {
        let kw = KeywordList::new(["python", "java"]);
        let rec = normalize(&raw(json!({"text": "We need a Python Developer"})), &kw);
        assert_eq!(rec.matched_keywords, ["python"]);
    }

    #[test]
    fn partial_word_matches_count() {
        let kw = KeywordList::new(["AI"]);
        let rec = normalize(&raw(json!({"text": "please email me"})), &kw);
        assert_eq!(rec.matched_keywords, ["AI"]);
    }

    #[test]
    fn matches_follow_keyword_order_with_duplicates() {
        let kw = KeywordList::new(["react", "backend", "React", "go"]);
        let rec = normalize(&raw(json!({"text": "Backend role, React on the frontend"})), &kw);
        assert_eq!(rec.matched_keywords, ["react", "backend", "React"]);
    }

    #[test]
    fn title_used_for_matching_when_text_missing() {
        let kw = KeywordList::new(["engineer"]);
        let rec = normalize(&raw(json!({"title": "Senior Engineer", "text": ""})), &kw);
        assert_eq!(rec.matched_keywords, ["engineer"]);
        assert_eq!(rec.text, "");
        assert_eq!(rec.title.as_deref(), Some("Senior Engineer"));
    }

    #[test]
    fn text_wins_over_title_for_matching() {
        let kw = KeywordList::new(["engineer"]);
        let rec = normalize(&raw(json!({"title": "Engineer", "text": "nothing here"})), &kw);
        assert!(rec.matched_keywords.is_empty());
    }

    #[test]
    fn empty_mapping_gets_every_default() {
        let rec = normalize_at(&RawRecord::default(), &KeywordList::defaults(), fixed_now());
        assert_eq!(
            rec,
            CanonicalRecord {
                id: None,
                url: None,
                author: None,
                title: None,
                company: None,
                location: None,
                text: String::new(),
                likes: 0,
                comments: 0,
                scraped_at: "2025-09-02T12:30:00.000000Z".into(),
                source: "linkedin".into(),
                matched_keywords: vec![],
            }
        );
    }

    #[test]
    fn author_falls_back_to_company() {
        let kw = KeywordList::defaults();
        let rec = normalize(&raw(json!({"company": "TechCorp"})), &kw);
        assert_eq!(rec.author.as_deref(), Some("TechCorp"));
        assert_eq!(rec.company.as_deref(), Some("TechCorp"));

        let rec = normalize(&raw(json!({"author": "", "company": "TechCorp"})), &kw);
        assert_eq!(rec.author.as_deref(), Some("TechCorp"));

        let rec = normalize(&raw(json!({"author": "Jane", "company": "TechCorp"})), &kw);
        assert_eq!(rec.author.as_deref(), Some("Jane"));
    }

    #[test]
    fn empty_strings_become_null() {
        let rec = normalize(
            &raw(json!({"title": "", "company": "", "location": ""})),
            &KeywordList::defaults(),
        );
        assert_eq!(rec.title, None);
        assert_eq!(rec.company, None);
        assert_eq!(rec.location, None);
    }

    #[test]
    fn passthrough_fields_are_kept() {
        let rec = normalize_at(
            &raw(json!({
                "id": "post_12345",
                "url": "https://linkedin.com/jobs/view/12345",
                "likes": 120,
                "comments": 5,
                "scraped_at": "2025-01-01T00:00:00Z",
                "source": "linkedin_feed",
            })),
            &KeywordList::defaults(),
            fixed_now(),
        );
        assert_eq!(rec.id.as_deref(), Some("post_12345"));
        assert_eq!(rec.url.as_deref(), Some("https://linkedin.com/jobs/view/12345"));
        assert_eq!(rec.likes, 120);
        assert_eq!(rec.comments, 5);
        assert_eq!(rec.scraped_at, "2025-01-01T00:00:00Z");
        assert_eq!(rec.source, "linkedin_feed");
    }

    #[test]
    fn empty_scraped_at_is_stamped() {
        let rec = normalize_at(&raw(json!({"scraped_at": ""})), &KeywordList::defaults(), fixed_now());
        assert_eq!(rec.scraped_at, "2025-09-02T12:30:00.000000Z");
    }

    #[test]
    fn live_timestamp_is_utc_iso() {
        let rec = normalize(&RawRecord::default(), &KeywordList::defaults());
        assert!(rec.scraped_at.ends_with('Z'));
        let parsed = DateTime::parse_from_rfc3339(&rec.scraped_at).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn normalize_all_is_one_to_one_in_order() {
        let raws = vec![
            raw(json!({"id": "1", "text": "python"})),
            RawRecord::default(),
            raw(json!({"id": "3"})),
        ];
        let out = normalize_all(&raws, &KeywordList::new(["python"]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].id.as_deref(), Some("1"));
        assert_eq!(out[0].matched_keywords, ["python"]);
        assert_eq!(out[1].id, None);
        assert_eq!(out[2].id.as_deref(), Some("3"));
    }

    #[test]
    fn matched_keywords_subset_of_list() {
        let kw = KeywordList::defaults();
        let rec = normalize(
            &raw(json!({"text": "Machine Learning engineer, Python + React, data scientist"})),
            &kw,
        );
        assert_eq!(
            rec.matched_keywords,
            ["engineer", "python", "react", "machine learning", "data scientist"]
        );
        assert!(rec.matched_keywords.iter().all(|m| kw.as_slice().contains(m)));
    }
}
