use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::record::CanonicalRecord;
use crate::stage::ensure_parent;

pub fn connect(path: &Path) -> Result<Connection> {
    ensure_parent(path)?;
    let conn = Connection::open(path)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            seq              INTEGER PRIMARY KEY,
            id               TEXT,
            url              TEXT,
            author           TEXT,
            title            TEXT,
            company          TEXT,
            location         TEXT,
            text             TEXT NOT NULL,
            likes            INTEGER NOT NULL DEFAULT 0,
            comments         INTEGER NOT NULL DEFAULT 0,
            scraped_at       TEXT NOT NULL,
            source           TEXT NOT NULL,
            matched_keywords TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_posts_id ON posts(id);
        ",
    )?;
    Ok(())
}

/// Replace the table contents with `records`, keeping their order in `seq`.
pub fn replace_posts(conn: &Connection, records: &[CanonicalRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        tx.execute("DELETE FROM posts", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO posts
             (seq, id, url, author, title, company, location, text, likes, comments,
              scraped_at, source, matched_keywords)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        for (seq, r) in records.iter().enumerate() {
            let keywords = keywords_column(&r.matched_keywords)?;
            count += stmt.execute(rusqlite::params![
                seq as i64,
                r.id,
                r.url,
                r.author,
                r.title,
                r.company,
                r.location,
                r.text,
                clamp(r.likes),
                clamp(r.comments),
                r.scraped_at,
                r.source,
                keywords,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// `matched_keywords` is stored as a JSON array string.
fn keywords_column(keywords: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(keywords)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
