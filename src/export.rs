//! Tabular exports of canonical records: CSV and an Excel workbook.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use crate::error::{PipelineError, Result};
use crate::record::{CanonicalRecord, COLUMNS};
use crate::stage::ensure_parent;

/// Spreadsheet apps need the BOM to pick UTF-8.
const BOM: &str = "\u{feff}";
const KEYWORD_SEP: &str = "; ";
const SHEET_NAME: &str = "posts";

pub fn write_csv(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut w = BufWriter::new(file);
    write_records(&mut w, records)
        .and_then(|_| w.flush())
        .map_err(|e| PipelineError::io(path, e))
}

pub fn write_records<W: Write>(mut w: W, records: &[CanonicalRecord]) -> io::Result<()> {
    write!(w, "{}", BOM)?;
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    write_row(&mut w, &header)?;
    for rec in records {
        write_row(&mut w, &to_row(rec))?;
    }
    Ok(())
}

/// One cell per column, in [`COLUMNS`] order. Null is an empty cell.
fn to_row(rec: &CanonicalRecord) -> Vec<String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        opt(&rec.id),
        opt(&rec.url),
        opt(&rec.author),
        opt(&rec.title),
        opt(&rec.company),
        opt(&rec.location),
        rec.text.clone(),
        rec.likes.to_string(),
        rec.comments.to_string(),
        rec.scraped_at.clone(),
        rec.source.clone(),
        rec.matched_keywords.join(KEYWORD_SEP),
    ]
}

/// Single-sheet workbook: bold header row, then one row per record. Counts
/// are numeric cells, everything else is text; nulls are left blank.
pub fn write_xlsx(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    ensure_parent(path)?;

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, rec) in records.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, cell) in to_row(rec).iter().enumerate() {
            let c = col as u16;
            match COLUMNS[col] {
                "likes" => sheet.write_number(row, c, rec.likes as f64)?,
                "comments" => sheet.write_number(row, c, rec.comments as f64)?,
                _ if cell.is_empty() => continue,
                _ => sheet.write_string(row, c, cell)?,
            };
        }
    }
    sheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
