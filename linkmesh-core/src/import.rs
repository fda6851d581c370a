//! CSV corpus import.
//!
//! Header columns are auto-mapped case-insensitively: `url` and a content
//! column (`html_or_text`, `content`, or anything text/html-ish) are
//! required; title, meta fields, publish date and language are optional.
//! Duplicate URLs keep the first occurrence.

use chrono::{DateTime, NaiveDate, Utc};
use linkmesh_engine::error::{EngineError, Result};
use linkmesh_engine::model::PageRecord;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct ColumnMap {
    url: Option<usize>,
    title: Option<usize>,
    content: Option<usize>,
    meta_title: Option<usize>,
    meta_description: Option<usize>,
    pub_date: Option<usize>,
    language: Option<usize>,
}

pub fn load_pages_csv(path: &Path) -> Result<(Vec<PageRecord>, ImportStats)> {
    let text = fs::read_to_string(path)
        .map_err(|e| EngineError::Validation(format!("cannot read {}: {}", path.display(), e)))?;
    parse_pages_csv(&text)
}

pub fn parse_pages_csv(text: &str) -> Result<(Vec<PageRecord>, ImportStats)> {
    let mut rows = parse_csv(text).into_iter();
    let header = rows
        .next()
        .ok_or_else(|| EngineError::Validation("CSV file is empty".to_string()))?;
    let map = map_columns(&header)?;

    let mut stats = ImportStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let url = normalize_url(field(&row, map.url).trim());
        let content = field(&row, map.content).to_string();
        if url.is_empty() || content.trim().is_empty() {
            stats.skipped += 1;
            continue;
        }
        if !seen.insert(url.clone()) {
            stats.duplicates += 1;
            continue;
        }
        records.push(PageRecord {
            url,
            title: field(&row, map.title).trim().to_string(),
            content,
            meta_title: optional(&row, map.meta_title),
            meta_description: optional(&row, map.meta_description),
            publish_date: optional(&row, map.pub_date).and_then(|s| parse_date(&s)),
            language: optional(&row, map.language),
        });
        stats.total += 1;
    }

    Ok((records, stats))
}

fn field<'a>(row: &'a [String], index: Option<usize>) -> &'a str {
    index.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn optional(row: &[String], index: Option<usize>) -> Option<String> {
    let value = field(row, index).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn map_columns(header: &[String]) -> Result<ColumnMap> {
    let mut map = ColumnMap::default();
    for (i, raw) in header.iter().enumerate() {
        let name = raw.trim().to_lowercase();
        if name.contains("meta_title") {
            map.meta_title.get_or_insert(i);
        } else if name.contains("meta_description") {
            map.meta_description.get_or_insert(i);
        } else if name.contains("url") {
            map.url.get_or_insert(i);
        } else if name.contains("title") {
            map.title.get_or_insert(i);
        } else if name.contains("content") || name.contains("html") || name.contains("text") {
            map.content.get_or_insert(i);
        } else if name.contains("date") || name.contains("published") {
            map.pub_date.get_or_insert(i);
        } else if name.contains("lang") {
            map.language.get_or_insert(i);
        }
    }
    if map.url.is_none() {
        return Err(EngineError::Validation(
            "CSV is missing a url column".to_string(),
        ));
    }
    if map.content.is_none() {
        return Err(EngineError::Validation(
            "CSV is missing a content column (html_or_text)".to_string(),
        ));
    }
    Ok(map)
}

/// Exports often carry absolute URLs; the corpus is keyed by the
/// site-relative path.
fn normalize_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        match url::Url::parse(raw) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => String::new(),
        }
    } else {
        raw.to_string()
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Minimal CSV reader: comma-separated, double quotes with `""` escapes,
/// quoted fields may contain newlines.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => current.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut current));
                }
                '\n' => {
                    row.push(std::mem::take(&mut current));
                    rows.push(std::mem::take(&mut row));
                }
                '\r' => {}
                _ => current.push(c),
            }
        }
    }
    if !current.is_empty() || !row.is_empty() {
        row.push(current);
        rows.push(row);
    }
    rows
}
