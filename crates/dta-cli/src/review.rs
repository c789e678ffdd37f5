//! Reading back transfer logs.

use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Rows per page when `--page-size` is not given
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// A yearly log loaded into memory, newest row first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LogTable {
    /// Load a quoted CSV log. The header row is taken from the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open log {}", path.display()))?;

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        rows.reverse();

        Ok(Self { headers, rows })
    }

    /// Load several logs as one table, newest row first across all of them.
    /// Headers come from the first log.
    pub fn load_all(paths: &[PathBuf]) -> anyhow::Result<Self> {
        let mut merged = Self::default();
        for path in paths {
            let table = Self::load(path)?;
            if merged.headers.is_empty() {
                merged.headers = table.headers;
            }
            merged.rows.extend(table.rows);
        }

        if paths.len() > 1
            && let Some(column) = merged.column("Timestamp")
        {
            merged
                .rows
                .sort_by(|a, b| b.get(column).cmp(&a.get(column)));
        }
        Ok(merged)
    }

    /// Index of the column named `name`, case-insensitively
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Rows where any field contains `query`, ignoring case. An empty query
    /// matches everything.
    pub fn filter(&self, query: &str) -> Vec<&[String]> {
        let needle = query.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|row| needle.is_empty() || row.iter().any(|field| field.to_lowercase().contains(&needle)))
            .map(Vec::as_slice)
            .collect()
    }
}

/// One page of `items`, with 1-based `page` clamped to the valid range.
/// Returns the page, the page number actually shown and the page count.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], usize, usize) {
    let page_size = page_size.max(1);
    let pages = items.len().div_ceil(page_size).max(1);
    let page = page.clamp(1, pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(items.len());
    (&items[start.min(end)..end], page, pages)
}

/// Years that have a `<year>` directory or a matching log under
/// `output_folder`, oldest first.
pub fn available_years(output_folder: &Path, log_template: &str) -> anyhow::Result<Vec<i32>> {
    let mut years = BTreeSet::new();
    let entries = match std::fs::read_dir(output_folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", output_folder.display())),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let year = if entry.file_type()?.is_dir() {
            parse_year(&name)
        } else {
            year_from_log_name(&name, log_template)
        };
        if let Some(year) = year {
            years.insert(year);
        }
    }

    Ok(years.into_iter().collect())
}

/// Logs under `output_folder` named after `log_template` for `year`, in
/// name order. Templates with tokens besides `{year}` (a username, say) may
/// match several files. Without a `{year}` token every matching log is
/// returned.
pub fn log_paths_for_year(output_folder: &Path, log_template: &str, year: i32) -> anyhow::Result<Vec<PathBuf>> {
    let pieces = template_pieces(log_template);
    let entries = match std::fs::read_dir(output_folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", output_folder.display())),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match match_pieces(&pieces, &name) {
            Some(Some(found)) if found == year => paths.push(entry.path()),
            Some(None) => paths.push(entry.path()),
            _ => {}
        }
    }

    paths.sort();
    Ok(paths)
}

fn parse_year(name: &str) -> Option<i32> {
    if name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}

/// Extract the year from a log named after `template`, e.g.
/// `TransferLog_jdoe_2024.log` for `TransferLog_{username}_{year}.log`.
fn year_from_log_name(name: &str, template: &str) -> Option<i32> {
    match_pieces(&template_pieces(template), name)?
}

#[derive(Debug, PartialEq)]
enum Piece {
    Literal(String),
    Year,
    Any,
}

/// Split a log name template into literal text and tokens
fn template_pieces(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        if open > 0 {
            pieces.push(Piece::Literal(rest[..open].to_string()));
        }
        let token = &rest[open + 1..open + close];
        pieces.push(if token.eq_ignore_ascii_case("year") {
            Piece::Year
        } else {
            Piece::Any
        });
        rest = &rest[open + close + 1..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest.to_string()));
    }
    pieces
}

/// Match `name` against template pieces. `None` when it does not match;
/// otherwise the year it carries, if the template has one.
fn match_pieces(pieces: &[Piece], name: &str) -> Option<Option<i32>> {
    let Some((first, rest)) = pieces.split_first() else {
        return name.is_empty().then_some(None);
    };

    match first {
        Piece::Literal(text) => match_pieces(rest, name.strip_prefix(text.as_str())?),
        Piece::Year => {
            let digits = name.get(..4)?;
            let year = parse_year(digits)?;
            let tail = match_pieces(rest, &name[4..])?;
            Some(tail.or(Some(year)))
        }
        Piece::Any => name
            .char_indices()
            .map(|(at, _)| at)
            .chain(std::iter::once(name.len()))
            .find_map(|at| match_pieces(rest, &name[at..])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_log(dir: &Path) -> PathBuf {
        let path = dir.join("TransferLog_2025.log");
        std::fs::write(
            &path,
            concat!(
                "\"Timestamp\",\"Username\",\"Media Type\",\"File Log\"\n",
                "\"2025-01-02 10:00:00\",\"jdoe\",\"DVD\",\"a.csv\"\n",
                "\"2025-02-03 11:00:00\",\"asmith\",\"Flash\",\"b.csv\"\n",
                "\"2025-03-04 12:00:00\",\"JDoe\",\"HDD\",\"c.csv\"\n",
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_is_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let table = LogTable::load(&write_log(temp_dir.path())).unwrap();

        assert_eq!(table.headers.len(), 4);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][3], "c.csv");
        assert_eq!(table.column("file log"), Some(3));
        assert_eq!(table.column("Purpose"), None);
    }

    #[test]
    fn test_filter_is_case_insensitive_over_all_columns() {
        let temp_dir = TempDir::new().unwrap();
        let table = LogTable::load(&write_log(temp_dir.path())).unwrap();

        assert_eq!(table.filter("JDOE").len(), 2);
        assert_eq!(table.filter("flash").len(), 1);
        assert_eq!(table.filter("2025-03").len(), 1);
        assert_eq!(table.filter("").len(), 3);
        assert!(table.filter("nothing").is_empty());
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=60).collect();

        let (page, shown, pages) = paginate(&items, 1, DEFAULT_PAGE_SIZE);
        assert_eq!((page.len(), shown, pages), (25, 1, 3));

        let (page, shown, _) = paginate(&items, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(page, &items[50..]);
        assert_eq!(shown, 3);

        let (page, shown, _) = paginate(&items, 99, DEFAULT_PAGE_SIZE);
        assert_eq!(shown, 3);
        assert_eq!(page.len(), 10);

        let empty: Vec<u32> = Vec::new();
        let (page, shown, pages) = paginate(&empty, 0, 0);
        assert!(page.is_empty());
        assert_eq!((shown, pages), (1, 1));
    }

    #[test]
    fn test_available_years() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("2023")).unwrap();
        std::fs::create_dir(temp_dir.path().join("drafts")).unwrap();
        write_log(temp_dir.path());
        std::fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        let years = available_years(temp_dir.path(), "TransferLog_{year}.log").unwrap();
        assert_eq!(years, vec![2023, 2025]);

        let missing = available_years(&temp_dir.path().join("absent"), "TransferLog_{year}.log").unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_load_all_merges_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let first = write_log(temp_dir.path());
        let second = temp_dir.path().join("TransferLog_other_2025.log");
        std::fs::write(
            &second,
            concat!(
                "\"Timestamp\",\"Username\",\"Media Type\",\"File Log\"\n",
                "\"2025-02-15 09:00:00\",\"other\",\"CD\",\"d.csv\"\n",
            ),
        )
        .unwrap();

        let table = LogTable::load_all(&[first, second]).unwrap();

        let logs: Vec<&str> = table.rows.iter().map(|r| r[3].as_str()).collect();
        assert_eq!(logs, vec!["c.csv", "d.csv", "b.csv", "a.csv"]);
        assert_eq!(table.headers.len(), 4);
    }

    #[test]
    fn test_log_paths_for_year_with_extra_tokens() {
        let temp_dir = TempDir::new().unwrap();
        let template = "TransferLog_{username}_{year}.log";
        for name in [
            "TransferLog_jdoe_2024.log",
            "TransferLog_asmith_2024.log",
            "TransferLog_jdoe_2023.log",
            "TransferLog_2024.txt",
            "notes.txt",
        ] {
            std::fs::write(temp_dir.path().join(name), "").unwrap();
        }

        let paths = log_paths_for_year(temp_dir.path(), template, 2024).unwrap();
        assert_eq!(
            paths,
            vec![
                temp_dir.path().join("TransferLog_asmith_2024.log"),
                temp_dir.path().join("TransferLog_jdoe_2024.log"),
            ]
        );

        assert_eq!(available_years(temp_dir.path(), template).unwrap(), vec![2023, 2024]);
        assert!(log_paths_for_year(temp_dir.path(), template, 1999).unwrap().is_empty());
        assert!(log_paths_for_year(&temp_dir.path().join("absent"), template, 2024).unwrap().is_empty());
    }

    #[test]
    fn test_year_from_log_name() {
        assert_eq!(year_from_log_name("TransferLog_2024.log", "TransferLog_{year}.log"), Some(2024));
        assert_eq!(year_from_log_name("transfers-2024-jdoe.csv", "transfers-{YEAR}-{username}.csv"), Some(2024));
        assert_eq!(year_from_log_name("Log_20x4.log", "Log_{year}.log"), None);
        assert_eq!(year_from_log_name("Log_2024.log", "Log.log"), None);
        assert_eq!(year_from_log_name("Log.log", "Log.log"), None);
    }
}
