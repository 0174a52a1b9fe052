//! CSV export and import of the time-log ledger.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{Error, Result};
use crate::model::{TimeLogEntry, MAX_FOCUS_SCORE};

const EXPORT_HEADER: [&str; 7] = [
    "id",
    "start",
    "end",
    "duration_secs",
    "task",
    "focus_score",
    "break_activities",
];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BREAK_SEPARATOR: &str = ";";

pub fn export_csv<W: Write>(writer: W, logs: &[TimeLogEntry]) -> Result<usize> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(EXPORT_HEADER)?;
    for entry in logs {
        out.write_record([
            entry.id.map(|id| id.to_string()).unwrap_or_default(),
            entry.start_time.format(DATETIME_FORMAT).to_string(),
            entry.end_time.format(DATETIME_FORMAT).to_string(),
            entry.duration().num_seconds().to_string(),
            entry.task_text.clone(),
            entry.focus_score.to_string(),
            entry.break_activities.join(BREAK_SEPARATOR),
        ])?;
    }
    out.flush().map_err(|err| Error::Csv(err.into()))?;
    Ok(logs.len())
}

pub fn export_csv_file(path: &Path, logs: &[TimeLogEntry]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    let file = std::fs::File::create(path).map_err(|err| Error::io(path, err))?;
    export_csv(std::io::BufWriter::new(file), logs)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub entries: Vec<TimeLogEntry>,
    pub total_rows: usize,
    pub skipped_rows: usize,
}

struct ImportColumns {
    start: usize,
    end: Option<usize>,
    duration: Option<usize>,
    task: usize,
    focus_score: Option<usize>,
    break_activities: Option<usize>,
}

impl ImportColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let missing = |what: &str| Error::ImportFormat {
            reason: format!("missing required column: {what}"),
        };
        let start = find_header_index(headers, &["start", "starttime", "startlocal"])
            .ok_or_else(|| missing("start"))?;
        let task = find_header_index(headers, &["task", "tasktext", "subject"])
            .ok_or_else(|| missing("task"))?;
        let end = find_header_index(headers, &["end", "endtime", "endlocal"]);
        let duration = find_header_index(headers, &["durationsecs", "duration", "seconds"]);
        if end.is_none() && duration.is_none() {
            return Err(missing("end or duration_secs"));
        }
        Ok(Self {
            start,
            end,
            duration,
            task,
            focus_score: find_header_index(headers, &["focusscore", "focus", "score"]),
            break_activities: find_header_index(headers, &["breakactivities", "breaks"]),
        })
    }
}

/// Rows that cannot be parsed are counted and skipped; ids are never imported.
pub fn import_csv<R: Read>(reader: R) -> Result<ImportReport> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let columns = ImportColumns::from_headers(&headers)?;

    let mut report = ImportReport::default();
    for (row_idx, row) in reader.records().enumerate() {
        report.total_rows += 1;
        let parsed = match row {
            Ok(row) => parse_row(&row, &columns),
            Err(err) => {
                tracing::warn!(row = row_idx + 2, error = %err, "unreadable CSV row");
                None
            }
        };
        match parsed {
            Some(entry) => report.entries.push(entry),
            None => report.skipped_rows += 1,
        }
    }
    Ok(report)
}

pub fn import_csv_file(path: &Path) -> Result<ImportReport> {
    let file = std::fs::File::open(path).map_err(|err| Error::io(path, err))?;
    import_csv(std::io::BufReader::new(file))
}

fn parse_row(record: &StringRecord, columns: &ImportColumns) -> Option<TimeLogEntry> {
    let start = record_text(record, Some(columns.start)).and_then(parse_local_datetime)?;
    let end = record_text(record, columns.end)
        .and_then(parse_local_datetime)
        .or_else(|| {
            record_text(record, columns.duration)
                .and_then(|secs| secs.parse::<f64>().ok())
                .filter(|secs| secs.is_finite())
                .and_then(|secs| Duration::try_milliseconds((secs * 1000.0).round() as i64))
                .and_then(|span| start.checked_add_signed(span))
        })?;
    if end <= start {
        return None;
    }
    let task = record_text(record, Some(columns.task))?;

    let focus_score = match record_text(record, columns.focus_score) {
        Some(text) => text.parse::<u8>().ok().filter(|s| *s <= MAX_FOCUS_SCORE)?,
        None => 0,
    };
    let break_activities = record_text(record, columns.break_activities)
        .map(|text| {
            text.split(BREAK_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let mut entry = TimeLogEntry::new(start, end, task);
    entry.focus_score = focus_score;
    entry.break_activities = break_activities;
    Some(entry)
}

fn find_header_index(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    let wanted: HashSet<String> = aliases.iter().map(|a| normalize_header_key(a)).collect();
    headers
        .iter()
        .position(|header| wanted.contains(&normalize_header_key(header)))
}

fn normalize_header_key(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn record_text(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Accepts RFC 3339 or local `YYYY-MM-DD HH:MM[:SS]` style timestamps.
pub fn parse_local_datetime(value: &str) -> Option<DateTime<Local>> {
    const FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }
    FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(value, format).ok()?;
        match Local.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(a, b) => Some(a.min(b)),
            LocalResult::None => None,
        }
    })
}
