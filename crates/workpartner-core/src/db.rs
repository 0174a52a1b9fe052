use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, LocalResult, TimeZone};
use rusqlite::backup::Backup;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::model::{TimeLogEntry, MAX_FOCUS_SCORE};

/// SQLite-backed ledger of finished sessions.
pub struct TimeLogDb {
    conn: Connection,
}

impl TimeLogDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "\
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            CREATE TABLE IF NOT EXISTS time_logs (
              id INTEGER PRIMARY KEY,
              start_ms INTEGER NOT NULL,
              end_ms INTEGER NOT NULL CHECK (end_ms >= start_ms),
              task_text TEXT NOT NULL,
              focus_score INTEGER NOT NULL DEFAULT 0 CHECK (focus_score BETWEEN 0 AND 5),
              break_activities TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_time_logs_start ON time_logs(start_ms);
            CREATE INDEX IF NOT EXISTS idx_time_logs_task ON time_logs(task_text);",
        )?;
        Ok(Self { conn })
    }

    /// Stores the entry and returns its row id. Empty or inverted spans are rejected.
    pub fn insert(&mut self, entry: &TimeLogEntry) -> Result<i64> {
        validate(entry)?;
        self.conn.execute(
            "\
            INSERT INTO time_logs (start_ms, end_ms, task_text, focus_score, break_activities)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.start_time.timestamp_millis(),
                entry.end_time.timestamp_millis(),
                entry.task_text,
                entry.focus_score,
                encode_breaks(&entry.break_activities),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_many(&mut self, entries: &[TimeLogEntry]) -> Result<usize> {
        for entry in entries {
            validate(entry)?;
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "\
                INSERT INTO time_logs (start_ms, end_ms, task_text, focus_score, break_activities)
                VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.start_time.timestamp_millis(),
                    entry.end_time.timestamp_millis(),
                    entry.task_text,
                    entry.focus_score,
                    encode_breaks(&entry.break_activities),
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn get(&self, id: i64) -> Result<TimeLogEntry> {
        self.conn
            .query_row(
                "\
                SELECT id, start_ms, end_ms, task_text, focus_score, break_activities
                FROM time_logs WHERE id = ?1",
                params![id],
                entry_from_row,
            )
            .optional()?
            .ok_or(Error::LogNotFound { id })
    }

    /// All entries, newest first.
    pub fn list_all(&self) -> Result<Vec<TimeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "\
            SELECT id, start_ms, end_ms, task_text, focus_score, break_activities
            FROM time_logs
            ORDER BY start_ms DESC, id DESC",
        )?;
        let rows = stmt.query_map([], entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Entries starting within `[start, end)`, oldest first.
    pub fn list_started_between(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Vec<TimeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "\
            SELECT id, start_ms, end_ms, task_text, focus_score, break_activities
            FROM time_logs
            WHERE start_ms >= ?1 AND start_ms < ?2
            ORDER BY start_ms ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![start.timestamp_millis(), end.timestamp_millis()],
            entry_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Replaces span, task and score of an existing entry.
    pub fn update(&mut self, id: i64, entry: &TimeLogEntry) -> Result<()> {
        validate(entry)?;
        let changed = self.conn.execute(
            "\
            UPDATE time_logs
            SET start_ms = ?1, end_ms = ?2, task_text = ?3, focus_score = ?4, break_activities = ?5
            WHERE id = ?6",
            params![
                entry.start_time.timestamp_millis(),
                entry.end_time.timestamp_millis(),
                entry.task_text,
                entry.focus_score,
                encode_breaks(&entry.break_activities),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::LogNotFound { id });
        }
        Ok(())
    }

    pub fn rate(&mut self, id: i64, score: u8, break_activities: &[String]) -> Result<()> {
        if score > MAX_FOCUS_SCORE {
            return Err(Error::InvalidFocusScore { score });
        }
        let changed = self.conn.execute(
            "UPDATE time_logs SET focus_score = ?1, break_activities = ?2 WHERE id = ?3",
            params![score, encode_breaks(break_activities), id],
        )?;
        if changed == 0 {
            return Err(Error::LogNotFound { id });
        }
        Ok(())
    }

    pub fn delete(&mut self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM time_logs WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::LogNotFound { id });
        }
        Ok(())
    }

    /// Rewrites the task name on every matching entry; returns how many changed.
    pub fn rename_task(&mut self, old: &str, new: &str) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE time_logs SET task_text = ?1 WHERE task_text = ?2",
            params![new, old],
        )?;
        Ok(changed)
    }

    /// Assigns `task` to every entry overlapping `[start, end)`.
    pub fn reassign_overlapping(
        &mut self,
        start: DateTime<Local>,
        end: DateTime<Local>,
        task: &str,
    ) -> Result<usize> {
        if end <= start {
            return Err(Error::InvalidRange);
        }
        let changed = self.conn.execute(
            "\
            UPDATE time_logs
            SET task_text = ?1
            WHERE start_ms < ?3 AND end_ms > ?2",
            params![task, start.timestamp_millis(), end.timestamp_millis()],
        )?;
        Ok(changed)
    }

    pub fn latest_unrated(&self) -> Result<Option<TimeLogEntry>> {
        Ok(self
            .conn
            .query_row(
                "\
                SELECT id, start_ms, end_ms, task_text, focus_score, break_activities
                FROM time_logs
                WHERE focus_score = 0
                ORDER BY end_ms DESC, id DESC
                LIMIT 1",
                [],
                entry_from_row,
            )
            .optional()?)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM time_logs", [], |row| row.get(0))?)
    }

    /// Online copy of the whole ledger to `dest`.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let mut dst = Connection::open(dest)?;
        let backup = Backup::new(&self.conn, &mut dst)?;
        backup.run_to_completion(256, Duration::from_millis(10), None)?;
        Ok(())
    }
}

fn validate(entry: &TimeLogEntry) -> Result<()> {
    if entry.end_time <= entry.start_time {
        return Err(Error::InvalidRange);
    }
    if entry.focus_score > MAX_FOCUS_SCORE {
        return Err(Error::InvalidFocusScore {
            score: entry.focus_score,
        });
    }
    Ok(())
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeLogEntry> {
    let breaks: String = row.get(5)?;
    Ok(TimeLogEntry {
        id: Some(row.get(0)?),
        start_time: local_from_millis(row.get(1)?),
        end_time: local_from_millis(row.get(2)?),
        task_text: row.get(3)?,
        focus_score: row.get(4)?,
        break_activities: serde_json::from_str(&breaks).unwrap_or_default(),
    })
}

fn encode_breaks(breaks: &[String]) -> String {
    serde_json::to_string(breaks).unwrap_or_else(|_| "[]".to_owned())
}

fn local_from_millis(ms: i64) -> DateTime<Local> {
    match Local.timestamp_millis_opt(ms) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => DateTime::<Local>::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::tempdir;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap()
    }

    fn entry(start: DateTime<Local>, minutes: i64, task: &str) -> TimeLogEntry {
        TimeLogEntry::new(start, start + ChronoDuration::minutes(minutes), task)
    }

    #[test]
    fn insert_and_read_back() {
        let mut db = TimeLogDb::open_in_memory().unwrap();
        let mut e = entry(at(9, 0), 30, "Math");
        e.break_activities = vec!["walk".to_owned()];
        let id = db.insert(&e).unwrap();

        let stored = db.get(id).unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.start_time, e.start_time);
        assert_eq!(stored.end_time, e.end_time);
        assert_eq!(stored.break_activities, vec!["walk".to_owned()]);
    }

    #[test]
    fn rejects_empty_span_and_bad_score() {
        let mut db = TimeLogDb::open_in_memory().unwrap();
        assert!(matches!(
            db.insert(&entry(at(9, 0), 0, "Math")),
            Err(Error::InvalidRange)
        ));
        let id = db.insert(&entry(at(9, 0), 5, "Math")).unwrap();
        assert!(matches!(
            db.rate(id, 6, &[]),
            Err(Error::InvalidFocusScore { score: 6 })
        ));
        assert!(matches!(db.rate(999, 3, &[]), Err(Error::LogNotFound { id: 999 })));
    }

    #[test]
    fn rename_touches_only_matching_task() {
        let mut db = TimeLogDb::open_in_memory().unwrap();
        db.insert(&entry(at(9, 0), 30, "Math")).unwrap();
        db.insert(&entry(at(10, 0), 30, "Math")).unwrap();
        db.insert(&entry(at(11, 0), 30, "English")).unwrap();

        assert_eq!(db.rename_task("Math", "Calculus").unwrap(), 2);
        let tasks: Vec<String> = db.list_all().unwrap().into_iter().map(|e| e.task_text).collect();
        assert_eq!(tasks, vec!["English", "Calculus", "Calculus"]);
    }

    #[test]
    fn reassign_hits_overlapping_entries() {
        let mut db = TimeLogDb::open_in_memory().unwrap();
        db.insert(&entry(at(9, 0), 30, "A")).unwrap();
        db.insert(&entry(at(9, 45), 30, "B")).unwrap();
        db.insert(&entry(at(11, 0), 30, "C")).unwrap();

        assert_eq!(db.reassign_overlapping(at(9, 20), at(10, 0), "Z").unwrap(), 2);
        let day = db.list_started_between(at(0, 0), at(23, 59)).unwrap();
        let tasks: Vec<&str> = day.iter().map(|e| e.task_text.as_str()).collect();
        assert_eq!(tasks, vec!["Z", "Z", "C"]);
    }

    #[test]
    fn latest_unrated_skips_rated() {
        let mut db = TimeLogDb::open_in_memory().unwrap();
        let first = db.insert(&entry(at(9, 0), 30, "A")).unwrap();
        let second = db.insert(&entry(at(10, 0), 30, "B")).unwrap();
        db.rate(second, 4, &["stretch".to_owned()]).unwrap();

        let unrated = db.latest_unrated().unwrap().unwrap();
        assert_eq!(unrated.id, Some(first));
        db.delete(first).unwrap();
        assert!(db.latest_unrated().unwrap().is_none());
    }

    #[test]
    fn backup_copies_rows() {
        let dir = tempdir().unwrap();
        let mut db = TimeLogDb::open(&dir.path().join("timelogs.db")).unwrap();
        db.insert(&entry(at(9, 0), 30, "A")).unwrap();

        let dest = dir.path().join("backup").join("copy.db");
        db.backup_to(&dest).unwrap();
        let copy = TimeLogDb::open(&dest).unwrap();
        assert_eq!(copy.count().unwrap(), 1);
    }
}
