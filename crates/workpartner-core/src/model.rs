use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

pub const MAX_FOCUS_SCORE: u8 = 5;

/// One finished work session. `focus_score == 0` means the user has not rated it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub task_text: String,
    #[serde(default)]
    pub focus_score: u8,
    #[serde(default)]
    pub break_activities: Vec<String>,
}

impl TimeLogEntry {
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, task_text: &str) -> Self {
        Self {
            id: None,
            start_time,
            end_time,
            task_text: task_text.to_owned(),
            focus_score: 0,
            break_activities: Vec::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn is_rated(&self) -> bool {
        self.focus_score > 0
    }

    /// Overlap with `[start, end)`, zero when disjoint.
    pub fn overlap_with(&self, start: DateTime<Local>, end: DateTime<Local>) -> Duration {
        let lo = self.start_time.max(start);
        let hi = self.end_time.min(end);
        if hi > lo {
            hi - lo
        } else {
            Duration::zero()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub text: String,
}

impl TaskItem {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.text.to_lowercase() == name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, h, m, s).unwrap()
    }

    #[test]
    fn duration_is_end_minus_start() {
        let entry = TimeLogEntry::new(at(9, 0, 0), at(9, 25, 30), "Math");
        assert_eq!(entry.duration(), Duration::seconds(25 * 60 + 30));
        assert!(!entry.is_rated());
    }

    #[test]
    fn overlap_clips_to_window() {
        let entry = TimeLogEntry::new(at(9, 0, 0), at(10, 0, 0), "Math");
        assert_eq!(entry.overlap_with(at(9, 50, 0), at(10, 10, 0)), Duration::minutes(10));
        assert_eq!(entry.overlap_with(at(10, 0, 0), at(11, 0, 0)), Duration::zero());
    }

    #[test]
    fn task_match_ignores_case() {
        assert!(TaskItem::new("English").matches("ENGLISH"));
        assert!(!TaskItem::new("English").matches("Engl"));
    }
}
