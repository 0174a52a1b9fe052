use chrono::{DateTime, Datelike, Days, Duration, Local, NaiveDate, TimeZone, Timelike, Weekday};

use crate::model::TimeLogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    Today,
    ThisWeek,
    ThisMonth,
    All,
}

impl RangePreset {
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::ThisWeek => "This Week",
            Self::ThisMonth => "This Month",
            Self::All => "All",
        }
    }
}

/// Inclusive day range; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn for_preset(anchor: NaiveDate, preset: RangePreset) -> Self {
        match preset {
            RangePreset::Today => Self::between(anchor, anchor),
            RangePreset::ThisWeek => {
                let back = u64::from(anchor.weekday().num_days_from_monday());
                let start = anchor.checked_sub_days(Days::new(back)).unwrap_or(anchor);
                let end = start.checked_add_days(Days::new(6)).unwrap_or(anchor);
                Self::between(start, end)
            }
            RangePreset::ThisMonth => {
                let start = month_start(anchor);
                let end = add_months(start, 1)
                    .and_then(|next| next.checked_sub_days(Days::new(1)))
                    .unwrap_or(anchor);
                Self::between(start, end)
            }
            RangePreset::All => Self::all(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Local instants from midnight of `from` to midnight after `to`; `None` when unbounded.
    pub fn local_bounds(&self) -> Option<(DateTime<Local>, DateTime<Local>)> {
        let start = local_midnight(self.from?)?;
        let end = local_midnight(self.to?.succ_opt()?)?;
        Some((start, end))
    }

    pub fn label(&self) -> String {
        match (self.from, self.to) {
            (None, None) => RangePreset::All.label().to_owned(),
            (Some(from), Some(to)) if from == to => from.to_string(),
            (from, to) => format!(
                "{} to {}",
                from.map_or_else(|| "start".to_owned(), |d| d.to_string()),
                to.map_or_else(|| "now".to_owned(), |d| d.to_string())
            ),
        }
    }
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn add_months(month_start: NaiveDate, offset_months: i32) -> Option<NaiveDate> {
    let total_months = i64::from(month_start.year()) * 12
        + i64::from(month_start.month0())
        + i64::from(offset_months);
    let year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let month0 = u32::try_from(total_months.rem_euclid(12)).ok()?;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

fn local_date(entry: &TimeLogEntry) -> NaiveDate {
    entry.start_time.with_timezone(&Local).date_naive()
}

fn minutes(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 60_000.0
}

pub fn total_duration<'a>(logs: impl IntoIterator<Item = &'a TimeLogEntry>) -> Duration {
    logs.into_iter()
        .fold(Duration::zero(), |acc, entry| acc + entry.duration())
}

/// Logged time for entries starting on `date`, optionally for one task.
pub fn day_total(logs: &[TimeLogEntry], date: NaiveDate, task: Option<&str>) -> Duration {
    total_duration(logs.iter().filter(|entry| {
        local_date(entry) == date && task.map_or(true, |t| entry.task_text == t)
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallStats {
    pub total: Duration,
    pub days: usize,
    pub longest_session: Duration,
    pub peak_hour: Option<u32>,
    /// Minutes of work started in each hour of the day.
    pub hourly_minutes: [f64; 24],
}

pub fn overall_stats(logs: &[TimeLogEntry]) -> OverallStats {
    let mut days: Vec<NaiveDate> = logs.iter().map(local_date).collect();
    days.sort_unstable();
    days.dedup();

    let mut hourly_minutes = [0.0_f64; 24];
    for entry in logs {
        let hour = entry.start_time.hour() as usize;
        if let Some(slot) = hourly_minutes.get_mut(hour) {
            *slot += minutes(entry.duration());
        }
    }
    let peak_hour = hourly_minutes
        .iter()
        .enumerate()
        .filter(|(_, m)| **m > 0.0)
        .fold(None::<(usize, f64)>, |best, (hour, m)| match best {
            Some((_, best_m)) if best_m >= *m => best,
            _ => Some((hour, *m)),
        })
        .and_then(|(hour, _)| u32::try_from(hour).ok());

    OverallStats {
        total: total_duration(logs),
        days: days.len(),
        longest_session: logs
            .iter()
            .map(TimeLogEntry::duration)
            .max()
            .unwrap_or_else(Duration::zero),
        peak_hour,
        hourly_minutes,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskFocus {
    pub task: String,
    pub average_score: f64,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocusSummary {
    pub overall_average: f64,
    pub by_task: Vec<TaskFocus>,
}

/// Averages over rated sessions only; `None` when nothing is rated.
pub fn focus_summary(logs: &[TimeLogEntry]) -> Option<FocusSummary> {
    let rated: Vec<&TimeLogEntry> = logs.iter().filter(|e| e.is_rated()).collect();
    if rated.is_empty() {
        return None;
    }
    let overall_average = average_score(&rated);

    let mut by_task: Vec<TaskFocus> = group_by_first_seen(&rated, |e| e.task_text.clone())
        .into_iter()
        .map(|(task, group)| TaskFocus {
            task,
            average_score: average_score(&group),
            total: total_duration(group.iter().copied()),
        })
        .collect();
    by_task.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));

    Some(FocusSummary {
        overall_average,
        by_task,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTotal {
    pub task: String,
    pub total: Duration,
}

/// Per-task time for entries whose start day falls in `range`, largest first.
pub fn task_totals(logs: &[TimeLogEntry], range: DateRange) -> Vec<TaskTotal> {
    let in_range: Vec<&TimeLogEntry> = logs
        .iter()
        .filter(|e| range.contains(local_date(e)))
        .collect();
    let mut totals: Vec<TaskTotal> = group_by_first_seen(&in_range, |e| e.task_text.clone())
        .into_iter()
        .map(|(task, group)| TaskTotal {
            task,
            total: total_duration(group.iter().copied()),
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

pub const GOLDEN_TIME_MIN_RATED: usize = 3;
pub const WORK_REST_MIN_RATED: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct GoldenTime {
    pub weekday: Weekday,
    pub hour: u32,
    pub average_score: f64,
    /// Task with the most time in that slot.
    pub peak_task: Option<String>,
}

/// The weekday/hour slot with the best average focus score.
pub fn golden_time(logs: &[TimeLogEntry]) -> Option<GoldenTime> {
    let rated: Vec<&TimeLogEntry> = logs.iter().filter(|e| e.is_rated()).collect();
    if rated.len() < GOLDEN_TIME_MIN_RATED {
        return None;
    }

    let slots = group_by_first_seen(&rated, |e| (e.start_time.weekday(), e.start_time.hour()));
    let mut best: Option<((Weekday, u32), f64, Vec<&TimeLogEntry>)> = None;
    for (slot, group) in slots {
        let avg = average_score(&group);
        if best.as_ref().map_or(true, |(_, best_avg, _)| avg > *best_avg) {
            best = Some((slot, avg, group));
        }
    }
    let ((weekday, hour), average_score, group) = best?;

    let peak_task = group_by_first_seen(&group, |e| e.task_text.clone())
        .into_iter()
        .map(|(task, entries)| (task, total_duration(entries.iter().copied())))
        .fold(None::<(String, Duration)>, |acc, (task, total)| match acc {
            Some((_, best_total)) if best_total >= total => acc,
            _ => Some((task, total)),
        })
        .map(|(task, _)| task);

    Some(GoldenTime {
        weekday,
        hour,
        average_score,
        peak_task,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkRestPattern {
    /// Lower bound of the 15-minute work bucket.
    pub work_minutes: i64,
    /// Lower bound of the 5-minute rest bucket.
    pub rest_minutes: i64,
    pub average_next_score: f64,
}

/// Finds the work/rest bucket pair after which the next session was rated highest.
/// Only rests longer than 5 and at most 120 minutes count.
pub fn work_rest_pattern(logs: &[TimeLogEntry]) -> Option<WorkRestPattern> {
    let mut rated: Vec<&TimeLogEntry> = logs.iter().filter(|e| e.is_rated()).collect();
    if rated.len() < WORK_REST_MIN_RATED {
        return None;
    }
    rated.sort_by_key(|e| e.start_time);

    // (work bucket, rest bucket, next score)
    let samples: Vec<(i64, i64, u8)> = rated
        .windows(2)
        .filter_map(|pair| {
            let (current, next) = (pair.first()?, pair.get(1)?);
            let rest = next.start_time - current.end_time;
            let rest_min = minutes(rest);
            if rest_min > 5.0 && rest_min <= 120.0 {
                let work = current.duration().num_minutes() / 15 * 15;
                let rest = rest.num_minutes() / 5 * 5;
                Some((work, rest, next.focus_score))
            } else {
                None
            }
        })
        .collect();

    let mut best: Option<WorkRestPattern> = None;
    for (work, group) in group_by_first_seen(&samples, |s| s.0) {
        for (rest, sub) in group_by_first_seen(&group, |s| s.1) {
            let avg = sub.iter().map(|s| f64::from(s.2)).sum::<f64>() / sub.len() as f64;
            if best.as_ref().map_or(true, |b| avg > b.average_next_score) {
                best = Some(WorkRestPattern {
                    work_minutes: work,
                    rest_minutes: rest,
                    average_next_score: avg,
                });
            }
        }
    }
    best
}

fn average_score(entries: &[&TimeLogEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| f64::from(e.focus_score)).sum::<f64>() / entries.len() as f64
}

/// Groups preserving the order in which keys first appear.
fn group_by_first_seen<T, K, F>(items: &[T], key: F) -> Vec<(K, Vec<T>)>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, group)) => group.push(item.clone()),
            None => groups.push((k, vec![item.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32) -> DateTime<Local> {
        // March 2025: the 3rd is a Monday.
        Local.with_ymd_and_hms(2025, 3, day, h, m, 0).unwrap()
    }

    fn log(day: u32, h: u32, m: u32, minutes: i64, task: &str, score: u8) -> TimeLogEntry {
        let start = at(day, h, m);
        let mut e = TimeLogEntry::new(start, start + Duration::minutes(minutes), task);
        e.focus_score = score;
        e
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn bounds_span_whole_days() {
        let (start, end) = DateRange::between(date(4), date(3)).local_bounds().unwrap();
        assert_eq!(start, at(3, 0, 0));
        assert_eq!(end, at(5, 0, 0));
        assert!(DateRange::all().local_bounds().is_none());
        assert!(DateRange {
            from: Some(date(3)),
            to: None
        }
        .local_bounds()
        .is_none());
    }

    #[test]
    fn range_labels() {
        assert_eq!(DateRange::all().label(), "All");
        assert_eq!(DateRange::between(date(3), date(3)).label(), "2025-03-03");
        assert_eq!(
            DateRange::between(date(3), date(9)).label(),
            "2025-03-03 to 2025-03-09"
        );
        assert_eq!(RangePreset::ThisWeek.label(), "This Week");
    }

    #[test]
    fn presets_cover_expected_days() {
        let wednesday = date(5);
        let week = DateRange::for_preset(wednesday, RangePreset::ThisWeek);
        assert_eq!(week.from, Some(date(3)));
        assert_eq!(week.to, Some(date(9)));

        let month = DateRange::for_preset(wednesday, RangePreset::ThisMonth);
        assert_eq!(month.from, Some(date(1)));
        assert_eq!(month.to, Some(date(31)));

        assert!(DateRange::for_preset(wednesday, RangePreset::All).contains(date(1)));
        assert!(!DateRange::for_preset(wednesday, RangePreset::Today).contains(date(4)));
    }

    #[test]
    fn overall_stats_track_totals_and_peak() {
        let logs = vec![
            log(3, 9, 0, 30, "Math", 0),
            log(3, 14, 0, 90, "English", 0),
            log(4, 9, 10, 20, "Math", 0),
        ];
        let stats = overall_stats(&logs);
        assert_eq!(stats.total, Duration::minutes(140));
        assert_eq!(stats.days, 2);
        assert_eq!(stats.longest_session, Duration::minutes(90));
        assert_eq!(stats.peak_hour, Some(14));
        assert!((stats.hourly_minutes[9] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_logs_have_no_peak() {
        let stats = overall_stats(&[]);
        assert_eq!(stats.peak_hour, None);
        assert_eq!(stats.total, Duration::zero());
        assert!(focus_summary(&[]).is_none());
    }

    #[test]
    fn focus_summary_ignores_unrated() {
        let logs = vec![
            log(3, 9, 0, 30, "Math", 4),
            log(3, 10, 0, 30, "Math", 2),
            log(3, 11, 0, 30, "English", 5),
            log(3, 12, 0, 30, "English", 0),
        ];
        let summary = focus_summary(&logs).unwrap();
        assert!((summary.overall_average - 11.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.by_task[0].task, "English");
        assert_eq!(summary.by_task[0].total, Duration::minutes(30));
        assert!((summary.by_task[1].average_score - 3.0).abs() < 1e-9);
    }

    #[test]
    fn task_totals_respect_range() {
        let logs = vec![
            log(3, 9, 0, 30, "Math", 0),
            log(3, 10, 0, 45, "English", 0),
            log(10, 9, 0, 120, "Math", 0),
        ];
        let week = task_totals(&logs, DateRange::for_preset(date(5), RangePreset::ThisWeek));
        assert_eq!(week.len(), 2);
        assert_eq!(week[0].task, "English");

        let all = task_totals(&logs, DateRange::all());
        assert_eq!(all[0].task, "Math");
        assert_eq!(all[0].total, Duration::minutes(150));
        assert_eq!(day_total(&logs, date(3), Some("Math")), Duration::minutes(30));
        assert_eq!(day_total(&logs, date(3), None), Duration::minutes(75));
    }

    #[test]
    fn golden_time_needs_three_rated_sessions() {
        let mut logs = vec![log(3, 9, 0, 30, "Math", 5), log(4, 20, 0, 30, "Art", 2)];
        assert!(golden_time(&logs).is_none());

        logs.push(log(3, 9, 40, 10, "English", 5));
        let golden = golden_time(&logs).unwrap();
        assert_eq!(golden.weekday, Weekday::Mon);
        assert_eq!(golden.hour, 9);
        assert_eq!(golden.peak_task.as_deref(), Some("Math"));
        assert!((golden.average_score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn work_rest_pattern_picks_best_bucket() {
        let logs = vec![
            log(3, 8, 0, 50, "A", 3),
            // 10 minute rest after 50 minutes of work
            log(3, 9, 0, 50, "A", 5),
            // 60 minute rest
            log(3, 10, 50, 20, "A", 2),
            // 3 minute rest is ignored
            log(3, 11, 13, 20, "A", 1),
            // 200 minute rest is ignored
            log(3, 14, 53, 20, "A", 4),
        ];
        let pattern = work_rest_pattern(&logs).unwrap();
        assert_eq!(pattern.work_minutes, 45);
        assert_eq!(pattern.rest_minutes, 10);
        assert!((pattern.average_next_score - 5.0).abs() < 1e-9);

        assert!(work_rest_pattern(&logs[..4]).is_none());
    }
}
