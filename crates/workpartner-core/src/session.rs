//! Work-session stopwatch driven by one tick per poll.
//!
//! ```text
//! Stopped --trackable + task--> Running --idle > timeout--> PausedForIdle
//!    ^                            |  ^                         |     |
//!    |        distraction/unknown |  +------ input resumes ----+     |
//!    +----------------------------+<------- grace elapsed -----------+
//! ```
//!
//! Every transition into `Stopped` finalizes the session and yields at most one
//! [`TimeLogEntry`]; sessions shorter than the minimum duration are dropped.

use chrono::{DateTime, Duration, Local};

use crate::classifier::ActivityClass;
use crate::model::TimeLogEntry;
use crate::settings::AppSettings;

pub const IDLE_GRACE_SECS: i64 = 10;
pub const MIN_SESSION_SECS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub idle_detection: bool,
    pub idle_timeout: Duration,
    pub grace: Duration,
    pub min_duration: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl SessionPolicy {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let timeout_secs = i64::try_from(settings.idle_timeout_seconds).unwrap_or(i64::MAX / 1000);
        Self {
            idle_detection: settings.is_idle_detection_enabled,
            idle_timeout: Duration::seconds(timeout_secs),
            grace: Duration::seconds(IDLE_GRACE_SECS),
            min_duration: Duration::seconds(MIN_SESSION_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
    PausedForIdle,
}

#[derive(Debug, Clone)]
pub struct SessionStopwatch {
    policy: SessionPolicy,
    state: SessionState,
    task: Option<String>,
    session_start: Option<DateTime<Local>>,
    accumulated: Duration,
    run_started: Option<DateTime<Local>>,
    paused_at: Option<DateTime<Local>>,
}

impl SessionStopwatch {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            state: SessionState::Stopped,
            task: None,
            session_start: None,
            accumulated: Duration::zero(),
            run_started: None,
            paused_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn session_start(&self) -> Option<DateTime<Local>> {
        self.session_start
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Takes effect from the next tick; an open session keeps running.
    pub fn set_policy(&mut self, policy: SessionPolicy) {
        self.policy = policy;
    }

    /// Active time of the current session, idle pauses excluded.
    pub fn elapsed(&self, now: DateTime<Local>) -> Duration {
        match (self.state, self.run_started) {
            (SessionState::Running, Some(run_started)) if now > run_started => {
                self.accumulated + (now - run_started)
            }
            _ => self.accumulated,
        }
    }

    /// Switching to a different task closes the session of the previous one.
    pub fn select_task(&mut self, task: Option<&str>, now: DateTime<Local>) -> Option<TimeLogEntry> {
        if self.task.as_deref() == task {
            return None;
        }
        let finished = self.finalize(now);
        self.task = task.map(str::to_owned);
        finished
    }

    /// Renames the selected task in place without closing the session.
    pub fn rename_task(&mut self, old: &str, new: &str) {
        if self.task.as_deref() == Some(old) {
            self.task = Some(new.to_owned());
        }
    }

    pub fn tick(
        &mut self,
        now: DateTime<Local>,
        class: ActivityClass,
        idle: Duration,
    ) -> Option<TimeLogEntry> {
        if !class.is_trackable() {
            return self.finalize(now);
        }

        let is_idle = self.policy.idle_detection
            && class != ActivityClass::Passive
            && idle > self.policy.idle_timeout;

        match (self.state, is_idle) {
            (SessionState::Running, true) => {
                self.pause(now, idle);
                None
            }
            (SessionState::PausedForIdle, true) => {
                let paused_at = self.paused_at.unwrap_or(now);
                if now - paused_at > self.policy.grace {
                    self.finalize(now)
                } else {
                    None
                }
            }
            (SessionState::PausedForIdle, false) => {
                self.state = SessionState::Running;
                self.run_started = Some(now);
                self.paused_at = None;
                None
            }
            (SessionState::Stopped, false) => {
                if self.task.is_some() {
                    self.state = SessionState::Running;
                    self.session_start = Some(now);
                    self.run_started = Some(now);
                    self.accumulated = Duration::zero();
                }
                None
            }
            (SessionState::Stopped, true) | (SessionState::Running, false) => None,
        }
    }

    /// Closes the session (if any) and returns its entry when it lasted long enough.
    pub fn finalize(&mut self, now: DateTime<Local>) -> Option<TimeLogEntry> {
        if self.state == SessionState::Stopped {
            return None;
        }
        let elapsed = self.elapsed(now);
        let entry = match (self.session_start, self.task.as_deref()) {
            (Some(start), Some(task)) if elapsed >= self.policy.min_duration => {
                Some(TimeLogEntry::new(start, start + elapsed, task))
            }
            _ => None,
        };
        self.reset();
        entry
    }

    fn pause(&mut self, now: DateTime<Local>, idle: Duration) {
        let run_started = self.run_started.unwrap_or(now);
        // Stop the clock where input ceased, not where the timeout fired.
        let cutoff = (now - idle).max(run_started).min(now);
        self.accumulated = self.accumulated + (cutoff - run_started);
        self.run_started = None;
        self.paused_at = Some(now);
        self.state = SessionState::PausedForIdle;
    }

    fn reset(&mut self) {
        self.state = SessionState::Stopped;
        self.session_start = None;
        self.accumulated = Duration::zero();
        self.run_started = None;
        self.paused_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn t(secs: i64) -> DateTime<Local> {
        base() + Duration::seconds(secs)
    }

    fn policy(timeout_secs: i64) -> SessionPolicy {
        SessionPolicy {
            idle_detection: true,
            idle_timeout: Duration::seconds(timeout_secs),
            grace: Duration::seconds(IDLE_GRACE_SECS),
            min_duration: Duration::seconds(MIN_SESSION_SECS),
        }
    }

    fn running(task: &str) -> SessionStopwatch {
        let mut sw = SessionStopwatch::new(policy(30));
        assert!(sw.select_task(Some(task), t(0)).is_none());
        assert!(sw.tick(t(0), ActivityClass::Work, Duration::zero()).is_none());
        assert_eq!(sw.state(), SessionState::Running);
        sw
    }

    /// Feeds one tick per second in `[from, to]` with idle growing from `idle_from`.
    fn idle_ticks(
        sw: &mut SessionStopwatch,
        from: i64,
        to: i64,
        idle_from: i64,
    ) -> Vec<TimeLogEntry> {
        (from..=to)
            .filter_map(|s| sw.tick(t(s), ActivityClass::Work, Duration::seconds(s - idle_from)))
            .collect()
    }

    #[test]
    fn does_not_start_without_task() {
        let mut sw = SessionStopwatch::new(policy(30));
        assert!(sw.tick(t(0), ActivityClass::Work, Duration::zero()).is_none());
        assert_eq!(sw.state(), SessionState::Stopped);
    }

    #[test]
    fn distraction_finalizes_running_session() {
        let mut sw = running("Math");
        let entry = sw.tick(t(120), ActivityClass::Distraction, Duration::zero()).unwrap();
        assert_eq!(entry.task_text, "Math");
        assert_eq!(entry.start_time, t(0));
        assert_eq!(entry.end_time, t(120));
        assert_eq!(sw.state(), SessionState::Stopped);
        assert!(sw.tick(t(121), ActivityClass::Distraction, Duration::zero()).is_none());
    }

    #[test]
    fn unknown_activity_finalizes_running_session() {
        let mut sw = running("Math");
        let entry = sw.tick(t(45), ActivityClass::Unknown, Duration::zero()).unwrap();
        assert_eq!(entry.duration(), Duration::seconds(45));
    }

    #[test]
    fn short_idle_then_resume_emits_nothing() {
        let mut sw = running("Math");
        for s in 1..=60 {
            assert!(sw.tick(t(s), ActivityClass::Work, Duration::zero()).is_none());
        }
        // Input stops at 60; timeout (30s) fires at 91 and we stay idle past it briefly.
        let emitted = idle_ticks(&mut sw, 61, 98, 60);
        assert!(emitted.is_empty());
        assert_eq!(sw.state(), SessionState::PausedForIdle);

        assert!(sw.tick(t(99), ActivityClass::Work, Duration::zero()).is_none());
        assert_eq!(sw.state(), SessionState::Running);
        assert_eq!(sw.session_start(), Some(t(0)));

        let entry = sw.tick(t(159), ActivityClass::Unknown, Duration::zero()).unwrap();
        // 60s before idle + 60s after resume.
        assert_eq!(entry.duration(), Duration::seconds(120));
    }

    #[test]
    fn idle_past_grace_emits_one_entry_with_active_time() {
        let mut sw = running("Math");
        for s in 1..=300 {
            assert!(sw.tick(t(s), ActivityClass::Work, Duration::zero()).is_none());
        }
        let emitted = idle_ticks(&mut sw, 301, 600, 300);
        assert_eq!(emitted.len(), 1);
        let entry = &emitted[0];
        assert_eq!(entry.start_time, t(0));
        assert_eq!(entry.duration(), Duration::seconds(300));
        assert_eq!(sw.state(), SessionState::Stopped);
    }

    #[test]
    fn passive_activity_never_pauses() {
        let mut sw = running("Lecture");
        assert!(sw.tick(t(500), ActivityClass::Passive, Duration::seconds(400)).is_none());
        assert_eq!(sw.state(), SessionState::Running);
        assert_eq!(sw.elapsed(t(500)), Duration::seconds(500));
    }

    #[test]
    fn idle_detection_can_be_disabled() {
        let mut sw = running("Math");
        let mut p = policy(30);
        p.idle_detection = false;
        sw.set_policy(p);
        assert!(sw.tick(t(400), ActivityClass::Work, Duration::seconds(399)).is_none());
        assert_eq!(sw.state(), SessionState::Running);
    }

    #[test]
    fn sub_second_sessions_are_discarded() {
        let mut sw = SessionStopwatch::new(policy(30));
        sw.select_task(Some("Math"), base());
        sw.tick(base(), ActivityClass::Work, Duration::zero());
        let almost = base() + Duration::milliseconds(900);
        assert!(sw.tick(almost, ActivityClass::Distraction, Duration::zero()).is_none());
        assert_eq!(sw.state(), SessionState::Stopped);
    }

    #[test]
    fn distraction_while_paused_ends_at_pause_point() {
        let mut sw = running("Math");
        sw.tick(t(50), ActivityClass::Work, Duration::zero());
        // Idle reported at 90 with 40s of no input: clock stops at 50.
        assert!(sw.tick(t(90), ActivityClass::Work, Duration::seconds(40)).is_none());
        assert_eq!(sw.state(), SessionState::PausedForIdle);
        let entry = sw.tick(t(92), ActivityClass::Distraction, Duration::zero()).unwrap();
        assert_eq!(entry.end_time, t(50));
    }

    #[test]
    fn switching_task_closes_previous_session() {
        let mut sw = running("Math");
        let entry = sw.select_task(Some("English"), t(30)).unwrap();
        assert_eq!(entry.task_text, "Math");
        assert_eq!(sw.state(), SessionState::Stopped);
        assert_eq!(sw.current_task(), Some("English"));
        assert!(sw.select_task(Some("English"), t(31)).is_none());
    }

    #[test]
    fn rename_keeps_session_open() {
        let mut sw = running("Math");
        sw.rename_task("Math", "Calculus");
        let entry = sw.finalize(t(10)).unwrap();
        assert_eq!(entry.task_text, "Calculus");
    }
}
