//! Focus mode nags and predicted-focus suggestions.

use chrono::{DateTime, Datelike, Duration, Local, Timelike, Weekday};

use crate::classifier::ActivityClass;
use crate::model::TimeLogEntry;
use crate::settings::AppSettings;

pub const ADVICE_INTERVAL_SECS: i64 = 60;
pub const PREDICTION_DURATION_MINUTES: u32 = 60;
pub const PEAK_FOCUS_THRESHOLD: f32 = 4.0;
pub const LOW_FOCUS_THRESHOLD: f32 = 2.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nag {
    pub message: String,
}

/// Raises a nag when a distraction is in the foreground, at most once per interval.
#[derive(Debug, Clone)]
pub struct FocusMode {
    active: bool,
    interval: Duration,
    message: String,
    last_nag: Option<DateTime<Local>>,
}

impl FocusMode {
    pub fn new(active: bool, settings: &AppSettings) -> Self {
        let mut mode = Self {
            active,
            interval: Duration::zero(),
            message: String::new(),
            last_nag: None,
        };
        mode.apply_settings(settings);
        mode
    }

    pub fn apply_settings(&mut self, settings: &AppSettings) {
        let secs = i64::try_from(settings.focus_mode_nag_interval_seconds).unwrap_or(i64::MAX / 1000);
        self.interval = Duration::seconds(secs.max(1));
        self.message = settings.focus_mode_nag_message.clone();
    }

    pub fn check(&mut self, now: DateTime<Local>, class: ActivityClass) -> Option<Nag> {
        if !self.active || class != ActivityClass::Distraction {
            return None;
        }
        if let Some(last) = self.last_nag {
            if now - last < self.interval {
                return None;
            }
        }
        self.last_nag = Some(now);
        Some(Nag {
            message: self.message.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionInput {
    pub task: String,
    pub weekday: Weekday,
    pub hour: u32,
    pub duration_minutes: u32,
}

impl PredictionInput {
    pub fn at(task: &str, when: DateTime<Local>) -> Self {
        Self {
            task: task.to_owned(),
            weekday: when.weekday(),
            hour: when.hour(),
            duration_minutes: PREDICTION_DURATION_MINUTES,
        }
    }
}

/// Expected focus score (0-5) for a prospective session, `None` when unknown.
pub trait FocusPredictor {
    fn predict(&self, input: &PredictionInput) -> Option<f32>;
}

/// Average score of rated history: same task at the same weekday and hour,
/// else the same task at any time.
#[derive(Debug, Clone, Default)]
pub struct HistoricalPredictor {
    history: Vec<TimeLogEntry>,
}

impl HistoricalPredictor {
    pub fn new(logs: impl IntoIterator<Item = TimeLogEntry>) -> Self {
        Self {
            history: logs.into_iter().filter(TimeLogEntry::is_rated).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl FocusPredictor for HistoricalPredictor {
    fn predict(&self, input: &PredictionInput) -> Option<f32> {
        let same_task: Vec<&TimeLogEntry> = self
            .history
            .iter()
            .filter(|e| e.task_text == input.task)
            .collect();
        let same_slot: Vec<&TimeLogEntry> = same_task
            .iter()
            .copied()
            .filter(|e| e.start_time.weekday() == input.weekday && e.start_time.hour() == input.hour)
            .collect();

        mean_score(&same_slot).or_else(|| mean_score(&same_task))
    }
}

fn mean_score(entries: &[&TimeLogEntry]) -> Option<f32> {
    if entries.is_empty() {
        return None;
    }
    let sum: u32 = entries.iter().map(|e| u32::from(e.focus_score)).sum();
    Some(sum as f32 / entries.len() as f32)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    PeakFocus { task: String, predicted: f32 },
    TakeBreak { task: String, predicted: f32 },
}

impl Suggestion {
    pub fn message(&self) -> String {
        match self {
            Self::PeakFocus { task, predicted } => format!(
                "You usually focus well on {task} around now (expected {predicted:.1}/5). Keep going!"
            ),
            Self::TakeBreak { task, predicted } => format!(
                "Focus on {task} tends to drop at this time (expected {predicted:.1}/5). Consider a short break."
            ),
        }
    }
}

/// Consults the predictor at most once per [`ADVICE_INTERVAL_SECS`] while a session runs.
#[derive(Debug, Clone)]
pub struct FocusAdvisor<P> {
    predictor: P,
    enabled: bool,
    last_check: Option<DateTime<Local>>,
}

impl<P: FocusPredictor> FocusAdvisor<P> {
    pub fn new(predictor: P, enabled: bool) -> Self {
        Self {
            predictor,
            enabled,
            last_check: None,
        }
    }

    pub fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }

    pub fn check(&mut self, now: DateTime<Local>, running_task: Option<&str>) -> Option<Suggestion> {
        if !self.enabled {
            return None;
        }
        let task = running_task?;
        if let Some(last) = self.last_check {
            if now - last < Duration::seconds(ADVICE_INTERVAL_SECS) {
                return None;
            }
        }
        self.last_check = Some(now);

        let predicted = self.predictor.predict(&PredictionInput::at(task, now))?;
        if predicted >= PEAK_FOCUS_THRESHOLD {
            Some(Suggestion::PeakFocus {
                task: task.to_owned(),
                predicted,
            })
        } else if predicted > 0.0 && predicted < LOW_FOCUS_THRESHOLD {
            Some(Suggestion::TakeBreak {
                task: task.to_owned(),
                predicted,
            })
        } else {
            None
        }
    }
}
