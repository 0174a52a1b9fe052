use std::time::SystemTime;

use chrono::{DateTime, Duration, Local};

use crate::classifier::{ActivityClass, ActivityProbe, Classifier};
use crate::error::{Error, Result};
use crate::focus::{FocusAdvisor, FocusMode, HistoricalPredictor, Nag, Suggestion};
use crate::model::TimeLogEntry;
use crate::session::{SessionPolicy, SessionState, SessionStopwatch};
use crate::store;
use crate::tasks::TaskCatalog;
use crate::workspace::Workspace;

/// Rated history is re-read from the ledger this often so ratings made elsewhere count.
const PREDICTOR_REFRESH_SECS: i64 = 600;

/// One poll of the foreground window and input state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySample {
    pub at: DateTime<Local>,
    /// `None` when no foreground window could be resolved.
    pub probe: Option<ActivityProbe>,
    /// Time since the last keyboard or mouse input.
    pub idle: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderOptions {
    pub focus_mode: bool,
    pub advice: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub class: ActivityClass,
    pub state: SessionState,
    pub task: Option<String>,
    pub elapsed: Duration,
    /// Session closed by this tick, already stored in the ledger.
    pub finished: Option<TimeLogEntry>,
    pub nag: Option<Nag>,
    pub suggestion: Option<Suggestion>,
}

/// Drives the stopwatch from activity samples and persists finished sessions.
pub struct Recorder {
    workspace: Workspace,
    classifier: Classifier,
    stopwatch: SessionStopwatch,
    focus: FocusMode,
    advisor: FocusAdvisor<HistoricalPredictor>,
    settings_mtime: Option<SystemTime>,
    tasks_mtime: Option<SystemTime>,
    predictor_loaded_at: Option<DateTime<Local>>,
}

impl Recorder {
    pub fn new(workspace: Workspace, options: RecorderOptions) -> Result<Self> {
        let settings = workspace.settings();
        let classifier = Classifier::from_settings(settings);
        let stopwatch = SessionStopwatch::new(SessionPolicy::from_settings(settings));
        let focus = FocusMode::new(options.focus_mode, settings);
        let predictor = HistoricalPredictor::new(workspace.db().list_all()?);
        let settings_mtime = store::modified_time(&workspace.paths().settings());
        let tasks_mtime = store::modified_time(&workspace.paths().tasks());

        Ok(Self {
            workspace,
            classifier,
            stopwatch,
            focus,
            advisor: FocusAdvisor::new(predictor, options.advice),
            settings_mtime,
            tasks_mtime,
            predictor_loaded_at: None,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Selects a catalog task, closing the session of the previous one.
    pub fn select_task(&mut self, name: &str, now: DateTime<Local>) -> Result<Option<TimeLogEntry>> {
        let task = self
            .workspace
            .tasks()
            .find(name)
            .ok_or_else(|| Error::TaskNotFound {
                name: name.to_owned(),
            })?
            .text
            .clone();
        let finished = self.stopwatch.select_task(Some(&task), now);
        self.persist(finished)
    }

    pub fn ingest(&mut self, sample: &ActivitySample) -> Result<TickReport> {
        let now = sample.at;
        self.reload_if_changed()?;
        self.refresh_predictor(now)?;

        let mut finished = self.ensure_task_selected(now)?;

        let class = sample
            .probe
            .as_ref()
            .map_or(ActivityClass::Unknown, |probe| self.classifier.classify(probe));
        let ticked = self.stopwatch.tick(now, class, sample.idle);
        if let Some(entry) = self.persist(ticked)? {
            finished = Some(entry);
        }

        let nag = self.focus.check(now, class);
        let running_task = match self.stopwatch.state() {
            SessionState::Running => self.stopwatch.current_task(),
            _ => None,
        };
        let suggestion = self.advisor.check(now, running_task);

        Ok(TickReport {
            class,
            state: self.stopwatch.state(),
            task: self.stopwatch.current_task().map(str::to_owned),
            elapsed: self.stopwatch.elapsed(now),
            finished,
            nag,
            suggestion,
        })
    }

    /// Closes any open session; called on shutdown.
    pub fn flush(&mut self, now: DateTime<Local>) -> Result<Option<TimeLogEntry>> {
        let finished = self.stopwatch.finalize(now);
        self.persist(finished)
    }

    fn persist(&mut self, finished: Option<TimeLogEntry>) -> Result<Option<TimeLogEntry>> {
        let Some(entry) = finished else {
            return Ok(None);
        };
        let stored = self.workspace.record_session(entry)?;
        tracing::info!(
            id = stored.id,
            task = %stored.task_text,
            secs = stored.duration().num_seconds(),
            "session recorded"
        );
        Ok(Some(stored))
    }

    /// Picks the first task when none is selected, or when the selected one was deleted.
    fn ensure_task_selected(&mut self, now: DateTime<Local>) -> Result<Option<TimeLogEntry>> {
        let tasks = self.workspace.tasks();
        let current_known = self
            .stopwatch
            .current_task()
            .is_some_and(|task| tasks.items().iter().any(|t| t.text == task));
        if current_known {
            return Ok(None);
        }
        let first = tasks.first().map(|task| task.text.clone());
        if first.is_none() && self.stopwatch.current_task().is_none() {
            return Ok(None);
        }
        let finished = self.stopwatch.select_task(first.as_deref(), now);
        self.persist(finished)
    }

    fn reload_if_changed(&mut self) -> Result<()> {
        let paths = self.workspace.paths();
        let settings_mtime = store::modified_time(&paths.settings());
        let tasks_mtime = store::modified_time(&paths.tasks());

        if settings_mtime != self.settings_mtime {
            self.settings_mtime = settings_mtime;
            self.workspace.reload_settings()?;
            let settings = self.workspace.settings();
            self.classifier = Classifier::from_settings(settings);
            self.stopwatch.set_policy(SessionPolicy::from_settings(settings));
            self.focus.apply_settings(settings);
            tracing::info!("settings reloaded");
        }
        if tasks_mtime != self.tasks_mtime {
            self.tasks_mtime = tasks_mtime;
            let previous = self.workspace.tasks().clone();
            self.workspace.reload_tasks()?;
            let current = self.stopwatch.current_task().map(str::to_owned);
            if let Some(old) = current {
                if let Some(new) = renamed_in_place(&previous, self.workspace.tasks(), &old) {
                    tracing::info!(%old, %new, "selected task renamed");
                    self.stopwatch.rename_task(&old, &new);
                }
            }
            tracing::info!(count = self.workspace.tasks().items().len(), "tasks reloaded");
        }
        Ok(())
    }

    fn refresh_predictor(&mut self, now: DateTime<Local>) -> Result<()> {
        let due = self
            .predictor_loaded_at
            .map_or(true, |at| now - at >= Duration::seconds(PREDICTOR_REFRESH_SECS));
        if due {
            *self.advisor.predictor_mut() = HistoricalPredictor::new(self.workspace.db().list_all()?);
            self.predictor_loaded_at = Some(now);
        }
        Ok(())
    }
}

/// New name of `task` when a reload replaced it in place: the old text is gone and the
/// slot it held now carries a name the previous catalog did not have.
fn renamed_in_place(previous: &TaskCatalog, reloaded: &TaskCatalog, task: &str) -> Option<String> {
    let exact = |catalog: &TaskCatalog, name: &str| catalog.items().iter().any(|t| t.text == name);
    if exact(reloaded, task) || previous.items().len() != reloaded.items().len() {
        return None;
    }
    let idx = previous.items().iter().position(|t| t.text == task)?;
    let candidate = &reloaded.items().get(idx)?.text;
    (!exact(previous, candidate)).then(|| candidate.clone())
}
