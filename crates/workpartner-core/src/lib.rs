//! Focus tracking core: activity classification, the session stopwatch,
//! the time-log ledger and the data files around them.

pub mod analysis;
pub mod classifier;
pub mod db;
pub mod error;
pub mod exchange;
pub mod focus;
pub mod logging;
pub mod model;
pub mod recorder;
pub mod session;
pub mod settings;
pub mod shop;
pub mod store;
pub mod tasks;
pub mod todos;
pub mod workspace;

pub use classifier::{ActivityClass, ActivityProbe, Classifier};
pub use error::{Error, Result};
pub use model::{TaskItem, TimeLogEntry};
pub use recorder::{ActivitySample, Recorder, RecorderOptions, TickReport};
pub use session::{SessionPolicy, SessionState, SessionStopwatch};
pub use settings::AppSettings;
pub use store::DataPaths;
pub use workspace::Workspace;

/// Name of the mutex the daemon holds while it runs; one daemon per session.
pub const DAEMON_MUTEX_NAME: &str = "Local\\WorkPartnerBackendSingleton";

/// Formats a duration as `HH:MM:SS`; hours are not wrapped at 24.
pub fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
