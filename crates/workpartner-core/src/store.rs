use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// File layout of the data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
    items_db: PathBuf,
}

impl DataPaths {
    /// `%APPDATA%\WorkPartner` when available, else `./data`.
    pub fn default_root() -> PathBuf {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("WorkPartner");
        }
        PathBuf::from("data")
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let items_db = root.join("items_db.json");
        Self { root, items_db }
    }

    pub fn with_items_db(mut self, items_db: impl Into<PathBuf>) -> Self {
        self.items_db = items_db.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn tasks(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    pub fn todos(&self) -> PathBuf {
        self.root.join("todos.json")
    }

    pub fn memo(&self) -> PathBuf {
        self.root.join("memo.txt")
    }

    pub fn time_logs(&self) -> PathBuf {
        self.root.join("timelogs.db")
    }

    pub fn items_db(&self) -> &Path {
        &self.items_db
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("Logs")
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|err| Error::io(&self.root, err))
    }

    /// Deletes every user data file plus the log directory. The item catalog is left alone.
    pub fn reset_all(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let logs = self.time_logs();
        let candidates = [
            self.settings(),
            self.tasks(),
            self.todos(),
            self.memo(),
            logs.with_extension("db-wal"),
            logs.with_extension("db-shm"),
            logs,
        ];
        for path in candidates {
            if path.exists() {
                fs::remove_file(&path).map_err(|err| Error::io(&path, err))?;
                removed.push(path);
            }
        }
        let log_dir = self.log_dir();
        if log_dir.exists() {
            fs::remove_dir_all(&log_dir).map_err(|err| Error::io(&log_dir, err))?;
            removed.push(log_dir);
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    File,
    Missing,
    /// The file did not parse and was moved aside to `backup`.
    Recovered { backup: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub source: LoadSource,
}

impl<T> Loaded<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn was_recovered(&self) -> bool {
        matches!(self.source, LoadSource::Recovered { .. })
    }
}

/// Reads a JSON file, falling back to `T::default()` when it is missing or corrupt.
pub fn load_json<T>(path: &Path) -> Result<Loaded<T>>
where
    T: DeserializeOwned + Default,
{
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Loaded {
                value: T::default(),
                source: LoadSource::Missing,
            });
        }
        Err(err) => return Err(Error::io(path, err)),
    };

    if text.trim().is_empty() {
        return Ok(Loaded {
            value: T::default(),
            source: LoadSource::Missing,
        });
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(Loaded {
            value,
            source: LoadSource::File,
        }),
        Err(parse_err) => {
            let backup = backup_path(path);
            fs::rename(path, &backup).map_err(|err| Error::io(path, err))?;
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                "corrupt data file moved aside: {parse_err}"
            );
            Ok(Loaded {
                value: T::default(),
                source: LoadSource::Recovered {
                    backup,
                    reason: parse_err.to_string(),
                },
            })
        }
    }
}

/// Writes pretty JSON through a temp file so a crash never leaves half a file behind.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text).map_err(|err| Error::io(&tmp, err))?;
    fs::rename(&tmp, path).map_err(|err| Error::io(path, err))
}

pub fn load_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(Error::io(path, err)),
    }
}

pub fn save_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    fs::write(path, content).map_err(|err| Error::io(path, err))
}

pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_owned());
    path.with_file_name(format!("{name}.corrupt-{stamp}"))
}
