use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::shop::ItemType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("task '{name}' already exists")]
    DuplicateTask { name: String },

    #[error("task '{name}' not found")]
    TaskNotFound { name: String },

    #[error("task name must not be empty")]
    EmptyTaskName,

    #[error("todo {id} not found")]
    TodoNotFound { id: Uuid },

    #[error("time log {id} not found")]
    LogNotFound { id: i64 },

    #[error("invalid time range: end must be after start")]
    InvalidRange,

    #[error("focus score must be between 0 and 5, got {score}")]
    InvalidFocusScore { score: u8 },

    #[error("shop item {id} not found")]
    ItemNotFound { id: Uuid },

    #[error("item '{name}' is already owned")]
    AlreadyOwned { name: String },

    #[error("item '{name}' is not owned")]
    NotOwned { name: String },

    #[error("not enough coins: need {price}, have {coins}")]
    InsufficientCoins { price: u64, coins: u64 },

    #[error("{item_type:?} is a color category and cannot be equipped")]
    ColorCategory { item_type: ItemType },

    #[error("{item_type:?} does not take a custom color")]
    NotColorCategory { item_type: ItemType },

    #[error("invalid color '{value}', expected #RRGGBB or #AARRGGBB")]
    InvalidColor { value: String },

    #[error("cannot import CSV: {reason}")]
    ImportFormat { reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
