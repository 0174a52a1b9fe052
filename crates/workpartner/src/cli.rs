use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use workpartner_core::analysis::RangePreset;
use workpartner_core::settings::ProcessList;

#[derive(Parser, Debug)]
#[command(name = "workpartner", version, about = "Focus tracker: tasks, todos, time logs and rewards")]
pub struct Cli {
    /// Data directory (default: %APPDATA%\WorkPartner, else ./data)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Shop item catalog (default: <data-dir>/items_db.json)
    #[arg(long, global = true)]
    pub items_db: Option<PathBuf>,

    /// Print JSON instead of tables where supported
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the task catalog
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Manage the todo tree
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Inspect and edit recorded sessions
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Browse and buy shop items
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Owned items, equipping and avatar colors
    Closet {
        #[command(subcommand)]
        action: ClosetAction,
    },
    /// Summaries of recorded time and focus
    Stats {
        #[arg(long, value_enum, default_value_t = RangeArg::All)]
        range: RangeArg,
        /// Custom range start (YYYY-MM-DD); overrides --range
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Custom range end (YYYY-MM-DD), inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Expected focus score for a task
    Predict {
        task: String,
        /// Time of the session (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Export all sessions to CSV
    Export { path: PathBuf },
    /// Import sessions from CSV
    Import { path: PathBuf },
    /// Copy the session ledger to another SQLite file
    Backup { path: PathBuf },
    /// Read or replace the memo
    Memo {
        #[command(subcommand)]
        action: MemoAction,
    },
    /// Delete all user data
    Reset {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Daemon state, coins and today's totals
    Status,
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    List,
    Add { name: String },
    Rename { old: String, new: String },
    Delete { name: String },
    /// Set the display color (#RRGGBB)
    Color { name: String, color: String },
}

#[derive(Subcommand, Debug)]
pub enum TodoAction {
    List {
        /// Day to show (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },
    Add {
        text: String,
        #[arg(long)]
        date: Option<String>,
        /// Id (or unique prefix) of the parent todo
        #[arg(long)]
        parent: Option<String>,
    },
    Done { id: String },
    Undo { id: String },
    Remove { id: String },
    Edit { id: String, text: String },
    Move { id: String, date: String },
    Tag { id: String, tag: String },
    /// Suggest tags from the current task and tag rules
    Suggest {
        id: String,
        #[arg(long)]
        task: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogAction {
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        task: Option<String>,
    },
    /// Add a session manually
    Add {
        #[arg(long)]
        task: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = 0)]
        score: u8,
    },
    Edit {
        id: i64,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Rate a session's focus (1-5) and note what you did in the break
    Rate {
        id: i64,
        score: u8,
        #[arg(long = "break")]
        breaks: Vec<String>,
    },
    Delete { id: i64 },
    /// Move every session overlapping a time range to another task
    Reassign {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        task: String,
    },
    /// Most recent session without a rating
    Unrated,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    AddProcess {
        #[arg(value_enum)]
        list: ListArg,
        keyword: String,
    },
    RemoveProcess {
        #[arg(value_enum)]
        list: ListArg,
        keyword: String,
    },
    Idle {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        timeout: Option<u64>,
    },
    Nag {
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        interval: Option<u64>,
    },
    MiniTimer {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    AddTagRule { keyword: String, tag: String },
    RemoveTagRule { keyword: String },
}

#[derive(Subcommand, Debug)]
pub enum ShopAction {
    List,
    Buy { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ClosetAction {
    List {
        /// Only one category, e.g. HairStyle
        #[arg(long = "type")]
        item_type: Option<String>,
    },
    /// Equip an owned item, or unequip it if already worn
    Equip { id: String },
    /// Set a color category (HairColor, EyeColor, ClothesColor, CushionColor)
    Color { item_type: String, color: String },
    /// Equipped items in drawing order
    Avatar,
}

#[derive(Subcommand, Debug)]
pub enum MemoAction {
    Show,
    Set { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListArg {
    Work,
    Passive,
    Distraction,
}

impl From<ListArg> for ProcessList {
    fn from(value: ListArg) -> Self {
        match value {
            ListArg::Work => Self::Work,
            ListArg::Passive => Self::Passive,
            ListArg::Distraction => Self::Distraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    Today,
    Week,
    Month,
    All,
}

impl From<RangeArg> for RangePreset {
    fn from(value: RangeArg) -> Self {
        match value {
            RangeArg::Today => Self::Today,
            RangeArg::Week => Self::ThisWeek,
            RangeArg::Month => Self::ThisMonth,
            RangeArg::All => Self::All,
        }
    }
}
