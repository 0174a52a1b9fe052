use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::db::TimeLogDb;
use crate::error::{Error, Result};
use crate::exchange::{self, ImportReport};
use crate::model::{TaskItem, TimeLogEntry};
use crate::settings::AppSettings;
use crate::shop::{ItemCatalog, ItemType};
use crate::store::{self, DataPaths, LoadSource, Loaded};
use crate::tasks::{is_hex_color, TaskCatalog};
use crate::todos::{TodoItem, TodoList};

/// A data file that failed to parse at load time and was replaced by defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFile {
    pub path: PathBuf,
    pub backup: PathBuf,
    pub reason: String,
}

/// Everything persisted in one data directory, loaded together.
///
/// Mutating operations write the affected files immediately, so other
/// processes sharing the directory see every change.
pub struct Workspace {
    paths: DataPaths,
    settings: AppSettings,
    tasks: TaskCatalog,
    todos: TodoList,
    items: ItemCatalog,
    db: TimeLogDb,
    recovered: Vec<RecoveredFile>,
}

impl Workspace {
    pub fn open(paths: DataPaths) -> Result<Self> {
        paths.ensure_root()?;
        let mut recovered = Vec::new();

        let settings_path = paths.settings();
        let settings = take(store::load_json(&settings_path)?, &settings_path, &mut recovered);
        let tasks_path = paths.tasks();
        let tasks: Vec<TaskItem> = take(store::load_json(&tasks_path)?, &tasks_path, &mut recovered);
        let todos_path = paths.todos();
        let todos: Vec<TodoItem> = take(store::load_json(&todos_path)?, &todos_path, &mut recovered);
        let items = take(ItemCatalog::load(paths.items_db())?, paths.items_db(), &mut recovered);
        let db = TimeLogDb::open(&paths.time_logs())?;

        Ok(Self {
            paths,
            settings,
            tasks: TaskCatalog::new(tasks),
            todos: TodoList::new(todos),
            items,
            db,
            recovered,
        })
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn recovered_files(&self) -> &[RecoveredFile] {
        &self.recovered
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Applies `change` to the settings and persists them.
    pub fn update_settings<T>(&mut self, change: impl FnOnce(&mut AppSettings) -> T) -> Result<T> {
        let out = change(&mut self.settings);
        self.save_settings()?;
        Ok(out)
    }

    pub fn save_settings(&self) -> Result<()> {
        store::save_json(&self.paths.settings(), &self.settings)
    }

    pub fn reload_settings(&mut self) -> Result<()> {
        let path = self.paths.settings();
        self.settings = take(store::load_json(&path)?, &path, &mut self.recovered);
        Ok(())
    }

    pub fn reload_tasks(&mut self) -> Result<()> {
        let path = self.paths.tasks();
        let items: Vec<TaskItem> = take(store::load_json(&path)?, &path, &mut self.recovered);
        self.tasks = TaskCatalog::new(items);
        Ok(())
    }

    pub fn tasks(&self) -> &TaskCatalog {
        &self.tasks
    }

    pub fn todos(&self) -> &TodoList {
        &self.todos
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }

    pub fn db(&self) -> &TimeLogDb {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut TimeLogDb {
        &mut self.db
    }

    pub fn add_task(&mut self, name: &str) -> Result<String> {
        let text = self.tasks.add(name)?.text.clone();
        self.save_tasks()?;
        Ok(text)
    }

    /// Renames a task everywhere it is referenced. Returns the number of log entries rewritten.
    ///
    /// The ledger is rewritten before the catalog is saved, so a failed update leaves both
    /// under the old name.
    pub fn rename_task(&mut self, old: &str, new: &str) -> Result<usize> {
        let old = self.task_text(old)?;
        let mut renamed = self.tasks.clone();
        if !renamed.rename(&old, new)? {
            return Ok(0);
        }
        let new = new.trim();
        let changed = self.db.rename_task(&old, new)?;
        self.tasks = renamed;
        self.save_tasks()?;
        self.settings.rename_task_color(&old, new);
        self.save_settings()?;
        tracing::info!(%old, new, changed, "task renamed");
        Ok(changed)
    }

    /// Logged sessions of the task are kept.
    pub fn delete_task(&mut self, name: &str) -> Result<()> {
        let removed = self.tasks.remove(name)?;
        self.save_tasks()?;
        if self.settings.task_colors.remove(&removed.text).is_some() {
            self.save_settings()?;
        }
        Ok(())
    }

    pub fn set_task_color(&mut self, name: &str, color: &str) -> Result<()> {
        let task = self.task_text(name)?;
        let color = color.trim();
        if !is_hex_color(color) {
            return Err(Error::InvalidColor {
                value: color.to_owned(),
            });
        }
        self.settings.task_colors.insert(task, color.to_uppercase());
        self.save_settings()
    }

    /// Catalog spelling of a task name given in any case.
    fn task_text(&self, name: &str) -> Result<String> {
        self.tasks
            .find(name)
            .map(|task| task.text.clone())
            .ok_or_else(|| Error::TaskNotFound {
                name: name.to_owned(),
            })
    }

    fn save_tasks(&self) -> Result<()> {
        store::save_json(&self.paths.tasks(), self.tasks.items())
    }

    /// Applies `change` to the todo list and persists it.
    pub fn update_todos<T>(&mut self, change: impl FnOnce(&mut TodoList) -> Result<T>) -> Result<T> {
        let out = change(&mut self.todos)?;
        self.save_todos()?;
        Ok(out)
    }

    /// Marks a todo done or not done; first completion pays out coins.
    pub fn complete_todo(&mut self, id: Uuid, completed: bool) -> Result<u64> {
        let earned = self.todos.set_completed(id, completed)?;
        self.save_todos()?;
        if earned > 0 {
            self.settings.coins = self.settings.coins.saturating_add(earned);
            self.save_settings()?;
        }
        Ok(earned)
    }

    fn save_todos(&self) -> Result<()> {
        store::save_json(&self.paths.todos(), self.todos.items())
    }

    pub fn purchase(&mut self, id: Uuid) -> Result<u64> {
        let remaining = self.items.purchase(&mut self.settings, id)?;
        self.save_settings()?;
        Ok(remaining)
    }

    pub fn toggle_equip(&mut self, id: Uuid) -> Result<bool> {
        let equipped = self.items.toggle_equip(&mut self.settings, id)?;
        self.save_settings()?;
        Ok(equipped)
    }

    pub fn set_custom_color(&mut self, item_type: ItemType, color: &str) -> Result<()> {
        self.items
            .set_custom_color(&mut self.settings, item_type, color)?;
        self.save_settings()
    }

    /// Persists a finished session and returns it with its ledger id.
    pub fn record_session(&mut self, mut entry: TimeLogEntry) -> Result<TimeLogEntry> {
        let id = self.db.insert(&entry)?;
        entry.id = Some(id);
        Ok(entry)
    }

    pub fn reassign_logs(
        &mut self,
        start: DateTime<Local>,
        end: DateTime<Local>,
        task: &str,
    ) -> Result<usize> {
        let task = self
            .tasks
            .find(task)
            .ok_or_else(|| Error::TaskNotFound {
                name: task.to_owned(),
            })?
            .text
            .clone();
        self.db.reassign_overlapping(start, end, &task)
    }

    pub fn export_logs(&self, dest: &Path) -> Result<usize> {
        let mut logs = self.db.list_all()?;
        logs.reverse();
        exchange::export_csv_file(dest, &logs)
    }

    /// Imports every valid row; unknown task names are added to the catalog.
    pub fn import_logs(&mut self, source: &Path) -> Result<ImportReport> {
        let report = exchange::import_csv_file(source)?;
        self.db.insert_many(&report.entries)?;
        let mut added_task = false;
        for entry in &report.entries {
            if self.tasks.find(&entry.task_text).is_none() {
                self.tasks.add(&entry.task_text)?;
                added_task = true;
            }
        }
        if added_task {
            self.save_tasks()?;
        }
        Ok(report)
    }

    pub fn backup_logs(&self, dest: &Path) -> Result<()> {
        self.db.backup_to(dest)
    }

    pub fn memo(&self) -> Result<String> {
        store::load_text(&self.paths.memo())
    }

    pub fn save_memo(&self, content: &str) -> Result<()> {
        store::save_text(&self.paths.memo(), content)
    }

    /// Deletes all user data. The workspace is consumed so the ledger is closed first.
    pub fn reset(self) -> Result<Vec<PathBuf>> {
        let Self { paths, db, .. } = self;
        drop(db);
        paths.reset_all()
    }
}

fn take<T>(loaded: Loaded<T>, path: &Path, recovered: &mut Vec<RecoveredFile>) -> T {
    if let LoadSource::Recovered { backup, reason } = &loaded.source {
        recovered.push(RecoveredFile {
            path: path.to_path_buf(),
            backup: backup.clone(),
            reason: reason.clone(),
        });
    }
    loaded.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shop::ShopItem;
    use crate::todos::TODO_COMPLETION_REWARD;
    use chrono::{Duration, NaiveDate, TimeZone};
    use tempfile::tempdir;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap()
    }

    fn open(dir: &Path) -> Workspace {
        Workspace::open(DataPaths::new(dir)).unwrap()
    }

    #[test]
    fn rename_propagates_to_logs_and_colors() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        ws.add_task("Math").unwrap();
        ws.add_task("English").unwrap();
        ws.set_task_color("math", "#112233").unwrap();
        ws.record_session(TimeLogEntry::new(at(9, 0), at(9, 30), "Math"))
            .unwrap();
        ws.record_session(TimeLogEntry::new(at(10, 0), at(10, 30), "Math"))
            .unwrap();
        ws.record_session(TimeLogEntry::new(at(11, 0), at(11, 30), "English"))
            .unwrap();

        assert_eq!(ws.rename_task("Math", "Calculus").unwrap(), 2);
        assert!(matches!(
            ws.rename_task("Calculus", "english"),
            Err(Error::DuplicateTask { .. })
        ));

        let reopened = open(dir.path());
        let tasks: Vec<&str> = reopened
            .tasks()
            .items()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(tasks, vec!["Calculus", "English"]);
        assert_eq!(
            reopened.settings().task_colors.get("Calculus").map(String::as_str),
            Some("#112233")
        );
        assert!(!reopened.settings().task_colors.contains_key("Math"));
        let logs = reopened.db().list_all().unwrap();
        assert_eq!(logs.iter().filter(|e| e.task_text == "Calculus").count(), 2);
        assert!(logs.iter().all(|e| e.task_text != "Math"));
    }

    #[test]
    fn rename_and_delete_accept_any_case() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        ws.add_task("Math").unwrap();
        ws.add_task("English").unwrap();
        ws.set_task_color("English", "#445566").unwrap();
        ws.record_session(TimeLogEntry::new(at(9, 0), at(9, 30), "Math"))
            .unwrap();

        assert_eq!(ws.rename_task("math", "Calculus").unwrap(), 1);
        assert_eq!(ws.db().list_all().unwrap()[0].task_text, "Calculus");
        assert_eq!(ws.rename_task("CALCULUS", "Calculus").unwrap(), 0);

        ws.delete_task("english").unwrap();
        assert!(ws.tasks().find("English").is_none());
        assert!(ws.settings().task_colors.is_empty());
        assert!(matches!(
            ws.delete_task("english"),
            Err(Error::TaskNotFound { .. })
        ));
    }

    #[test]
    fn failed_ledger_rename_keeps_catalog() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        ws.add_task("Math").unwrap();
        let conn = rusqlite::Connection::open(ws.paths().time_logs()).unwrap();
        conn.execute_batch("DROP TABLE time_logs").unwrap();
        drop(conn);

        assert!(ws.rename_task("Math", "Calculus").is_err());
        assert!(ws.tasks().find("Math").is_some());
        assert!(open(dir.path()).tasks().find("Math").is_some());
    }

    #[test]
    fn delete_task_keeps_logs() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        ws.add_task("Math").unwrap();
        ws.set_task_color("Math", "#112233").unwrap();
        ws.record_session(TimeLogEntry::new(at(9, 0), at(9, 30), "Math"))
            .unwrap();
        ws.delete_task("Math").unwrap();
        assert!(ws.tasks().is_empty());
        assert!(ws.settings().task_colors.is_empty());
        assert_eq!(ws.db().count().unwrap(), 1);
    }

    #[test]
    fn completing_todo_pays_coins_once() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let id = ws
            .update_todos(|todos| Ok(todos.add("Read", day)))
            .unwrap()
            .unwrap();
        assert_eq!(ws.complete_todo(id, true).unwrap(), TODO_COMPLETION_REWARD);
        ws.complete_todo(id, false).unwrap();
        assert_eq!(ws.complete_todo(id, true).unwrap(), 0);

        let reopened = open(dir.path());
        assert_eq!(reopened.settings().coins, TODO_COMPLETION_REWARD);
        assert!(reopened.todos().find(id).unwrap().has_been_rewarded);
    }

    #[test]
    fn purchase_persists_and_reports_corrupt_files() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let hat = ShopItem {
            id: Uuid::new_v4(),
            name: "Beret".to_owned(),
            item_type: ItemType::Accessory1,
            price: 5,
            image_path: String::new(),
        };
        store::save_json(paths.items_db(), &vec![hat.clone()]).unwrap();
        std::fs::write(paths.todos(), "{ not json").unwrap();

        let mut ws = Workspace::open(paths.clone()).unwrap();
        assert_eq!(ws.recovered_files().len(), 1);
        assert_eq!(ws.recovered_files()[0].path, paths.todos());

        ws.update_settings(|s| s.coins = 12).unwrap();
        assert_eq!(ws.purchase(hat.id).unwrap(), 7);
        assert!(ws.toggle_equip(hat.id).unwrap());
        let reopened = Workspace::open(paths).unwrap();
        assert!(reopened.recovered_files().is_empty());
        assert_eq!(reopened.settings().coins, 7);
        assert_eq!(
            reopened.settings().equipped_items.get(&ItemType::Accessory1),
            Some(&hat.id)
        );
    }

    #[test]
    fn reassign_requires_known_task() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        ws.add_task("Art").unwrap();
        ws.record_session(TimeLogEntry::new(at(9, 0), at(10, 0), "Math"))
            .unwrap();
        ws.record_session(TimeLogEntry::new(at(12, 0), at(13, 0), "Math"))
            .unwrap();
        assert!(matches!(
            ws.reassign_logs(at(9, 30), at(11, 0), "History"),
            Err(Error::TaskNotFound { .. })
        ));
        assert_eq!(ws.reassign_logs(at(9, 30), at(11, 0), "art").unwrap(), 1);
        let logs = ws.db().list_all().unwrap();
        assert_eq!(logs.iter().filter(|e| e.task_text == "Art").count(), 1);
    }

    #[test]
    fn export_import_and_reset() {
        let dir = tempdir().unwrap();
        let mut ws = open(dir.path());
        let mut e = TimeLogEntry::new(at(9, 0), at(9, 0) + Duration::minutes(25), "Math");
        e.focus_score = 4;
        ws.record_session(e).unwrap();
        ws.save_memo("remember the milk").unwrap();

        let csv = dir.path().join("export.csv");
        assert_eq!(ws.export_logs(&csv).unwrap(), 1);

        let other = tempdir().unwrap();
        let mut fresh = open(other.path());
        let report = fresh.import_logs(&csv).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(fresh.db().count().unwrap(), 1);
        assert!(fresh.tasks().find("Math").is_some());

        let backup = dir.path().join("backup").join("copy.db");
        ws.backup_logs(&backup).unwrap();
        assert_eq!(TimeLogDb::open(&backup).unwrap().count().unwrap(), 1);

        let removed = ws.reset().unwrap();
        assert!(removed.iter().any(|p| p.ends_with("memo.txt")));
        assert!(!dir.path().join("timelogs.db").exists());
        assert!(csv.exists());
    }
}
