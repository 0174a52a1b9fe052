use crate::error::{Error, Result};
use crate::model::TaskItem;
use crate::settings::AppSettings;

/// Fallback colors handed out round-robin to tasks without an explicit color.
pub const TASK_PALETTE: [&str; 8] = [
    "#FFB6C1", "#ADD8E6", "#90EE90", "#FFFFE0", "#DDA0DD", "#FFDAB9", "#AFEEEE", "#F0E68C",
];
pub const UNASSIGNED_COLOR: &str = "#D3D3D3";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCatalog {
    items: Vec<TaskItem>,
}

impl TaskCatalog {
    pub fn new(items: Vec<TaskItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&TaskItem> {
        self.items.first()
    }

    pub fn find(&self, name: &str) -> Option<&TaskItem> {
        self.items.iter().find(|task| task.matches(name))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|task| task.matches(name))
    }

    pub fn add(&mut self, name: &str) -> Result<&TaskItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyTaskName);
        }
        if self.find(name).is_some() {
            return Err(Error::DuplicateTask {
                name: name.to_owned(),
            });
        }
        self.items.push(TaskItem::new(name));
        let last = self.items.len() - 1;
        Ok(&self.items[last])
    }

    /// Renames in place, keeping the task's position. Returns `Ok(false)` when the
    /// name did not change.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<bool> {
        let new = new.trim();
        if new.is_empty() {
            return Err(Error::EmptyTaskName);
        }
        let idx = self.position(old).ok_or_else(|| Error::TaskNotFound {
            name: old.to_owned(),
        })?;
        if self.items[idx].text == new {
            return Ok(false);
        }
        let clash = self
            .items
            .iter()
            .enumerate()
            .any(|(i, task)| i != idx && task.matches(new));
        if clash {
            return Err(Error::DuplicateTask {
                name: new.to_owned(),
            });
        }
        self.items[idx].text = new.to_owned();
        Ok(true)
    }

    pub fn remove(&mut self, name: &str) -> Result<TaskItem> {
        let idx = self.position(name).ok_or_else(|| Error::TaskNotFound {
            name: name.to_owned(),
        })?;
        Ok(self.items.remove(idx))
    }
}

/// Explicit color from settings, else a palette color fixed by the task's position.
pub fn color_for_task(settings: &AppSettings, catalog: &TaskCatalog, name: &str) -> String {
    if name.is_empty() {
        return UNASSIGNED_COLOR.to_owned();
    }
    if let Some(color) = settings.task_colors.get(name) {
        if is_hex_color(color) {
            return color.clone();
        }
    }
    let slot = catalog.position(name).unwrap_or_else(|| {
        name.bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)))
    });
    TASK_PALETTE[slot % TASK_PALETTE.len()].to_owned()
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> TaskCatalog {
        TaskCatalog::new(names.iter().map(|n| TaskItem::new(n)).collect())
    }

    #[test]
    fn add_rejects_case_insensitive_duplicates() {
        let mut tasks = catalog(&["Math"]);
        assert!(matches!(tasks.add(" math "), Err(Error::DuplicateTask { .. })));
        assert!(matches!(tasks.add("   "), Err(Error::EmptyTaskName)));
        assert_eq!(tasks.add("  English ").unwrap().text, "English");
        assert_eq!(tasks.items().len(), 2);
    }

    #[test]
    fn rename_checks_other_names_only() {
        let mut tasks = catalog(&["Math", "English"]);
        assert!(!tasks.rename("Math", "Math").unwrap());
        assert!(tasks.rename("Math", "MATH").unwrap());
        assert!(matches!(
            tasks.rename("MATH", "english"),
            Err(Error::DuplicateTask { .. })
        ));
        assert!(matches!(
            tasks.rename("History", "Art"),
            Err(Error::TaskNotFound { .. })
        ));
    }

    #[test]
    fn lookups_ignore_case() {
        let mut tasks = catalog(&["Math", "English"]);
        assert_eq!(tasks.position("ENGLISH"), Some(1));
        assert!(tasks.rename("math", "Calculus").unwrap());
        assert_eq!(tasks.items()[0].text, "Calculus");
        assert_eq!(tasks.remove("english").unwrap().text, "English");
        assert_eq!(tasks.items().len(), 1);
    }

    #[test]
    fn colors_prefer_settings_then_palette() {
        let tasks = catalog(&["Math", "English"]);
        let mut settings = AppSettings::default();
        settings.task_colors.insert("English".to_owned(), "#123456".to_owned());
        settings.task_colors.insert("Math".to_owned(), "blue-ish".to_owned());

        assert_eq!(color_for_task(&settings, &tasks, "English"), "#123456");
        assert_eq!(color_for_task(&settings, &tasks, "Math"), TASK_PALETTE[0]);
        assert_eq!(color_for_task(&settings, &tasks, ""), UNASSIGNED_COLOR);
    }

    #[test]
    fn hex_color_validation() {
        assert!(is_hex_color("#A0b1C2"));
        assert!(is_hex_color("#FFA0B1C2"));
        assert!(!is_hex_color("A0B1C2"));
        assert!(!is_hex_color("#XYZXYZ"));
    }
}
