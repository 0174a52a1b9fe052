use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const TODO_COMPLETION_REWARD: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub text: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub has_been_rewarded: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sub_tasks: Vec<TodoItem>,
}

impl TodoItem {
    pub fn new(text: &str, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.trim().to_owned(),
            date,
            is_completed: false,
            has_been_rewarded: false,
            tags: Vec::new(),
            sub_tasks: Vec::new(),
        }
    }
}

/// Tree-structured checklist. Top-level items are filtered by date; subtasks ride along.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn new(items: Vec<TodoItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn for_date(&self, date: NaiveDate) -> Vec<&TodoItem> {
        self.items.iter().filter(|item| item.date == date).collect()
    }

    pub fn add(&mut self, text: &str, date: NaiveDate) -> Option<Uuid> {
        if text.trim().is_empty() {
            return None;
        }
        let item = TodoItem::new(text, date);
        let id = item.id;
        self.items.push(item);
        Some(id)
    }

    /// Subtasks inherit the parent's date.
    pub fn add_subtask(&mut self, parent: Uuid, text: &str) -> Result<Uuid> {
        let parent_item = self.find_mut(parent).ok_or(Error::TodoNotFound { id: parent })?;
        let item = TodoItem::new(text, parent_item.date);
        let id = item.id;
        parent_item.sub_tasks.push(item);
        Ok(id)
    }

    pub fn find(&self, id: Uuid) -> Option<&TodoItem> {
        find_in(&self.items, id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut TodoItem> {
        find_in_mut(&mut self.items, id)
    }

    /// Removes the item wherever it sits in the tree, together with its subtasks.
    pub fn remove(&mut self, id: Uuid) -> Result<TodoItem> {
        remove_from(&mut self.items, id).ok_or(Error::TodoNotFound { id })
    }

    /// Returns the coins earned: the reward is paid once per item, on its first completion.
    pub fn set_completed(&mut self, id: Uuid, completed: bool) -> Result<u64> {
        let item = self.find_mut(id).ok_or(Error::TodoNotFound { id })?;
        item.is_completed = completed;
        if completed && !item.has_been_rewarded {
            item.has_been_rewarded = true;
            return Ok(TODO_COMPLETION_REWARD);
        }
        Ok(0)
    }

    pub fn set_date(&mut self, id: Uuid, date: NaiveDate) -> Result<()> {
        let item = self.find_mut(id).ok_or(Error::TodoNotFound { id })?;
        item.date = date;
        Ok(())
    }

    pub fn set_text(&mut self, id: Uuid, text: &str) -> Result<()> {
        let item = self.find_mut(id).ok_or(Error::TodoNotFound { id })?;
        item.text = text.trim().to_owned();
        Ok(())
    }

    /// Returns false when the tag is blank or already present.
    pub fn add_tag(&mut self, id: Uuid, tag: &str) -> Result<bool> {
        let item = self.find_mut(id).ok_or(Error::TodoNotFound { id })?;
        let tag = tag.trim();
        if tag.is_empty() || item.tags.iter().any(|t| t == tag) {
            return Ok(false);
        }
        item.tags.push(tag.to_owned());
        Ok(true)
    }
}

/// Tag suggestions for a todo: `#<current task>` plus the tag of every rule whose
/// keyword occurs in the todo text. Existing tags are left out.
pub fn suggest_tags(
    todo: &TodoItem,
    current_task: Option<&str>,
    tag_rules: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    if let Some(task) = current_task.map(str::trim).filter(|t| !t.is_empty()) {
        suggestions.push(format!("#{task}"));
    }
    let text = todo.text.to_lowercase();
    for (keyword, tag) in tag_rules {
        if text.contains(&keyword.to_lowercase()) {
            suggestions.push(tag.clone());
        }
    }

    let mut out: Vec<String> = Vec::new();
    for suggestion in suggestions {
        if !out.contains(&suggestion) && !todo.tags.contains(&suggestion) {
            out.push(suggestion);
        }
    }
    out
}

fn find_in(items: &[TodoItem], id: Uuid) -> Option<&TodoItem> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in(&item.sub_tasks, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(items: &mut [TodoItem], id: Uuid) -> Option<&mut TodoItem> {
    for item in items.iter_mut() {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in_mut(&mut item.sub_tasks, id) {
            return Some(found);
        }
    }
    None
}

fn remove_from(items: &mut Vec<TodoItem>, id: Uuid) -> Option<TodoItem> {
    if let Some(idx) = items.iter().position(|item| item.id == id) {
        return Some(items.remove(idx));
    }
    items
        .iter_mut()
        .find_map(|item| remove_from(&mut item.sub_tasks, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut list = TodoList::default();
        assert!(list.add("  ", day(3)).is_none());
        assert!(list.items().is_empty());
    }

    #[test]
    fn subtasks_inherit_date_and_are_found_recursively() {
        let mut list = TodoList::default();
        let parent = list.add("Write report", day(3)).unwrap();
        let child = list.add_subtask(parent, "Outline").unwrap();
        let grandchild = list.add_subtask(child, "Collect sources").unwrap();

        assert_eq!(list.find(grandchild).unwrap().date, day(3));
        assert_eq!(list.for_date(day(3)).len(), 1);
        assert!(list.for_date(day(4)).is_empty());

        let removed = list.remove(child).unwrap();
        assert_eq!(removed.sub_tasks.len(), 1);
        assert!(list.find(grandchild).is_none());
        assert!(list.find(parent).unwrap().sub_tasks.is_empty());
    }

    #[test]
    fn completion_reward_is_paid_once() {
        let mut list = TodoList::default();
        let id = list.add("Read chapter 3", day(3)).unwrap();
        assert_eq!(list.set_completed(id, true).unwrap(), TODO_COMPLETION_REWARD);
        assert_eq!(list.set_completed(id, false).unwrap(), 0);
        assert_eq!(list.set_completed(id, true).unwrap(), 0);
        assert!(matches!(
            list.set_completed(Uuid::new_v4(), true),
            Err(Error::TodoNotFound { .. })
        ));
    }

    #[test]
    fn tags_are_unique() {
        let mut list = TodoList::default();
        let id = list.add("Gym", day(3)).unwrap();
        assert!(list.add_tag(id, "#health").unwrap());
        assert!(!list.add_tag(id, "#health").unwrap());
        assert!(!list.add_tag(id, " ").unwrap());
    }

    #[test]
    fn suggestions_combine_task_and_rules() {
        let mut rules = BTreeMap::new();
        rules.insert("report".to_owned(), "#writing".to_owned());
        rules.insert("math".to_owned(), "#study".to_owned());
        rules.insert("Quarterly".to_owned(), "#writing".to_owned());

        let mut todo = TodoItem::new("Quarterly REPORT draft", day(3));
        let suggestions = suggest_tags(&todo, Some("Work"), &rules);
        assert_eq!(suggestions, vec!["#Work".to_owned(), "#writing".to_owned()]);

        todo.tags.push("#Work".to_owned());
        assert_eq!(suggest_tags(&todo, Some("Work"), &rules), vec!["#writing".to_owned()]);
        assert_eq!(suggest_tags(&todo, None, &BTreeMap::new()), Vec::<String>::new());
    }

    #[test]
    fn old_files_without_ids_still_load() {
        let json = r#"[{"text":"Old","date":"2025-03-03","sub_tasks":[{"text":"Child","date":"2025-03-03"}]}]"#;
        let items: Vec<TodoItem> = serde_json::from_str(json).unwrap();
        assert_ne!(items[0].id, items[0].sub_tasks[0].id);
    }
}
