use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shop::ItemType;

pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_NAG_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_NAG_MESSAGE: &str = "Back to work! You are in focus mode.";

/// User profile and configuration, persisted wholesale on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub work_processes: Vec<String>,
    pub passive_processes: Vec<String>,
    pub distraction_processes: Vec<String>,
    pub is_idle_detection_enabled: bool,
    pub idle_timeout_seconds: u64,
    pub is_mini_timer_enabled: bool,
    pub focus_mode_nag_message: String,
    pub focus_mode_nag_interval_seconds: u64,
    pub task_colors: BTreeMap<String, String>,
    pub tag_rules: BTreeMap<String, String>,
    pub owned_item_ids: BTreeSet<Uuid>,
    pub equipped_items: BTreeMap<ItemType, Uuid>,
    pub custom_colors: BTreeMap<ItemType, String>,
    pub coins: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            work_processes: Vec::new(),
            passive_processes: Vec::new(),
            distraction_processes: Vec::new(),
            is_idle_detection_enabled: true,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECS,
            is_mini_timer_enabled: false,
            focus_mode_nag_message: DEFAULT_NAG_MESSAGE.to_owned(),
            focus_mode_nag_interval_seconds: DEFAULT_NAG_INTERVAL_SECS,
            task_colors: BTreeMap::new(),
            tag_rules: BTreeMap::new(),
            owned_item_ids: BTreeSet::new(),
            equipped_items: BTreeMap::new(),
            custom_colors: BTreeMap::new(),
            coins: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessList {
    Work,
    Passive,
    Distraction,
}

impl AppSettings {
    pub fn processes(&self, list: ProcessList) -> &[String] {
        match list {
            ProcessList::Work => &self.work_processes,
            ProcessList::Passive => &self.passive_processes,
            ProcessList::Distraction => &self.distraction_processes,
        }
    }

    fn processes_mut(&mut self, list: ProcessList) -> &mut Vec<String> {
        match list {
            ProcessList::Work => &mut self.work_processes,
            ProcessList::Passive => &mut self.passive_processes,
            ProcessList::Distraction => &mut self.distraction_processes,
        }
    }

    /// Keywords are stored trimmed and lowercased. Returns false for blanks and duplicates.
    pub fn add_process(&mut self, list: ProcessList, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return false;
        }
        let entries = self.processes_mut(list);
        if entries.iter().any(|existing| *existing == keyword) {
            return false;
        }
        entries.push(keyword);
        true
    }

    pub fn remove_process(&mut self, list: ProcessList, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        let entries = self.processes_mut(list);
        let before = entries.len();
        entries.retain(|existing| *existing != keyword);
        entries.len() != before
    }

    pub fn add_tag_rule(&mut self, keyword: &str, tag: &str) -> bool {
        let keyword = keyword.trim();
        let tag = tag.trim();
        if keyword.is_empty() || tag.is_empty() || self.tag_rules.contains_key(keyword) {
            return false;
        }
        self.tag_rules.insert(keyword.to_owned(), tag.to_owned());
        true
    }

    pub fn remove_tag_rule(&mut self, keyword: &str) -> bool {
        self.tag_rules.remove(keyword.trim()).is_some()
    }

    /// Moves a task's color entry to its new name.
    pub fn rename_task_color(&mut self, old: &str, new: &str) {
        if let Some(color) = self.task_colors.remove(old) {
            self.task_colors.insert(new.to_owned(), color);
        }
    }
}
