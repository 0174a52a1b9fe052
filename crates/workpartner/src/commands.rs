use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use uuid::Uuid;
use workpartner_core::analysis::{self, DateRange, RangePreset};
use workpartner_core::exchange::parse_local_datetime;
use workpartner_core::focus::{
    FocusPredictor, HistoricalPredictor, PredictionInput, LOW_FOCUS_THRESHOLD, PEAK_FOCUS_THRESHOLD,
};
use workpartner_core::shop::{ItemCatalog, ItemType};
use workpartner_core::todos::{suggest_tags, TodoItem, TodoList};
use workpartner_core::{DataPaths, TimeLogEntry, Workspace};

use crate::cli::{
    ClosetAction, Command, LogAction, MemoAction, SettingsAction, ShopAction, TaskAction, TodoAction,
};
use crate::render;

pub fn execute(ws: &mut Workspace, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Task { action } => task(ws, action),
        Command::Todo { action } => todo(ws, action, json),
        Command::Log { action } => log(ws, action, json),
        Command::Settings { action } => settings(ws, action),
        Command::Shop { action } => shop(ws, action),
        Command::Closet { action } => closet(ws, action),
        Command::Stats { range, from, to } => {
            let (range, label) = match (from, to) {
                (Some(from), Some(to)) => {
                    let range = DateRange::between(parse_date(&from)?, parse_date(&to)?);
                    (range, range.label())
                }
                _ => {
                    let preset = RangePreset::from(range);
                    (DateRange::for_preset(today(), preset), preset.label().to_owned())
                }
            };
            stats(ws, range, &label)
        }
        Command::Predict { task, at } => predict(ws, &task, at.as_deref()),
        Command::Export { path } => {
            let count = ws.export_logs(&path)?;
            println!("Exported {count} sessions to {}", path.display());
            Ok(())
        }
        Command::Import { path } => {
            let report = ws.import_logs(&path)?;
            if report.entries.is_empty() {
                bail!("{} contains no valid rows", path.display());
            }
            println!(
                "Imported {} of {} rows ({} skipped)",
                report.entries.len(),
                report.total_rows,
                report.skipped_rows
            );
            Ok(())
        }
        Command::Backup { path } => {
            ws.backup_logs(&path)?;
            println!("Ledger copied to {}", path.display());
            Ok(())
        }
        Command::Memo { action } => match action {
            MemoAction::Show => {
                print!("{}", ws.memo()?);
                Ok(())
            }
            MemoAction::Set { text } => Ok(ws.save_memo(&text)?),
        },
        Command::Status => status(ws),
        Command::Reset { .. } => bail!("reset is handled before the workspace is opened"),
    }
}

/// Deletes the data directory contents. Needs `--yes`.
pub fn reset(paths: DataPaths, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("this deletes all tasks, todos, sessions and settings; pass --yes to confirm");
    }
    let ws = Workspace::open(paths)?;
    let removed = ws.reset()?;
    if removed.is_empty() {
        println!("Nothing to delete.");
    }
    for path in removed {
        println!("removed {}", path.display());
    }
    Ok(())
}

fn task(ws: &mut Workspace, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::List => render::print_tasks(ws),
        TaskAction::Add { name } => {
            let name = ws.add_task(&name)?;
            println!("Added task '{name}'");
        }
        TaskAction::Rename { old, new } => {
            let changed = ws.rename_task(&old, &new)?;
            println!("Renamed '{old}' to '{}' ({changed} sessions updated)", new.trim());
        }
        TaskAction::Delete { name } => {
            ws.delete_task(&name)?;
            println!("Deleted task '{name}'; its sessions are kept");
        }
        TaskAction::Color { name, color } => ws.set_task_color(&name, &color)?,
    }
    Ok(())
}

fn todo(ws: &mut Workspace, action: TodoAction, json: bool) -> Result<()> {
    match action {
        TodoAction::List { date } => {
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
            let items = ws.todos().for_date(date);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("Todos for {date}");
                render::print_todo_tree(&items);
            }
        }
        TodoAction::Add { text, date, parent } => {
            let id = match parent {
                Some(parent) => {
                    let parent = resolve_todo(ws.todos(), &parent)?;
                    ws.update_todos(|todos| todos.add_subtask(parent, &text))?
                }
                None => {
                    let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
                    ws.update_todos(|todos| Ok(todos.add(&text, date)))?
                        .ok_or_else(|| anyhow!("todo text must not be empty"))?
                }
            };
            println!("Added todo {}", render::short_id(id));
        }
        TodoAction::Done { id } => {
            let id = resolve_todo(ws.todos(), &id)?;
            let earned = ws.complete_todo(id, true)?;
            if earned > 0 {
                println!("Done! +{earned} coins (now {})", ws.settings().coins);
            } else {
                println!("Done!");
            }
        }
        TodoAction::Undo { id } => {
            let id = resolve_todo(ws.todos(), &id)?;
            ws.complete_todo(id, false)?;
        }
        TodoAction::Remove { id } => {
            let id = resolve_todo(ws.todos(), &id)?;
            let removed = ws.update_todos(|todos| todos.remove(id))?;
            println!("Removed '{}'", removed.text);
        }
        TodoAction::Edit { id, text } => {
            let id = resolve_todo(ws.todos(), &id)?;
            ws.update_todos(|todos| todos.set_text(id, &text))?;
        }
        TodoAction::Move { id, date } => {
            let id = resolve_todo(ws.todos(), &id)?;
            let date = parse_date(&date)?;
            ws.update_todos(|todos| todos.set_date(id, date))?;
        }
        TodoAction::Tag { id, tag } => {
            let id = resolve_todo(ws.todos(), &id)?;
            if !ws.update_todos(|todos| todos.add_tag(id, &tag))? {
                println!("Tag not added (blank or already present)");
            }
        }
        TodoAction::Suggest { id, task } => {
            let id = resolve_todo(ws.todos(), &id)?;
            let item = ws
                .todos()
                .find(id)
                .ok_or_else(|| anyhow!("todo {id} not found"))?;
            for tag in suggest_tags(item, task.as_deref(), &ws.settings().tag_rules) {
                println!("{tag}");
            }
        }
    }
    Ok(())
}

fn log(ws: &mut Workspace, action: LogAction, json: bool) -> Result<()> {
    match action {
        LogAction::List { from, to, task } => {
            let range = DateRange {
                from: from.as_deref().map(parse_date).transpose()?,
                to: to.as_deref().map(parse_date).transpose()?,
            };
            let logs: Vec<TimeLogEntry> = ws
                .db()
                .list_all()?
                .into_iter()
                .filter(|e| range.contains(e.start_time.date_naive()))
                .filter(|e| task.as_deref().map_or(true, |t| e.task_text.eq_ignore_ascii_case(t)))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                render::print_logs(&logs);
            }
        }
        LogAction::Add {
            task,
            start,
            end,
            score,
        } => {
            let task = canonical_task(ws, &task)?;
            let mut entry = TimeLogEntry::new(parse_time(&start)?, parse_time(&end)?, &task);
            entry.focus_score = score;
            let stored = ws.record_session(entry)?;
            render::print_entry("Added", &stored);
        }
        LogAction::Edit {
            id,
            task,
            start,
            end,
        } => {
            let mut entry = ws.db().get(id)?;
            if let Some(task) = task {
                entry.task_text = canonical_task(ws, &task)?;
            }
            if let Some(start) = start {
                entry.start_time = parse_time(&start)?;
            }
            if let Some(end) = end {
                entry.end_time = parse_time(&end)?;
            }
            ws.db_mut().update(id, &entry)?;
            render::print_entry("Updated", &entry);
        }
        LogAction::Rate { id, score, breaks } => {
            ws.db_mut().rate(id, score, &breaks)?;
            println!("Session #{id} rated {score}/5");
        }
        LogAction::Delete { id } => {
            ws.db_mut().delete(id)?;
            println!("Deleted session #{id}");
        }
        LogAction::Reassign { start, end, task } => {
            let changed = ws.reassign_logs(parse_time(&start)?, parse_time(&end)?, &task)?;
            println!("{changed} sessions moved to '{task}'");
        }
        LogAction::Unrated => match ws.db().latest_unrated()? {
            Some(entry) => render::print_entry("Unrated", &entry),
            None => println!("Every session is rated."),
        },
    }
    Ok(())
}

fn settings(ws: &mut Workspace, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => println!("{}", serde_json::to_string_pretty(ws.settings())?),
        SettingsAction::AddProcess { list, keyword } => {
            if !ws.update_settings(|s| s.add_process(list.into(), &keyword))? {
                println!("'{keyword}' is blank or already listed");
            }
        }
        SettingsAction::RemoveProcess { list, keyword } => {
            if !ws.update_settings(|s| s.remove_process(list.into(), &keyword))? {
                println!("'{keyword}' was not listed");
            }
        }
        SettingsAction::Idle { enabled, timeout } => {
            if timeout == Some(0) {
                bail!("--timeout must be greater than zero");
            }
            ws.update_settings(|s| {
                if let Some(enabled) = enabled {
                    s.is_idle_detection_enabled = enabled;
                }
                if let Some(timeout) = timeout {
                    s.idle_timeout_seconds = timeout;
                }
            })?;
        }
        SettingsAction::Nag { message, interval } => {
            if interval == Some(0) {
                bail!("--interval must be greater than zero");
            }
            ws.update_settings(|s| {
                if let Some(message) = message {
                    s.focus_mode_nag_message = message;
                }
                if let Some(interval) = interval {
                    s.focus_mode_nag_interval_seconds = interval;
                }
            })?;
        }
        SettingsAction::MiniTimer { enabled } => {
            ws.update_settings(|s| s.is_mini_timer_enabled = enabled)?;
        }
        SettingsAction::AddTagRule { keyword, tag } => {
            if !ws.update_settings(|s| s.add_tag_rule(&keyword, &tag))? {
                println!("Rule not added (blank or keyword already has a tag)");
            }
        }
        SettingsAction::RemoveTagRule { keyword } => {
            if !ws.update_settings(|s| s.remove_tag_rule(&keyword))? {
                println!("No rule for '{keyword}'");
            }
        }
    }
    Ok(())
}

fn shop(ws: &mut Workspace, action: ShopAction) -> Result<()> {
    match action {
        ShopAction::List => {
            println!("Coins: {}", ws.settings().coins);
            let rows: Vec<_> = ws
                .items()
                .shop_inventory()
                .into_iter()
                .map(|item| (item, ws.items().status(ws.settings(), item)))
                .collect();
            render::print_items(&rows);
        }
        ShopAction::Buy { id } => {
            let id = resolve_item(ws.items(), &id)?;
            let remaining = ws.purchase(id)?;
            println!("Bought! {remaining} coins left");
        }
    }
    Ok(())
}

fn closet(ws: &mut Workspace, action: ClosetAction) -> Result<()> {
    match action {
        ClosetAction::List { item_type } => {
            let items = match item_type.as_deref().map(parse_item_type).transpose()? {
                Some(item_type) => ws.items().of_type(item_type),
                None => ws.items().items().iter().collect(),
            };
            let rows: Vec<_> = items
                .into_iter()
                .map(|item| (item, ws.items().status(ws.settings(), item)))
                .filter(|(_, status)| status.owned)
                .collect();
            render::print_items(&rows);
            for (item_type, color) in &ws.settings().custom_colors {
                println!("{item_type:?}: {color}");
            }
        }
        ClosetAction::Equip { id } => {
            let id = resolve_item(ws.items(), &id)?;
            let equipped = ws.toggle_equip(id)?;
            println!("{}", if equipped { "Equipped" } else { "Unequipped" });
        }
        ClosetAction::Color { item_type, color } => {
            ws.set_custom_color(parse_item_type(&item_type)?, &color)?;
        }
        ClosetAction::Avatar => render::print_avatar(&ws.items().avatar_layers(ws.settings())),
    }
    Ok(())
}

fn stats(ws: &Workspace, range: DateRange, label: &str) -> Result<()> {
    let all = ws.db().list_all()?;
    let in_range = match range.local_bounds() {
        Some((start, end)) => ws.db().list_started_between(start, end)?,
        None => all
            .iter()
            .filter(|e| range.contains(e.start_time.date_naive()))
            .cloned()
            .collect(),
    };

    println!("Range: {label}");
    println!();
    render::print_overall(&analysis::overall_stats(&in_range));
    println!();
    render::print_focus(analysis::focus_summary(&in_range).as_ref());
    println!();
    println!("Time per task:");
    render::print_totals(&analysis::task_totals(&all, range));
    println!();
    render::print_golden(analysis::golden_time(&all).as_ref());
    render::print_work_rest(analysis::work_rest_pattern(&all).as_ref());
    Ok(())
}

fn predict(ws: &Workspace, task: &str, at: Option<&str>) -> Result<()> {
    let task = canonical_task(ws, task)?;
    let when = at.map(parse_time).transpose()?.unwrap_or_else(Local::now);
    let predictor = HistoricalPredictor::new(ws.db().list_all()?);
    let input = PredictionInput::at(&task, when);

    match predictor.predict(&input) {
        Some(score) => {
            println!(
                "Expected focus for {task} on {:?} at {:02}:00: {score:.1}/5",
                input.weekday, input.hour
            );
            if score >= PEAK_FOCUS_THRESHOLD {
                println!("This is one of your best times for {task}.");
            } else if score > 0.0 && score < LOW_FOCUS_THRESHOLD {
                println!("Focus tends to be low then; plan a break or a lighter task.");
            }
        }
        None => println!("No rated sessions for {task} yet."),
    }
    Ok(())
}

fn status(ws: &Workspace) -> Result<()> {
    let running = crate::daemon_running();
    println!(
        "Daemon:      {}",
        match running {
            Some(true) => "running",
            Some(false) => "stopped",
            None => "unknown on this platform",
        }
    );
    println!("Coins:       {}", ws.settings().coins);
    println!(
        "Mini timer:  {}",
        if ws.settings().is_mini_timer_enabled { "on" } else { "off" }
    );

    let logs = ws.db().list_all()?;
    let today = today();
    println!(
        "Today:       {}",
        workpartner_core::format_duration(analysis::day_total(&logs, today, None))
    );
    for task in ws.tasks().items() {
        let total = analysis::day_total(&logs, today, Some(&task.text));
        if total > chrono::Duration::zero() {
            println!("  {:<24} {}", task.text, workpartner_core::format_duration(total));
        }
    }
    let open_todos = ws.todos().for_date(today).iter().filter(|t| !t.is_completed).count();
    println!("Open todos:  {open_todos}");
    if let Some(entry) = ws.db().latest_unrated()? {
        render::print_entry("Rate me", &entry);
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn parse_time(value: &str) -> Result<DateTime<Local>> {
    parse_local_datetime(value)
        .ok_or_else(|| anyhow!("invalid time '{value}', expected YYYY-MM-DD HH:MM[:SS]"))
}

fn parse_item_type(value: &str) -> Result<ItemType> {
    ItemType::parse(value).ok_or_else(|| anyhow!("unknown item type '{value}'"))
}

fn canonical_task(ws: &Workspace, name: &str) -> Result<String> {
    ws.tasks()
        .find(name)
        .map(|task| task.text.clone())
        .ok_or_else(|| anyhow!("task '{name}' not found"))
}

fn resolve_todo(todos: &TodoList, prefix: &str) -> Result<Uuid> {
    let mut ids = Vec::new();
    collect_ids(todos.items(), &mut ids);
    resolve_prefix(ids, prefix, "todo")
}

fn collect_ids(items: &[TodoItem], out: &mut Vec<Uuid>) {
    for item in items {
        out.push(item.id);
        collect_ids(&item.sub_tasks, out);
    }
}

fn resolve_item(catalog: &ItemCatalog, prefix: &str) -> Result<Uuid> {
    resolve_prefix(catalog.items().iter().map(|item| item.id).collect(), prefix, "item")
}

/// Accepts a full id or a unique prefix of its hex form.
fn resolve_prefix(ids: Vec<Uuid>, prefix: &str, what: &str) -> Result<Uuid> {
    let wanted = prefix.trim().to_ascii_lowercase().replace('-', "");
    if wanted.is_empty() {
        bail!("{what} id must not be empty");
    }
    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.simple().to_string().starts_with(&wanted))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no {what} matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} {what}s; use more characters", matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_resolve_uniquely() {
        let a = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let b = Uuid::parse_str("67e5aaaa-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(resolve_prefix(vec![a, b], "67e550", "todo").unwrap(), a);
        assert_eq!(
            resolve_prefix(vec![a, b], "67E5AAAA-10b1", "todo").unwrap(),
            b
        );
        assert!(resolve_prefix(vec![a, b], "67e5", "todo").is_err());
        assert!(resolve_prefix(vec![a, b], "ffff", "todo").is_err());
        assert!(resolve_prefix(vec![a], " ", "todo").is_err());
    }

    #[test]
    fn mini_timer_toggle_persists_and_status_reads_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::open(DataPaths::new(dir.path())).unwrap();
        execute(
            &mut ws,
            Command::Settings {
                action: SettingsAction::MiniTimer { enabled: true },
            },
            false,
        )
        .unwrap();
        assert!(ws.settings().is_mini_timer_enabled);
        assert!(status(&ws).is_ok());

        let reopened = Workspace::open(DataPaths::new(dir.path())).unwrap();
        assert!(reopened.settings().is_mini_timer_enabled);
    }

    #[test]
    fn stats_and_closet_filters_run_on_empty_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::open(DataPaths::new(dir.path())).unwrap();
        let today = Command::Stats {
            range: crate::cli::RangeArg::Today,
            from: None,
            to: None,
        };
        assert!(execute(&mut ws, today, false).is_ok());
        let closet = Command::Closet {
            action: ClosetAction::List {
                item_type: Some("HairStyle".to_owned()),
            },
        };
        assert!(execute(&mut ws, closet, false).is_ok());
    }

    #[test]
    fn dates_and_times_parse() {
        assert_eq!(
            parse_date("2025-03-03").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert!(parse_date("03/03/2025").is_err());
        assert!(parse_time("2025-03-03 09:30").is_ok());
        assert!(parse_time("yesterday").is_err());
    }
}
