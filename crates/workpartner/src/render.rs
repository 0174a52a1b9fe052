use chrono::{DateTime, Local};
use uuid::Uuid;
use workpartner_core::analysis::{FocusSummary, GoldenTime, OverallStats, TaskTotal, WorkRestPattern};
use workpartner_core::format_duration;
use workpartner_core::shop::{AvatarLayer, ItemStatus, ShopItem};
use workpartner_core::tasks::color_for_task;
use workpartner_core::todos::TodoItem;
use workpartner_core::{TimeLogEntry, Workspace};

pub fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

fn clock(t: DateTime<Local>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn print_tasks(ws: &Workspace) {
    if ws.tasks().is_empty() {
        println!("No tasks yet. Add one with `workpartner task add <name>`.");
        return;
    }
    for task in ws.tasks().items() {
        let color = color_for_task(ws.settings(), ws.tasks(), &task.text);
        println!("{color}  {}", task.text);
    }
}

pub fn print_todo_tree(items: &[&TodoItem]) {
    if items.is_empty() {
        println!("Nothing to do.");
        return;
    }
    for item in items {
        print_todo(item, 0);
    }
}

fn print_todo(item: &TodoItem, depth: usize) {
    let mark = if item.is_completed { "x" } else { " " };
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        format!("  {}", item.tags.join(" "))
    };
    println!(
        "{indent}[{mark}] {text}  ({id}){tags}",
        indent = "    ".repeat(depth),
        text = item.text,
        id = short_id(item.id),
    );
    for child in &item.sub_tasks {
        print_todo(child, depth + 1);
    }
}

pub fn print_logs(logs: &[TimeLogEntry]) {
    if logs.is_empty() {
        println!("No sessions recorded.");
        return;
    }
    println!(
        "{:>6}  {:<19}  {:<19}  {:>8}  {:>5}  TASK",
        "ID", "START", "END", "DURATION", "FOCUS"
    );
    for entry in logs {
        let score = if entry.is_rated() {
            entry.focus_score.to_string()
        } else {
            "-".to_owned()
        };
        println!(
            "{:>6}  {:<19}  {:<19}  {:>8}  {:>5}  {}",
            entry.id.map(|id| id.to_string()).unwrap_or_default(),
            clock(entry.start_time),
            clock(entry.end_time),
            format_duration(entry.duration()),
            score,
            entry.task_text,
        );
    }
}

pub fn print_entry(label: &str, entry: &TimeLogEntry) {
    println!(
        "{label}: #{} {} | {} -> {} ({})",
        entry.id.map(|id| id.to_string()).unwrap_or_default(),
        entry.task_text,
        clock(entry.start_time),
        clock(entry.end_time),
        format_duration(entry.duration()),
    );
}

pub fn print_overall(stats: &OverallStats) {
    println!("Total time:      {}", format_duration(stats.total));
    println!("Days tracked:    {}", stats.days);
    println!("Longest session: {}", format_duration(stats.longest_session));
    match stats.peak_hour {
        Some(hour) => println!("Peak hour:       {hour:02}:00 - {:02}:00", (hour + 1) % 24),
        None => println!("Peak hour:       -"),
    }

    let max = stats.hourly_minutes.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return;
    }
    println!();
    for (hour, minutes) in stats.hourly_minutes.iter().enumerate() {
        if *minutes <= 0.0 {
            continue;
        }
        let width = ((minutes / max) * 40.0).round().max(1.0) as usize;
        println!("{hour:02}h {:<40} {:>6.1} min", "#".repeat(width), minutes);
    }
}

pub fn print_focus(summary: Option<&FocusSummary>) {
    let Some(summary) = summary else {
        println!("No rated sessions yet.");
        return;
    };
    println!("Average focus:   {:.2}/5", summary.overall_average);
    for task in &summary.by_task {
        println!(
            "  {:<24} {:.2}/5  ({})",
            task.task,
            task.average_score,
            format_duration(task.total)
        );
    }
}

pub fn print_totals(totals: &[TaskTotal]) {
    if totals.is_empty() {
        println!("No time recorded in this range.");
        return;
    }
    for total in totals {
        println!("  {:<24} {}", total.task, format_duration(total.total));
    }
}

pub fn print_golden(golden: Option<&GoldenTime>) {
    match golden {
        Some(g) => println!(
            "Golden time:     {:?} {:02}:00 (avg focus {:.2}{})",
            g.weekday,
            g.hour,
            g.average_score,
            g.peak_task
                .as_deref()
                .map(|task| format!(", mostly {task}"))
                .unwrap_or_default()
        ),
        None => println!("Golden time:     rate at least 3 sessions to find it"),
    }
}

pub fn print_work_rest(pattern: Option<&WorkRestPattern>) {
    match pattern {
        Some(p) => println!(
            "Best rhythm:     ~{} min work, ~{} min rest (next session avg {:.2})",
            p.work_minutes, p.rest_minutes, p.average_next_score
        ),
        None => println!("Best rhythm:     rate at least 5 sessions to find it"),
    }
}

pub fn print_items(items: &[(&ShopItem, ItemStatus)]) {
    if items.is_empty() {
        println!("No items.");
        return;
    }
    for (item, status) in items {
        let state = match (status.owned, status.equipped) {
            (_, true) => "equipped",
            (true, false) => "owned",
            (false, false) => "",
        };
        println!(
            "{}  {:<14} {:<24} {:>6}  {}",
            short_id(item.id),
            format!("{:?}", item.item_type),
            item.name,
            item.price,
            state
        );
    }
}

pub fn print_avatar(layers: &[AvatarLayer<'_>]) {
    if layers.is_empty() {
        println!("Nothing equipped.");
        return;
    }
    for layer in layers {
        println!(
            "{:>3}  {:<14} {:<24} {}  {}",
            layer.item.item_type.layer(),
            format!("{:?}", layer.item.item_type),
            layer.item.name,
            layer.item.image_path,
            layer.tint.as_deref().unwrap_or("")
        );
    }
}
