use crate::clock::{local_minutes, Ticker};
use crate::config::{load_config, write_default_config, Config};
use crate::cursor::{Notifier, Silent};
use crate::grid::{format_hour12, SlotLayout, MINUTES_PER_DAY};
use crate::model::{MarkerColor, PlanError};
use crate::paint::Tool;
use crate::planner::Planner;
use crate::registry::Categories;
use crate::storage::{
    init_project_store, load_state, locate_store, FileStore, StoreLocation, StoreScope, StoreSink,
};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::io::Write;
use std::time::Instant;

const MARKER_KEYS: &str = "123456789abcdefghijklmnopqrstuvwxyz";

pub struct Workspace {
    pub planner: Planner,
    pub config: Config,
    pub store: FileStore,
}

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    let config_path = write_default_config(&location)?;
    let workspace = open_at(location)?;
    println!(
        "Initialized planner at {} (config {})",
        workspace.store.location().dir.display(),
        config_path.display()
    );
    Ok(())
}

pub fn show() -> Result<()> {
    let workspace = open_workspace()?;
    let planner = &workspace.planner;
    let layout = planner.layout();
    let categories = planner.categories();
    let grid = planner.grid();
    let now = layout.slot_at_minutes(local_minutes());

    println!("{}", scope_line(workspace.store.location()));
    for hour in 0..24 {
        let mut row = format!("{:>5} ", format_hour12(hour));
        for segment in 0..layout.slots_per_hour() {
            let idx = layout.index_of(hour, segment);
            let slot = grid.slot(idx);
            let key = slot
                .category_id
                .as_deref()
                .and_then(|id| categories.position(id))
                .map(marker_key)
                .unwrap_or('.');
            let tag = if slot.todo_ids.is_empty() { ' ' } else { '+' };
            let open = if idx == now { '>' } else { ' ' };
            row.push(open);
            row.push(key);
            row.push(tag);
        }
        println!("{}", row);
    }
    println!();
    print_markers(categories, planner.tool());
    println!();
    for (span, category_id) in grid.runs() {
        let name = categories
            .get(category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        println!(
            "{}-{} {}",
            layout.label(span.start),
            layout.end_label(span.end),
            name
        );
        let todo_ids = &grid.slot(span.start).todo_ids;
        for text in planner.todos().texts_for(todo_ids) {
            println!("    • {}", text);
        }
    }
    Ok(())
}

pub fn paint(from: String, to: Option<String>, marker: Option<String>) -> Result<()> {
    let mut workspace = open_workspace()?;
    let planner = &mut workspace.planner;
    let tool = match marker {
        Some(reference) => Tool::marker(resolve_marker(planner.categories(), &reference)?),
        None => planner.tool().clone(),
    };
    planner.set_tool(tool)?;
    let (start, end) = parse_span(planner, &from, to.as_deref())?;
    let changed = planner.paint_span(start, end)?;
    let name = planner
        .tool()
        .category_id()
        .and_then(|id| planner.categories().get(id))
        .map(|c| c.name.clone())
        .unwrap_or_default();
    println!(
        "Painted {}-{} with {} ({} slots changed)",
        planner.layout().label(start.min(end)),
        planner.layout().end_label(start.max(end)),
        name,
        changed
    );
    Ok(())
}

pub fn erase(from: String, to: Option<String>) -> Result<()> {
    let mut workspace = open_workspace()?;
    let planner = &mut workspace.planner;
    planner.set_tool(Tool::Eraser)?;
    let (start, end) = parse_span(planner, &from, to.as_deref())?;
    let changed = planner.paint_span(start, end)?;
    println!(
        "Erased {}-{} ({} slots changed)",
        planner.layout().label(start.min(end)),
        planner.layout().end_label(start.max(end)),
        changed
    );
    Ok(())
}

pub fn assign(todo_id: String, at: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let planner = &mut workspace.planner;
    let index = parse_slot(planner.layout(), &at)?;
    let span = planner
        .assign_todo(&todo_id, index)
        .with_context(|| format!("assigning {} at {}", todo_id, at))?;
    println!(
        "Assigned {} to {}-{}",
        todo_id,
        planner.layout().label(span.start),
        planner.layout().end_label(span.end)
    );
    Ok(())
}

pub fn unassign(todo_id: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let touched = workspace.planner.unassign_todo(&todo_id)?;
    println!("Detached {} from {} slots", todo_id, touched);
    Ok(())
}

pub fn reset() -> Result<()> {
    let mut workspace = open_workspace()?;
    workspace.planner.reset_grid();
    println!("Grid cleared");
    Ok(())
}

pub fn now() -> Result<()> {
    let workspace = open_workspace()?;
    let planner = &workspace.planner;
    let idx = planner.layout().slot_at_minutes(local_minutes());
    let slot = planner.grid().slot(idx);
    let name = slot
        .category_id
        .as_deref()
        .and_then(|id| planner.categories().get(id))
        .map(|c| c.name.as_str())
        .unwrap_or("(free)");
    println!(
        "{}-{} {}",
        planner.layout().label(idx),
        planner.layout().end_label(idx),
        name
    );
    for text in planner.todos().texts_for(&slot.todo_ids) {
        println!("    • {}", text);
    }
    Ok(())
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, title: &str, body: &[String]) {
        if let Err(err) = write_notice(&mut std::io::stdout(), title, body) {
            log::debug!("failed to print notice: {}", err);
        }
    }
}

fn write_notice(out: &mut impl Write, title: &str, body: &[String]) -> std::io::Result<()> {
    let stamp = chrono::Local::now().format("%H:%M");
    writeln!(out, "\x07[{}] {}", stamp, title)?;
    for line in body {
        writeln!(out, "    {}", line)?;
    }
    out.flush()
}

pub fn watch() -> Result<()> {
    let mut workspace = open_workspace()?;
    let mut ticker = Ticker::new(workspace.config.tick_interval());
    let mut console = ConsoleNotifier;
    let mut silent = Silent;
    let notifier: &mut dyn Notifier = if workspace.config.notifications {
        &mut console
    } else {
        &mut silent
    };
    println!(
        "Watching {} (every {}s, Ctrl-C to stop)",
        workspace.store.location().dir.display(),
        workspace.config.tick_seconds
    );
    loop {
        let now = Instant::now();
        if ticker.poll(now) {
            // Pick up edits made by other processes since the last tick
            workspace.planner.hydrate(load_state(&workspace.store));
            workspace.planner.tick(local_minutes(), notifier);
        }
        std::thread::sleep(ticker.remaining(Instant::now()));
    }
}

pub fn marker_list() -> Result<()> {
    let workspace = open_workspace()?;
    print_markers(workspace.planner.categories(), workspace.planner.tool());
    Ok(())
}

pub fn marker_add(name: Option<String>, color: Option<String>) -> Result<()> {
    let mut workspace = open_workspace()?;
    let color = color.map(|c| c.parse::<MarkerColor>()).transpose()?;
    let id = workspace.planner.add_category(name, color);
    let category = workspace
        .planner
        .categories()
        .get(&id)
        .ok_or_else(|| anyhow!("marker {} vanished", id))?;
    println!(
        "Added marker {}: {} ({})",
        category.id, category.name, category.color
    );
    Ok(())
}

pub fn marker_rename(marker: String, name: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let id = resolve_marker(workspace.planner.categories(), &marker)?;
    workspace.planner.rename_category(&id, &name)?;
    println!("Renamed {} to {}", id, name.trim());
    Ok(())
}

pub fn marker_color(marker: String, color: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let id = resolve_marker(workspace.planner.categories(), &marker)?;
    let color: MarkerColor = color.parse()?;
    workspace.planner.recolor_category(&id, color)?;
    println!("Marker {} is now {}", id, color);
    Ok(())
}

pub fn marker_rm(marker: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let id = resolve_marker(workspace.planner.categories(), &marker)?;
    workspace
        .planner
        .delete_category(&id)
        .with_context(|| format!("deleting marker {}", id))?;
    println!("Deleted marker {}", id);
    Ok(())
}

pub fn todo_list() -> Result<()> {
    let workspace = open_workspace()?;
    let planner = &workspace.planner;
    if planner.todos().is_empty() {
        println!("(no todos)");
    }
    for todo in planner.todos().iter() {
        let slots = planner
            .grid()
            .slots()
            .iter()
            .filter(|s| s.todo_ids.contains(&todo.id))
            .count();
        println!(
            "[{}] {}: {}{}",
            if todo.completed { "x" } else { " " },
            todo.id,
            todo.text,
            if slots > 0 {
                format!(" ({} slots)", slots)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

pub fn todo_add(text: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let id = workspace.planner.add_todo(&text)?;
    println!("Added todo {}", id);
    Ok(())
}

pub fn todo_edit(todo_id: String, text: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    workspace.planner.edit_todo(&todo_id, &text)?;
    println!("Updated todo {}", todo_id);
    Ok(())
}

pub fn todo_done(todo_id: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    let completed = workspace.planner.toggle_todo(&todo_id)?;
    println!(
        "Todo {} marked {}",
        todo_id,
        if completed { "done" } else { "open" }
    );
    Ok(())
}

pub fn todo_rm(todo_id: String) -> Result<()> {
    let mut workspace = open_workspace()?;
    workspace.planner.delete_todo(&todo_id)?;
    println!("Deleted todo {}", todo_id);
    Ok(())
}

pub fn tui() -> Result<()> {
    let workspace = open_workspace()?;
    ui::run(workspace)
}

pub fn open_workspace() -> Result<Workspace> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd)?;
    open_at(location)
}

fn open_at(location: StoreLocation) -> Result<Workspace> {
    let config = load_config(&location)?;
    let store = FileStore::new(location);
    log::info!("using store {:?}", store.location().dir);
    let state = load_state(&store);
    let planner = Planner::new(
        config.layout(),
        state,
        Box::new(StoreSink::new(store.clone())),
    );
    Ok(Workspace {
        planner,
        config,
        store,
    })
}

fn scope_line(location: &StoreLocation) -> String {
    format!(
        "Day plan ({}) {}",
        match location.scope {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        },
        location.dir.display()
    )
}

fn print_markers(categories: &Categories, tool: &Tool) {
    for (idx, category) in categories.iter().enumerate() {
        let active = if tool.category_id() == Some(category.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{}{} {} ({}) [{}]",
            active,
            marker_key(idx),
            category.name,
            category.color,
            category.id
        );
    }
}

pub fn marker_key(idx: usize) -> char {
    MARKER_KEYS.chars().nth(idx).unwrap_or('#')
}

fn resolve_marker(categories: &Categories, reference: &str) -> Result<String> {
    categories
        .find(reference)
        .map(|c| c.id.clone())
        .ok_or_else(|| PlanError::CategoryNotFound(reference.to_string()).into())
}

fn parse_span(planner: &Planner, from: &str, to: Option<&str>) -> Result<(usize, usize)> {
    let start = parse_slot(planner.layout(), from)?;
    let end = match to {
        Some(raw) => parse_slot(planner.layout(), raw)?,
        None => start,
    };
    Ok((start, end))
}

pub fn parse_slot(layout: &SlotLayout, input: &str) -> Result<usize> {
    let raw = input.trim();
    if let Some((h, m)) = raw.split_once(':') {
        let hours: u32 = h
            .parse()
            .map_err(|_| anyhow!("invalid time (use HH:MM): {}", raw))?;
        let minutes: u32 = m
            .parse()
            .map_err(|_| anyhow!("invalid time (use HH:MM): {}", raw))?;
        let total = hours
            .checked_mul(60)
            .and_then(|base| base.checked_add(minutes))
            .filter(|total| minutes < 60 && *total < MINUTES_PER_DAY)
            .ok_or_else(|| anyhow!("time out of range: {}", raw))?;
        return Ok(layout.slot_at_minutes(total));
    }
    let index: usize = raw
        .parse()
        .map_err(|_| anyhow!("expected HH:MM or a slot index, got {}", raw))?;
    if index >= layout.slot_count() {
        return Err(PlanError::SlotOutOfRange {
            index,
            len: layout.slot_count(),
        }
        .into());
    }
    Ok(index)
}
