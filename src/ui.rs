use crate::clock::{local_minutes, Ticker};
use crate::commands::{marker_key, Workspace};
use crate::cursor::{Notifier, Silent};
use crate::grid::{format_hour12, format_minutes};
use crate::model::PlanError;
use crate::paint::Tool;
use crate::planner::{DragItem, DropTarget};
use crate::registry::NEW_CATEGORY_NAME;
use crate::storage::StoreScope;
use anyhow::Result;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::ListState;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout, Write};
use std::time::{Duration, Instant};

const HOUR_LABEL_WIDTH: u16 = 6;

pub fn run(workspace: Workspace) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(workspace);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    workspace: Workspace,
    cursor: usize,
    focus: Focus,
    selected_marker: usize,
    selected_todo: usize,
    status: String,
    mode: Mode,
    ticker: Ticker,
    popup: PopupNotifier,
    hits: HitMap,
}

enum Mode {
    Normal,
    Input { target: InputTarget, field: FieldValue },
    Confirm(Pending),
}

enum InputTarget {
    NewTodo,
    EditTodo(String),
    RenameMarker(String),
}

enum Pending {
    DeleteMarker(String),
    DeleteTodo(String),
    ResetGrid,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    Grid,
    Markers,
    Todos,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::Markers,
            Focus::Markers => Focus::Todos,
            Focus::Todos => Focus::Grid,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Grid => Focus::Todos,
            Focus::Markers => Focus::Grid,
            Focus::Todos => Focus::Markers,
        }
    }
}

#[derive(Default)]
struct HitMap {
    slots: Vec<(Rect, usize)>,
    markers: Vec<(Rect, usize)>,
    todos: Vec<(Rect, usize)>,
}

impl HitMap {
    fn clear(&mut self) {
        self.slots.clear();
        self.markers.clear();
        self.todos.clear();
    }

    fn slot_at(&self, column: u16, row: u16) -> Option<usize> {
        lookup(&self.slots, column, row)
    }

    fn marker_at(&self, column: u16, row: u16) -> Option<usize> {
        lookup(&self.markers, column, row)
    }

    fn todo_at(&self, column: u16, row: u16) -> Option<usize> {
        lookup(&self.todos, column, row)
    }
}

struct Notice {
    title: String,
    body: Vec<String>,
}

#[derive(Default)]
struct PopupNotifier {
    notice: Option<Notice>,
}

impl Notifier for PopupNotifier {
    fn notify(&mut self, title: &str, body: &[String]) {
        self.notice = Some(Notice {
            title: title.to_string(),
            body: body.to_vec(),
        });
        let mut out = stdout();
        if let Err(err) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            log::debug!("failed to ring bell: {}", err);
        }
    }
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn home(&mut self) {
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.cursor = self.value.len();
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(workspace: Workspace) -> Self {
        let status = format!(
            "Loaded plan from {}",
            workspace.store.location().dir.display()
        );
        let ticker = Ticker::new(workspace.config.tick_interval());
        let cursor = workspace.planner.layout().slot_at_minutes(local_minutes());
        App {
            workspace,
            cursor,
            focus: Focus::Grid,
            selected_marker: 0,
            selected_todo: 0,
            status,
            mode: Mode::Normal,
            ticker,
            popup: PopupNotifier::default(),
            hits: HitMap::default(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.ticker.is_cancelled() {
            if self.ticker.poll(Instant::now()) {
                self.tick_clock();
            }
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                let quit = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => {
                        self.handle_mouse(mouse);
                        false
                    }
                    // The clock may have moved a lot while we were in the background
                    Event::FocusGained => {
                        self.ticker.resync();
                        false
                    }
                    _ => false,
                };
                if quit {
                    self.ticker.cancel();
                }
            }
        }
        Ok(())
    }

    fn tick_clock(&mut self) {
        let minutes = local_minutes();
        let planner = &mut self.workspace.planner;
        let notification = if self.workspace.config.notifications {
            planner.tick(minutes, &mut self.popup)
        } else {
            planner.tick(minutes, &mut Silent)
        };
        if let Some(notification) = notification {
            self.status = notification.body_lines().join("  ");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.popup.notice.take().is_some() {
            return false;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Input { .. } => {
                self.handle_input_key(key);
                false
            }
            Mode::Confirm(_) => {
                self.handle_confirm_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return false;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return false;
            }
            KeyCode::Esc => {
                self.cancel_gestures();
                return false;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                if idx < self.workspace.planner.categories().len() {
                    self.selected_marker = idx;
                    self.choose_marker(idx);
                }
                return false;
            }
            _ => {}
        }
        match self.focus {
            Focus::Grid => self.handle_grid_key(key),
            Focus::Markers => self.handle_marker_key(key),
            Focus::Todos => self.handle_todo_key(key),
        }
        false
    }

    fn handle_grid_key(&mut self, key: KeyEvent) {
        let per_hour = self.workspace.planner.layout().slots_per_hour() as isize;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-per_hour),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(per_hour),
            KeyCode::Char(' ') => {
                if self.workspace.planner.is_drawing() {
                    self.workspace.planner.pointer_release();
                    self.status = "Stopped drawing".into();
                } else {
                    self.workspace.planner.pointer_down(self.cursor);
                    self.status = "Drawing: move to paint, Space to stop".into();
                }
            }
            KeyCode::Enter => self.drop_at(Some(self.cursor)),
            KeyCode::Char('e') => self.toggle_eraser(),
            KeyCode::Char('x') => self.untag_cursor_slot(),
            KeyCode::Char('R') => self.mode = Mode::Confirm(Pending::ResetGrid),
            _ => {}
        }
    }

    fn handle_marker_key(&mut self, key: KeyEvent) {
        let count = self.workspace.planner.categories().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_marker = self.selected_marker.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                // one extra row for the eraser
                self.selected_marker = (self.selected_marker + 1).min(count);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.choose_marker(self.selected_marker),
            KeyCode::Char('e') => self.toggle_eraser(),
            KeyCode::Char('n') => {
                let id = self.workspace.planner.add_category(None, None);
                self.selected_marker = self.workspace.planner.categories().len() - 1;
                self.status = format!("Added marker {}", id);
                self.mode = Mode::Input {
                    target: InputTarget::RenameMarker(id),
                    field: FieldValue::new(NEW_CATEGORY_NAME),
                };
            }
            KeyCode::Char('r') => {
                if let Some((id, name)) = self.selected_category() {
                    self.mode = Mode::Input {
                        target: InputTarget::RenameMarker(id),
                        field: FieldValue::new(&name),
                    };
                }
            }
            KeyCode::Char('c') => {
                if let Some((id, name)) = self.selected_category() {
                    match self.workspace.planner.cycle_category_color(&id) {
                        Ok(color) => self.status = format!("{} is now {}", name, color),
                        Err(err) => self.reject(err),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some((id, _)) = self.selected_category() {
                    self.mode = Mode::Confirm(Pending::DeleteMarker(id));
                }
            }
            _ => {}
        }
    }

    fn handle_todo_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_todo = self.selected_todo.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.workspace.planner.todos().len();
                if self.selected_todo + 1 < count {
                    self.selected_todo += 1;
                }
            }
            KeyCode::Char('n') => {
                self.mode = Mode::Input {
                    target: InputTarget::NewTodo,
                    field: FieldValue::new(""),
                };
            }
            KeyCode::Char('e') => {
                if let Some((id, text)) = self.selected_todo_entry() {
                    self.mode = Mode::Input {
                        target: InputTarget::EditTodo(id),
                        field: FieldValue::new(&text),
                    };
                }
            }
            KeyCode::Char(' ') => {
                if let Some((id, text)) = self.selected_todo_entry() {
                    match self.workspace.planner.toggle_todo(&id) {
                        Ok(done) => {
                            self.status = format!(
                                "{} marked {}",
                                text,
                                if done { "done" } else { "open" }
                            )
                        }
                        Err(err) => self.reject(err),
                    }
                }
            }
            KeyCode::Char('u') => {
                if let Some((id, text)) = self.selected_todo_entry() {
                    match self.workspace.planner.unassign_todo(&id) {
                        Ok(n) => self.status = format!("Detached {} from {} slots", text, n),
                        Err(err) => self.reject(err),
                    }
                }
            }
            KeyCode::Char('g') => self.grab_selected_todo(),
            KeyCode::Char('d') => {
                if let Some((id, _)) = self.selected_todo_entry() {
                    self.mode = Mode::Confirm(Pending::DeleteTodo(id));
                }
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close = false;
        if let Mode::Input { target, field } = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Enter => close = self.submit_input(target, &field.value),
                KeyCode::Left => field.move_left(),
                KeyCode::Right => field.move_right(),
                KeyCode::Home => field.home(),
                KeyCode::End => field.end(),
                KeyCode::Backspace => field.backspace(),
                KeyCode::Char(c) => {
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    {
                        field.insert_char(c);
                    }
                }
                _ => {}
            }
        }
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn submit_input(&mut self, target: &InputTarget, text: &str) -> bool {
        let planner = &mut self.workspace.planner;
        let result = match target {
            InputTarget::NewTodo => planner.add_todo(text).map(|id| {
                self.selected_todo = planner.todos().len().saturating_sub(1);
                format!("Added todo {}", id)
            }),
            InputTarget::EditTodo(id) => planner
                .edit_todo(id, text)
                .map(|_| format!("Updated todo {}", id)),
            InputTarget::RenameMarker(id) => planner
                .rename_category(id, text)
                .map(|_| format!("Renamed marker to {}", text.trim())),
        };
        match result {
            Ok(message) => {
                self.status = message;
                true
            }
            Err(err) => {
                self.reject(err);
                false
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let pending = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Confirm(pending) => pending,
            other => {
                self.mode = other;
                return;
            }
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.apply(pending),
            KeyCode::Char('n') | KeyCode::Esc => self.status = "Canceled".into(),
            _ => self.mode = Mode::Confirm(pending),
        }
    }

    fn apply(&mut self, pending: Pending) {
        let planner = &mut self.workspace.planner;
        let result = match &pending {
            Pending::DeleteMarker(id) => planner
                .delete_category(id)
                .map(|_| format!("Deleted marker {}", id)),
            Pending::DeleteTodo(id) => planner
                .delete_todo(id)
                .map(|_| format!("Deleted todo {}", id)),
            Pending::ResetGrid => {
                planner.reset_grid();
                Ok("Grid cleared".to_string())
            }
        };
        match result {
            Ok(message) => self.status = message,
            Err(err) => self.reject(err),
        }
        self.ensure_bounds();
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.popup.notice.take().is_some() || !matches!(self.mode, Mode::Normal) {
                    return;
                }
                if let Some(idx) = self.hits.slot_at(column, row) {
                    self.focus = Focus::Grid;
                    self.cursor = idx;
                    self.workspace.planner.pointer_down(idx);
                } else if let Some(idx) = self.hits.marker_at(column, row) {
                    self.focus = Focus::Markers;
                    self.selected_marker = idx;
                    self.choose_marker(idx);
                } else if let Some(idx) = self.hits.todo_at(column, row) {
                    self.focus = Focus::Todos;
                    self.selected_todo = idx;
                    self.grab_selected_todo();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(idx) = self.hits.slot_at(column, row) {
                    if self.workspace.planner.is_drawing()
                        || self.workspace.planner.active_drag().is_some()
                    {
                        self.cursor = idx;
                    }
                    self.workspace.planner.pointer_enter(idx);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.workspace.planner.pointer_release();
                if self.workspace.planner.active_drag().is_some() {
                    let target = self.hits.slot_at(column, row);
                    self.drop_at(target);
                }
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let last = self.workspace.planner.grid().len() as isize - 1;
        let next = (self.cursor as isize + delta).clamp(0, last) as usize;
        if next == self.cursor {
            return;
        }
        self.cursor = next;
        self.workspace.planner.pointer_enter(next);
    }

    fn cancel_gestures(&mut self) {
        if self.workspace.planner.is_drawing() {
            self.workspace.planner.pointer_release();
            self.status = "Stopped drawing".into();
        }
        if self.workspace.planner.active_drag().is_some() {
            self.drop_at(None);
        }
    }

    fn choose_marker(&mut self, idx: usize) {
        let categories = self.workspace.planner.categories();
        let (tool, label) = match categories.as_slice().get(idx) {
            Some(category) => (Tool::marker(category.id.clone()), category.name.clone()),
            None => (Tool::Eraser, "Eraser".to_string()),
        };
        match self.workspace.planner.set_tool(tool) {
            Ok(()) => self.status = format!("Tool: {}", label),
            Err(err) => self.reject(err),
        }
    }

    fn toggle_eraser(&mut self) {
        let count = self.workspace.planner.categories().len();
        if self.workspace.planner.tool().is_eraser() {
            let idx = if self.selected_marker < count {
                self.selected_marker
            } else {
                0
            };
            self.choose_marker(idx);
        } else {
            self.choose_marker(count);
        }
    }

    fn grab_selected_todo(&mut self) {
        let Some((id, text)) = self.selected_todo_entry() else {
            return;
        };
        match self.workspace.planner.drag_start(DragItem::Todo(id)) {
            Ok(()) => {
                self.focus = Focus::Grid;
                self.status = format!("Dragging \"{}\": drop it on a painted block", text);
            }
            Err(err) => self.reject(err),
        }
    }

    fn drop_at(&mut self, index: Option<usize>) {
        if self.workspace.planner.active_drag().is_none() {
            return;
        }
        let layout = *self.workspace.planner.layout();
        match self.workspace.planner.drag_end(index.map(DropTarget::Slot)) {
            Ok(Some(span)) => {
                self.status = format!(
                    "Assigned to {}-{}",
                    layout.label(span.start),
                    layout.end_label(span.end)
                )
            }
            Ok(None) => self.status = "Drag canceled".into(),
            Err(err) => self.reject(err),
        }
    }

    fn untag_cursor_slot(&mut self) {
        let Some(todo_id) = self
            .workspace
            .planner
            .grid()
            .slot(self.cursor)
            .todo_ids
            .last()
            .cloned()
        else {
            self.status = "No todos on this slot".into();
            return;
        };
        if self
            .workspace
            .planner
            .remove_todo_from_slot(self.cursor, &todo_id)
        {
            self.status = format!("Removed {} from this slot", todo_id);
        }
    }

    fn reject(&mut self, err: PlanError) {
        log::info!("rejected: {}", err);
        self.status = format!("Not done: {}", err);
    }

    fn selected_category(&self) -> Option<(String, String)> {
        self.workspace
            .planner
            .categories()
            .as_slice()
            .get(self.selected_marker)
            .map(|c| (c.id.clone(), c.name.clone()))
    }

    fn selected_todo_entry(&self) -> Option<(String, String)> {
        self.workspace
            .planner
            .todos()
            .as_slice()
            .get(self.selected_todo)
            .map(|t| (t.id.clone(), t.text.clone()))
    }

    fn ensure_bounds(&mut self) {
        let planner = &self.workspace.planner;
        self.selected_marker = self.selected_marker.min(planner.categories().len());
        self.selected_todo = self
            .selected_todo
            .min(planner.todos().len().saturating_sub(1));
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        self.hits.clear();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(14),
                Constraint::Length(6),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(layout[1]);
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(body[0]);
        self.draw_day_half(f, halves[0], 0, "AM");
        self.draw_day_half(f, halves[1], 12, "PM");

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(body[1]);
        self.draw_markers(f, side[0]);
        self.draw_todos(f, side[1]);

        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Input { target, field } => self.draw_input(f, target, field),
            Mode::Confirm(pending) => self.draw_confirm(f, pending),
            Mode::Normal => {}
        }
        if let Some(notice) = &self.popup.notice {
            draw_notice(f, notice);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let location = self.workspace.store.location();
        let scope = match location.scope {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        };
        let planner = &self.workspace.planner;
        let now = planner
            .now_slot()
            .map(|idx| planner.layout().label(idx))
            .unwrap_or_else(|| "--:--".into());
        let planned = planner.grid().painted_count() as u32 * planner.layout().slot_minutes();
        let (tool_label, tool_color) = match planner.tool() {
            Tool::Eraser => ("eraser".to_string(), Color::Gray),
            Tool::Marker(id) => match id.as_deref().and_then(|id| planner.categories().get(id)) {
                Some(category) => (category.name.clone(), rgb(category.color.rgb())),
                None => ("none".to_string(), Color::DarkGray),
            },
        };
        let mut spans = vec![
            Span::styled(
                "daysprint ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(scope, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", location.dir.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(format!("now {}", now), Style::default().fg(Color::Yellow)),
            Span::raw("  •  "),
            Span::styled(
                format!("planned {}", format_minutes(planned)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("tool {}", tool_label),
                Style::default().fg(tool_color).add_modifier(Modifier::BOLD),
            ),
        ];
        if planner.is_drawing() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                "drawing",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if planner.active_drag().is_some() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                "dragging todo",
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_day_half(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, first_hour: usize, title: &str) {
        let border = if self.focus == Focus::Grid {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title.to_string());
        let inner = block.inner(area);
        f.render_widget(block, area);

        let planner = &self.workspace.planner;
        let layout = planner.layout();
        let grid = planner.grid();
        let per_hour = layout.slots_per_hour();
        let cell_width = cell_width(inner.width.saturating_sub(HOUR_LABEL_WIDTH), per_hour);
        let now = planner.now_slot();
        let now_hour = now.map(|idx| layout.hour_of(idx));

        let mut lines = Vec::new();
        for row in 0..12u16 {
            if row >= inner.height {
                break;
            }
            let hour = first_hour + row as usize;
            let label_style = if now_hour == Some(hour) {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let mut spans = vec![Span::styled(
                format!("{:>5} ", format_hour12(hour)),
                label_style,
            )];
            for segment in 0..per_hour {
                let idx = layout.index_of(hour, segment);
                let x = inner.x + HOUR_LABEL_WIDTH + segment as u16 * cell_width;
                if x + cell_width <= inner.x + inner.width {
                    self.hits.slots.push((
                        Rect {
                            x,
                            y: inner.y + row,
                            width: cell_width,
                            height: 1,
                        },
                        idx,
                    ));
                }
                let slot = grid.slot(idx);
                let color = slot
                    .category_id
                    .as_deref()
                    .and_then(|id| planner.categories().get(id))
                    .map(|c| c.color.rgb());
                let mark = if now == Some(idx) {
                    '▶'
                } else if !slot.todo_ids.is_empty() {
                    '•'
                } else if slot.is_blank() {
                    '·'
                } else {
                    ' '
                };
                let run_start = color.is_some() && !grid.has_prev_same(idx);
                let run_end = color.is_some() && !grid.has_next_same(idx);
                let mut style = match color {
                    Some(c) => Style::default().bg(rgb(c)).fg(text_on(c)),
                    None => Style::default().fg(Color::DarkGray),
                };
                if idx == self.cursor {
                    style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
                }
                spans.push(Span::styled(
                    cell_text(cell_width as usize, run_start, run_end, mark),
                    style,
                ));
            }
            lines.push(Line::from(spans));
        }
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_markers(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let planner = &self.workspace.planner;
        let focused = self.focus == Focus::Markers;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
            .title("Markers");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let tool = planner.tool();
        let mut items: Vec<ListItem> = planner
            .categories()
            .iter()
            .enumerate()
            .map(|(idx, category)| {
                let active = tool.category_id() == Some(category.id.as_str());
                let painted = planner
                    .grid()
                    .slots()
                    .iter()
                    .filter(|s| s.category_id.as_deref() == Some(category.id.as_str()))
                    .count();
                let mut name_style = Style::default().fg(Color::White);
                if active {
                    name_style = name_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                }
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", marker_key(idx)),
                        Style::default().fg(Color::LightCyan),
                    ),
                    Span::styled("██ ", Style::default().fg(rgb(category.color.rgb()))),
                    Span::styled(category.name.clone(), name_style),
                    Span::styled(
                        format!("  {}", painted),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        let eraser_style = if tool.is_eraser() {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Gray)
        };
        items.push(ListItem::new(Line::from(vec![
            Span::styled("e ", Style::default().fg(Color::LightCyan)),
            Span::styled("░░ ", Style::default().fg(Color::Gray)),
            Span::styled("Eraser", eraser_style),
        ])));

        let count = items.len();
        let mut state = ListState::default();
        if focused {
            state.select(Some(self.selected_marker.min(count - 1)));
        }
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, inner, &mut state);
        self.hits.markers = row_hits(inner, state.offset(), count);
    }

    fn draw_todos(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let planner = &self.workspace.planner;
        let focused = self.focus == Focus::Todos;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
            .title("Todos");
        let inner = block.inner(area);
        f.render_widget(block, area);

        if planner.todos().is_empty() {
            let hint = Paragraph::new("No todos yet. Press n to add one.")
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true });
            f.render_widget(hint, inner);
            return;
        }

        let dragged = match planner.active_drag() {
            Some(DragItem::Todo(id)) => Some(id.as_str()),
            None => None,
        };
        let items: Vec<ListItem> = planner
            .todos()
            .iter()
            .map(|todo| {
                let slots = planner
                    .grid()
                    .slots()
                    .iter()
                    .filter(|s| s.todo_ids.contains(&todo.id))
                    .count();
                let mut text_style = if todo.completed {
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default().fg(Color::White)
                };
                if dragged == Some(todo.id.as_str()) {
                    text_style = text_style
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD);
                }
                let mut spans = vec![
                    Span::styled(
                        if todo.completed { "[x] " } else { "[ ] " },
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(
                        truncate_text(&todo.text, inner.width.saturating_sub(10) as usize),
                        text_style,
                    ),
                ];
                if slots > 0 {
                    spans.push(Span::styled(
                        format!("  {}", slots),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let count = items.len();
        let mut state = ListState::default();
        if focused {
            state.select(Some(self.selected_todo.min(count - 1)));
        }
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, inner, &mut state);
        self.hits.todos = row_hits(inner, state.offset(), count);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let (detail_lines, title) = self.slot_detail();
        let detail = Paragraph::new(detail_lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(title),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::LightCyan));
        let mut spans = vec![
            key("Tab"),
            Span::raw(" focus  "),
            key("1-9"),
            Span::raw(" marker  "),
        ];
        match self.focus {
            Focus::Grid => spans.extend([
                key("←↑↓→ / h j k l"),
                Span::raw(" move  "),
                key("Space"),
                Span::raw(" draw  "),
                key("Enter"),
                Span::raw(" drop  "),
                key("e"),
                Span::raw(" eraser  "),
                key("x"),
                Span::raw(" untag  "),
                key("R"),
                Span::raw(" reset  "),
            ]),
            Focus::Markers => spans.extend([
                key("Enter"),
                Span::raw(" use  "),
                key("n"),
                Span::raw(" new  "),
                key("r"),
                Span::raw(" rename  "),
                key("c"),
                Span::raw(" colour  "),
                key("d"),
                Span::raw(" delete  "),
            ]),
            Focus::Todos => spans.extend([
                key("n"),
                Span::raw(" new  "),
                key("e"),
                Span::raw(" edit  "),
                key("Space"),
                Span::raw(" done  "),
                key("g"),
                Span::raw(" grab  "),
                key("u"),
                Span::raw(" unassign  "),
                key("d"),
                Span::raw(" delete  "),
            ]),
        }
        spans.extend([key("Esc"), Span::raw(" cancel  "), key("q"), Span::raw(" quit")]);
        Line::from(spans)
    }

    fn slot_detail(&self) -> (Vec<Line<'static>>, String) {
        let planner = &self.workspace.planner;
        let layout = planner.layout();
        let grid = planner.grid();
        let title = format!("{}-{}", layout.label(self.cursor), layout.end_label(self.cursor));
        let slot = grid.slot(self.cursor);
        let category = slot
            .category_id
            .as_deref()
            .and_then(|id| planner.categories().get(id));
        let Some(category) = category else {
            return (vec![Line::from("Free")], title);
        };
        let mut lines = vec![Line::from(Span::styled(
            category.name.clone(),
            Style::default()
                .fg(rgb(category.color.rgb()))
                .add_modifier(Modifier::BOLD),
        ))];
        if let Some(span) = grid.run_at(self.cursor) {
            lines.push(Line::from(Span::styled(
                format!(
                    "block {}-{} ({} slots)",
                    layout.label(span.start),
                    layout.end_label(span.end),
                    span.len()
                ),
                Style::default().fg(Color::Gray),
            )));
        }
        for text in planner.todos().texts_for(&slot.todo_ids) {
            lines.push(Line::from(format!("• {}", text)));
        }
        (lines, title)
    }

    fn draw_input(&self, f: &mut ratatui::Frame<'_>, target: &InputTarget, field: &FieldValue) {
        let area = centered_rect(60, 20, f.size());
        let title = match target {
            InputTarget::NewTodo => "New Todo",
            InputTarget::EditTodo(_) => "Edit Todo",
            InputTarget::RenameMarker(_) => "Rename Marker",
        };
        let body = vec![
            Line::from(Span::styled(
                field.with_caret(),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to save • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body)
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, pending: &Pending) {
        let area = centered_rect(50, 30, f.size());
        let planner = &self.workspace.planner;
        let question = match pending {
            Pending::DeleteMarker(id) => format!(
                "Delete marker \"{}\" and blank its slots?",
                planner
                    .categories()
                    .get(id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(id.as_str())
            ),
            Pending::DeleteTodo(id) => format!(
                "Delete todo \"{}\"?",
                planner
                    .todos()
                    .get(id)
                    .map(|t| t.text.as_str())
                    .unwrap_or(id.as_str())
            ),
            Pending::ResetGrid => "Blank the whole day?".to_string(),
        };
        let body = vec![
            Line::from(Span::styled(
                question,
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        "Confirm",
                        Style::default()
                            .fg(Color::LightRed)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightRed)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn draw_notice(f: &mut ratatui::Frame<'_>, notice: &Notice) {
    let area = centered_rect(50, 30, f.size());
    let mut body: Vec<Line> = notice
        .body
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect();
    body.push(Line::from(""));
    body.push(Line::from(Span::styled(
        "Press any key to dismiss",
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    notice.title.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

fn lookup(hits: &[(Rect, usize)], column: u16, row: u16) -> Option<usize> {
    hits.iter()
        .find(|(rect, _)| contains(*rect, column, row))
        .map(|(_, idx)| *idx)
}

fn row_hits(area: Rect, offset: usize, count: usize) -> Vec<(Rect, usize)> {
    (offset..count)
        .take(area.height as usize)
        .enumerate()
        .map(|(row, idx)| {
            (
                Rect {
                    x: area.x,
                    y: area.y + row as u16,
                    width: area.width,
                    height: 1,
                },
                idx,
            )
        })
        .collect()
}

fn cell_width(available: u16, per_hour: usize) -> u16 {
    if per_hour == 0 {
        return 1;
    }
    (available / per_hour as u16).clamp(1, 4)
}

fn cell_text(width: usize, run_start: bool, run_end: bool, mark: char) -> String {
    match width {
        0 => String::new(),
        1 => mark.to_string(),
        2 => format!("{}{}", if run_start { '▏' } else { ' ' }, mark),
        _ => {
            let mut text = String::with_capacity(width + 6);
            text.push(if run_start { '▏' } else { ' ' });
            text.push(mark);
            text.extend(std::iter::repeat(' ').take(width - 3));
            text.push(if run_end { '▕' } else { ' ' });
            text
        }
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

fn text_on((r, g, b): (u8, u8, u8)) -> Color {
    let luma = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    if luma > 150_000 {
        Color::Black
    } else {
        Color::White
    }
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_editing_respects_char_boundaries() {
        let mut field = FieldValue::new("café");
        field.backspace();
        assert_eq!(field.value, "caf");
        field.move_left();
        field.move_left();
        field.insert_char('ü');
        assert_eq!(field.value, "cüaf");
        assert_eq!(field.with_caret(), "cü▌af");
        field.end();
        field.move_right();
        assert_eq!(field.cursor, field.value.len());
        field.home();
        field.backspace();
        assert_eq!(field.value, "cüaf");
    }

    #[test]
    fn test_lookup_finds_cell_under_pointer() {
        let hits = vec![
            (Rect::new(10, 2, 3, 1), 4),
            (Rect::new(13, 2, 3, 1), 5),
        ];
        assert_eq!(lookup(&hits, 10, 2), Some(4));
        assert_eq!(lookup(&hits, 15, 2), Some(5));
        assert_eq!(lookup(&hits, 16, 2), None);
        assert_eq!(lookup(&hits, 12, 3), None);
    }

    #[test]
    fn test_row_hits_follow_scroll_offset() {
        let area = Rect::new(0, 5, 20, 3);
        let hits = row_hits(area, 2, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], (Rect::new(0, 5, 20, 1), 2));
        assert_eq!(hits[2].1, 4);
        assert!(row_hits(area, 0, 0).is_empty());
    }

    #[test]
    fn test_cell_text_marks_run_edges() {
        assert_eq!(cell_text(3, true, false, '•'), "▏• ");
        assert_eq!(cell_text(4, false, true, ' '), "   ▕");
        assert_eq!(cell_text(2, true, true, '·'), "▏·");
        assert_eq!(cell_text(1, true, true, '▶'), "▶");
        assert_eq!(cell_width(80, 4), 4);
        assert_eq!(cell_width(10, 4), 2);
        assert_eq!(cell_width(0, 60), 1);
    }

    #[test]
    fn test_text_contrast() {
        assert_eq!(text_on((250, 204, 21)), Color::Black);
        assert_eq!(text_on((59, 130, 246)), Color::White);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer line", 8), "a lon...");
        assert_eq!(truncate_text("abcdef", 2), "ab");
    }
}
