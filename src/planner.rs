use crate::cursor::{Notifier, SlotNotification, TimeCursor};
use crate::grid::{Grid, RunSpan, SlotLayout};
use crate::model::{CategoryId, MarkerColor, PlanError, TodoId};
use crate::paint::{PaintSession, Tool};
use crate::registry::{self, Categories, Todos};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Categories,
    Todos,
    Grid,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [StoreKey::Categories, StoreKey::Todos, StoreKey::Grid];

    pub fn name(&self) -> &'static str {
        match self {
            StoreKey::Categories => "categories",
            StoreKey::Todos => "todos",
            StoreKey::Grid => "grid",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Categories(&'a Categories),
    Todos(&'a Todos),
    Grid(&'a Grid),
}

impl Record<'_> {
    pub fn key(&self) -> StoreKey {
        match self {
            Record::Categories(_) => StoreKey::Categories,
            Record::Todos(_) => StoreKey::Todos,
            Record::Grid(_) => StoreKey::Grid,
        }
    }
}

pub trait SnapshotSink {
    fn persist(&mut self, record: Record<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    pub categories: Categories,
    pub todos: Todos,
    pub grid: Option<Grid>,
    pub stale: Vec<StoreKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragItem {
    Todo(TodoId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Slot(usize),
}

pub struct Planner {
    layout: SlotLayout,
    categories: Categories,
    todos: Todos,
    grid: Grid,
    tool: Tool,
    session: PaintSession,
    cursor: TimeCursor,
    drag: Option<DragItem>,
    sink: Box<dyn SnapshotSink>,
}

impl Planner {
    pub fn new(layout: SlotLayout, state: PlannerState, sink: Box<dyn SnapshotSink>) -> Self {
        let mut planner = Planner {
            layout,
            categories: Categories::default(),
            todos: Todos::default(),
            grid: Grid::for_layout(&layout),
            tool: Tool::default(),
            session: PaintSession::default(),
            cursor: TimeCursor::new(layout),
            drag: None,
            sink,
        };
        planner.hydrate(state);
        planner
    }

    /// Replaces the whole state with a loaded snapshot. A grid of the wrong
    /// length is discarded and references to unknown records are dropped.
    /// Records that had to be defaulted or repaired are persisted again.
    pub fn hydrate(&mut self, state: PlannerState) {
        let expected = self.layout.slot_count();
        let mut dirty = state.stale;
        let mut grid = match state.grid {
            Some(grid) if grid.len() == expected => grid,
            Some(grid) => {
                log::warn!(
                    "stored grid has {} slots, expected {}; starting empty",
                    grid.len(),
                    expected
                );
                dirty.push(StoreKey::Grid);
                Grid::new(expected)
            }
            None => {
                dirty.push(StoreKey::Grid);
                Grid::new(expected)
            }
        };
        let scrubbed = grid.scrub(&state.categories.ids(), &state.todos.ids());
        if scrubbed > 0 {
            log::warn!("repaired references in {} slots", scrubbed);
            dirty.push(StoreKey::Grid);
        }
        self.tool = Tool::marker(state.categories.first().id.clone());
        self.categories = state.categories;
        self.todos = state.todos;
        self.grid = grid;
        self.session.release();
        self.drag = None;

        dirty.sort_by_key(|k| StoreKey::ALL.iter().position(|a| a == k));
        dirty.dedup();
        self.emit(&dirty);
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn todos(&self) -> &Todos {
        &self.todos
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_drawing()
    }

    pub fn active_drag(&self) -> Option<&DragItem> {
        self.drag.as_ref()
    }

    pub fn now_slot(&self) -> Option<usize> {
        self.cursor.current()
    }

    pub fn set_tool(&mut self, tool: Tool) -> Result<(), PlanError> {
        if let Some(id) = tool.category_id() {
            if self.categories.get(id).is_none() {
                return Err(PlanError::CategoryNotFound(id.to_string()));
            }
        }
        self.tool = tool;
        Ok(())
    }

    // Painting

    pub fn pointer_down(&mut self, index: usize) -> bool {
        let changed = self.session.pointer_down(&mut self.grid, index, &self.tool);
        if changed {
            self.emit(&[StoreKey::Grid]);
        }
        changed
    }

    pub fn pointer_enter(&mut self, index: usize) -> bool {
        let changed = self.session.pointer_enter(&mut self.grid, index, &self.tool);
        if changed {
            self.emit(&[StoreKey::Grid]);
        }
        changed
    }

    pub fn pointer_release(&mut self) {
        self.session.release();
    }

    pub fn paint_span(&mut self, start: usize, end: usize) -> Result<usize, PlanError> {
        self.grid.ensure_index(start)?;
        self.grid.ensure_index(end)?;
        let order: Vec<usize> = if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        };
        let mut changed = 0;
        for (n, idx) in order.into_iter().enumerate() {
            let painted = if n == 0 {
                self.pointer_down(idx)
            } else {
                self.pointer_enter(idx)
            };
            if painted {
                changed += 1;
            }
        }
        self.pointer_release();
        Ok(changed)
    }

    pub fn reset_grid(&mut self) {
        self.grid.reset();
        self.emit(&[StoreKey::Grid]);
    }

    // Todo assignment

    pub fn drag_start(&mut self, item: DragItem) -> Result<(), PlanError> {
        match &item {
            DragItem::Todo(id) => {
                if self.todos.get(id).is_none() {
                    return Err(PlanError::TodoNotFound(id.clone()));
                }
            }
        }
        self.drag = Some(item);
        Ok(())
    }

    pub fn drag_end(&mut self, target: Option<DropTarget>) -> Result<Option<RunSpan>, PlanError> {
        let item = self.drag.take().ok_or(PlanError::NoActiveDrag)?;
        let Some(DropTarget::Slot(index)) = target else {
            return Ok(None);
        };
        match item {
            DragItem::Todo(todo_id) => self.assign_todo(&todo_id, index).map(Some),
        }
    }

    pub fn assign_todo(&mut self, todo_id: &str, index: usize) -> Result<RunSpan, PlanError> {
        if self.todos.get(todo_id).is_none() {
            return Err(PlanError::TodoNotFound(todo_id.to_string()));
        }
        let span = self.grid.assign_todo_to_run(index, todo_id)?;
        self.emit(&[StoreKey::Grid]);
        Ok(span)
    }

    pub fn unassign_todo(&mut self, todo_id: &str) -> Result<usize, PlanError> {
        if self.todos.get(todo_id).is_none() {
            return Err(PlanError::TodoNotFound(todo_id.to_string()));
        }
        let touched = self.grid.remove_todo_everywhere(todo_id);
        if touched > 0 {
            self.emit(&[StoreKey::Grid]);
        }
        Ok(touched)
    }

    pub fn remove_todo_from_slot(&mut self, index: usize, todo_id: &str) -> bool {
        let removed = self.grid.remove_todo_at(index, todo_id);
        if removed {
            self.emit(&[StoreKey::Grid]);
        }
        removed
    }

    // Categories

    pub fn add_category(&mut self, name: Option<String>, color: Option<MarkerColor>) -> CategoryId {
        let id = self.categories.create(name, color).id.clone();
        self.tool = Tool::marker(id.clone());
        self.emit(&[StoreKey::Categories]);
        id
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<(), PlanError> {
        self.categories.rename(id, name)?;
        self.emit(&[StoreKey::Categories]);
        Ok(())
    }

    pub fn recolor_category(&mut self, id: &str, color: MarkerColor) -> Result<(), PlanError> {
        self.categories.recolor(id, color)?;
        self.emit(&[StoreKey::Categories]);
        Ok(())
    }

    pub fn cycle_category_color(&mut self, id: &str) -> Result<MarkerColor, PlanError> {
        let color = self.categories.cycle_color(id)?;
        self.emit(&[StoreKey::Categories]);
        Ok(color)
    }

    pub fn delete_category(&mut self, id: &str) -> Result<(), PlanError> {
        let replacement = self
            .categories
            .replacement_for(id)
            .map(|c| c.id.clone());
        registry::delete_category(&mut self.categories, &mut self.grid, id)?;
        if self.tool.category_id() == Some(id) {
            if let Some(next) = replacement {
                self.tool = Tool::marker(next);
            }
        }
        self.emit(&[StoreKey::Categories, StoreKey::Grid]);
        Ok(())
    }

    // Todos

    pub fn add_todo(&mut self, text: &str) -> Result<TodoId, PlanError> {
        let id = self.todos.add(text)?.id.clone();
        self.emit(&[StoreKey::Todos]);
        Ok(id)
    }

    pub fn edit_todo(&mut self, id: &str, text: &str) -> Result<(), PlanError> {
        self.todos.set_text(id, text)?;
        self.emit(&[StoreKey::Todos]);
        Ok(())
    }

    pub fn toggle_todo(&mut self, id: &str) -> Result<bool, PlanError> {
        let completed = self.todos.toggle(id)?;
        self.emit(&[StoreKey::Todos]);
        Ok(completed)
    }

    pub fn delete_todo(&mut self, id: &str) -> Result<(), PlanError> {
        registry::delete_todo(&mut self.todos, &mut self.grid, id)?;
        if self.drag == Some(DragItem::Todo(id.to_string())) {
            self.drag = None;
        }
        self.emit(&[StoreKey::Todos, StoreKey::Grid]);
        Ok(())
    }

    // Clock

    pub fn tick(
        &mut self,
        minutes_since_midnight: u32,
        notifier: &mut dyn Notifier,
    ) -> Option<SlotNotification> {
        let notification = self.cursor.tick(
            minutes_since_midnight,
            &self.grid,
            &self.categories,
            &self.todos,
        )?;
        log::info!(
            "entered slot {} ({})",
            self.layout.label(notification.slot),
            notification.category_name
        );
        if notifier.available() {
            notifier.notify(notification.title(), &notification.body_lines());
        }
        Some(notification)
    }

    fn emit(&mut self, keys: &[StoreKey]) {
        for key in keys {
            let record = match key {
                StoreKey::Categories => Record::Categories(&self.categories),
                StoreKey::Todos => Record::Todos(&self.todos),
                StoreKey::Grid => Record::Grid(&self.grid),
            };
            if let Err(err) = self.sink.persist(record) {
                log::warn!("failed to persist {}: {:#}", key.name(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<StoreKey>>>);

    impl SnapshotSink for Recorder {
        fn persist(&mut self, record: Record<'_>) -> Result<()> {
            self.0.borrow_mut().push(record.key());
            Ok(())
        }
    }

    struct Discard;

    impl SnapshotSink for Discard {
        fn persist(&mut self, _record: Record<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct Failing;

    impl SnapshotSink for Failing {
        fn persist(&mut self, _record: Record<'_>) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[derive(Default)]
    struct Collect {
        shown: Vec<(String, Vec<String>)>,
        available: bool,
    }

    impl Notifier for Collect {
        fn available(&self) -> bool {
            self.available
        }

        fn notify(&mut self, title: &str, body: &[String]) {
            self.shown.push((title.to_string(), body.to_vec()));
        }
    }

    fn state_xy() -> PlannerState {
        PlannerState {
            categories: Categories::from_vec(vec![
                Category::new("X".into(), "Focus", MarkerColor::Blue500),
                Category::new("Y".into(), "Admin", MarkerColor::Teal500),
            ])
            .unwrap(),
            todos: Todos::default(),
            grid: Some(Grid::new(96)),
            stale: Vec::new(),
        }
    }

    fn planner() -> (Planner, Recorder) {
        let recorder = Recorder::default();
        let planner = Planner::new(
            SlotLayout::default(),
            state_xy(),
            Box::new(recorder.clone()),
        );
        (planner, recorder)
    }

    #[test]
    fn test_defaults_to_first_marker() {
        let (planner, _) = planner();
        assert_eq!(planner.grid().len(), 96);
        assert_eq!(planner.tool(), &Tool::marker("X"));
    }

    #[test]
    fn test_hydrate_persists_defaulted_records() {
        let recorder = Recorder::default();
        let mut state = state_xy();
        state.grid = None;
        state.stale = vec![StoreKey::Todos, StoreKey::Categories];
        Planner::new(SlotLayout::default(), state, Box::new(recorder.clone()));
        assert_eq!(*recorder.0.borrow(), StoreKey::ALL.to_vec());
    }

    #[test]
    fn test_hydrate_discards_wrong_sized_grid() {
        let mut state = state_xy();
        let mut grid = Grid::new(48);
        grid.paint(0, &Tool::marker("X"));
        state.grid = Some(grid);
        let planner = Planner::new(SlotLayout::default(), state, Box::new(Discard));
        assert_eq!(planner.grid().len(), 96);
        assert_eq!(planner.grid().painted_count(), 0);
    }

    #[test]
    fn test_hydrate_scrubs_unknown_category() {
        let mut state = state_xy();
        let mut grid = Grid::new(96);
        grid.paint(3, &Tool::marker("gone"));
        grid.paint(4, &Tool::marker("X"));
        state.grid = Some(grid);
        let planner = Planner::new(SlotLayout::default(), state, Box::new(Discard));
        assert!(planner.grid().slot(3).is_blank());
        assert_eq!(planner.grid().category_at(4), Some("X"));
    }

    #[test]
    fn test_hydrate_collapses_repeated_todo_tags() {
        let recorder = Recorder::default();
        let mut state = state_xy();
        let todo = state.todos.add("stretch").unwrap().id.clone();
        let mut grid = Grid::new(96);
        grid.paint(5, &Tool::marker("X"));
        grid.slot_mut(5).todo_ids = vec![todo.clone(), todo.clone()];
        state.grid = Some(grid);
        let planner = Planner::new(SlotLayout::default(), state, Box::new(recorder.clone()));
        assert_eq!(planner.grid().slot(5).todo_ids, vec![todo]);
        assert_eq!(*recorder.0.borrow(), vec![StoreKey::Grid]);
    }

    #[test]
    fn test_drag_gesture_persists_each_change() {
        let (mut planner, recorder) = planner();
        planner.pointer_down(10);
        planner.pointer_enter(11);
        planner.pointer_enter(11);
        planner.pointer_release();
        planner.pointer_enter(12);
        assert_eq!(planner.grid().run_at(10), Some(RunSpan { start: 10, end: 11 }));
        assert_eq!(*recorder.0.borrow(), vec![StoreKey::Grid, StoreKey::Grid]);
    }

    #[test]
    fn test_paint_span_backwards() {
        let (mut planner, _) = planner();
        assert_eq!(planner.paint_span(7, 4), Ok(4));
        assert_eq!(planner.grid().run_at(5), Some(RunSpan { start: 4, end: 7 }));
        assert!(!planner.is_drawing());
        assert!(planner.paint_span(0, 96).is_err());
    }

    #[test]
    fn test_drag_and_drop_assigns_run() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("draft agenda").unwrap();
        planner.paint_span(8, 11).unwrap();

        planner.drag_start(DragItem::Todo(todo.clone())).unwrap();
        let span = planner.drag_end(Some(DropTarget::Slot(9))).unwrap();
        assert_eq!(span, Some(RunSpan { start: 8, end: 11 }));
        assert!(planner.active_drag().is_none());
        for idx in 8..=11 {
            assert_eq!(planner.grid().slot(idx).todo_ids, vec![todo.clone()]);
        }
    }

    #[test]
    fn test_cancelled_drop_is_noop() {
        let (mut planner, recorder) = planner();
        let todo = planner.add_todo("read").unwrap();
        recorder.0.borrow_mut().clear();
        planner.drag_start(DragItem::Todo(todo)).unwrap();
        assert_eq!(planner.drag_end(None), Ok(None));
        assert!(recorder.0.borrow().is_empty());
        assert_eq!(planner.drag_end(None), Err(PlanError::NoActiveDrag));
    }

    #[test]
    fn test_drop_on_unpainted_slot_rejected() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("read").unwrap();
        planner.drag_start(DragItem::Todo(todo)).unwrap();
        assert_eq!(
            planner.drag_end(Some(DropTarget::Slot(3))),
            Err(PlanError::UnpaintedSlot(3))
        );
        assert!(planner.active_drag().is_none());
    }

    #[test]
    fn test_delete_active_category_moves_tool() {
        let (mut planner, recorder) = planner();
        planner.paint_span(5, 5).unwrap();
        recorder.0.borrow_mut().clear();

        planner.delete_category("X").unwrap();
        assert_eq!(planner.tool(), &Tool::marker("Y"));
        assert!(planner.grid().slot(5).is_blank());
        assert_eq!(
            *recorder.0.borrow(),
            vec![StoreKey::Categories, StoreKey::Grid]
        );
        assert_eq!(planner.delete_category("Y"), Err(PlanError::LastCategory));
        assert_eq!(planner.categories().len(), 1);
    }

    #[test]
    fn test_delete_other_category_keeps_tool() {
        let (mut planner, _) = planner();
        planner.delete_category("Y").unwrap();
        assert_eq!(planner.tool(), &Tool::marker("X"));
    }

    #[test]
    fn test_eraser_tool_survives_category_delete() {
        let (mut planner, _) = planner();
        planner.set_tool(Tool::Eraser).unwrap();
        planner.delete_category("X").unwrap();
        assert!(planner.tool().is_eraser());
    }

    #[test]
    fn test_set_tool_rejects_unknown_category() {
        let (mut planner, _) = planner();
        assert!(planner.set_tool(Tool::marker("nope")).is_err());
        assert_eq!(planner.tool(), &Tool::marker("X"));
    }

    #[test]
    fn test_add_category_becomes_active() {
        let (mut planner, _) = planner();
        let id = planner.add_category(None, None);
        assert_eq!(planner.tool().category_id(), Some(id.as_str()));
        assert_eq!(planner.categories().get(&id).unwrap().name, "New Task");
    }

    #[test]
    fn test_delete_todo_cascades_and_cancels_drag() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("call").unwrap();
        planner.paint_span(2, 5).unwrap();
        planner.assign_todo(&todo, 2).unwrap();
        planner.drag_start(DragItem::Todo(todo.clone())).unwrap();

        planner.delete_todo(&todo).unwrap();
        assert!(planner.active_drag().is_none());
        assert!(planner.grid().slots().iter().all(|s| s.todo_ids.is_empty()));
    }

    #[test]
    fn test_unassign_keeps_todo() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("gym").unwrap();
        planner.paint_span(0, 3).unwrap();
        planner.assign_todo(&todo, 0).unwrap();
        assert_eq!(planner.unassign_todo(&todo), Ok(4));
        assert!(planner.todos().get(&todo).is_some());
        assert_eq!(planner.unassign_todo(&todo), Ok(0));
    }

    #[test]
    fn test_tick_notifies_when_available() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("write tests").unwrap();
        planner.paint_span(37, 40).unwrap();
        planner.assign_todo(&todo, 37).unwrap();

        let mut notifier = Collect {
            available: true,
            ..Collect::default()
        };
        assert!(planner.tick(9 * 60, &mut notifier).is_none());
        assert!(planner.tick(9 * 60 + 15, &mut notifier).is_some());
        assert!(planner.tick(9 * 60 + 30, &mut notifier).is_none());
        assert_eq!(notifier.shown.len(), 1);
        assert_eq!(
            notifier.shown[0].1,
            vec!["Time for: Focus".to_string(), "• write tests".to_string()]
        );
        assert_eq!(planner.now_slot(), Some(38));
    }

    #[test]
    fn test_tick_without_notifier_still_tracks() {
        let (mut planner, _) = planner();
        planner.paint_span(1, 1).unwrap();
        let mut notifier = Collect::default();
        planner.tick(0, &mut notifier);
        assert!(planner.tick(15, &mut notifier).is_some());
        assert!(notifier.shown.is_empty());
        assert_eq!(planner.now_slot(), Some(1));
    }

    #[test]
    fn test_failing_sink_does_not_block_mutation() {
        let mut planner = Planner::new(SlotLayout::default(), state_xy(), Box::new(Failing));
        assert!(planner.pointer_down(0));
        assert_eq!(planner.grid().category_at(0), Some("X"));
    }

    #[test]
    fn test_slot_count_never_changes() {
        let (mut planner, _) = planner();
        let todo = planner.add_todo("a").unwrap();
        planner.paint_span(0, 95).unwrap();
        planner.assign_todo(&todo, 50).unwrap();
        planner.set_tool(Tool::Eraser).unwrap();
        planner.paint_span(10, 20).unwrap();
        planner.delete_category("X").unwrap();
        planner.reset_grid();
        planner.delete_todo(&todo).unwrap();
        assert_eq!(planner.grid().len(), 96);
    }
}
