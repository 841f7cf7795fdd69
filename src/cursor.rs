use crate::grid::{Grid, SlotLayout};
use crate::registry::{Categories, Todos};

pub const NOTIFICATION_TITLE: &str = "Action Period Started!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNotification {
    pub slot: usize,
    pub category_name: String,
    pub todo_texts: Vec<String>,
}

impl SlotNotification {
    pub fn title(&self) -> &'static str {
        NOTIFICATION_TITLE
    }

    pub fn body_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Time for: {}", self.category_name)];
        lines.extend(self.todo_texts.iter().map(|t| format!("• {}", t)));
        lines
    }
}

pub trait Notifier {
    fn available(&self) -> bool {
        true
    }

    fn notify(&mut self, title: &str, body: &[String]);
}

pub struct Silent;

impl Notifier for Silent {
    fn available(&self) -> bool {
        false
    }

    fn notify(&mut self, _title: &str, _body: &[String]) {}
}

#[derive(Debug, Clone)]
pub struct TimeCursor {
    layout: SlotLayout,
    previous: Option<usize>,
}

impl TimeCursor {
    pub fn new(layout: SlotLayout) -> Self {
        TimeCursor {
            layout,
            previous: None,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.previous
    }

    /// Records the slot for `minutes_since_midnight` and returns a
    /// notification when it was entered from a slot with another category.
    /// The first tick only records.
    pub fn tick(
        &mut self,
        minutes_since_midnight: u32,
        grid: &Grid,
        categories: &Categories,
        todos: &Todos,
    ) -> Option<SlotNotification> {
        let current = self.layout.slot_at_minutes(minutes_since_midnight);
        let previous = self.previous.replace(current)?;
        if previous == current {
            return None;
        }
        let entered = grid.slot(current);
        let category_id = entered.category_id.as_deref()?;
        if grid.category_at(previous) == Some(category_id) {
            return None;
        }
        let category = categories.get(category_id)?;
        Some(SlotNotification {
            slot: current,
            category_name: category.name.clone(),
            todo_texts: todos
                .texts_for(&entered.todo_ids)
                .map(str::to_string)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, MarkerColor};
    use crate::paint::Tool;

    fn setup() -> (Grid, Categories, Todos) {
        let cats = Categories::from_vec(vec![
            Category::new("A".into(), "Deep Work", MarkerColor::Blue500),
            Category::new("B".into(), "Meeting", MarkerColor::Purple500),
        ])
        .unwrap();
        (Grid::new(96), cats, Todos::default())
    }

    #[test]
    fn test_notifies_once_per_category_change() {
        let (mut grid, cats, todos) = setup();
        // slots 0..7 = [null, A, A, B, B, null, null]
        for (idx, cat) in [(1, "A"), (2, "A"), (3, "B"), (4, "B")] {
            grid.paint(idx, &Tool::marker(cat));
        }
        let mut cursor = TimeCursor::new(SlotLayout::default());
        let fired: Vec<_> = (0..7)
            .filter_map(|slot| cursor.tick(slot * 15, &grid, &cats, &todos))
            .map(|n| n.category_name)
            .collect();
        assert_eq!(fired, vec!["Deep Work", "Meeting"]);
    }

    #[test]
    fn test_cold_start_does_not_notify() {
        let (mut grid, cats, todos) = setup();
        grid.paint(4, &Tool::marker("A"));
        let mut cursor = TimeCursor::new(SlotLayout::default());
        assert!(cursor.tick(60, &grid, &cats, &todos).is_none());
        assert_eq!(cursor.current(), Some(4));
    }

    #[test]
    fn test_repeated_reads_of_same_slot_are_silent() {
        let (mut grid, cats, todos) = setup();
        grid.paint(1, &Tool::marker("A"));
        let mut cursor = TimeCursor::new(SlotLayout::default());
        cursor.tick(0, &grid, &cats, &todos);
        assert!(cursor.tick(15, &grid, &cats, &todos).is_some());
        for minute in 16..30 {
            assert!(cursor.tick(minute, &grid, &cats, &todos).is_none());
        }
    }

    #[test]
    fn test_compares_with_previous_observed_slot_only() {
        // A . A: leaving A for blank then re-entering A notifies again
        let (mut grid, cats, todos) = setup();
        grid.paint(0, &Tool::marker("A"));
        grid.paint(2, &Tool::marker("A"));
        let mut cursor = TimeCursor::new(SlotLayout::default());
        cursor.tick(0, &grid, &cats, &todos);
        assert!(cursor.tick(15, &grid, &cats, &todos).is_none());
        assert!(cursor.tick(30, &grid, &cats, &todos).is_some());
    }

    #[test]
    fn test_skipped_slots_compare_against_last_seen() {
        let (mut grid, cats, todos) = setup();
        grid.paint(0, &Tool::marker("A"));
        grid.paint(8, &Tool::marker("A"));
        let mut cursor = TimeCursor::new(SlotLayout::default());
        cursor.tick(0, &grid, &cats, &todos);
        // Jumped over the blank slots in between; category is unchanged
        assert!(cursor.tick(120, &grid, &cats, &todos).is_none());
        assert_eq!(cursor.current(), Some(8));
    }

    #[test]
    fn test_notification_carries_todo_texts() {
        let (mut grid, cats, mut todos) = setup();
        let t1 = todos.add("review PR").unwrap().id.clone();
        let t2 = todos.add("reply to mail").unwrap().id.clone();
        grid.paint(1, &Tool::marker("B"));
        grid.assign_todo_to_run(1, &t2).unwrap();
        grid.assign_todo_to_run(1, &t1).unwrap();

        let mut cursor = TimeCursor::new(SlotLayout::default());
        cursor.tick(10, &grid, &cats, &todos);
        let note = cursor.tick(20, &grid, &cats, &todos).unwrap();
        assert_eq!(note.slot, 1);
        assert_eq!(note.title(), NOTIFICATION_TITLE);
        assert_eq!(
            note.body_lines(),
            vec!["Time for: Meeting", "• reply to mail", "• review PR"]
        );
    }

    #[test]
    fn test_coarser_layout() {
        let (mut grid, cats, todos) = setup();
        grid.paint(1, &Tool::marker("A"));
        let mut cursor = TimeCursor::new(SlotLayout::new(30).unwrap());
        cursor.tick(29, &grid, &cats, &todos);
        assert!(cursor.tick(30, &grid, &cats, &todos).is_some());
    }
}
