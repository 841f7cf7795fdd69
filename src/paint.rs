use crate::grid::Grid;
use crate::model::CategoryId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Marker(Option<CategoryId>),
    Eraser,
}

impl Tool {
    pub fn marker(category_id: impl Into<CategoryId>) -> Self {
        Tool::Marker(Some(category_id.into()))
    }

    pub fn category_id(&self) -> Option<&str> {
        match self {
            Tool::Marker(id) => id.as_deref(),
            Tool::Eraser => None,
        }
    }

    pub fn is_eraser(&self) -> bool {
        matches!(self, Tool::Eraser)
    }
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Marker(None)
    }
}

impl Grid {
    /// Applies `tool` to the slot at `index`. Returns true when the slot
    /// changed. Repeating the same call is always a no-op.
    ///
    /// Erasing blanks the slot completely, todo references included.
    pub fn paint(&mut self, index: usize, tool: &Tool) -> bool {
        let slot = self.slot_mut(index);
        match tool {
            Tool::Eraser => {
                if slot.is_painted() {
                    slot.blank();
                    true
                } else {
                    false
                }
            }
            Tool::Marker(Some(category_id)) => {
                if slot.category_id.as_deref() == Some(category_id.as_str()) {
                    return false;
                }
                slot.category_id = Some(category_id.clone());
                true
            }
            Tool::Marker(None) => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PaintSession {
    drawing: bool,
}

impl PaintSession {
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn pointer_down(&mut self, grid: &mut Grid, index: usize, tool: &Tool) -> bool {
        self.drawing = true;
        grid.paint(index, tool)
    }

    pub fn pointer_enter(&mut self, grid: &mut Grid, index: usize, tool: &Tool) -> bool {
        if !self.drawing {
            return false;
        }
        grid.paint(index, tool)
    }

    pub fn release(&mut self) {
        self.drawing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::grid_from;

    fn tools() -> Vec<Tool> {
        vec![
            Tool::marker("A"),
            Tool::marker("B"),
            Tool::Eraser,
            Tool::Marker(None),
        ]
    }

    #[test]
    fn test_paint_is_idempotent() {
        for tool in tools() {
            for idx in 0..4 {
                let mut once = grid_from("A.B.");
                once.slot_mut(0).todo_ids.push("t1".into());
                once.paint(idx, &tool);
                let mut twice = once.clone();
                let changed = twice.paint(idx, &tool);
                assert!(!changed);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_eraser_clears_category_and_todos() {
        let mut grid = grid_from("AA");
        grid.slot_mut(1).todo_ids.push("t1".into());
        assert!(grid.paint(1, &Tool::Eraser));
        assert_eq!(grid.slot(1).category_id, None);
        assert!(grid.slot(1).todo_ids.is_empty());
        assert_eq!(grid.category_at(0), Some("A"));
    }

    #[test]
    fn test_eraser_on_blank_slot_is_noop() {
        let mut grid = grid_from("..");
        assert!(!grid.paint(0, &Tool::Eraser));
        assert!(grid.slot(0).is_blank());
    }

    #[test]
    fn test_marker_keeps_todos() {
        let mut grid = grid_from("A");
        grid.slot_mut(0).todo_ids.push("t1".into());
        assert!(grid.paint(0, &Tool::marker("B")));
        assert_eq!(grid.category_at(0), Some("B"));
        assert_eq!(grid.slot(0).todo_ids, vec!["t1".to_string()]);
    }

    #[test]
    fn test_unbound_marker_is_noop() {
        let mut grid = grid_from("A.");
        assert!(!grid.paint(0, &Tool::Marker(None)));
        assert!(!grid.paint(1, &Tool::Marker(None)));
        assert_eq!(grid, grid_from("A."));
    }

    #[test]
    #[should_panic]
    fn test_paint_out_of_range_panics() {
        grid_from("..").paint(2, &Tool::Eraser);
    }

    #[test]
    fn test_session_paints_only_while_drawing() {
        let mut grid = grid_from("....");
        let mut session = PaintSession::default();
        let tool = Tool::marker("A");

        assert!(!session.pointer_enter(&mut grid, 0, &tool));
        assert!(session.pointer_down(&mut grid, 1, &tool));
        assert!(session.is_drawing());
        assert!(session.pointer_enter(&mut grid, 2, &tool));
        // Re-entering a painted slot converges
        assert!(!session.pointer_enter(&mut grid, 1, &tool));
        session.release();
        assert!(!session.pointer_enter(&mut grid, 3, &tool));
        assert_eq!(grid, grid_from(".AA."));
    }

    #[test]
    fn test_release_without_gesture_is_harmless() {
        let mut session = PaintSession::default();
        session.release();
        session.release();
        assert!(!session.is_drawing());
    }
}
