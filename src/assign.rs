use crate::grid::{Grid, RunSpan};
use crate::model::PlanError;

impl Grid {
    /// Tags every slot of the run containing `index` with `todo_id`.
    ///
    /// Dropping onto an unpainted slot is rejected and leaves the grid as it
    /// was. Slots already carrying the todo keep a single reference.
    pub fn assign_todo_to_run(&mut self, index: usize, todo_id: &str) -> Result<RunSpan, PlanError> {
        let span = self.run_at(index).ok_or(PlanError::UnpaintedSlot(index))?;
        for idx in span.start..=span.end {
            self.slot_mut(idx).add_todo(todo_id);
        }
        Ok(span)
    }

    pub fn remove_todo_at(&mut self, index: usize, todo_id: &str) -> bool {
        self.slot_mut(index).remove_todo(todo_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::grid::tests::grid_from;
    use crate::grid::RunSpan;
    use crate::model::PlanError;

    fn tagged(grid: &crate::grid::Grid, todo: &str) -> Vec<usize> {
        grid.slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.todo_ids.iter().any(|id| id == todo))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_flood_fill_stops_at_other_category() {
        let mut grid = grid_from("AAABAA");
        let span = grid.assign_todo_to_run(2, "T").unwrap();
        assert_eq!(span, RunSpan { start: 0, end: 2 });
        assert_eq!(tagged(&grid, "T"), vec![0, 1, 2]);
    }

    #[test]
    fn test_flood_fill_skips_separate_block() {
        let mut grid = grid_from("A.A");
        grid.assign_todo_to_run(0, "T").unwrap();
        assert_eq!(tagged(&grid, "T"), vec![0]);
    }

    #[test]
    fn test_flood_fill_reaches_grid_edges() {
        let mut grid = grid_from("BBBB");
        let span = grid.assign_todo_to_run(1, "T").unwrap();
        assert_eq!(span.len(), 4);
        assert_eq!(tagged(&grid, "T"), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_drop_on_unpainted_slot_is_rejected() {
        let mut grid = grid_from("A.A");
        let before = grid.clone();
        assert_eq!(
            grid.assign_todo_to_run(1, "T"),
            Err(PlanError::UnpaintedSlot(1))
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn test_overlapping_drops_do_not_duplicate() {
        let mut grid = grid_from("AAA");
        grid.assign_todo_to_run(0, "T").unwrap();
        grid.assign_todo_to_run(2, "T").unwrap();
        for slot in grid.slots() {
            assert_eq!(slot.todo_ids, vec!["T".to_string()]);
        }
    }

    #[test]
    fn test_existing_todo_order_preserved() {
        let mut grid = grid_from("AA");
        grid.assign_todo_to_run(1, "second").unwrap();
        grid.remove_todo_at(0, "second");
        grid.assign_todo_to_run(0, "first").unwrap();
        grid.assign_todo_to_run(0, "second").unwrap();
        assert_eq!(grid.slot(0).todo_ids, vec!["first", "second"]);
        assert_eq!(grid.slot(1).todo_ids, vec!["second", "first"]);
    }
}
