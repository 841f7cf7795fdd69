use crate::grid::Grid;
use crate::model::{
    default_categories, generate_id, Category, MarkerColor, PlanError, Todo, TodoId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const NEW_CATEGORY_NAME: &str = "New Task";

/// Ordered marker categories. Never empty, so it is only built via `from_vec`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Categories {
    items: Vec<Category>,
}

impl Categories {
    pub fn from_vec(items: Vec<Category>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Categories { items })
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.items
    }

    pub fn first(&self) -> &Category {
        &self.items[0]
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.items.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|c| c.id == id)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.items.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn find(&self, reference: &str) -> Option<&Category> {
        self.get(reference).or_else(|| {
            self.items
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(reference.trim()))
        })
    }

    pub fn next_free_color(&self) -> MarkerColor {
        let used: HashSet<MarkerColor> = self.items.iter().map(|c| c.color).collect();
        MarkerColor::PICKER
            .iter()
            .copied()
            .find(|c| !used.contains(c))
            .unwrap_or(MarkerColor::PICKER[self.items.len() % MarkerColor::PICKER.len()])
    }

    pub fn create(&mut self, name: Option<String>, color: Option<MarkerColor>) -> &Category {
        let category = Category::new(
            generate_id("cat"),
            name.unwrap_or_else(|| NEW_CATEGORY_NAME.to_string()),
            color.unwrap_or_else(|| self.next_free_color()),
        );
        self.items.push(category);
        &self.items[self.items.len() - 1]
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), PlanError> {
        let category = self.get_mut(id)?;
        category.name = name.trim().to_string();
        Ok(())
    }

    pub fn recolor(&mut self, id: &str, color: MarkerColor) -> Result<(), PlanError> {
        self.get_mut(id)?.color = color;
        Ok(())
    }

    pub fn cycle_color(&mut self, id: &str) -> Result<MarkerColor, PlanError> {
        let category = self.get_mut(id)?;
        category.color = category.color.next();
        Ok(category.color)
    }

    pub fn replacement_for(&self, id: &str) -> Option<&Category> {
        self.items.iter().find(|c| c.id != id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Category, PlanError> {
        self.items
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PlanError::CategoryNotFound(id.to_string()))
    }
}

impl Default for Categories {
    fn default() -> Self {
        Categories {
            items: default_categories(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Todos {
    items: Vec<Todo>,
}

impl Todos {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Todo> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Todo] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.items.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn add(&mut self, text: &str) -> Result<&Todo, PlanError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlanError::EmptyTodoText);
        }
        self.items.push(Todo::new(generate_id("todo"), text));
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn set_text(&mut self, id: &str, text: &str) -> Result<(), PlanError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlanError::EmptyTodoText);
        }
        self.get_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, PlanError> {
        let todo = self.get_mut(id)?;
        todo.completed = !todo.completed;
        Ok(todo.completed)
    }

    pub fn texts_for<'a>(&'a self, ids: &'a [TodoId]) -> impl Iterator<Item = &'a str> + 'a {
        ids.iter()
            .filter_map(move |id| self.get(id).map(|t| t.text.as_str()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Todo, PlanError> {
        self.items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PlanError::TodoNotFound(id.to_string()))
    }
}

/// Removes a category and blanks every slot painted with it. Deleting the
/// last category is rejected with nothing changed.
pub fn delete_category(
    categories: &mut Categories,
    grid: &mut Grid,
    id: &str,
) -> Result<Category, PlanError> {
    let idx = categories
        .position(id)
        .ok_or_else(|| PlanError::CategoryNotFound(id.to_string()))?;
    if categories.len() <= 1 {
        return Err(PlanError::LastCategory);
    }
    let removed = categories.items.remove(idx);
    let cleared = grid.clear_category(&removed.id);
    log::debug!("deleted category {} ({} slots cleared)", removed.id, cleared);
    Ok(removed)
}

pub fn delete_todo(todos: &mut Todos, grid: &mut Grid, id: &str) -> Result<Todo, PlanError> {
    let idx = todos
        .items
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| PlanError::TodoNotFound(id.to_string()))?;
    let removed = todos.items.remove(idx);
    let cleared = grid.remove_todo_everywhere(&removed.id);
    log::debug!("deleted todo {} ({} slots untagged)", removed.id, cleared);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Tool;

    fn two_categories() -> Categories {
        Categories::from_vec(vec![
            Category::new("X".into(), "X", MarkerColor::Red500),
            Category::new("Y".into(), "Y", MarkerColor::Blue500),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_registry_not_constructible() {
        assert!(Categories::from_vec(Vec::new()).is_none());
        assert_eq!(Categories::default().len(), 5);
    }

    #[test]
    fn test_delete_category_blanks_its_slots() {
        let mut cats = two_categories();
        let mut grid = Grid::new(8);
        grid.paint(5, &Tool::marker("X"));
        grid.paint(6, &Tool::marker("Y"));
        grid.slot_mut(5).todo_ids.push("T1".into());
        grid.slot_mut(6).todo_ids.push("T1".into());

        let removed = delete_category(&mut cats, &mut grid, "X").unwrap();
        assert_eq!(removed.id, "X");
        assert!(grid.slot(5).is_blank());
        assert_eq!(grid.category_at(6), Some("Y"));
        assert_eq!(grid.slot(6).todo_ids, vec!["T1".to_string()]);
        assert_eq!(cats.len(), 1);
    }

    #[test]
    fn test_delete_last_category_rejected() {
        let mut cats = two_categories();
        let mut grid = Grid::new(8);
        delete_category(&mut cats, &mut grid, "X").unwrap();
        grid.paint(2, &Tool::marker("Y"));
        let grid_before = grid.clone();
        let cats_before = cats.clone();

        assert_eq!(
            delete_category(&mut cats, &mut grid, "Y"),
            Err(PlanError::LastCategory)
        );
        assert_eq!(grid, grid_before);
        assert_eq!(cats, cats_before);
    }

    #[test]
    fn test_delete_unknown_category() {
        let mut cats = two_categories();
        let mut grid = Grid::new(2);
        assert_eq!(
            delete_category(&mut cats, &mut grid, "nope"),
            Err(PlanError::CategoryNotFound("nope".into()))
        );
    }

    #[test]
    fn test_replacement_skips_deleted() {
        let cats = two_categories();
        assert_eq!(cats.replacement_for("X").unwrap().id, "Y");
        assert_eq!(cats.replacement_for("Y").unwrap().id, "X");
    }

    #[test]
    fn test_delete_todo_removes_all_references() {
        let mut todos = Todos::default();
        let t1 = todos.add("write report").unwrap().id.clone();
        let t2 = todos.add("call bank").unwrap().id.clone();
        let mut grid = Grid::new(8);
        grid.slot_mut(2).todo_ids = vec![t1.clone(), t2.clone()];
        grid.slot_mut(5).todo_ids = vec![t1.clone()];
        grid.slot_mut(6).todo_ids = vec![t2.clone()];

        delete_todo(&mut todos, &mut grid, &t1).unwrap();
        assert!(todos.get(&t1).is_none());
        assert_eq!(grid.slot(2).todo_ids, vec![t2.clone()]);
        assert!(grid.slot(5).todo_ids.is_empty());
        assert_eq!(grid.slot(6).todo_ids, vec![t2]);
    }

    #[test]
    fn test_blank_todo_text_rejected() {
        let mut todos = Todos::default();
        assert_eq!(todos.add("   ").unwrap_err(), PlanError::EmptyTodoText);
        assert!(todos.is_empty());

        let id = todos.add(" plan trip ").unwrap().id.clone();
        assert_eq!(todos.get(&id).unwrap().text, "plan trip");
        assert_eq!(todos.set_text(&id, ""), Err(PlanError::EmptyTodoText));
        assert_eq!(todos.get(&id).unwrap().text, "plan trip");
    }

    #[test]
    fn test_toggle_completed() {
        let mut todos = Todos::default();
        let id = todos.add("stretch").unwrap().id.clone();
        assert_eq!(todos.toggle(&id), Ok(true));
        assert_eq!(todos.toggle(&id), Ok(false));
        assert!(todos.toggle("missing").is_err());
    }

    #[test]
    fn test_create_category_uses_free_color() {
        let mut cats = Categories::from_vec(vec![Category::new(
            "a".into(),
            "A",
            MarkerColor::Slate600,
        )])
        .unwrap();
        let created = cats.create(None, None);
        assert_eq!(created.name, NEW_CATEGORY_NAME);
        assert_eq!(created.color, MarkerColor::Red500);
    }

    #[test]
    fn test_find_by_name() {
        let cats = Categories::default();
        let meals = cats.find("meals").unwrap();
        assert_eq!(meals.color, MarkerColor::Orange400);
        assert_eq!(cats.find(&meals.id).unwrap().name, "Meals");
    }
}
