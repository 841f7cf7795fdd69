use crate::model::{CategoryId, PlanError, TodoId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    slot_minutes: u32,
}

impl SlotLayout {
    pub fn new(slot_minutes: u32) -> Option<Self> {
        if slot_minutes == 0 || 60 % slot_minutes != 0 {
            return None;
        }
        Some(SlotLayout { slot_minutes })
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    pub fn slots_per_hour(&self) -> usize {
        (60 / self.slot_minutes) as usize
    }

    pub fn slot_count(&self) -> usize {
        (MINUTES_PER_DAY / self.slot_minutes) as usize
    }

    pub fn slot_at_minutes(&self, minutes_since_midnight: u32) -> usize {
        assert!(
            minutes_since_midnight < MINUTES_PER_DAY,
            "minute {} is past the end of the day",
            minutes_since_midnight
        );
        (minutes_since_midnight / self.slot_minutes) as usize
    }

    pub fn index_of(&self, hour: usize, segment: usize) -> usize {
        assert!(hour < 24, "hour {} out of range", hour);
        assert!(
            segment < self.slots_per_hour(),
            "segment {} out of range",
            segment
        );
        hour * self.slots_per_hour() + segment
    }

    pub fn hour_of(&self, index: usize) -> usize {
        index / self.slots_per_hour()
    }

    pub fn start_minutes(&self, index: usize) -> u32 {
        index as u32 * self.slot_minutes
    }

    pub fn label(&self, index: usize) -> String {
        format_minutes(self.start_minutes(index))
    }

    pub fn end_label(&self, index: usize) -> String {
        format_minutes(self.start_minutes(index) + self.slot_minutes)
    }
}

impl Default for SlotLayout {
    fn default() -> Self {
        SlotLayout {
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn format_hour12(hour: usize) -> String {
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let h12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{} {}", h12, suffix)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub todo_ids: Vec<TodoId>,
}

impl Slot {
    pub fn is_painted(&self) -> bool {
        self.category_id.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.category_id.is_none() && self.todo_ids.is_empty()
    }

    pub(crate) fn blank(&mut self) {
        self.category_id = None;
        self.todo_ids.clear();
    }

    pub(crate) fn add_todo(&mut self, todo_id: &str) -> bool {
        if self.todo_ids.iter().any(|id| id == todo_id) {
            return false;
        }
        self.todo_ids.push(todo_id.to_string());
        true
    }

    pub(crate) fn remove_todo(&mut self, todo_id: &str) -> bool {
        let before = self.todo_ids.len();
        self.todo_ids.retain(|id| id != todo_id);
        self.todo_ids.len() != before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpan {
    pub start: usize,
    pub end: usize,
}

impl RunSpan {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Fixed-length, chronologically ordered slot sequence. The length is chosen
/// at construction and never changes afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Grid {
    slots: Vec<Slot>,
}

impl Grid {
    pub fn new(slot_count: usize) -> Self {
        Grid {
            slots: vec![Slot::default(); slot_count],
        }
    }

    pub fn for_layout(layout: &SlotLayout) -> Self {
        Self::new(layout.slot_count())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> &Slot {
        self.check_index(index);
        &self.slots[index]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Slot {
        self.check_index(index);
        &mut self.slots[index]
    }

    pub fn check_index(&self, index: usize) {
        assert!(
            index < self.slots.len(),
            "slot index {} out of range ({} slots)",
            index,
            self.slots.len()
        );
    }

    pub fn ensure_index(&self, index: usize) -> Result<usize, PlanError> {
        if index < self.slots.len() {
            Ok(index)
        } else {
            Err(PlanError::SlotOutOfRange {
                index,
                len: self.slots.len(),
            })
        }
    }

    pub fn category_at(&self, index: usize) -> Option<&str> {
        self.slot(index).category_id.as_deref()
    }

    /// Maximal contiguous run of slots sharing the category painted at
    /// `index`. Unpainted slots do not form runs.
    pub fn run_at(&self, index: usize) -> Option<RunSpan> {
        let category = self.category_at(index)?;
        let mut start = index;
        while start > 0 && self.slots[start - 1].category_id.as_deref() == Some(category) {
            start -= 1;
        }
        let mut end = index;
        while end + 1 < self.slots.len()
            && self.slots[end + 1].category_id.as_deref() == Some(category)
        {
            end += 1;
        }
        Some(RunSpan { start, end })
    }

    pub fn has_prev_same(&self, index: usize) -> bool {
        match self.category_at(index) {
            Some(cat) => index > 0 && self.slots[index - 1].category_id.as_deref() == Some(cat),
            None => false,
        }
    }

    pub fn has_next_same(&self, index: usize) -> bool {
        match self.category_at(index) {
            Some(cat) => self
                .slots
                .get(index + 1)
                .map_or(false, |s| s.category_id.as_deref() == Some(cat)),
            None => false,
        }
    }

    pub fn runs(&self) -> Vec<(RunSpan, &str)> {
        let mut runs = Vec::new();
        let mut idx = 0;
        while idx < self.slots.len() {
            match self.run_at(idx) {
                Some(span) => {
                    if let Some(cat) = self.category_at(idx) {
                        runs.push((span, cat));
                    }
                    idx = span.end + 1;
                }
                None => idx += 1,
            }
        }
        runs
    }

    pub(crate) fn clear_category(&mut self, category_id: &str) -> usize {
        let mut touched = 0;
        for slot in self.slots.iter_mut() {
            if slot.category_id.as_deref() == Some(category_id) {
                slot.blank();
                touched += 1;
            }
        }
        touched
    }

    pub(crate) fn remove_todo_everywhere(&mut self, todo_id: &str) -> usize {
        let mut touched = 0;
        for slot in self.slots.iter_mut() {
            if slot.remove_todo(todo_id) {
                touched += 1;
            }
        }
        touched
    }

    pub(crate) fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.blank();
        }
    }

    pub(crate) fn scrub(
        &mut self,
        categories: &HashSet<&str>,
        todos: &HashSet<&str>,
    ) -> usize {
        let mut touched = 0;
        for slot in self.slots.iter_mut() {
            if let Some(cat) = slot.category_id.as_deref() {
                if !categories.contains(cat) {
                    slot.blank();
                    touched += 1;
                    continue;
                }
            }
            let before = slot.todo_ids.len();
            let mut seen = HashSet::new();
            slot.todo_ids
                .retain(|id| todos.contains(id.as_str()) && seen.insert(id.clone()));
            if slot.todo_ids.len() != before {
                touched += 1;
            }
        }
        touched
    }

    pub fn painted_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_painted()).count()
    }
}
