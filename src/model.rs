use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CategoryId = String;
pub type TodoId = String;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: MarkerColor,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    #[serde(rename = "slate-600")]
    Slate600,
    #[serde(rename = "gray-500")]
    Gray500,
    #[serde(rename = "red-400")]
    Red400,
    #[serde(rename = "red-500")]
    Red500,
    #[serde(rename = "orange-400")]
    Orange400,
    #[serde(rename = "orange-500")]
    Orange500,
    #[serde(rename = "amber-400")]
    Amber400,
    #[serde(rename = "yellow-400")]
    Yellow400,
    #[serde(rename = "lime-500")]
    Lime500,
    #[serde(rename = "green-400")]
    Green400,
    #[serde(rename = "green-500")]
    Green500,
    #[serde(rename = "emerald-600")]
    Emerald600,
    #[serde(rename = "teal-500")]
    Teal500,
    #[serde(rename = "cyan-500")]
    Cyan500,
    #[serde(rename = "sky-500")]
    Sky500,
    #[serde(rename = "blue-500")]
    Blue500,
    #[serde(rename = "indigo-500")]
    Indigo500,
    #[serde(rename = "violet-500")]
    Violet500,
    #[serde(rename = "purple-500")]
    Purple500,
    #[serde(rename = "fuchsia-500")]
    Fuchsia500,
    #[serde(rename = "pink-500")]
    Pink500,
    #[serde(rename = "rose-500")]
    Rose500,
}

impl MarkerColor {
    pub const ALL: [MarkerColor; 22] = [
        MarkerColor::Slate600,
        MarkerColor::Gray500,
        MarkerColor::Red400,
        MarkerColor::Red500,
        MarkerColor::Orange400,
        MarkerColor::Orange500,
        MarkerColor::Amber400,
        MarkerColor::Yellow400,
        MarkerColor::Lime500,
        MarkerColor::Green400,
        MarkerColor::Green500,
        MarkerColor::Emerald600,
        MarkerColor::Teal500,
        MarkerColor::Cyan500,
        MarkerColor::Sky500,
        MarkerColor::Blue500,
        MarkerColor::Indigo500,
        MarkerColor::Violet500,
        MarkerColor::Purple500,
        MarkerColor::Fuchsia500,
        MarkerColor::Pink500,
        MarkerColor::Rose500,
    ];

    pub const PICKER: [MarkerColor; 18] = [
        MarkerColor::Slate600,
        MarkerColor::Red500,
        MarkerColor::Orange500,
        MarkerColor::Amber400,
        MarkerColor::Yellow400,
        MarkerColor::Lime500,
        MarkerColor::Green500,
        MarkerColor::Emerald600,
        MarkerColor::Teal500,
        MarkerColor::Cyan500,
        MarkerColor::Sky500,
        MarkerColor::Blue500,
        MarkerColor::Indigo500,
        MarkerColor::Violet500,
        MarkerColor::Purple500,
        MarkerColor::Fuchsia500,
        MarkerColor::Pink500,
        MarkerColor::Rose500,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            MarkerColor::Slate600 => "slate-600",
            MarkerColor::Gray500 => "gray-500",
            MarkerColor::Red400 => "red-400",
            MarkerColor::Red500 => "red-500",
            MarkerColor::Orange400 => "orange-400",
            MarkerColor::Orange500 => "orange-500",
            MarkerColor::Amber400 => "amber-400",
            MarkerColor::Yellow400 => "yellow-400",
            MarkerColor::Lime500 => "lime-500",
            MarkerColor::Green400 => "green-400",
            MarkerColor::Green500 => "green-500",
            MarkerColor::Emerald600 => "emerald-600",
            MarkerColor::Teal500 => "teal-500",
            MarkerColor::Cyan500 => "cyan-500",
            MarkerColor::Sky500 => "sky-500",
            MarkerColor::Blue500 => "blue-500",
            MarkerColor::Indigo500 => "indigo-500",
            MarkerColor::Violet500 => "violet-500",
            MarkerColor::Purple500 => "purple-500",
            MarkerColor::Fuchsia500 => "fuchsia-500",
            MarkerColor::Pink500 => "pink-500",
            MarkerColor::Rose500 => "rose-500",
        }
    }

    pub fn hex(&self) -> u32 {
        match self {
            MarkerColor::Slate600 => 0x475569,
            MarkerColor::Gray500 => 0x6b7280,
            MarkerColor::Red400 => 0xf87171,
            MarkerColor::Red500 => 0xef4444,
            MarkerColor::Orange400 => 0xfb923c,
            MarkerColor::Orange500 => 0xf97316,
            MarkerColor::Amber400 => 0xfbbf24,
            MarkerColor::Yellow400 => 0xfacc15,
            MarkerColor::Lime500 => 0x84cc16,
            MarkerColor::Green400 => 0x4ade80,
            MarkerColor::Green500 => 0x22c55e,
            MarkerColor::Emerald600 => 0x059669,
            MarkerColor::Teal500 => 0x14b8a6,
            MarkerColor::Cyan500 => 0x06b6d4,
            MarkerColor::Sky500 => 0x0ea5e9,
            MarkerColor::Blue500 => 0x3b82f6,
            MarkerColor::Indigo500 => 0x6366f1,
            MarkerColor::Violet500 => 0x8b5cf6,
            MarkerColor::Purple500 => 0xa855f7,
            MarkerColor::Fuchsia500 => 0xd946ef,
            MarkerColor::Pink500 => 0xec4899,
            MarkerColor::Rose500 => 0xf43f5e,
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let hex = self.hex();
        ((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn next(&self) -> MarkerColor {
        match Self::PICKER.iter().position(|c| c == self) {
            Some(idx) => Self::PICKER[(idx + 1) % Self::PICKER.len()],
            None => Self::PICKER[0],
        }
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for MarkerColor {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.token() == wanted)
            .ok_or_else(|| PlanError::UnknownColor(s.to_string()))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("todo not found: {0}")]
    TodoNotFound(String),
    #[error("cannot delete the last remaining category")]
    LastCategory,
    #[error("todo text must not be empty")]
    EmptyTodoText,
    #[error("slot {0} is not painted")]
    UnpaintedSlot(usize),
    #[error("slot {index} out of range (grid has {len} slots)")]
    SlotOutOfRange { index: usize, len: usize },
    #[error("no todo is being dragged")]
    NoActiveDrag,
    #[error("unknown colour: {0}")]
    UnknownColor(String),
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, color: MarkerColor) -> Self {
        Category {
            id,
            name: name.into(),
            color,
        }
    }
}

impl Todo {
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Todo {
            id,
            text: text.into(),
            completed: false,
        }
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(generate_id("cat"), "Deep Work", MarkerColor::Blue500),
        Category::new(generate_id("cat"), "Meeting", MarkerColor::Purple500),
        Category::new(generate_id("cat"), "Break", MarkerColor::Green400),
        Category::new(generate_id("cat"), "Meals", MarkerColor::Orange400),
        Category::new(generate_id("cat"), "Exercise", MarkerColor::Red400),
    ]
}

pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tokens_parse_back() {
        for color in MarkerColor::ALL {
            assert_eq!(color.token().parse::<MarkerColor>().unwrap(), color);
        }
        assert!("mauve-300".parse::<MarkerColor>().is_err());
    }

    #[test]
    fn test_color_cycle_wraps_in_picker_order() {
        assert_eq!(MarkerColor::Slate600.next(), MarkerColor::Red500);
        assert_eq!(MarkerColor::Rose500.next(), MarkerColor::Slate600);
        // Non-picker colours jump to the start of the cycle
        assert_eq!(MarkerColor::Gray500.next(), MarkerColor::Slate600);
    }

    #[test]
    fn test_color_serializes_as_token() {
        let yaml = serde_yaml::to_string(&MarkerColor::Emerald600).unwrap();
        assert_eq!(yaml.trim(), "emerald-600");
        assert_eq!(MarkerColor::Blue500.rgb(), (0x3b, 0x82, 0xf6));
    }

    #[test]
    fn test_default_categories_have_unique_ids() {
        let cats = default_categories();
        assert_eq!(cats.len(), 5);
        assert_eq!(cats[0].name, "Deep Work");
        for (i, a) in cats.iter().enumerate() {
            assert!(a.id.starts_with("cat-"));
            for b in &cats[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
