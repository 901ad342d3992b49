//! The to-do ledger: the agent's explicit plan.
//!
//! Items are addressed by their position in the list. Removing an item
//! shifts every later item down by one, so positions must not be cached
//! across a removal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single planning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub requirement: String,
    #[serde(default)]
    pub is_complete: bool,
}

impl TodoItem {
    fn new(requirement: String) -> Self {
        Self {
            requirement,
            is_complete: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("a plan needs at least one requirement")]
    EmptyPlan,
    #[error("to-do item {index} does not exist (the list has {len} items)")]
    OutOfRange { index: usize, len: usize },
}

/// Ordered list of [`TodoItem`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoLedger {
    items: Vec<TodoItem>,
}

impl TodoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends each requirement as a new, incomplete item.
    ///
    /// Returns the number of items added.
    pub fn append<I, S>(&mut self, requirements: I) -> Result<usize, TodoError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let new_items: Vec<TodoItem> = requirements
            .into_iter()
            .map(|r| TodoItem::new(r.into()))
            .collect();
        if new_items.is_empty() {
            return Err(TodoError::EmptyPlan);
        }
        let added = new_items.len();
        self.items.extend(new_items);
        Ok(added)
    }

    /// Sets the completion state of the item at `index`.
    pub fn set_status(&mut self, index: usize, is_complete: bool) -> Result<&TodoItem, TodoError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(TodoError::OutOfRange { index, len })?;
        item.is_complete = is_complete;
        Ok(item)
    }

    /// Removes the item at `index`, shifting later items down.
    pub fn remove(&mut self, index: usize) -> Result<TodoItem, TodoError> {
        if index >= self.items.len() {
            return Err(TodoError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    pub fn all(&self) -> &[TodoItem] {
        &self.items
    }

    /// Items not yet complete, with their positions.
    pub fn incomplete(&self) -> Vec<(usize, &TodoItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_complete)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the plan has items and every one of them is done.
    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.is_complete)
    }

    /// Numbered checklist, the form the model and the human both see.
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "(no to-do items)".to_string();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mark = if item.is_complete { "x" } else { " " };
                format!("{i}. [{mark}] {}", item.requirement)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(items: &[&str]) -> TodoLedger {
        let mut ledger = TodoLedger::new();
        ledger.append(items.iter().copied()).unwrap();
        ledger
    }

    #[test]
    fn test_append_creates_incomplete_items() {
        let ledger = ledger(&["read main.rs", "write review"]);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.all().iter().all(|item| !item.is_complete));
    }

    #[test]
    fn test_append_nothing_is_rejected() {
        let mut ledger = TodoLedger::new();
        assert_eq!(ledger.append(Vec::<String>::new()), Err(TodoError::EmptyPlan));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_remove_shifts_later_items() {
        let mut ledger = ledger(&["a", "b", "c", "d"]);
        let removed = ledger.remove(1).unwrap();
        assert_eq!(removed.requirement, "b");
        let names: Vec<_> = ledger.all().iter().map(|i| i.requirement.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_out_of_range_never_noops() {
        let mut ledger = ledger(&["a"]);
        assert_eq!(
            ledger.set_status(1, true).unwrap_err(),
            TodoError::OutOfRange { index: 1, len: 1 }
        );
        assert_eq!(
            ledger.remove(5).unwrap_err(),
            TodoError::OutOfRange { index: 5, len: 1 }
        );
        assert_eq!(ledger.all(), &[TodoItem::new("a".into())]);
    }

    #[test]
    fn test_incomplete_and_completion() {
        let mut ledger = ledger(&["a", "b"]);
        assert!(!ledger.is_complete());
        ledger.set_status(0, true).unwrap();
        let open: Vec<_> = ledger.incomplete().into_iter().map(|(i, _)| i).collect();
        assert_eq!(open, vec![1]);
        ledger.set_status(1, true).unwrap();
        assert!(ledger.is_complete());
        ledger.set_status(1, false).unwrap();
        assert!(!ledger.is_complete());
    }

    #[test]
    fn test_empty_ledger_is_not_complete() {
        assert!(!TodoLedger::new().is_complete());
    }

    #[test]
    fn test_item_serde_is_lossless() {
        let item = TodoItem {
            requirement: "check error handling in src/db".into(),
            is_complete: true,
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: TodoItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }

    #[test]
    fn test_listing_is_stable() {
        let ledger = ledger(&["a", "b"]);
        assert_eq!(ledger.all().to_vec(), ledger.all().to_vec());
        assert_eq!(ledger.render(), ledger.render());
        assert_eq!(ledger.render(), "0. [ ] a\n1. [ ] b");
    }
}
