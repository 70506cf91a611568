use std::collections::HashSet;

use crate::models::Achievement;

/// Newly unlocked achievements, shown one at a time in delivery order.
#[derive(Debug, Clone, Default)]
pub struct AchievementQueue {
    items: Vec<Achievement>,
    index: usize,
    open: bool,
}

impl AchievementQueue {
    /// Replaces the queue with one completion response's list. Repeated ids
    /// within the list keep their first occurrence. Opens the surface when
    /// there is anything to show.
    pub fn load(&mut self, achievements: Vec<Achievement>) -> Option<&Achievement> {
        let mut seen = HashSet::new();
        self.items = achievements
            .into_iter()
            .filter(|achievement| seen.insert(achievement.id.clone()))
            .collect();
        self.index = 0;
        self.open = !self.items.is_empty();
        self.current()
    }

    pub fn current(&self) -> Option<&Achievement> {
        if self.open {
            self.items.get(self.index)
        } else {
            None
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.items.len()
    }

    /// Advances to the next achievement, or closes the surface and resets
    /// the index after the last one.
    pub fn dismiss(&mut self) -> Option<&Achievement> {
        if !self.open {
            return None;
        }
        if self.is_last() {
            self.open = false;
            self.index = 0;
            return None;
        }
        self.index += 1;
        self.current()
    }
}
