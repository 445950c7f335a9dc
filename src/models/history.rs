use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One consumed meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEntry {
    pub user_id: u64,
    pub meal_id: u64,
    pub consumed_at: DateTime<Utc>,
}

/// Meal consumption log, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionHistory {
    entries: Vec<ConsumptionEntry>,
}

impl ConsumptionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry
    pub fn record(&mut self, user_id: u64, meal_id: u64, consumed_at: DateTime<Utc>) {
        self.entries.push(ConsumptionEntry {
            user_id,
            meal_id,
            consumed_at,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one user, newest first. Entries sharing a timestamp keep
    /// reverse insertion order.
    pub fn entries_for(&self, user_id: u64) -> Vec<&ConsumptionEntry> {
        let mut entries: Vec<&ConsumptionEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .collect();
        entries.sort_by(|a, b| b.consumed_at.cmp(&a.consumed_at));
        entries
    }

    /// Meal ids of the user's `limit` most recent entries, newest first
    pub fn recent_meal_ids(&self, user_id: u64, limit: usize) -> Vec<u64> {
        self.entries_for(user_id)
            .into_iter()
            .take(limit)
            .map(|e| e.meal_id)
            .collect()
    }

    /// A copy holding only the given user's entries
    pub fn for_user(&self, user_id: u64) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_recent_meal_ids_newest_first() {
        let now = Utc::now();
        let mut history = ConsumptionHistory::new();
        history.record(1, 10, now - Duration::hours(3));
        history.record(1, 11, now - Duration::hours(1));
        history.record(2, 99, now);
        history.record(1, 12, now - Duration::hours(2));

        assert_eq!(history.recent_meal_ids(1, 10), vec![11, 12, 10]);
        assert_eq!(history.recent_meal_ids(1, 2), vec![11, 12]);
        assert_eq!(history.recent_meal_ids(2, 10), vec![99]);
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let now = Utc::now();
        let mut history = ConsumptionHistory::new();
        for meal_id in 0..15 {
            history.record(1, meal_id, now + Duration::minutes(meal_id as i64));
        }

        let recent = history.recent_meal_ids(1, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first(), Some(&14));
        assert!(!recent.contains(&4));
    }

    #[test]
    fn test_same_timestamp_prefers_latest_insert() {
        let now = Utc::now();
        let mut history = ConsumptionHistory::new();
        history.record(1, 1, now);
        history.record(1, 2, now);

        assert_eq!(history.recent_meal_ids(1, 1), vec![2]);
    }

    #[test]
    fn test_for_user_filters_entries() {
        let now = Utc::now();
        let mut history = ConsumptionHistory::new();
        history.record(1, 1, now);
        history.record(2, 2, now);

        let filtered = history.for_user(2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.recent_meal_ids(2, 10), vec![2]);
        assert!(filtered.recent_meal_ids(1, 10).is_empty());
    }
}
