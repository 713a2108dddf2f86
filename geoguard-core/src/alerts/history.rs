use std::collections::VecDeque;

use super::types::ProximityAlert;

/// Default number of alerts retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Bounded alert log, oldest entries evicted first
#[derive(Debug, Clone)]
pub struct AlertHistory {
    alerts: VecDeque<ProximityAlert>,
    capacity: usize,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        AlertHistory {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, alert: ProximityAlert) {
        while self.alerts.len() >= self.capacity {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert);
    }

    /// Snapshot, oldest first
    pub fn to_vec(&self) -> Vec<ProximityAlert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProximityAlert> {
        self.alerts.iter()
    }

    pub fn latest(&self) -> Option<&ProximityAlert> {
        self.alerts.back()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
