use std::collections::HashMap;

use super::types::AlertType;

/// Default minimum spacing between identical notifications
pub const DEFAULT_COOLDOWN_MS: u64 = 30_000;

/// Per-key notification throttle
///
/// Keys are `(title, alert type)`. The window is anchored on the last
/// notification that was let through; suppressed attempts do not extend it.
#[derive(Debug, Clone)]
pub struct NotificationCooldown {
    window_ms: u64,
    last_notified: HashMap<(String, AlertType), u64>,
}

impl NotificationCooldown {
    pub fn new(window_ms: u64) -> Self {
        NotificationCooldown {
            window_ms,
            last_notified: HashMap::new(),
        }
    }

    /// Returns true (and starts a new window) if a notification for this key
    /// may be presented at `now_ms`
    pub fn try_acquire(&mut self, title: &str, alert_type: AlertType, now_ms: u64) -> bool {
        let key = (title.to_string(), alert_type);
        if let Some(&last) = self.last_notified.get(&key) {
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last_notified.insert(key, now_ms);
        true
    }

    /// Drop entries whose window has passed
    pub fn prune(&mut self, now_ms: u64) {
        let window = self.window_ms;
        self.last_notified
            .retain(|_, last| now_ms.saturating_sub(*last) < window);
    }

    /// Number of keys still inside or awaiting pruning
    pub fn len(&self) -> usize {
        self.last_notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_notified.is_empty()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn clear(&mut self) {
        self.last_notified.clear();
    }
}

impl Default for NotificationCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppress_within_window() {
        let mut cooldown = NotificationCooldown::default();
        assert!(cooldown.try_acquire("Arrived", AlertType::Entered, 1_000));
        assert!(!cooldown.try_acquire("Arrived", AlertType::Entered, 20_000));
        // Window anchored on the first notification, not the suppressed one
        assert!(cooldown.try_acquire("Arrived", AlertType::Entered, 31_000));
    }

    #[test]
    fn test_keys_independent() {
        let mut cooldown = NotificationCooldown::default();
        assert!(cooldown.try_acquire("Arrived", AlertType::Entered, 0));
        assert!(cooldown.try_acquire("Arrived", AlertType::Exited, 0));
        assert!(cooldown.try_acquire("Other", AlertType::Entered, 0));
    }

    #[test]
    fn test_clock_going_backwards() {
        let mut cooldown = NotificationCooldown::new(100);
        assert!(cooldown.try_acquire("t", AlertType::Warning, 500));
        assert!(!cooldown.try_acquire("t", AlertType::Warning, 400));
    }

    #[test]
    fn test_prune() {
        let mut cooldown = NotificationCooldown::new(100);
        cooldown.try_acquire("t", AlertType::Warning, 0);
        cooldown.prune(50);
        assert_eq!(cooldown.last_notified.len(), 1);
        cooldown.prune(150);
        assert!(cooldown.last_notified.is_empty());
    }
}
