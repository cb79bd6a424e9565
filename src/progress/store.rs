//! Collaborator interfaces used by the activity tracker

use crate::error::Result;

use super::badges::{BadgeUnlocked, UserBadgeProgress};
use super::streaks::StreakRecord;

/// Persistence for streak and badge state, keyed by user
pub trait ProgressStore {
    /// Load the user's streak record; a user with no record gets the default
    /// (empty) one.
    fn load_streak_record(&self, user_id: &str) -> Result<StreakRecord>;

    /// Save the record and return it as stored (with its new version).
    fn save_streak_record(&self, user_id: &str, record: &StreakRecord) -> Result<StreakRecord>;

    fn load_badge_progress(&self, user_id: &str) -> Result<Vec<UserBadgeProgress>>;

    fn save_badge_progress(&self, user_id: &str, progress: &UserBadgeProgress) -> Result<()>;
}

/// Aggregate counters computed from the study log
pub trait MetricsSource {
    fn session_count(&self, user_id: &str) -> Result<i64>;
    fn topics_learned_count(&self, user_id: &str) -> Result<i64>;
    fn subject_count(&self, user_id: &str) -> Result<i64>;
}

/// Receives "badge unlocked" events. Delivery is fire-and-forget.
pub trait BadgeNotifier {
    fn badge_unlocked(&self, event: &BadgeUnlocked);
}

impl<F> BadgeNotifier for F
where
    F: Fn(&BadgeUnlocked),
{
    fn badge_unlocked(&self, event: &BadgeUnlocked) {
        self(event)
    }
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl BadgeNotifier for LogNotifier {
    fn badge_unlocked(&self, event: &BadgeUnlocked) {
        tracing::info!(badge = %event.badge_id, name = %event.badge_name, "Badge unlocked");
    }
}
