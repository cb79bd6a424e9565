//! Activity tracker - drives streak and badge updates for one user action
//!
//! Flow for a logged study session:
//! load streak → apply activity → save (if changed) → gather metrics →
//! evaluate badges → write each changed badge independently → notify.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::badges::{
    BADGES, BadgeMetrics, BadgeRule, BadgeUnlocked, UserBadgeProgress, evaluate,
};
use super::store::{BadgeNotifier, MetricsSource, ProgressStore};
use super::streaks::{self, StreakOutcome, StreakRecord};
use crate::error::{Error, Result};
use crate::time::Clock;

/// Events that can happen while processing an activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StreakExtended { count: u32 },
    /// The gap was too long; the streak restarted at 1
    StreakBroken { previous: u32 },
    BadgeUnlocked(BadgeUnlocked),
}

/// A badge update that could not be written
#[derive(Debug)]
pub struct BadgeWriteFailure {
    pub badge_id: String,
    pub error: Error,
}

/// Everything that happened while processing one activity
#[derive(Debug)]
pub struct ActivityReport {
    pub streak: StreakRecord,
    pub outcome: StreakOutcome,
    /// Full badge state after this pass, one entry per rule
    pub badges: Vec<UserBadgeProgress>,
    pub events: Vec<ProgressEvent>,
    /// Badge writes that failed; the other badges were still written
    pub failed_writes: Vec<BadgeWriteFailure>,
}

impl ActivityReport {
    pub fn unlocked(&self) -> impl Iterator<Item = &BadgeUnlocked> {
        self.events.iter().filter_map(|e| match e {
            ProgressEvent::BadgeUnlocked(unlocked) => Some(unlocked),
            _ => None,
        })
    }
}

/// Coordinates the streak engine, the badge evaluator and their collaborators
pub struct ActivityTracker<'a> {
    store: &'a dyn ProgressStore,
    metrics: &'a dyn MetricsSource,
    notifier: &'a dyn BadgeNotifier,
    clock: &'a dyn Clock,
    rules: &'a [BadgeRule],
}

impl<'a> ActivityTracker<'a> {
    /// Create a tracker using the built-in badge catalog
    pub fn new(
        store: &'a dyn ProgressStore,
        metrics: &'a dyn MetricsSource,
        notifier: &'a dyn BadgeNotifier,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            metrics,
            notifier,
            clock,
            rules: BADGES,
        }
    }

    /// Use a different rule catalog
    pub fn with_rules(mut self, rules: &'a [BadgeRule]) -> Self {
        self.rules = rules;
        self
    }

    /// Process a qualifying study activity (a logged session)
    pub fn record_activity(&self, user_id: &str) -> Result<ActivityReport> {
        let now = self.clock.now();
        let current = self.store.load_streak_record(user_id)?;
        let (next, outcome) = streaks::record_activity(&current, &now);

        let mut events = Vec::new();
        let streak = if outcome.increased {
            let saved = self.store.save_streak_record(user_id, &next)?;
            if outcome.broken {
                debug!(user = user_id, previous = current.current_streak, "Streak broken");
                events.push(ProgressEvent::StreakBroken {
                    previous: current.current_streak,
                });
            } else {
                debug!(user = user_id, count = saved.current_streak, "Streak extended");
                events.push(ProgressEvent::StreakExtended {
                    count: saved.current_streak,
                });
            }
            saved
        } else {
            debug!(user = user_id, "Activity already counted today");
            current
        };

        let (badges, mut badge_events, failed_writes) =
            self.update_badges(user_id, &streak, now.with_timezone(&Utc))?;
        events.append(&mut badge_events);

        Ok(ActivityReport {
            streak,
            outcome,
            badges,
            events,
            failed_writes,
        })
    }

    /// Re-evaluate badges without a streak transition (e.g. a topic was
    /// marked learned)
    pub fn refresh_badges(&self, user_id: &str) -> Result<ActivityReport> {
        let now = self.clock.now().with_timezone(&Utc);
        let streak = self.store.load_streak_record(user_id)?;
        let (badges, events, failed_writes) = self.update_badges(user_id, &streak, now)?;

        Ok(ActivityReport {
            streak,
            outcome: StreakOutcome::UNCHANGED,
            badges,
            events,
            failed_writes,
        })
    }

    /// Clear the user's current streak
    pub fn reset_streak(&self, user_id: &str) -> Result<StreakRecord> {
        let current = self.store.load_streak_record(user_id)?;
        let reset = streaks::reset_streak(&current);
        self.store.save_streak_record(user_id, &reset)
    }

    /// Current metric snapshot for the user
    pub fn metrics(&self, user_id: &str, streak: &StreakRecord) -> Result<BadgeMetrics> {
        Ok(BadgeMetrics {
            session_count: self.metrics.session_count(user_id)?,
            topics_learned_count: self.metrics.topics_learned_count(user_id)?,
            subject_count: self.metrics.subject_count(user_id)?,
            current_streak: i64::from(streak.current_streak),
        })
    }

    /// `now` is read once per pass so unlocks share the streak's timestamp
    fn update_badges(
        &self,
        user_id: &str,
        streak: &StreakRecord,
        now: DateTime<Utc>,
    ) -> Result<(Vec<UserBadgeProgress>, Vec<ProgressEvent>, Vec<BadgeWriteFailure>)> {
        let metrics = self.metrics(user_id, streak)?;
        let existing = self.store.load_badge_progress(user_id)?;
        let evaluation = evaluate(&metrics, self.rules, &existing, now)?;

        let mut failed_writes = Vec::new();
        for entry in evaluation.changed_since(&existing) {
            if let Err(error) = self.store.save_badge_progress(user_id, entry) {
                warn!(user = user_id, badge = %entry.badge_id, error = %error, "Failed to save badge progress");
                failed_writes.push(BadgeWriteFailure {
                    badge_id: entry.badge_id.clone(),
                    error,
                });
            }
        }

        // Unlocks whose write failed are not announced
        let mut events = Vec::new();
        for unlocked in evaluation.unlocked {
            if failed_writes.iter().any(|f| f.badge_id == unlocked.badge_id) {
                continue;
            }
            self.notifier.badge_unlocked(&unlocked);
            events.push(ProgressEvent::BadgeUnlocked(unlocked));
        }

        Ok((evaluation.progress, events, failed_writes))
    }
}
