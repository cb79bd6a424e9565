//! Badge progress evaluation
//!
//! Recomputes progress for every rule in a catalog from the current metric
//! values. Earned state is monotonic: once `earned_at` is set for a badge it
//! is carried forward unchanged and progress stays at 100, whatever the
//! metrics say later.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::definitions::{BadgeMetric, BadgeRule};
use crate::validation::ValidationError;

/// Metric snapshot a badge pass is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BadgeMetrics {
    pub session_count: i64,
    pub topics_learned_count: i64,
    pub subject_count: i64,
    pub current_streak: i64,
}

impl BadgeMetrics {
    pub fn value(&self, metric: BadgeMetric) -> i64 {
        match metric {
            BadgeMetric::SessionCount => self.session_count,
            BadgeMetric::TopicsLearnedCount => self.topics_learned_count,
            BadgeMetric::SubjectCount => self.subject_count,
            BadgeMetric::CurrentStreak => self.current_streak,
        }
    }

    /// Reject negative counters; they indicate an upstream data bug.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for metric in [
            BadgeMetric::SessionCount,
            BadgeMetric::TopicsLearnedCount,
            BadgeMetric::SubjectCount,
            BadgeMetric::CurrentStreak,
        ] {
            let value = self.value(metric);
            if value < 0 {
                return Err(ValidationError::NegativeMetric {
                    metric: metric.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Progress of one user towards one badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadgeProgress {
    pub badge_id: String,
    /// 0..=100
    pub progress: u8,
    pub earned_at: Option<DateTime<Utc>>,
}

impl UserBadgeProgress {
    pub fn is_earned(&self) -> bool {
        self.earned_at.is_some()
    }
}

/// A badge that transitioned to earned during an evaluation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeUnlocked {
    pub badge_id: String,
    pub badge_name: String,
    pub earned_at: DateTime<Utc>,
}

/// Result of an evaluation pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// One entry per rule, in catalog order
    pub progress: Vec<UserBadgeProgress>,
    /// Badges earned for the first time in this pass
    pub unlocked: Vec<BadgeUnlocked>,
}

impl Evaluation {
    /// Entries that differ from (or are missing in) `existing`.
    pub fn changed_since<'a>(&'a self, existing: &[UserBadgeProgress]) -> Vec<&'a UserBadgeProgress> {
        self.progress
            .iter()
            .filter(|entry| !existing.iter().any(|prev| prev == *entry))
            .collect()
    }
}

/// Percentage of `threshold` reached by `value`, capped at 100 and rounded
/// half-up.
pub fn progress_percent(value: u64, threshold: u32) -> u8 {
    let threshold = u64::from(threshold.max(1));
    if value >= threshold {
        return 100;
    }
    // value < threshold, so the quotient is at most 100
    ((value * 200 + threshold) / (threshold * 2)) as u8
}

/// Check a rule catalog for zero thresholds and duplicate ids.
pub fn validate_rules(rules: &[BadgeRule]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(rules.len());
    for rule in rules {
        if rule.threshold == 0 {
            return Err(ValidationError::InvalidThreshold(rule.id.to_string()));
        }
        if !seen.insert(rule.id) {
            return Err(ValidationError::DuplicateBadge(rule.id.to_string()));
        }
    }
    Ok(())
}

/// Evaluate every rule against `metrics`, folding in `existing` progress.
///
/// Fails fast on negative metrics, invalid rules, progress outside 0..=100,
/// or existing progress for a badge the catalog does not define. With the
/// same inputs and no threshold crossed for the first time, the output is
/// identical to `existing` (modulo missing entries, which are created).
pub fn evaluate(
    metrics: &BadgeMetrics,
    rules: &[BadgeRule],
    existing: &[UserBadgeProgress],
    now: DateTime<Utc>,
) -> Result<Evaluation, ValidationError> {
    metrics.validate()?;
    validate_rules(rules)?;

    let mut by_id: HashMap<&str, &UserBadgeProgress> = HashMap::with_capacity(existing.len());
    for entry in existing {
        if !rules.iter().any(|rule| rule.id == entry.badge_id) {
            return Err(ValidationError::UnknownBadge(entry.badge_id.clone()));
        }
        if entry.progress > 100 {
            return Err(ValidationError::ProgressOutOfRange {
                badge_id: entry.badge_id.clone(),
                progress: i64::from(entry.progress),
            });
        }
        by_id.entry(entry.badge_id.as_str()).or_insert(entry);
    }

    let mut evaluation = Evaluation {
        progress: Vec::with_capacity(rules.len()),
        unlocked: Vec::new(),
    };

    for rule in rules {
        // Non-negative after validate()
        let value = metrics.value(rule.metric).unsigned_abs();
        let raw = progress_percent(value, rule.threshold);

        let entry = match by_id.get(rule.id) {
            Some(prev) if prev.is_earned() => UserBadgeProgress {
                badge_id: rule.id.to_string(),
                progress: 100,
                earned_at: prev.earned_at,
            },
            _ => {
                let earned_at = (raw >= 100).then_some(now);
                if let Some(earned_at) = earned_at {
                    evaluation.unlocked.push(BadgeUnlocked {
                        badge_id: rule.id.to_string(),
                        badge_name: rule.name.to_string(),
                        earned_at,
                    });
                }
                UserBadgeProgress {
                    badge_id: rule.id.to_string(),
                    progress: raw,
                    earned_at,
                }
            }
        };
        evaluation.progress.push(entry);
    }

    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::badges::{BADGES, BadgeCategory};
    use chrono::TimeZone;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn rule(id: &'static str, metric: BadgeMetric, threshold: u32) -> BadgeRule {
        BadgeRule {
            id,
            name: "Test Badge",
            description: "",
            icon: "",
            category: BadgeCategory::Learning,
            metric,
            threshold,
        }
    }

    #[test]
    fn test_progress_percent_rounding() {
        assert_eq!(progress_percent(0, 7), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 8), 13); // 12.5 rounds up
        assert_eq!(progress_percent(7, 7), 100);
        assert_eq!(progress_percent(70, 7), 100);
    }

    #[test]
    fn test_first_session_unlocks() {
        let metrics = BadgeMetrics {
            session_count: 1,
            ..Default::default()
        };
        let rules = [rule("first-session", BadgeMetric::SessionCount, 1)];
        let eval = evaluate(&metrics, &rules, &[], t(10)).unwrap();

        assert_eq!(
            eval.progress,
            vec![UserBadgeProgress {
                badge_id: "first-session".to_string(),
                progress: 100,
                earned_at: Some(t(10)),
            }]
        );
        assert_eq!(eval.unlocked.len(), 1);
        assert_eq!(eval.unlocked[0].badge_id, "first-session");
        assert_eq!(eval.unlocked[0].badge_name, "Test Badge");
    }

    #[test]
    fn test_earned_badge_survives_metric_drop() {
        let rules = [rule("topics-10", BadgeMetric::TopicsLearnedCount, 10)];
        let existing = vec![UserBadgeProgress {
            badge_id: "topics-10".to_string(),
            progress: 100,
            earned_at: Some(t(1)),
        }];
        let metrics = BadgeMetrics {
            topics_learned_count: 5,
            ..Default::default()
        };

        let eval = evaluate(&metrics, &rules, &existing, t(12)).unwrap();
        assert_eq!(eval.progress, existing);
        assert!(eval.unlocked.is_empty());
    }

    #[test]
    fn test_partial_progress_updates_without_unlock() {
        let rules = [rule("streak-7", BadgeMetric::CurrentStreak, 7)];
        let existing = vec![UserBadgeProgress {
            badge_id: "streak-7".to_string(),
            progress: 29,
            earned_at: None,
        }];
        let metrics = BadgeMetrics {
            current_streak: 3,
            ..Default::default()
        };

        let eval = evaluate(&metrics, &rules, &existing, t(8)).unwrap();
        assert_eq!(eval.progress[0].progress, 43);
        assert_eq!(eval.progress[0].earned_at, None);
        assert!(eval.unlocked.is_empty());
        assert_eq!(eval.changed_since(&existing).len(), 1);
    }

    #[test]
    fn test_unearned_badge_transitions_once() {
        let rules = [rule("streak-3", BadgeMetric::CurrentStreak, 3)];
        let metrics = BadgeMetrics {
            current_streak: 3,
            ..Default::default()
        };
        let existing = vec![UserBadgeProgress {
            badge_id: "streak-3".to_string(),
            progress: 67,
            earned_at: None,
        }];

        let first = evaluate(&metrics, &rules, &existing, t(9)).unwrap();
        assert_eq!(first.unlocked.len(), 1);
        assert_eq!(first.progress[0].earned_at, Some(t(9)));

        let second = evaluate(&metrics, &rules, &first.progress, t(15)).unwrap();
        assert!(second.unlocked.is_empty());
        assert_eq!(second.progress, first.progress);
        assert!(second.changed_since(&first.progress).is_empty());
    }

    #[test]
    fn test_evaluate_is_idempotent_over_catalog() {
        let metrics = BadgeMetrics {
            session_count: 12,
            topics_learned_count: 4,
            subject_count: 2,
            current_streak: 2,
        };
        let first = evaluate(&metrics, BADGES, &[], t(9)).unwrap();
        let second = evaluate(&metrics, BADGES, &first.progress, t(10)).unwrap();

        assert_eq!(first.progress.len(), BADGES.len());
        assert_eq!(second.progress, first.progress);
        assert!(second.unlocked.is_empty());
    }

    #[test]
    fn test_negative_metric_rejected() {
        let metrics = BadgeMetrics {
            subject_count: -1,
            ..Default::default()
        };
        assert_eq!(
            evaluate(&metrics, BADGES, &[], t(9)),
            Err(ValidationError::NegativeMetric {
                metric: "subjectCount",
                value: -1
            })
        );
    }

    #[test]
    fn test_unknown_existing_badge_rejected() {
        let existing = vec![UserBadgeProgress {
            badge_id: "consistency-king".to_string(),
            progress: 0,
            earned_at: None,
        }];
        assert_eq!(
            evaluate(&BadgeMetrics::default(), BADGES, &existing, t(9)),
            Err(ValidationError::UnknownBadge("consistency-king".to_string()))
        );
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let zero = [rule("broken", BadgeMetric::SessionCount, 0)];
        assert_eq!(
            evaluate(&BadgeMetrics::default(), &zero, &[], t(9)),
            Err(ValidationError::InvalidThreshold("broken".to_string()))
        );

        let dup = [
            rule("twice", BadgeMetric::SessionCount, 1),
            rule("twice", BadgeMetric::SubjectCount, 2),
        ];
        assert_eq!(
            validate_rules(&dup),
            Err(ValidationError::DuplicateBadge("twice".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_progress_rejected() {
        let rules = [rule("first-session", BadgeMetric::SessionCount, 1)];
        let existing = vec![UserBadgeProgress {
            badge_id: "first-session".to_string(),
            progress: 140,
            earned_at: None,
        }];
        assert!(matches!(
            evaluate(&BadgeMetrics::default(), &rules, &existing, t(9)),
            Err(ValidationError::ProgressOutOfRange { progress: 140, .. })
        ));
    }
}
