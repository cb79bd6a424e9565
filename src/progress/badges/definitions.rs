//! Badge catalog
//!
//! One authoritative list of badge rules. Each rule unlocks when a single
//! tracked metric reaches its threshold.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Counter a badge rule is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeMetric {
    SessionCount,
    TopicsLearnedCount,
    SubjectCount,
    CurrentStreak,
}

impl BadgeMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCount => "sessionCount",
            Self::TopicsLearnedCount => "topicsLearnedCount",
            Self::SubjectCount => "subjectCount",
            Self::CurrentStreak => "currentStreak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SessionCount => "sessions",
            Self::TopicsLearnedCount => "topics learned",
            Self::SubjectCount => "subjects",
            Self::CurrentStreak => "day streak",
        }
    }
}

impl fmt::Display for BadgeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge category for grouping in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Learning,
    Streak,
}

impl BadgeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Learning => "Learning",
            Self::Streak => "Streaks",
        }
    }
}

/// Static badge rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub metric: BadgeMetric,
    /// Metric value at which the badge is earned (must be positive)
    pub threshold: u32,
}

impl BadgeRule {
    /// Look up a rule in the built-in catalog
    pub fn get(id: &str) -> Option<&'static BadgeRule> {
        BADGES.iter().find(|b| b.id == id)
    }

    /// Human readable requirement, e.g. "7 day streak"
    pub fn requirement(&self) -> String {
        format!("{} {}", self.threshold, self.metric.label())
    }
}

/// All badge rules
pub static BADGES: &[BadgeRule] = &[
    // === LEARNING ===
    BadgeRule {
        id: "first-session",
        name: "First Steps",
        description: "Complete your first study session",
        icon: "⭐",
        category: BadgeCategory::Learning,
        metric: BadgeMetric::SessionCount,
        threshold: 1,
    },
    BadgeRule {
        id: "knowledge-seeker",
        name: "Knowledge Seeker",
        description: "Complete 50 study sessions",
        icon: "🏅",
        category: BadgeCategory::Learning,
        metric: BadgeMetric::SessionCount,
        threshold: 50,
    },
    BadgeRule {
        id: "topics-10",
        name: "Topic Explorer",
        description: "Learn 10 topics",
        icon: "📘",
        category: BadgeCategory::Learning,
        metric: BadgeMetric::TopicsLearnedCount,
        threshold: 10,
    },
    BadgeRule {
        id: "topics-50",
        name: "Topic Master",
        description: "Learn 50 topics",
        icon: "📚",
        category: BadgeCategory::Learning,
        metric: BadgeMetric::TopicsLearnedCount,
        threshold: 50,
    },
    BadgeRule {
        id: "subjects-5",
        name: "Curious Mind",
        description: "Track 5 subjects",
        icon: "🧭",
        category: BadgeCategory::Learning,
        metric: BadgeMetric::SubjectCount,
        threshold: 5,
    },
    // === STREAK ===
    BadgeRule {
        id: "streak-3",
        name: "On a Roll",
        description: "Study 3 days in a row",
        icon: "🔥",
        category: BadgeCategory::Streak,
        metric: BadgeMetric::CurrentStreak,
        threshold: 3,
    },
    BadgeRule {
        id: "streak-7",
        name: "Week Warrior",
        description: "Maintain a 7-day study streak",
        icon: "🔥",
        category: BadgeCategory::Streak,
        metric: BadgeMetric::CurrentStreak,
        threshold: 7,
    },
    BadgeRule {
        id: "streak-30",
        name: "Marathon Runner",
        description: "Study for 30 days in a row",
        icon: "🏃",
        category: BadgeCategory::Streak,
        metric: BadgeMetric::CurrentStreak,
        threshold: 30,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique_and_thresholds_positive() {
        let mut seen = HashSet::new();
        for rule in BADGES {
            assert!(seen.insert(rule.id), "duplicate badge id {}", rule.id);
            assert!(rule.threshold > 0, "{} has zero threshold", rule.id);
        }
    }

    #[test]
    fn test_lookup() {
        let rule = BadgeRule::get("streak-7").unwrap();
        assert_eq!(rule.name, "Week Warrior");
        assert_eq!(rule.metric, BadgeMetric::CurrentStreak);
        assert_eq!(rule.requirement(), "7 day streak");
        assert!(BadgeRule::get("consistency-king").is_none());
    }
}
