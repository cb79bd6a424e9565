//! Badges: the rule catalog and the progress evaluator

mod definitions;
mod evaluator;

pub use definitions::{BADGES, BadgeCategory, BadgeMetric, BadgeRule};
pub use evaluator::{
    BadgeMetrics, BadgeUnlocked, Evaluation, UserBadgeProgress, evaluate, progress_percent,
    validate_rules,
};
