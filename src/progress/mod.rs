//! Study progress: streaks, badges and the tracker that ties them together
//!
//! # Architecture
//!
//! ```text
//! study session logged
//!          │
//!          ▼
//!   ┌──────────────┐   StreakRecord    ┌──────────────┐
//!   │   streaks    │ ────────────────▶ │   badges     │
//!   │ (day logic)  │   + metrics       │ (evaluator)  │
//!   └──────────────┘                   └──────────────┘
//!          │                                  │
//!          └──────────┬───────────────────────┘
//!                     ▼
//!           ProgressStore (SQLite)  ──▶  BadgeNotifier
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let db = Database::open(&path)?;
//! let store = SqliteProgressStore::new(db.clone());
//! let study = StudyRepository::new(db);
//! let tracker = ActivityTracker::new(&store, &study, &LogNotifier, &SystemClock);
//!
//! let report = tracker.record_activity("user-1")?;
//! ```

pub mod badges;
mod sqlite;
mod store;
pub mod streaks;
mod tracker;

pub use badges::{
    BADGES, BadgeCategory, BadgeMetric, BadgeMetrics, BadgeRule, BadgeUnlocked, Evaluation,
    UserBadgeProgress, evaluate, progress_percent, validate_rules,
};
pub use sqlite::SqliteProgressStore;
pub use store::{BadgeNotifier, LogNotifier, MetricsSource, ProgressStore};
pub use streaks::{StreakChange, StreakOutcome, StreakRecord};
pub use tracker::{ActivityReport, ActivityTracker, BadgeWriteFailure, ProgressEvent};
