//! Log command implementation

use anyhow::{Context, Result};
use chrono::Local;

use studysync::progress::{ActivityTracker, BadgeUnlocked, StreakChange};
use studysync::study::NewSession;
use studysync::time::{SystemClock, parse_day_bucket};

use super::AppContext;

/// Record a study session, then update the streak and badges
pub fn log_command(
    ctx: &AppContext,
    subject_key: &str,
    topic_keys: &[String],
    notes: &str,
    date: Option<&str>,
    duration: Option<u32>,
) -> Result<()> {
    let session_date = match date {
        Some(d) => parse_day_bucket(d).with_context(|| format!("Invalid date (expected YYYY-MM-DD): {d}"))?,
        None => Local::now().date_naive(),
    };

    let study = ctx.study();
    let subject = ctx.find_subject(&study, subject_key)?;
    let topic_ids = topic_keys
        .iter()
        .map(|key| ctx.find_topic(&study, &subject, key).map(|t| t.id))
        .collect::<Result<Vec<_>>>()?;

    let session = study.log_session(
        ctx.user(),
        NewSession {
            subject_id: subject.id.clone(),
            topic_ids,
            notes: notes.to_string(),
            session_date,
            duration_minutes: duration,
        },
    )?;
    println!("Logged session for {} on {}", subject.name, session.session_date);

    let store = ctx.progress_store();
    let notify = |u: &BadgeUnlocked| ctx.announce(u);
    let report =
        ActivityTracker::new(&store, &study, &notify, &SystemClock).record_activity(ctx.user())?;

    match report.outcome.change() {
        Some(StreakChange::Increment) => {
            println!("🔥 Streak: {} days", report.streak.current_streak)
        }
        Some(StreakChange::Reset) => {
            println!("Streak restarted: 1 day (best: {})", report.streak.longest_streak)
        }
        None => println!(
            "Streak: {} days (already counted today)",
            report.streak.current_streak
        ),
    }

    for failure in &report.failed_writes {
        eprintln!("Warning: could not save badge {}: {}", failure.badge_id, failure.error);
    }
    Ok(())
}
