//! Stats command implementation

use anyhow::Result;
use chrono::Local;

use super::AppContext;

/// Show weekly statistics and daily activity
pub fn stats_command(ctx: &AppContext, days: u32) -> Result<()> {
    let study = ctx.study();
    let now = Local::now();
    let weekly = study.weekly_stats(ctx.user(), now.fixed_offset())?;

    println!("This week:");
    println!("  Sessions:          {}", weekly.total_sessions);
    println!("  Time studied:      {} min", weekly.total_duration_minutes);
    println!("  Topics learned:    {}", weekly.topics_completed);
    println!(
        "  Most studied:      {}",
        weekly.most_studied_subject.as_deref().unwrap_or("-")
    );
    println!("  Consistency:       {}%", weekly.consistency_score);

    let delta = weekly.total_sessions as i64 - weekly.previous_week_sessions as i64;
    println!(
        "  vs. last week:     {}{} sessions",
        if delta >= 0 { "+" } else { "" },
        delta
    );

    let activity = study.daily_activity(ctx.user(), now.date_naive(), days)?;
    if activity.is_empty() {
        return Ok(());
    }

    println!("\nLast {} days:", activity.len());
    for day in activity {
        println!(
            "  {} {:<10} {} session(s), {} subject(s)",
            day.date.format("%Y-%m-%d"),
            "█".repeat(day.sessions.min(10) as usize),
            day.sessions,
            day.subjects.len()
        );
    }
    Ok(())
}
