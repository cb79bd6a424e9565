//! Streak and badge commands

use anyhow::Result;
use chrono::Local;

use studysync::progress::{
    ActivityTracker, BADGES, BadgeCategory, BadgeUnlocked, ProgressStore, UserBadgeProgress,
};
use studysync::time::SystemClock;

use super::AppContext;

pub fn streak_command(ctx: &AppContext, reset: bool) -> Result<()> {
    let store = ctx.progress_store();

    if reset {
        let study = ctx.study();
        let notify = |u: &BadgeUnlocked| ctx.announce(u);
        let record =
            ActivityTracker::new(&store, &study, &notify, &SystemClock).reset_streak(ctx.user())?;
        println!("Streak reset. Best streak: {} days", record.longest_streak);
        return Ok(());
    }

    let record = store.load_streak_record(ctx.user())?;
    let now = Local::now();
    println!("🔥 Current streak: {} days", record.current_streak);
    println!("   Longest streak: {} days", record.longest_streak);
    match record.last_activity_at {
        Some(last) => {
            println!("   Last study:     {}", last.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
            if record.current_streak > 0 && !record.is_active(&now) {
                println!("   More than 24 hours have passed; your next session restarts the streak.");
            }
        }
        None => println!("   No study sessions yet."),
    }
    Ok(())
}

pub fn badges_command(ctx: &AppContext, json: bool) -> Result<()> {
    let store = ctx.progress_store();
    let study = ctx.study();
    let notify = |u: &BadgeUnlocked| ctx.announce(u);
    let report =
        ActivityTracker::new(&store, &study, &notify, &SystemClock).refresh_badges(ctx.user())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.badges)?);
        return Ok(());
    }

    let earned = report.badges.iter().filter(|b| b.is_earned()).count();
    println!("Badges: {}/{} earned", earned, BADGES.len());

    for category in [BadgeCategory::Learning, BadgeCategory::Streak] {
        println!("\n{}:", category.label());
        for rule in BADGES.iter().filter(|r| r.category == category) {
            let status = match report.badges.iter().find(|b| b.badge_id == rule.id) {
                Some(UserBadgeProgress {
                    earned_at: Some(at),
                    ..
                }) => format!("earned {}", at.with_timezone(&Local).format("%Y-%m-%d")),
                Some(entry) => format!("{}%", entry.progress),
                None => "0%".to_string(),
            };
            println!(
                "  {} {:<20} {:<36} {}",
                rule.icon, rule.name, rule.requirement(), status
            );
        }
    }
    Ok(())
}
