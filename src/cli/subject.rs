//! Subject and topic commands

use anyhow::Result;

use studysync::progress::{ActivityTracker, BadgeUnlocked};
use studysync::study::TopicStatus;
use studysync::time::SystemClock;

use super::AppContext;

pub fn subject_add_command(
    ctx: &AppContext,
    name: &str,
    description: &str,
    color: &str,
) -> Result<()> {
    let study = ctx.study();
    let subject = study.add_subject(ctx.user(), name, description, color)?;
    println!("Added subject {} ({})", subject.name, subject.id);

    // Subject count feeds the collector badges
    let store = ctx.progress_store();
    let notify = |u: &BadgeUnlocked| ctx.announce(u);
    ActivityTracker::new(&store, &study, &notify, &SystemClock).refresh_badges(ctx.user())?;
    Ok(())
}

pub fn subject_list_command(ctx: &AppContext) -> Result<()> {
    let study = ctx.study();
    let subjects = study.list_subjects(ctx.user())?;

    if subjects.is_empty() {
        println!("No subjects yet. Add one with `studysync subject add <name>`.");
        return Ok(());
    }

    println!("Subjects ({}):\n", subjects.len());
    for subject in subjects {
        let topics = study.list_topics(ctx.user(), &subject.id)?;
        let learned = topics
            .iter()
            .filter(|t| t.status == TopicStatus::Learned)
            .count();
        println!(
            "  {} {} - {}/{} topics learned",
            subject.color,
            subject.name,
            learned,
            topics.len()
        );
        if !subject.description.is_empty() {
            println!("    {}", subject.description);
        }
        println!("    id: {}", subject.id);
    }
    Ok(())
}

pub fn subject_delete_command(ctx: &AppContext, key: &str) -> Result<()> {
    let study = ctx.study();
    let subject = ctx.find_subject(&study, key)?;
    study.delete_subject(ctx.user(), &subject.id)?;
    println!("Deleted subject {}", subject.name);
    Ok(())
}

pub fn topic_add_command(ctx: &AppContext, subject_key: &str, name: &str) -> Result<()> {
    let study = ctx.study();
    let subject = ctx.find_subject(&study, subject_key)?;
    let topic = study.add_topic(ctx.user(), &subject.id, name)?;
    println!("Added topic {} to {} ({})", topic.name, subject.name, topic.id);
    Ok(())
}

pub fn topic_list_command(ctx: &AppContext, subject_key: &str) -> Result<()> {
    let study = ctx.study();
    let subject = ctx.find_subject(&study, subject_key)?;
    let topics = study.list_topics(ctx.user(), &subject.id)?;

    if topics.is_empty() {
        println!("No topics in {}.", subject.name);
        return Ok(());
    }

    println!("{} ({} topics):\n", subject.name, topics.len());
    for topic in topics {
        let marker = match topic.status {
            TopicStatus::Learned => "✓",
            TopicStatus::InProgress => "…",
            TopicStatus::NotStarted => " ",
        };
        println!("  [{}] {}. {} ({})", marker, topic.order_index + 1, topic.name, topic.id);
    }
    Ok(())
}

pub fn topic_status_command(
    ctx: &AppContext,
    subject_key: &str,
    topic_key: &str,
    status: &str,
) -> Result<()> {
    let status: TopicStatus = status.parse()?;
    let study = ctx.study();
    let subject = ctx.find_subject(&study, subject_key)?;
    let topic = ctx.find_topic(&study, &subject, topic_key)?;
    let topic = study.set_topic_status(ctx.user(), &topic.id, status)?;
    println!("{} is now {}", topic.name, topic.status);

    let store = ctx.progress_store();
    let notify = |u: &BadgeUnlocked| ctx.announce(u);
    ActivityTracker::new(&store, &study, &notify, &SystemClock).refresh_badges(ctx.user())?;
    Ok(())
}
