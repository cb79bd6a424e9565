//! Study group commands

use anyhow::Result;

use studysync::groups::{GroupService, MessageAttachment};

use super::AppContext;

pub fn group_create_command(ctx: &AppContext, name: &str, description: &str) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    let group = groups.create_group(ctx.user(), name, description)?;
    println!("Created group {} ({})", group.name, group.id);
    println!("Invite code: {}", group.invite_code);
    Ok(())
}

pub fn group_join_command(ctx: &AppContext, invite_code: &str) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    let joined = groups.join_group(ctx.user(), invite_code)?;
    println!("Joined {} ({})", joined.group_name, joined.group_id);
    Ok(())
}

pub fn group_leave_command(ctx: &AppContext, group_id: &str) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    groups.leave_group(ctx.user(), group_id)?;
    println!("Left group {group_id}");
    Ok(())
}

pub fn group_delete_command(ctx: &AppContext, group_id: &str) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    groups.delete_group(ctx.user(), group_id)?;
    println!("Deleted group {group_id}");
    Ok(())
}

/// Members of one group, or the user's own groups when no id is given
pub fn group_members_command(ctx: &AppContext, group_id: Option<&str>) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());

    let Some(group_id) = group_id else {
        let mine = groups.list_groups(ctx.user())?;
        if mine.is_empty() {
            println!("You are not in any groups.");
            return Ok(());
        }
        println!("Your groups ({}):\n", mine.len());
        for (group, role) in mine {
            println!("  {} [{}] code: {}", group.name, role, group.invite_code);
            println!("    id: {}", group.id);
        }
        return Ok(());
    };

    let members = groups.members(group_id)?;
    if members.is_empty() {
        println!("No members found.");
        return Ok(());
    }

    println!("Members ({}):\n", members.len());
    for member in members {
        println!(
            "  {} [{}] joined {}",
            member.user_id,
            member.role,
            member.joined_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub fn group_say_command(
    ctx: &AppContext,
    group_id: &str,
    message: &str,
    attachment: Option<MessageAttachment>,
) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    let sent = groups.send_message(ctx.user(), group_id, message, attachment)?;
    println!("Sent message {}", sent.id);
    Ok(())
}

/// Recent messages, oldest first, with reaction counts
pub fn group_messages_command(ctx: &AppContext, group_id: &str) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    let messages = groups.messages(ctx.user(), group_id)?;
    if messages.is_empty() {
        println!("No messages yet.");
        return Ok(());
    }

    for message in messages {
        println!(
            "[{}] {}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.user_id,
            message.content
        );
        if let Some(file) = &message.attachment {
            println!("    📎 {} ({}) {}", file.name, file.content_type, file.url);
        }
        let reactions = groups.reactions(ctx.user(), &message.id)?;
        if !reactions.is_empty() {
            let line: Vec<String> = reactions
                .iter()
                .map(|r| {
                    let mine = if r.reacted { "*" } else { "" };
                    format!("{} {}{}", r.emoji, r.count, mine)
                })
                .collect();
            println!("    {}", line.join("  "));
        }
        println!("    id: {}", message.id);
    }
    Ok(())
}

pub fn group_react_command(ctx: &AppContext, message_id: &str, emoji: &str, remove: bool) -> Result<()> {
    let groups = GroupService::new(ctx.db.clone());
    if remove {
        if groups.remove_reaction(ctx.user(), message_id, emoji)? {
            println!("Removed {emoji}");
        } else {
            println!("You had not reacted with {emoji}");
        }
    } else if groups.add_reaction(ctx.user(), message_id, emoji)? {
        println!("Reacted with {emoji}");
    } else {
        println!("Already reacted with {emoji}");
    }
    Ok(())
}
