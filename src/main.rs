use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use studysync::groups::MessageAttachment;

mod cli;

use cli::AppContext;

#[derive(Parser)]
#[command(name = "studysync")]
#[command(about = "StudySync - track study sessions, streaks and badges")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.studysync/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file and database
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage subjects
    #[command(subcommand)]
    Subject(SubjectCommands),

    /// Manage topics within a subject
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Log a study session and update streak and badges
    Log {
        /// Subject id or name
        subject: String,

        /// Topic ids or names covered in this session
        #[arg(short, long = "topic")]
        topics: Vec<String>,

        /// Session notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Session date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Duration in minutes
        #[arg(short = 'm', long)]
        duration: Option<u32>,
    },

    /// Show the current study streak
    Streak {
        /// Reset the current streak to zero
        #[arg(long)]
        reset: bool,
    },

    /// Show badge progress
    Badges {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show weekly statistics and recent daily activity
    Stats {
        /// Number of days of daily activity to show (1-366)
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=366))]
        days: u32,
    },

    /// Manage study groups
    #[command(subcommand)]
    Group(GroupCommands),

    /// Manage study materials
    #[command(subcommand)]
    Material(MaterialCommands),

    /// Show or change the theme preference
    #[command(subcommand)]
    Theme(ThemeCommands),
}

#[derive(Subcommand)]
enum SubjectCommands {
    /// Add a subject
    Add {
        name: String,
        /// Hex color (#rgb or #rrggbb)
        #[arg(long, default_value = "#3b82f6")]
        color: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List subjects
    List,
    /// Delete a subject with its topics and sessions
    Delete {
        /// Subject id or name
        subject: String,
    },
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Add a topic to a subject
    Add {
        /// Subject id or name
        subject: String,
        name: String,
    },
    /// List topics of a subject
    List {
        /// Subject id or name
        subject: String,
    },
    /// Change the status of a topic (not-started, in-progress, learned)
    Status {
        /// Subject id or name
        subject: String,
        /// Topic id or name
        topic: String,
        status: String,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Create a group and print its invite code
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Join a group by invite code
    Join { invite_code: String },
    /// Leave a group
    Leave { group_id: String },
    /// Delete a group (admins only)
    Delete { group_id: String },
    /// List members of a group, or your groups when no id is given
    Members { group_id: Option<String> },
    /// Post a message to a group
    Say {
        group_id: String,
        #[arg(default_value = "")]
        message: String,
        /// URL of an attached file
        #[arg(long, requires_all = ["attach_name", "attach_type"])]
        attach_url: Option<String>,
        #[arg(long)]
        attach_name: Option<String>,
        /// MIME type of the attached file
        #[arg(long)]
        attach_type: Option<String>,
    },
    /// Show recent messages of a group with their reactions
    Messages { group_id: String },
    /// React to a message with an emoji
    React {
        message_id: String,
        emoji: String,
        /// Remove the reaction instead
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand)]
enum MaterialCommands {
    /// Add a link or PDF
    Add {
        title: String,
        url: String,
        /// pdf or link
        #[arg(long, default_value = "link")]
        kind: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Subject id or name
        #[arg(long)]
        subject: Option<String>,
        /// Share with this group right away
        #[arg(long)]
        group: Option<String>,
    },
    /// List your materials and those shared with your groups
    List {
        /// Only materials shared with this group
        #[arg(long)]
        group: Option<String>,
    },
    /// Delete one of your materials
    Delete { material_id: String },
    /// Mark a material as useful
    Useful { material_id: String },
    /// Share one of your materials with a group
    Share { material_id: String, group_id: String },
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// Show the current theme
    Show,
    /// Change mode and/or accent color
    Set {
        /// light or dark
        #[arg(long)]
        mode: Option<String>,
        /// blue, purple, green, orange, pink or teal
        #[arg(long)]
        accent: Option<String>,
    },
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = AppContext::resolve_config_path(cli.config.as_deref());

    if let Commands::Init { force } = cli.command {
        init_logging(if cli.verbose { "debug" } else { "info" });
        return cli::init::init_command(&config_path, force);
    }

    let ctx = AppContext::load(&config_path)?;
    init_logging(if cli.verbose { "debug" } else { ctx.config.log_level.as_str() });

    match cli.command {
        // Handled before the context is loaded
        Commands::Init { .. } => Ok(()),
        Commands::Subject(cmd) => match cmd {
            SubjectCommands::Add {
                name,
                color,
                description,
            } => cli::subject::subject_add_command(&ctx, &name, &description, &color),
            SubjectCommands::List => cli::subject::subject_list_command(&ctx),
            SubjectCommands::Delete { subject } => {
                cli::subject::subject_delete_command(&ctx, &subject)
            }
        },
        Commands::Topic(cmd) => match cmd {
            TopicCommands::Add { subject, name } => {
                cli::subject::topic_add_command(&ctx, &subject, &name)
            }
            TopicCommands::List { subject } => cli::subject::topic_list_command(&ctx, &subject),
            TopicCommands::Status {
                subject,
                topic,
                status,
            } => cli::subject::topic_status_command(&ctx, &subject, &topic, &status),
        },
        Commands::Log {
            subject,
            topics,
            notes,
            date,
            duration,
        } => cli::session::log_command(
            &ctx,
            &subject,
            &topics,
            &notes,
            date.as_deref(),
            duration,
        ),
        Commands::Streak { reset } => cli::progress::streak_command(&ctx, reset),
        Commands::Badges { json } => cli::progress::badges_command(&ctx, json),
        Commands::Stats { days } => cli::stats::stats_command(&ctx, days),
        Commands::Group(cmd) => match cmd {
            GroupCommands::Create { name, description } => {
                cli::group::group_create_command(&ctx, &name, &description)
            }
            GroupCommands::Join { invite_code } => {
                cli::group::group_join_command(&ctx, &invite_code)
            }
            GroupCommands::Leave { group_id } => cli::group::group_leave_command(&ctx, &group_id),
            GroupCommands::Delete { group_id } => {
                cli::group::group_delete_command(&ctx, &group_id)
            }
            GroupCommands::Members { group_id } => {
                cli::group::group_members_command(&ctx, group_id.as_deref())
            }
            GroupCommands::Say {
                group_id,
                message,
                attach_url,
                attach_name,
                attach_type,
            } => {
                let attachment = match (attach_url, attach_name, attach_type) {
                    (Some(url), Some(name), Some(content_type)) => Some(MessageAttachment {
                        url,
                        name,
                        content_type,
                    }),
                    _ => None,
                };
                cli::group::group_say_command(&ctx, &group_id, &message, attachment)
            }
            GroupCommands::Messages { group_id } => {
                cli::group::group_messages_command(&ctx, &group_id)
            }
            GroupCommands::React {
                message_id,
                emoji,
                remove,
            } => cli::group::group_react_command(&ctx, &message_id, &emoji, remove),
        },
        Commands::Material(cmd) => match cmd {
            MaterialCommands::Add {
                title,
                url,
                kind,
                description,
                subject,
                group,
            } => cli::material::material_add_command(
                &ctx,
                &title,
                &url,
                &kind,
                &description,
                subject.as_deref(),
                group,
            ),
            MaterialCommands::List { group } => {
                cli::material::material_list_command(&ctx, group.as_deref())
            }
            MaterialCommands::Delete { material_id } => {
                cli::material::material_delete_command(&ctx, &material_id)
            }
            MaterialCommands::Useful { material_id } => {
                cli::material::material_useful_command(&ctx, &material_id)
            }
            MaterialCommands::Share {
                material_id,
                group_id,
            } => cli::material::material_share_command(&ctx, &material_id, &group_id),
        },
        Commands::Theme(cmd) => match cmd {
            ThemeCommands::Show => cli::theme::theme_show_command(&ctx),
            ThemeCommands::Set { mode, accent } => {
                cli::theme::theme_set_command(&ctx, mode.as_deref(), accent.as_deref())
            }
        },
    }
}
