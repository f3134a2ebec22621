//! # CalBot CLI
//!
//! Calendar reminder bot: posts a reminder shortly before each event and
//! turns one-line descriptions into calendar events.
//!
//! Usage:
//!   calbot run                                  # Start the reminder loop
//!   calbot run --dry-run                        # Log reminders instead of sending
//!   calbot add 2024-08-15 10:00-11:00 会議       # Create an event
//!   calbot list 7                               # Upcoming events
//!   calbot delete 会議                           # Delete by title
//!   calbot digest --send                        # Today's schedule
//!   calbot check                                # Verify calendar access
//!   calbot config show                          # Show configuration

use std::sync::Arc;

use anyhow::Result;
use calbot_calendar::{create_source, parser, GoogleCalendar};
use calbot_channels::{create_sinks, DiscordChannel, LogSink};
use calbot_core::traits::{EventSource, NotificationSink, SystemClock};
use calbot_core::types::{Event, EventTiming};
use calbot_core::config::MAX_HORIZON_DAYS;
use calbot_core::CalBotConfig;
use calbot_scheduler::{
    DailyDigestJob, NotificationDeduplicator, NotifyRouter, ReminderLoop, ReminderScheduler,
    ReminderSettings,
};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "calbot",
    version,
    about = "CalBot: calendar reminders in your chat channel",
    long_about = "Polls a Google calendar and posts a reminder before every event, exactly once.\nAlso creates and deletes events from one-line descriptions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder loop until Ctrl+C
    Run {
        /// Use an empty in-memory calendar and log reminders instead of sending
        #[arg(long)]
        dry_run: bool,
    },

    /// Create an event from "YYYY-MM-DD HH:MM-HH:MM title" or "MM/DD HH:MM-HH:MM title"
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List upcoming events
    List {
        /// Days ahead
        days: Option<i64>,
    },

    /// Delete the first upcoming event with this title
    Delete {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Show today's schedule
    Digest {
        /// Post it to the configured channels
        #[arg(long)]
        send: bool,
    },

    /// Check calendar and channel access
    Check,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "calbot=debug,calbot_core=debug,calbot_calendar=debug,calbot_scheduler=debug,calbot_channels=debug"
    } else {
        "calbot=info,calbot_calendar=info,calbot_scheduler=info,calbot_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        CalBotConfig::load_from(std::path::Path::new(path))?
    } else {
        CalBotConfig::load()?
    };
    config.validate()?;
    let zone = config.timezone()?;

    match cli.command {
        Commands::Run { dry_run } => {
            let source: Arc<dyn EventSource> = Arc::from(create_source(&config.calendar, zone, dry_run)?);
            let sink: Arc<dyn NotificationSink> = if dry_run {
                Arc::new(LogSink::new(zone))
            } else {
                let router = build_router(&config, zone)?;
                if router.is_empty() {
                    anyhow::bail!("No notification channel configured (channel.discord or channel.webhook)");
                }
                tracing::info!("Notification channels: {}", router.names().join(", "));
                Arc::new(router)
            };

            let reminder_loop = ReminderLoop::new(
                source,
                sink,
                Arc::new(SystemClock),
                ReminderSettings::from_config(&config),
                NotificationDeduplicator::from_config(&config.dedup),
            );
            let mut scheduler = ReminderScheduler::new(reminder_loop);
            scheduler.start();

            println!("CalBot reminder loop running ({}). Press Ctrl+C to stop.", config.timezone);
            tokio::signal::ctrl_c().await?;
            scheduler.stop();
            scheduler.wait().await?;
            println!("Stopped.");
        }

        Commands::Add { text } => {
            let text = text.join(" ");
            let Some(draft) = parser::parse_now(&text, zone) else {
                println!("Couldn't understand \"{text}\".");
                println!("Use: YYYY-MM-DD HH:MM-HH:MM title   or   MM/DD HH:MM-HH:MM title");
                return Ok(());
            };

            let source = create_source(&config.calendar, zone, false)?;
            let event = source.create_event(&draft).await?;
            println!("Created: {}", draft.title);
            println!(
                "  {} - {}",
                draft.start.format("%Y-%m-%d %H:%M"),
                draft.end.format("%H:%M")
            );
            println!("  id: {}", event.id);
            if let Some(url) = &config.calendar.web_url {
                println!("  {url}");
            }
        }

        Commands::List { days } => {
            let days = days.unwrap_or(config.horizons.upcoming_days);
            if !(1..=MAX_HORIZON_DAYS).contains(&days) {
                anyhow::bail!("Days must be between 1 and {MAX_HORIZON_DAYS}");
            }
            let source = create_source(&config.calendar, zone, false)?;
            let events = source.list_upcoming(Utc::now(), days).await?;

            if events.is_empty() {
                println!("No events in the next {days} days.");
            } else {
                println!("Events in the next {days} days:");
                for event in &events {
                    println!("  {}", event_line(event, &zone));
                }
            }
            if let Some(url) = &config.calendar.web_url {
                println!("\n{url}");
            }
        }

        Commands::Delete { title } => {
            let title = title.join(" ");
            let source = create_source(&config.calendar, zone, false)?;
            if source.delete_by_title(&title, config.horizons.delete_search_days).await? {
                println!("Deleted \"{title}\".");
            } else {
                println!(
                    "No event titled \"{title}\" in the next {} days.",
                    config.horizons.delete_search_days
                );
            }
        }

        Commands::Digest { send } => {
            let source: Arc<dyn EventSource> = Arc::from(create_source(&config.calendar, zone, false)?);
            let job = DailyDigestJob::new(source, Arc::new(SystemClock), zone)
                .with_days(config.horizons.digest_days);

            if send {
                let router = build_router(&config, zone)?;
                let count = if router.is_empty() {
                    job.send(&LogSink::new(zone)).await?
                } else {
                    job.send(&router).await?
                };
                println!("Digest sent ({count} events).");
            } else {
                let events = job.run().await?;
                if events.is_empty() {
                    println!("No events today.");
                }
                for event in &events {
                    println!("  {}", event_line(event, &zone));
                }
            }
        }

        Commands::Check => {
            println!("CalBot v{}", env!("CARGO_PKG_VERSION"));
            println!("  Timezone: {}", config.timezone);

            let calendar = GoogleCalendar::new(&config.calendar)?;
            let report = calendar.check_connection(Utc::now()).await?;
            println!(
                "  Calendar: {} ({})",
                report.summary.as_deref().unwrap_or("N/A"),
                report.calendar_id
            );
            println!("  Calendar timezone: {}", report.time_zone.as_deref().unwrap_or("N/A"));
            println!("  Next 24h: {} events", report.upcoming.len());
            for event in &report.upcoming {
                println!("    {}", event_line(event, &zone));
            }

            if let Some(discord) = config.channel.discord.as_ref().filter(|d| d.enabled) {
                let me = DiscordChannel::new(discord, zone)?.get_me().await?;
                println!("  Discord bot: {} ({})", me.username, me.id);
            }
            if let Some(webhook) = config.channel.webhook.as_ref().filter(|w| w.enabled) {
                println!("  Webhook: {}", webhook.outbound_url);
            }
        }

        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let content = toml::to_string_pretty(&config)?;
                    println!("{content}");
                }
            }
        }
    }

    Ok(())
}

/// All enabled channels, in priority order.
fn build_router(config: &CalBotConfig, zone: Tz) -> Result<NotifyRouter> {
    let mut router = NotifyRouter::new();
    for (priority, sink) in create_sinks(&config.channel, zone)? {
        router.add(priority, sink);
    }
    Ok(router)
}

fn event_line(event: &Event, zone: &Tz) -> String {
    let when = match &event.timing {
        EventTiming::Timed { start, .. } => start.with_timezone(zone).format("%m/%d %H:%M").to_string(),
        EventTiming::AllDay { start, .. } => format!("{} (all day)", start.format("%m/%d")),
    };
    let title = if event.title.is_empty() { "(no title)" } else { &event.title };
    format!("{when}  {title}")
}
