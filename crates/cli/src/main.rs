//! Lineup CLI - validate the bot's data files and preview its schedule

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lineup_core::application::SchedulerConfig;
use lineup_core::config::{load_roster, load_subjects};
use lineup_core::domain::{Roster, SubjectCatalog};
use lineup_core::port::parse_utc_offset;
use std::path::PathBuf;
use tabled::{Table, Tabled};

#[derive(Parser)]
#[command(name = "lineup")]
#[command(about = "Lineup queue bot operator CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the subjects and user mapping files
    Check {
        #[arg(long, env = "LINEUP__FILES__SUBJECTS", default_value = "subjects.json")]
        subjects: PathBuf,

        #[arg(long, env = "LINEUP__FILES__USER_MAPPING", default_value = "user_mapping.json")]
        users: PathBuf,
    },

    /// Show each subject's next session and when its queue opens
    Schedule {
        #[arg(long, env = "LINEUP__FILES__SUBJECTS", default_value = "subjects.json")]
        subjects: PathBuf,

        /// Offset to evaluate in, e.g. +03:00 (default: local)
        #[arg(long, env = "LINEUP__SCHEDULE__UTC_OFFSET")]
        utc_offset: Option<String>,

        /// Pretend it is this instant (RFC 3339)
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Debug, Tabled)]
struct ScheduleRow {
    #[tabled(rename = "Subject")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Next session")]
    next_start: String,
    #[tabled(rename = "Queue opens")]
    opens_at: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn schedule_rows(
    catalog: &SubjectCatalog,
    now: DateTime<FixedOffset>,
    config: &SchedulerConfig,
) -> Vec<ScheduleRow> {
    catalog
        .iter()
        .map(|subject| {
            let mut row = ScheduleRow {
                name: subject.name.clone(),
                code: subject.code.clone(),
                next_start: "-".to_string(),
                opens_at: "-".to_string(),
                status: String::new(),
            };

            match subject.slot() {
                Ok(slot) => {
                    let next = slot.next_occurrence(now);
                    let opens = next.start - config.opens_before();
                    row.next_start = next.start.format("%a %Y-%m-%d %H:%M").to_string();
                    row.opens_at = opens.format("%a %Y-%m-%d %H:%M").to_string();
                    row.status = if slot.current_occurrence(now).is_some() {
                        "in progress".to_string()
                    } else if now >= opens {
                        "queue open".to_string()
                    } else {
                        "waiting".to_string()
                    };
                }
                Err(e) => row.status = format!("invalid: {e}"),
            }
            row
        })
        .collect()
}

/// Surnames carried by several users; sheet rows with these are matched by
/// queue order only
fn shared_surname_report(roster: &Roster) -> Vec<String> {
    roster
        .shared_labels()
        .map(|(label, identities)| format!("'{label}' is shared by {}", identities.join(", ")))
        .collect()
}

fn resolve_now(utc_offset: Option<&str>, at: Option<&str>) -> Result<DateTime<FixedOffset>> {
    let offset = match utc_offset {
        Some(raw) => Some(parse_utc_offset(raw).with_context(|| format!("invalid offset '{raw}'"))?),
        None => None,
    };
    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at '{raw}', expected RFC 3339"))?,
        None => Local::now().into(),
    };
    Ok(match offset {
        Some(offset) => now.with_timezone(&offset),
        None => now,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { subjects, users } => {
            println!("{}", "Checking data files".cyan().bold());
            println!();

            let mut failed = false;

            match load_subjects(&subjects) {
                Ok(catalog) => {
                    let problems = catalog.validate();
                    if problems.is_empty() {
                        println!(
                            "  {} {} ({} subjects)",
                            "✓".green(),
                            subjects.display(),
                            catalog.len()
                        );
                    } else {
                        failed = true;
                        println!("  {} {}", "✗".red(), subjects.display());
                        for problem in problems {
                            println!("      {problem}");
                        }
                    }
                }
                Err(e) => {
                    failed = true;
                    println!("  {} {}: {e}", "✗".red(), subjects.display());
                }
            }

            match load_roster(&users) {
                Ok(roster) if roster.is_empty() => {
                    println!("  {} {} (no users, nobody can join)", "○".yellow(), users.display());
                }
                Ok(roster) => {
                    println!("  {} {} ({} users)", "✓".green(), users.display(), roster.len());
                    for line in shared_surname_report(&roster) {
                        println!("      {} {line}", "○".yellow());
                    }
                }
                Err(e) => {
                    failed = true;
                    println!("  {} {}: {e}", "✗".red(), users.display());
                }
            }

            if failed {
                bail!("data files have problems");
            }
        }

        Commands::Schedule {
            subjects,
            utc_offset,
            at,
        } => {
            let catalog = load_subjects(&subjects)
                .with_context(|| format!("failed to load {}", subjects.display()))?;
            let now = resolve_now(utc_offset.as_deref(), at.as_deref())?;
            let rows = schedule_rows(&catalog, now, &SchedulerConfig::default());

            println!(
                "{} {}",
                "Schedule as of".cyan().bold(),
                now.format("%a %Y-%m-%d %H:%M %:z")
            );
            println!();

            let count = |status: &str| rows.iter().filter(|r| r.status == status).count();
            let (open, running, waiting) = (count("queue open"), count("in progress"), count("waiting"));
            let invalid = rows.len() - open - running - waiting;
            println!("{}", Table::new(&rows));
            println!();
            println!(
                "{} open, {} in progress, {} waiting, {} invalid",
                open.to_string().green(),
                running.to_string().yellow(),
                waiting,
                invalid.to_string().red()
            );
        }
    }

    Ok(())
}
