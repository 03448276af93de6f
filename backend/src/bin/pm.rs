// pm: command-line client for pm-agent-server
//
// Every command maps to one API call; `--json` prints the raw response.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pm_agent_lib::{
    api::{CreateTaskRequest, RiskCheckInput, RiskItem},
    client::ApiClient,
    config::{parse_team_leads, Config},
    digest::DigestRequest,
    project_log::{LogCategory, LogFilter, DEFAULT_LIMIT},
    schedule::MeetingRequest,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pm", version, about = "Project-management assistant CLI")]
struct Cli {
    /// Server URL (defaults to PM_AGENT_URL or the configured bind address)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the server is up
    Health,
    /// Turn a free-text plan into stories
    Plan {
        /// Plan text; read from --file when omitted
        text: Vec<String>,
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },
    /// Submit a team lead's risk check-in
    Risk {
        team_lead: String,
        /// Off-track story as `ID=reason`
        #[arg(long = "blocker")]
        blockers: Vec<String>,
        /// On-track story id
        #[arg(long = "on-track")]
        on_track: Vec<String>,
    },
    /// Active stories owned by a team lead
    Stories { team_lead: String },
    /// Find overdue tasks and notify their owners
    Alerts {
        /// Report only, send nothing
        #[arg(long)]
        check: bool,
        #[arg(long)]
        no_notify: bool,
        /// Include tasks already marked Done
        #[arg(long)]
        include_pending: bool,
    },
    /// Show the project log
    Log {
        #[arg(long)]
        keyword: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
        /// 0 for no limit
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
        /// plans, risk, alerts, meetings, digests or system
        #[arg(long)]
        category: Option<String>,
    },
    /// Append a line to the project log
    Note { text: Vec<String> },
    /// Generate a PDF status report
    Digest {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        no_charts: bool,
        #[arg(long)]
        no_blockers: bool,
    },
    /// List generated reports
    Reports,
    /// Schedule a triage meeting for blocked stories
    Schedule {
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value_t = 15)]
        duration: u32,
        /// Only propose a time
        #[arg(long)]
        propose: bool,
        /// YYYY-MM-DD
        #[arg(long)]
        day: Option<String>,
        /// HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Extra attendee as `Name <email>`
        #[arg(long = "attendee")]
        attendees: Vec<String>,
    },
    /// List blocked stories
    Blocked,
    /// List tasks
    Tasks,
    /// Create a task
    Add {
        title: Vec<String>,
        #[arg(long)]
        owner: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Change a task's status
    Status { id: String, status: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_blocker(raw: &str) -> (String, Option<String>) {
    match raw.split_once('=') {
        Some((id, reason)) => (id.trim().to_string(), Some(reason.trim().to_string())),
        None => (raw.trim().to_string(), None),
    }
}

fn parse_category(raw: &str) -> Result<LogCategory> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .with_context(|| format!("Unknown log category '{}'", raw))
}

async fn run(cli: Cli) -> Result<()> {
    let url = cli.url.unwrap_or_else(|| Config::from_env().api_url);
    let client = ApiClient::new(url)?;

    match cli.command {
        Command::Health => {
            let health = client.health().await?;
            if cli.json {
                return print_json(&health);
            }
            println!(
                "{} ({})",
                health["status"].as_str().unwrap_or("unknown"),
                client.base_url()
            );
        }
        Command::Plan { text, file } => {
            let plan_text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => text.join(" "),
            };
            let response = client.plan(&plan_text).await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{}", response.message);
            for story in &response.stories {
                println!("  {}  {}  {}  due {}", story.id, story.owner, story.title, story.due_date);
            }
        }
        Command::Risk {
            team_lead,
            blockers,
            on_track,
        } => {
            let stories = client.lead_stories(&team_lead).await?.stories;
            let title_of = |id: &str| {
                stories
                    .iter()
                    .find(|s| s.story_id == id)
                    .map(|s| s.title.clone())
                    .unwrap_or_else(|| id.to_string())
            };

            let mut items: Vec<RiskItem> = blockers
                .iter()
                .map(|raw| {
                    let (id, reason) = parse_blocker(raw);
                    RiskItem {
                        title: title_of(&id),
                        story_id: id,
                        on_track: false,
                        reason,
                    }
                })
                .collect();
            items.extend(on_track.iter().map(|id| RiskItem {
                story_id: id.clone(),
                title: title_of(id),
                on_track: true,
                reason: None,
            }));

            let output = client.risk(&RiskCheckInput { team_lead, items }).await?;
            if cli.json {
                return print_json(&output);
            }
            println!("{}", output.message);
            for item in &output.blockers {
                println!("  blocker: {} {}", item.story_id, item.reason.as_deref().unwrap_or(""));
            }
            for item in &output.needs_discussion {
                println!("  needs discussion: {}", item.story_id);
            }
        }
        Command::Stories { team_lead } => {
            let response = client.lead_stories(&team_lead).await?;
            if cli.json {
                return print_json(&response);
            }
            if response.stories.is_empty() {
                println!("No active stories for {}", response.team_lead);
            }
            for story in &response.stories {
                println!("  {}  [{}]  {}", story.story_id, story.status, story.title);
            }
        }
        Command::Alerts {
            check,
            no_notify,
            include_pending,
        } => {
            let response = if check {
                client.check_alerts().await?
            } else {
                client.alerts(!no_notify, include_pending).await?
            };
            if cli.json {
                return print_json(&response);
            }
            println!("{}", response.message);
            for task in &response.overdue_tasks {
                println!(
                    "  {}  {}  {} ({} days late)",
                    task.id, task.owner, task.title, task.days_overdue
                );
            }
        }
        Command::Log {
            keyword,
            from,
            to,
            limit,
            category,
        } => {
            let filter = LogFilter {
                keyword,
                date_from: from,
                date_to: to,
                limit: Some(limit),
                category: category.as_deref().map(parse_category).transpose()?,
            };
            let response = client.filter_log(&filter).await?;
            if cli.json {
                return print_json(&response);
            }
            for entry in &response.entries {
                println!("{}  {}", entry.timestamp, entry.message);
            }
        }
        Command::Note { text } => {
            let response = client.add_log_entry(&text.join(" ")).await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{}", response.message);
        }
        Command::Digest {
            title,
            from,
            to,
            no_charts,
            no_blockers,
        } => {
            let mut request = DigestRequest {
                start_date: from,
                end_date: to,
                include_charts: !no_charts,
                include_blockers: !no_blockers,
                ..Default::default()
            };
            if let Some(title) = title {
                request.title = title;
            }
            let response = client.digest(&request).await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{}", response.message);
            println!("  {}", response.pdf_path);
        }
        Command::Reports => {
            let reports = client.reports().await?;
            if cli.json {
                return print_json(&reports);
            }
            for name in &reports {
                println!("{}", name);
            }
        }
        Command::Schedule {
            title,
            duration,
            propose,
            day,
            time,
            attendees,
        } => {
            let additional = parse_team_leads(&attendees.join(";"));
            let mut request = MeetingRequest {
                duration_minutes: duration,
                auto_schedule: !propose,
                preferred_day: day,
                preferred_start_time: time,
                additional_attendees: (!additional.is_empty()).then_some(additional),
                ..Default::default()
            };
            if let Some(title) = title {
                request.title = title;
            }
            let response = client.schedule(&request).await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{}", response.message);
            if let Some(link) = &response.meeting_link {
                println!("  {}", link);
            }
        }
        Command::Blocked => {
            let response = client.blocked().await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{} blocked stories", response.blocked_count);
            for story in &response.blocked_stories {
                println!(
                    "  {}  {}  {}: {}",
                    story.id, story.owner, story.title, story.blocker_description
                );
            }
        }
        Command::Tasks => {
            let tasks = client.tasks().await?;
            if cli.json {
                return print_json(&tasks);
            }
            for task in &tasks {
                println!(
                    "{}  [{}]  {}  {}",
                    task.id,
                    task.status,
                    task.title,
                    task.owner_or_unassigned()
                );
            }
        }
        Command::Add {
            title,
            owner,
            due,
            priority,
            status,
        } => {
            let request = CreateTaskRequest {
                title: Some(title.join(" ")),
                owner,
                due_date: due,
                priority,
                status,
                ..Default::default()
            };
            let task = client.create_task(&request).await?;
            if cli.json {
                return print_json(&task);
            }
            println!("Created {}: {}", task.id, task.title);
        }
        Command::Status { id, status } => {
            let task = client.update_status(&id, &status).await?;
            if cli.json {
                return print_json(&task);
            }
            println!("{} is now {}", task.id, task.status);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blocker() {
        assert_eq!(
            parse_blocker("TSK-001= waiting on vendor"),
            ("TSK-001".to_string(), Some("waiting on vendor".to_string()))
        );
        assert_eq!(parse_blocker("TSK-002"), ("TSK-002".to_string(), None));
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("Risk").unwrap(), LogCategory::Risk);
        assert!(parse_category("weather").is_err());
    }

    #[test]
    fn test_cli_parses_schedule() {
        let cli = Cli::try_parse_from(["pm", "schedule", "--propose", "--duration", "30"]).unwrap();
        match cli.command {
            Command::Schedule {
                propose, duration, ..
            } => {
                assert!(propose);
                assert_eq!(duration, 30);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
