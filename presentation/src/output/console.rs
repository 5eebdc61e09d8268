//! Console output: live trip events and the final plan

use crate::output::formatter::{OutputFormatter, TripPlan};
use crate::progress::reporter::ProgressReporter;
use async_trait::async_trait;
use colored::Colorize;
use tripsync_application::{NotificationSink, NotifyError};
use tripsync_domain::{AgentActivity, AnnouncementLevel, OptionTally, TripEvent, TripId};

/// Prints trip events as they are published
pub struct ConsoleNotifier {
    progress: ProgressReporter,
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(progress: ProgressReporter) -> Self {
        Self {
            progress,
            quiet: false,
        }
    }

    /// Drop everything except errors
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn tallies(options: &[OptionTally]) -> String {
        options
            .iter()
            .map(|o| format!("{} ({})", o.label, o.votes))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One display line per event; `None` for events shown only as progress
    pub fn render(event: &TripEvent) -> Option<String> {
        let line = match event {
            TripEvent::AgentStatus { agent, status, .. } => match status {
                AgentActivity::Started => return None,
                AgentActivity::Completed => format!("{} {}", "v".green(), agent),
                AgentActivity::CompletedWithWarnings => {
                    format!("{} {} (with warnings)", "!".yellow(), agent)
                }
                AgentActivity::Failed => format!("{} {}", "x".red(), agent.red()),
            },
            TripEvent::RunStatusChanged { status, reason } => match reason {
                Some(reason) => format!("{} {}: {}", "Run".cyan().bold(), status, reason),
                None => format!("{} {}", "Run".cyan().bold(), status),
            },
            TripEvent::VotingPrompt {
                phase,
                options,
                message,
            } => format!(
                "{} {}: {}\n    options: {}",
                "Vote".magenta().bold(),
                phase.display_name(),
                message,
                Self::tallies(options)
            ),
            TripEvent::VoteUpdate {
                phase,
                options,
                voters,
                total_members,
            } => format!(
                "{} {} {}/{} voted: {}",
                "Vote".magenta(),
                phase.display_name(),
                voters,
                total_members,
                Self::tallies(options)
            ),
            TripEvent::PhaseReadyUpdate {
                phase,
                users_ready,
                total,
                all_ready,
            } => {
                let mark = if *all_ready { "all ready".green() } else { "waiting".dimmed() };
                format!(
                    "{} {} {}/{} ready ({})",
                    "Ready".blue(),
                    phase.display_name(),
                    users_ready,
                    total,
                    mark
                )
            }
            TripEvent::PhaseResolved {
                phase,
                decision,
                rationale,
            } => format!(
                "{} {}: {} - {}",
                "Resolved".green().bold(),
                phase.display_name(),
                decision.as_deref().unwrap_or("-"),
                rationale
            ),
            TripEvent::Announcement { level, message } => match level {
                AnnouncementLevel::Info => format!("{} {}", "i".cyan(), message),
                AnnouncementLevel::Warning => format!("{} {}", "!".yellow(), message.yellow()),
                AnnouncementLevel::Error => format!("{} {}", "x".red(), message.red()),
            },
        };
        Some(line)
    }

    fn is_error(event: &TripEvent) -> bool {
        matches!(
            event,
            TripEvent::Announcement {
                level: AnnouncementLevel::Error,
                ..
            } | TripEvent::AgentStatus {
                status: AgentActivity::Failed,
                ..
            }
        )
    }
}

#[async_trait]
impl NotificationSink for ConsoleNotifier {
    async fn publish(&self, _trip_id: &TripId, event: TripEvent) -> Result<(), NotifyError> {
        if let TripEvent::AgentStatus {
            agent,
            status: AgentActivity::Started,
            step,
            progress,
        } = &event
        {
            if !self.quiet {
                self.progress.agent_started(agent, *step, *progress);
            }
            return Ok(());
        }
        if matches!(event, TripEvent::AgentStatus { .. }) {
            self.progress.agent_finished();
        }

        if self.quiet && !Self::is_error(&event) {
            return Ok(());
        }
        if let Some(line) = Self::render(&event) {
            self.progress.println(&line);
        }
        Ok(())
    }
}

/// Human-readable plan summary
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("\n{}\n{}\n{}\n", line.cyan(), title.cyan().bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n", format!("-- {} --", title).yellow().bold())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, plan: &TripPlan) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Trip: {}", plan.name)));
        output.push_str(&format!(
            "{} {}  {} {}\n",
            "Status:".cyan().bold(),
            plan.status,
            "Run:".cyan().bold(),
            plan.run_status.map(|s| s.as_str()).unwrap_or("none")
        ));

        output.push_str(&Self::section_header("Decisions"));
        output.push_str(&format!(
            "  Destination: {}\n",
            plan.destination.as_deref().unwrap_or("undecided")
        ));
        match (&plan.dates, plan.duration_days) {
            (Some(dates), _) => output.push_str(&format!("  Dates: {}\n", dates.label())),
            (None, Some(days)) => output.push_str(&format!("  Dates: open ({} days)\n", days)),
            (None, None) => output.push_str("  Dates: undecided\n"),
        }

        output.push_str(&Self::section_header("Phases"));
        for line in &plan.phases {
            let status = if line.blocked {
                format!("{} (blocked)", line.status).red().to_string()
            } else if line.status == tripsync_domain::PhaseStatus::Completed {
                line.status.to_string().green().to_string()
            } else {
                line.status.to_string()
            };
            output.push_str(&format!("  {:<12} {}\n", line.phase.display_name(), status));
        }

        if !plan.selected_activities.is_empty() {
            output.push_str(&Self::section_header("Selected Activities"));
            for activity in &plan.selected_activities {
                output.push_str(&format!(
                    "  * {} [{}] net {:+}\n",
                    activity.name, activity.category, activity.net_votes
                ));
            }
        }

        if let Some(itinerary) = &plan.itinerary {
            output.push_str(&Self::section_header("Itinerary"));
            for day in &itinerary.days {
                let date = day.date.map(|d| format!(" ({})", d)).unwrap_or_default();
                output.push_str(&format!("  {}\n", format!("Day {}{}", day.day, date).bold()));
                for item in &day.items {
                    output.push_str(&format!("    {:<9} {}\n", item.slot.as_str(), item.title));
                }
            }
        }

        if !plan.rejected_actions.is_empty() {
            output.push_str(&Self::section_header("Rejected Actions"));
            for rejected in &plan.rejected_actions {
                output.push_str(&format!("  * {}\n", rejected));
            }
        }
        if plan.unused_actions > 0 {
            output.push_str(&format!(
                "\n{} {} scripted action(s) were not needed\n",
                "Note:".dimmed(),
                plan.unused_actions
            ));
        }

        output
    }
}
