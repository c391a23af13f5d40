//! Console output formatter for orchestration results

use std::collections::BTreeMap;

use colored::Colorize;
use conductor_application::RequestOutcome;
use conductor_domain::{ConversationSummary, SessionId, truncate};

/// Formats engine output for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the outcome of a processed request
    pub fn format_outcome(outcome: &RequestOutcome) -> String {
        let mut output = String::new();

        output.push_str(&outcome.response);
        output.push('\n');

        if let Some(plan) = &outcome.plan {
            let status = if outcome.executed {
                "executed".green()
            } else {
                "pending (/execute to run)".yellow()
            };
            output.push_str(&format!(
                "\n{} {} [{}]\n",
                "Plan:".cyan().bold(),
                plan.task_description,
                status
            ));
        }

        output
    }

    /// Format the tool catalogue, grouped by provider
    pub fn format_catalogue(catalogue: &BTreeMap<String, Vec<String>>) -> String {
        if catalogue.is_empty() {
            return format!("{}\n", "No tools available.".dimmed());
        }

        let mut output = Self::section_header("Available tools");
        for (provider, lines) in catalogue {
            output.push_str(&format!("\n{}\n", provider.yellow().bold()));
            for line in lines {
                output.push_str(&format!("  - {}\n", line));
            }
        }
        output
    }

    /// Format the session list, marking the active one
    pub fn format_sessions(sessions: &[SessionId], current: &SessionId) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No sessions.".dimmed());
        }

        let mut output = Self::section_header("Sessions");
        for id in sessions {
            if id == current {
                output.push_str(&format!("{} {}\n", "*".green().bold(), id.as_str().green()));
            } else {
                output.push_str(&format!("  {}\n", id));
            }
        }
        output
    }

    /// Format a session summary
    pub fn format_summary(summary: &ConversationSummary) -> String {
        let mut output = Self::section_header("Session summary");
        output.push_str(&format!("{} {}\n", "Session:".cyan(), summary.session_id));
        output.push_str(&format!(
            "{} {}\n",
            "Executions:".cyan(),
            summary.execution_count
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Pending plan:".cyan(),
            if summary.has_plan { "yes" } else { "no" }
        ));

        if let Some(record) = &summary.last_record {
            output.push_str(&format!(
                "{} {} ({})\n",
                "Last request:".cyan(),
                truncate(&record.user_input, 80),
                record.timestamp.format("%Y-%m-%d %H:%M:%S")
            ));
            output.push_str(&format!(
                "{} {}\n",
                "Last result:".cyan(),
                truncate(&record.execution_result, 200)
            ));
        }
        output
    }

    /// Format an error line
    pub fn error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
