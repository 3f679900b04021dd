//! Terminal rendering of resources and log lines

use chrono::Utc;
use colored::{ColoredString, Colorize};

use crate::models::build::Build;
use crate::models::deployment::Deployment;
use crate::models::log::{LogEntry, Severity};
use crate::models::pipeline::{Pipeline, PipelineStep};
use crate::models::Resource;
use crate::progress::{elapsed, PipelineProgress, StepStatus};

const BAR_WIDTH: usize = 30;

/// One-line and detailed views of a resource
pub trait Render: Resource {
    /// Kind-specific details appended after the status
    fn details(&self) -> Vec<String>;

    /// `<kind> <id>  <status>  <details...>`
    fn summary(&self) -> String {
        let mut line = format!(
            "{} {}  {}",
            Self::KIND.to_string().bold(),
            self.id(),
            status_label(self.status_label(), self.is_terminal(), self.error_message().is_some())
        );
        for detail in self.details() {
            line.push_str("  ");
            line.push_str(&detail);
        }
        if let Some(message) = self.error_message() {
            line.push_str(&format!("\n  {} {}", "error:".red().bold(), message));
        }
        line
    }
}

fn status_label(label: &str, terminal: bool, failed: bool) -> ColoredString {
    if failed || label == "failed" {
        label.red().bold()
    } else if terminal {
        label.green().bold()
    } else if label == "unknown" || label.is_empty() {
        label.dimmed()
    } else {
        label.yellow()
    }
}

impl Render for Build {
    fn details(&self) -> Vec<String> {
        let mut details = Vec::new();
        if let Some(image) = &self.image_uri {
            details.push(format!("image={}", image));
        }
        if let (Some(start), Some(end)) = (self.created_at, self.completed_at) {
            details.push(format!("took {}s", elapsed(start, end).as_secs()));
        }
        details
    }
}

impl Render for Deployment {
    fn details(&self) -> Vec<String> {
        let mut details = Vec::new();
        if let Some(name) = &self.service_name {
            details.push(format!("service={}", name));
        }
        if let Some(url) = &self.service_url {
            details.push(url.underline().to_string());
        }
        if let Some(percent) = self.traffic_percent {
            details.push(format!("traffic={}%", percent));
        }
        if let Some(version) = &self.model_version {
            details.push(format!("model={}", version));
        }
        details
    }
}

impl Render for Pipeline {
    fn details(&self) -> Vec<String> {
        let progress = PipelineProgress::of(self);
        let mut details = vec![
            progress_bar(progress.progress_percentage()),
            step_line(&progress),
        ];

        let remaining = progress.estimated_time_remaining();
        if !remaining.is_zero() {
            details.push(format!("~{}s left", remaining.as_secs()));
        }
        if let Some(start) = self.created_at {
            details.push(format!("{}s elapsed", elapsed(start, Utc::now()).as_secs()));
        }
        if let Some(url) = &self.service_url {
            details.push(url.underline().to_string());
        }
        details
    }
}

/// `[#######.......]  45%`
pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled).green(),
        ".".repeat(BAR_WIDTH - filled).dimmed(),
        percent
    )
}

fn step_line(progress: &PipelineProgress<'_>) -> String {
    PipelineStep::ALL
        .iter()
        .map(|step| {
            let name = step.as_str();
            match progress.step_status(*step) {
                StepStatus::Completed => name.green().to_string(),
                StepStatus::Current => name.yellow().bold().to_string(),
                StepStatus::Failed => name.red().bold().to_string(),
                StepStatus::Upcoming => name.dimmed().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

/// `HH:MM:SS LEVEL message`
pub fn log_line(entry: &LogEntry) -> String {
    let level = format!("{:<8}", entry.severity.as_str().to_uppercase());
    let level = match entry.severity {
        Severity::Debug => level.dimmed(),
        Severity::Info => level.blue(),
        Severity::Warning => level.yellow(),
        Severity::Error => level.red(),
        Severity::Critical => level.red().bold(),
    };
    format!("{} {} {}", entry.timestamp.format("%H:%M:%S").to_string().dimmed(), level, entry.message)
}

/// Display-only status text from the log stream
pub fn notice_line(text: &str) -> String {
    format!("{} {}", "--".dimmed(), text.cyan())
}

/// Non-fatal error reported on the log stream
pub fn warning_line(message: &str) -> String {
    format!("{} {}", "warning:".yellow().bold(), message)
}
