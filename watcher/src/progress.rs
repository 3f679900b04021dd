//! Pipeline progress derivation
//!
//! Pure functions over a pipeline's step state. Identical inputs always give
//! identical outputs; none of them read the clock.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::pipeline::{Pipeline, PipelineStep};
use crate::models::status::PipelineStatus;

/// Rough per-step durations used for the remaining-time estimate.
///
/// These are hardcoded UX guesses, not measurements; no telemetry backs them.
pub fn average_step_duration(step: PipelineStep) -> Duration {
    match step {
        PipelineStep::Parse => Duration::from_secs(5),
        PipelineStep::Dependencies => Duration::from_secs(30),
        PipelineStep::Upload => Duration::from_secs(15),
        PipelineStep::Build => Duration::from_secs(180),
        PipelineStep::Deploy => Duration::from_secs(60),
    }
}

/// Display state of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Current,
    Upcoming,
    Failed,
}

/// Borrowed view of the inputs progress is derived from
#[derive(Debug, Clone, Copy)]
pub struct PipelineProgress<'a> {
    pub steps: &'a [PipelineStep],
    pub current_step: Option<PipelineStep>,
    pub completed: &'a [PipelineStep],
    pub status: &'a PipelineStatus,
}

impl<'a> PipelineProgress<'a> {
    /// View over the fixed five-step sequence
    pub fn of(pipeline: &'a Pipeline) -> Self {
        Self {
            steps: &PipelineStep::ALL,
            current_step: pipeline.current_step,
            completed: &pipeline.steps_completed,
            status: &pipeline.status,
        }
    }

    fn is_completed(&self, step: PipelineStep) -> bool {
        self.completed.contains(&step)
    }

    fn in_progress(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn step_status(&self, step: PipelineStep) -> StepStatus {
        let is_current = self.current_step == Some(step);
        if is_current && *self.status == PipelineStatus::Failed {
            StepStatus::Failed
        } else if self.is_completed(step) {
            StepStatus::Completed
        } else if is_current {
            StepStatus::Current
        } else {
            StepStatus::Upcoming
        }
    }

    /// Completion estimate in `0..=100`.
    ///
    /// A step that is still running counts as half done.
    pub fn progress_percentage(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }

        let mut done = self
            .steps
            .iter()
            .filter(|step| self.is_completed(**step))
            .count() as f64;

        if self.in_progress() {
            if let Some(current) = self.current_step {
                if !self.is_completed(current) && self.steps.contains(&current) {
                    done += 0.5;
                }
            }
        }

        let pct = done / self.steps.len() as f64 * 100.0;
        pct.clamp(0.0, 100.0).round() as u8
    }

    /// Sum of average durations for steps strictly after the current one.
    ///
    /// Without a current step every uncompleted step is counted. Terminal
    /// pipelines have nothing remaining.
    pub fn estimated_time_remaining(&self) -> Duration {
        if !self.in_progress() {
            return Duration::ZERO;
        }

        let remaining = match self.current_step.and_then(|c| self.steps.iter().position(|s| *s == c)) {
            Some(pos) => &self.steps[pos + 1..],
            None => self.steps,
        };

        remaining
            .iter()
            .filter(|step| !self.is_completed(**step))
            .map(|step| average_step_duration(*step))
            .sum()
    }
}

/// Time between two input timestamps, zero if `now` precedes `started_at`
pub fn elapsed(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - started_at).to_std().unwrap_or(Duration::ZERO)
}
