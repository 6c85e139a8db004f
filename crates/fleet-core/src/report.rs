//! Run report
//!
//! Every unit of work (one user provisioned, one record synchronized, one
//! listing) ends up as a [`UnitReport`] with a tagged [`Outcome`]. The
//! report is the only result of a run; nothing is raised past it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Stage of a run that produced a unit outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ListInstances,
    Provision,
    Settle,
    ListRecords,
    DnsSync,
    Teardown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ListInstances => "list-instances",
            Stage::Provision => "provision",
            Stage::Settle => "settle",
            Stage::ListRecords => "list-records",
            Stage::DnsSync => "dns-sync",
            Stage::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// Result of one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// The unit completed (detail describes what happened)
    Success(String),
    /// The unit was deliberately not performed
    Skipped(String),
    /// The unit failed; the run continued
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Outcome of one unit of work, with what it was about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub stage: Stage,
    /// User identity, record label, or tag the unit worked on
    pub subject: String,
    pub outcome: Outcome,
}

impl UnitReport {
    pub fn success(stage: Stage, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: Outcome::Success(detail.into()),
        }
    }

    pub fn skipped(stage: Stage, subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: Outcome::Skipped(reason.into()),
        }
    }

    pub fn failed(stage: Stage, subject: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: Outcome::Failed(error.to_string()),
        }
    }
}

/// Counts of outcomes per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Collected outcomes of one setup or teardown run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Start an empty report
    pub fn start(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            units: Vec::new(),
        }
    }

    pub fn push(&mut self, unit: UnitReport) {
        self.units.push(unit);
    }

    pub fn extend(&mut self, units: impl IntoIterator<Item = UnitReport>) {
        self.units.extend(units);
    }

    /// Stamp the finish time
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Units of one stage
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(move |u| u.stage == stage)
    }

    /// Units that failed
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.outcome.is_failure())
    }

    /// `true` if no unit failed
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for unit in &self.units {
            match unit.outcome {
                Outcome::Success(_) => summary.succeeded += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}
