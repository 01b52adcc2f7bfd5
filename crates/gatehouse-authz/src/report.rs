//! Compilation reports
//!
//! A [`CompilationReport`] records the outcome of every component a full
//! compilation touched, so an administrator can see what was compiled, what
//! was partially compiled and what failed.

use chrono::{DateTime, Utc};
use gatehouse_rbac::Component;
use serde::Serialize;

use crate::config::CompileStrategy;
use crate::error::{CompilationError, CompilationFailure};

/// Outcome of compiling one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationStatus {
    /// Every (role, action) pair was materialized
    Compiled,
    /// Some roles or actions were skipped
    PartiallyCompiled,
    /// A store write failed and the component was abandoned
    Failed,
    /// Nothing to compile
    Skipped,
}

/// One component in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationEntry {
    /// The compiled component
    pub component: Component,
    /// Outcome
    pub status: CompilationStatus,
    /// (role, action) pairs written
    pub pairs: usize,
    /// Ignored overrides, skipped roles and skipped actions
    pub warnings: Vec<String>,
    /// Failure reason, set when `status` is `Failed`
    pub error: Option<String>,
}

impl CompilationEntry {
    pub(crate) fn new(component: Component) -> Self {
        Self {
            component,
            status: CompilationStatus::Compiled,
            pairs: 0,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn skipped(component: Component, reason: impl Into<String>) -> Self {
        Self {
            status: CompilationStatus::Skipped,
            warnings: vec![reason.into()],
            ..Self::new(component)
        }
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.status = CompilationStatus::Failed;
        self.error = Some(reason.into());
    }

    /// Record a skipped role or action.
    pub(crate) fn degrade(&mut self, warning: impl Into<String>) {
        if self.status == CompilationStatus::Compiled {
            self.status = CompilationStatus::PartiallyCompiled;
        }
        self.warnings.push(warning.into());
    }

    fn failure(&self) -> CompilationFailure {
        CompilationFailure {
            component: self.component.clone(),
            reason: self
                .error
                .clone()
                .unwrap_or_else(|| self.warnings.join("; ")),
        }
    }
}

/// Result of a full compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationReport {
    /// Strategy the run used
    pub strategy: CompileStrategy,
    /// Whether partial compilations count as failures
    pub fail_on_partial: bool,
    /// Per-component outcomes, resources first, each group sorted by id
    pub entries: Vec<CompilationEntry>,
    /// Set when the run could not prepare or publish the store at all.
    /// Every entry that had pairs to publish is then `Failed`.
    pub aborted: Option<String>,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl CompilationReport {
    /// Check whether every component compiled and the store was published.
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failures().next().is_none()
    }

    /// Entries whose compilation failed.
    pub fn failures(&self) -> impl Iterator<Item = &CompilationEntry> {
        self.with_status(CompilationStatus::Failed)
    }

    /// Entries compiled with warnings.
    pub fn partial(&self) -> impl Iterator<Item = &CompilationEntry> {
        self.with_status(CompilationStatus::PartiallyCompiled)
    }

    /// Entries with `status`.
    pub fn with_status(&self, status: CompilationStatus) -> impl Iterator<Item = &CompilationEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }

    /// Look up the entry for a component.
    pub fn entry(&self, component: &Component) -> Option<&CompilationEntry> {
        self.entries.iter().find(|e| &e.component == component)
    }

    /// Total (role, action) pairs written.
    pub fn total_pairs(&self) -> usize {
        self.entries.iter().map(|e| e.pairs).sum()
    }

    /// Run duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Convert into a `Result`, failing if any component failed.
    ///
    /// With `fail_on_partial`, partially compiled components fail it too.
    /// An aborted run fails with every attempted component listed.
    pub fn into_result(self) -> Result<Self, CompilationError> {
        let attempted = self.entries.len();

        if let Some(reason) = &self.aborted {
            let failures = self
                .entries
                .iter()
                .map(|e| CompilationFailure {
                    component: e.component.clone(),
                    reason: reason.clone(),
                })
                .collect();
            return Err(CompilationError { attempted, failures });
        }

        let failures: Vec<CompilationFailure> = self
            .entries
            .iter()
            .filter(|e| {
                e.status == CompilationStatus::Failed
                    || (self.fail_on_partial && e.status == CompilationStatus::PartiallyCompiled)
            })
            .map(CompilationEntry::failure)
            .collect();

        if failures.is_empty() {
            Ok(self)
        } else {
            Err(CompilationError { attempted, failures })
        }
    }
}
