//! Crawl status and counters
//!
//! `CrawlState` is owned by the controller and only changes through
//! [`CrawlState::transition`] and the counter methods. Clients observe it
//! through [`CrawlSnapshot`] values.

use crate::TrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    // ===== Active States =====
    /// Validating the job, creating the workspace, seeding the frontier
    Initializing,

    /// Workers are fetching pages
    Running,

    // ===== Terminal States =====
    /// The frontier drained with the budget unset or not reached
    Completed,

    /// The page budget was reached while work remained
    BudgetExhausted,

    /// Setup failed, storage failed, or the crawl was cancelled
    Aborted,
}

impl CrawlStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::BudgetExhausted | Self::Aborted)
    }

    /// Returns true if `to` is a legal next status
    ///
    /// ```text
    /// Initializing -> Running | Aborted
    /// Running      -> Completed | BudgetExhausted | Aborted
    /// ```
    pub fn can_transition_to(&self, to: CrawlStatus) -> bool {
        matches!(
            (self, to),
            (Self::Initializing, Self::Running)
                | (Self::Initializing, Self::Aborted)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::BudgetExhausted)
                | (Self::Running, Self::Aborted)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the crawl published to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlSnapshot {
    pub status: CrawlStatus,
    /// Records written, errors included
    pub pages_fetched: u64,
    /// Records written with an error
    pub pages_failed: u64,
    /// Entries queued or in flight
    pub pages_remaining: u64,
}

/// Mutable crawl state owned by the controller
#[derive(Debug, Clone)]
pub struct CrawlState {
    status: CrawlStatus,
    pages_fetched: u64,
    pages_failed: u64,
    pages_remaining: u64,
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            status: CrawlStatus::Initializing,
            pages_fetched: 0,
            pages_failed: 0,
            pages_remaining: 0,
        }
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    pub fn pages_failed(&self) -> u64 {
        self.pages_failed
    }

    /// Moves to a new status
    ///
    /// Terminal statuses are final; any illegal move is rejected and leaves
    /// the state untouched.
    pub fn transition(&mut self, to: CrawlStatus) -> Result<(), TrawlError> {
        if !self.status.can_transition_to(to) {
            return Err(TrawlError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::debug!("Crawl status {} -> {}", self.status, to);
        self.status = to;
        Ok(())
    }

    /// Counts one written record
    pub fn record_page(&mut self, failed: bool) {
        self.pages_fetched += 1;
        if failed {
            self.pages_failed += 1;
        }
    }

    pub fn set_remaining(&mut self, remaining: u64) {
        self.pages_remaining = remaining;
    }

    pub fn snapshot(&self) -> CrawlSnapshot {
        CrawlSnapshot {
            status: self.status,
            pages_fetched: self.pages_fetched,
            pages_failed: self.pages_failed,
            pages_remaining: self.pages_remaining,
        }
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}
