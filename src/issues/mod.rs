/// Issue tracker
///
/// Citizen-reported issues with a status lifecycle:
/// reported -> acknowledged (on department assignment) -> in_progress -> resolved.
mod tracker;

pub use tracker::IssueTracker;

use crate::db::models::{Issue, IssueStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum title length
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum location length
pub const MAX_LOCATION_LEN: usize = 200;

/// Issue submitted by a citizen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Photo storage key
    pub photo: Option<String>,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub reporter_id: Option<i64>,
    /// Restrict to these departments; an empty list matches nothing
    pub department_ids: Option<Vec<i64>>,
    pub limit: Option<i64>,
}

impl IssueFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Option<IssueStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn reported_by(mut self, reporter_id: i64) -> Self {
        self.reporter_id = Some(reporter_id);
        self
    }

    pub fn in_departments(mut self, department_ids: Vec<i64>) -> Self {
        self.department_ids = Some(department_ids);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of a resolver status update
#[derive(Debug, Clone)]
pub enum StatusChange {
    Applied(Issue),
    /// Target was not a status a resolver may set; nothing changed
    Ignored,
}

/// Result of deleting an issue as fake
#[derive(Debug, Clone, Serialize)]
pub struct FakeIssueRemoval {
    pub issue: Issue,
    pub reporter_username: String,
    pub banned_until: DateTime<Utc>,
}
