/// Row types for the CivicFix database
use crate::error::{CivicError, CivicResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_citizen: bool,
    pub is_moderator: bool,
    pub is_resolver: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub is_banned: bool,
    pub banned_until: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

/// Session record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Department record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub admin_id: Option<i64>,
}

/// Issue lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum IssueStatus {
    Reported,
    Acknowledged,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> CivicResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "reported" => Ok(IssueStatus::Reported),
            "acknowledged" => Ok(IssueStatus::Acknowledged),
            "in_progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            _ => Err(CivicError::Validation(format!("Invalid issue status: {}", s))),
        }
    }

    /// Targets a department resolver may move an issue to, from any state
    pub fn resolver_may_set(&self) -> bool {
        matches!(self, IssueStatus::InProgress | IssueStatus::Resolved)
    }

    pub fn all() -> [IssueStatus; 4] {
        [
            IssueStatus::Reported,
            IssueStatus::Acknowledged,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
        ]
    }
}

/// Issue record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub reporter_id: i64,
    pub department_id: Option<i64>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Issue joined with its reporter, department and vote tally for a given viewer
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IssueView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub reporter_id: i64,
    pub reporter_username: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<String>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vote_count: i64,
    pub user_has_voted: bool,
}

/// Comment record joined with its author's username
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub issue_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Audit log entry for a privileged action
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub subject_user_id: Option<i64>,
    pub subject_issue_id: Option<i64>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}
