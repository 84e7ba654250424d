/// Audit log of privileged actions
use crate::{db::models::AuditEntry, error::CivicResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};

/// Privileged actions worth keeping a trail of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Ban,
    Unban,
    DeleteFakeIssue,
    AssignDepartment,
    UpdateStatus,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Ban => "user.ban",
            AuditAction::Unban => "user.unban",
            AuditAction::DeleteFakeIssue => "issue.delete_fake",
            AuditAction::AssignDepartment => "issue.assign_department",
            AuditAction::UpdateStatus => "issue.update_status",
        }
    }
}

/// One audit record to write
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub actor_id: i64,
    pub action: AuditAction,
    pub subject_user_id: Option<i64>,
    pub subject_issue_id: Option<i64>,
    pub details: Option<&'a str>,
}

/// Audit log
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an action. Failures are logged and swallowed; the action itself already happened.
    pub async fn record(&self, record: AuditRecord<'_>) {
        if let Err(e) = Self::record_with(&self.db, &record).await {
            tracing::warn!(action = record.action.as_str(), "Failed to write audit log: {}", e);
        }
    }

    /// Record an action through any executor (e.g. inside a transaction)
    pub async fn record_with<'e, E>(executor: E, record: &AuditRecord<'_>) -> CivicResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor_id, action, subject_user_id, subject_issue_id, details, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(record.actor_id)
        .bind(record.action.as_str())
        .bind(record.subject_user_id)
        .bind(record.subject_issue_id)
        .bind(record.details)
        .bind(Utc::now())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Most recent entries first
    pub async fn recent(&self, limit: i64) -> CivicResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor_id, action, subject_user_id, subject_issue_id, details, timestamp
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
