/// Aggregate statistics for the home page and superadmin reports
use crate::{
    db::models::IssueStatus,
    error::CivicResult,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;

/// Counters shown on the home page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeStats {
    pub total_issues: i64,
    pub resolved_issues: i64,
    pub active_users: i64,
    pub total_departments: i64,
}

/// Superadmin dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_issues: i64,
    pub unassigned_issues: i64,
    pub total_departments: i64,
    pub total_citizens: i64,
    pub banned_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: IssueStatus,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Superadmin report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueReport {
    pub total_issues: i64,
    pub status_counts: Vec<StatusCount>,
    pub top_departments: Vec<NamedCount>,
    pub top_citizens: Vec<NamedCount>,
    pub issues_last_30_days: Vec<DailyCount>,
}

const TOP_N: i64 = 5;
const TREND_DAYS: i64 = 30;

/// Report builder
#[derive(Clone)]
pub struct Reports {
    db: SqlitePool,
}

impl Reports {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn home_stats(&self) -> CivicResult<HomeStats> {
        Ok(HomeStats {
            total_issues: self.scalar("SELECT COUNT(*) FROM issue").await?,
            resolved_issues: self
                .scalar("SELECT COUNT(*) FROM issue WHERE status = 'resolved'")
                .await?,
            active_users: self
                .scalar("SELECT COUNT(*) FROM account WHERE is_active = 1")
                .await?,
            total_departments: self.scalar("SELECT COUNT(*) FROM department").await?,
        })
    }

    pub async fn dashboard_summary(&self) -> CivicResult<DashboardSummary> {
        Ok(DashboardSummary {
            total_issues: self.scalar("SELECT COUNT(*) FROM issue").await?,
            unassigned_issues: self
                .scalar("SELECT COUNT(*) FROM issue WHERE department_id IS NULL")
                .await?,
            total_departments: self.scalar("SELECT COUNT(*) FROM department").await?,
            total_citizens: self
                .scalar("SELECT COUNT(*) FROM account WHERE is_citizen = 1")
                .await?,
            banned_users: self
                .scalar("SELECT COUNT(*) FROM account WHERE is_banned = 1")
                .await?,
        })
    }

    /// Full issue report as of `now`
    pub async fn issue_report(&self, now: DateTime<Utc>) -> CivicResult<IssueReport> {
        let total_issues = self.scalar("SELECT COUNT(*) FROM issue").await?;

        let by_status: Vec<(IssueStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM issue GROUP BY status")
                .fetch_all(&self.db)
                .await?;
        let status_counts = IssueStatus::all()
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: by_status
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect();

        let top_departments = sqlx::query_as::<_, NamedCount>(
            r#"
            SELECT d.name AS name, COUNT(i.id) AS count
            FROM issue i
            JOIN department d ON d.id = i.department_id
            GROUP BY d.id
            ORDER BY count DESC, d.name ASC
            LIMIT ?1
            "#,
        )
        .bind(TOP_N)
        .fetch_all(&self.db)
        .await?;

        let top_citizens = sqlx::query_as::<_, NamedCount>(
            r#"
            SELECT a.username AS name, COUNT(i.id) AS count
            FROM issue i
            JOIN account a ON a.id = i.reporter_id
            GROUP BY a.id
            ORDER BY count DESC, a.username ASC
            LIMIT ?1
            "#,
        )
        .bind(TOP_N)
        .fetch_all(&self.db)
        .await?;

        let since = now - Duration::days(TREND_DAYS);
        let created: Vec<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM issue WHERE created_at >= ?1")
                .bind(since)
                .fetch_all(&self.db)
                .await?;

        Ok(IssueReport {
            total_issues,
            status_counts,
            top_departments,
            top_citizens,
            issues_last_30_days: per_day(&created),
        })
    }

    async fn scalar(&self, sql: &str) -> CivicResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.db).await?;
        Ok(value)
    }
}

/// Bucket timestamps by UTC calendar day, ascending
fn per_day(timestamps: &[DateTime<Utc>]) -> Vec<DailyCount> {
    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for ts in timestamps {
        *buckets.entry(ts.date_naive()).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|(day, count)| DailyCount { day, count })
        .collect()
}
