/// Issue storage and lifecycle transitions
use crate::{
    db::models::{Issue, IssueStatus, IssueView},
    error::{CivicError, CivicResult},
    issues::{FakeIssueRemoval, IssueFilter, NewIssue, StatusChange, MAX_LOCATION_LEN, MAX_TITLE_LEN},
    moderation::{ban_expiry, AuditAction, AuditLog, AuditRecord, BanManager},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const ISSUE_COLUMNS: &str = "id, title, description, reporter_id, department_id, location, latitude, longitude, photo, status, created_at, updated_at";

/// Issue tracker
#[derive(Clone)]
pub struct IssueTracker {
    db: SqlitePool,
}

impl IssueTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a new issue; it always starts as `reported`
    pub async fn report(&self, reporter_id: i64, new: NewIssue) -> CivicResult<Issue> {
        let title = new.title.trim();
        let description = new.description.trim();
        let location = new.location.trim();

        if title.is_empty() {
            return Err(CivicError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(CivicError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }
        if description.is_empty() {
            return Err(CivicError::Validation("Description is required".to_string()));
        }
        if location.chars().count() > MAX_LOCATION_LEN {
            return Err(CivicError::Validation(format!(
                "Location must be at most {} characters",
                MAX_LOCATION_LEN
            )));
        }
        if let Some(lat) = new.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CivicError::Validation("Latitude out of range".to_string()));
            }
        }
        if let Some(lon) = new.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(CivicError::Validation("Longitude out of range".to_string()));
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO issue (title, description, reporter_id, location, latitude, longitude, photo, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(reporter_id)
        .bind(location)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.photo)
        .bind(IssueStatus::Reported)
        .bind(now)
        .execute(&self.db)
        .await?;

        let issue = self.get(result.last_insert_rowid()).await?;
        tracing::info!(issue_id = issue.id, reporter_id, "Issue reported");

        Ok(issue)
    }

    /// Get an issue by id
    pub async fn get(&self, id: i64) -> CivicResult<Issue> {
        sqlx::query_as::<_, Issue>(&format!("SELECT {} FROM issue WHERE id = ?1", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("Issue {} not found", id)))
    }

    /// Issue joined with reporter, department and votes, as seen by `viewer`
    pub async fn view(&self, id: i64, viewer: Option<i64>) -> CivicResult<IssueView> {
        let mut query = Self::view_query(viewer);
        query.push(" WHERE i.id = ").push_bind(id);

        let issue = query
            .build_query_as::<IssueView>()
            .fetch_optional(&self.db)
            .await?;

        issue.ok_or_else(|| CivicError::NotFound(format!("Issue {} not found", id)))
    }

    /// Issues newest first, as seen by `viewer`
    pub async fn list(&self, filter: &IssueFilter, viewer: Option<i64>) -> CivicResult<Vec<IssueView>> {
        let mut query = Self::view_query(viewer);
        query.push(" WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND i.status = ").push_bind(status);
        }
        if let Some(reporter_id) = filter.reporter_id {
            query.push(" AND i.reporter_id = ").push_bind(reporter_id);
        }
        if let Some(department_ids) = &filter.department_ids {
            if department_ids.is_empty() {
                query.push(" AND 0");
            } else {
                query.push(" AND i.department_id IN (");
                let mut ids = query.separated(", ");
                for id in department_ids {
                    ids.push_bind(*id);
                }
                ids.push_unseparated(")");
            }
        }

        query.push(" ORDER BY i.created_at DESC, i.id DESC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let issues = query.build_query_as::<IssueView>().fetch_all(&self.db).await?;
        Ok(issues)
    }

    /// Assign an issue to a department, moving it to `acknowledged` whatever its prior status
    pub async fn assign_department(&self, issue_id: i64, department_id: i64) -> CivicResult<Issue> {
        self.get(issue_id).await?;

        let department_exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM department WHERE id = ?1")
                .bind(department_id)
                .fetch_optional(&self.db)
                .await?;
        if department_exists.is_none() {
            return Err(CivicError::NotFound(format!(
                "Department {} not found",
                department_id
            )));
        }

        sqlx::query(
            "UPDATE issue SET department_id = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(department_id)
        .bind(IssueStatus::Acknowledged)
        .bind(Utc::now())
        .bind(issue_id)
        .execute(&self.db)
        .await?;

        tracing::info!(issue_id, department_id, "Issue assigned to department");

        self.get(issue_id).await
    }

    /// Apply a resolver's requested status
    ///
    /// Only `in_progress` and `resolved` are accepted, from any current state.
    /// Anything else leaves the issue untouched.
    pub async fn resolver_update(&self, issue_id: i64, requested: &str) -> CivicResult<StatusChange> {
        let status = match IssueStatus::from_str(requested) {
            Ok(status) if status.resolver_may_set() => status,
            _ => {
                tracing::debug!(issue_id, requested, "Ignoring status a resolver may not set");
                return Ok(StatusChange::Ignored);
            }
        };

        let result = sqlx::query("UPDATE issue SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(Utc::now())
            .bind(issue_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CivicError::NotFound(format!("Issue {} not found", issue_id)));
        }

        Ok(StatusChange::Applied(self.get(issue_id).await?))
    }

    /// Delete an issue as fake and ban its reporter, in one transaction
    pub async fn delete_fake(
        &self,
        issue_id: i64,
        actor_id: i64,
        ban_days: i64,
    ) -> CivicResult<FakeIssueRemoval> {
        let banned_until = ban_expiry(Utc::now(), ban_days)?;
        let mut tx = self.db.begin().await?;

        let issue = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {} FROM issue WHERE id = ?1",
            ISSUE_COLUMNS
        ))
        .bind(issue_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CivicError::NotFound(format!("Issue {} not found", issue_id)))?;

        let reporter_username: String =
            sqlx::query_scalar("SELECT username FROM account WHERE id = ?1")
                .bind(issue.reporter_id)
                .fetch_one(&mut *tx)
                .await?;

        BanManager::ban_until(&mut *tx, issue.reporter_id, banned_until).await?;

        let details = format!("title={:?}; banned_until={}", issue.title, banned_until.to_rfc3339());
        AuditLog::record_with(
            &mut *tx,
            &AuditRecord {
                actor_id,
                action: AuditAction::DeleteFakeIssue,
                subject_user_id: Some(issue.reporter_id),
                subject_issue_id: Some(issue.id),
                details: Some(&details),
            },
        )
        .await?;

        sqlx::query("DELETE FROM issue WHERE id = ?1")
            .bind(issue_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            issue_id,
            reporter = %reporter_username,
            until = %banned_until,
            "Fake issue deleted and reporter banned"
        );

        Ok(FakeIssueRemoval {
            issue,
            reporter_username,
            banned_until,
        })
    }

    /// Whether any issue still references a photo key
    pub async fn photo_in_use(&self, key: &str) -> CivicResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issue WHERE photo = ?1")
            .bind(key)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Number of issues, optionally by status and reporter
    pub async fn count(&self, status: Option<IssueStatus>, reporter_id: Option<i64>) -> CivicResult<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM issue WHERE 1 = 1");
        if let Some(status) = status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(reporter_id) = reporter_id {
            query.push(" AND reporter_id = ").push_bind(reporter_id);
        }

        let count = query.build_query_scalar::<i64>().fetch_one(&self.db).await?;
        Ok(count)
    }

    fn view_query<'a>(viewer: Option<i64>) -> QueryBuilder<'a, Sqlite> {
        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT i.id, i.title, i.description, i.reporter_id,
                   r.username AS reporter_username,
                   i.department_id,
                   d.name AS department_name,
                   i.location, i.latitude, i.longitude, i.photo, i.status,
                   i.created_at, i.updated_at,
                   (SELECT COUNT(*) FROM vote v WHERE v.issue_id = i.id) AS vote_count,
                   EXISTS (SELECT 1 FROM vote v WHERE v.issue_id = i.id AND v.user_id = "#,
        );
        query.push_bind(viewer);
        query.push(
            r#") AS user_has_voted
            FROM issue i
            JOIN account r ON r.id = i.reporter_id
            LEFT JOIN department d ON d.id = i.department_id"#,
        );
        query
    }
}
