/// Voting ledger: one vote per user per issue, toggled on and off
use crate::error::{CivicError, CivicResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub voted: bool,
    pub vote_count: i64,
}

/// Voting ledger
#[derive(Clone)]
pub struct VoteLedger {
    db: SqlitePool,
}

impl VoteLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Toggle `user_id`'s vote on `issue_id`
    ///
    /// Insert-or-ignore first; when nothing was inserted the vote already
    /// existed and is removed instead. The unique pair constraint keeps
    /// concurrent toggles from duplicating rows.
    pub async fn toggle(&self, user_id: i64, issue_id: i64) -> CivicResult<VoteOutcome> {
        let issue_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM issue WHERE id = ?1")
            .bind(issue_id)
            .fetch_optional(&self.db)
            .await?;
        if issue_exists.is_none() {
            return Err(CivicError::NotFound("Issue not found".to_string()));
        }

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO vote (user_id, issue_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(issue_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .rows_affected();

        let voted = if inserted > 0 {
            true
        } else {
            sqlx::query("DELETE FROM vote WHERE user_id = ?1 AND issue_id = ?2")
                .bind(user_id)
                .bind(issue_id)
                .execute(&self.db)
                .await?;
            false
        };

        let vote_count = self.count(issue_id).await?;
        tracing::debug!(user_id, issue_id, voted, vote_count, "Vote toggled");

        Ok(VoteOutcome { voted, vote_count })
    }

    /// Number of votes on an issue
    pub async fn count(&self, issue_id: i64) -> CivicResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vote WHERE issue_id = ?1")
            .bind(issue_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
