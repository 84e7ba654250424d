/// Account bans
use crate::{
    db::models::User,
    error::{CivicError, CivicResult},
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

/// Longest ban a moderator can hand out
pub const MAX_BAN_DAYS: i64 = 3650;

/// Effective ban state of an account at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanStatus {
    /// Not banned
    Active,
    Banned { until: DateTime<Utc> },
    /// Ban fields are still set but `banned_until` has passed
    Expired,
}

impl BanStatus {
    /// Whole days left before the ban lapses, 0 when less than a day remains
    pub fn days_left(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            BanStatus::Banned { until } => Some((*until - now).num_days().max(0)),
            _ => None,
        }
    }
}

/// Evaluate ban fields without touching storage
///
/// A ban without an expiry is not enforced.
pub fn evaluate_ban(
    is_banned: bool,
    banned_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> BanStatus {
    match (is_banned, banned_until) {
        (true, Some(until)) if now >= until => BanStatus::Expired,
        (true, Some(until)) => BanStatus::Banned { until },
        _ => BanStatus::Active,
    }
}

/// Expiry of a `days`-long ban starting at `now`
pub fn ban_expiry(now: DateTime<Utc>, days: i64) -> CivicResult<DateTime<Utc>> {
    let invalid = || {
        CivicError::Validation(format!(
            "Ban duration must be between 1 and {} days",
            MAX_BAN_DAYS
        ))
    };

    if !(1..=MAX_BAN_DAYS).contains(&days) {
        return Err(invalid());
    }

    Duration::try_days(days)
        .and_then(|duration| now.checked_add_signed(duration))
        .ok_or_else(invalid)
}

/// Ban manager
#[derive(Clone)]
pub struct BanManager {
    db: SqlitePool,
}

impl BanManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Ban an account for `days` days, returning the expiry
    pub async fn ban(&self, user_id: i64, days: i64) -> CivicResult<DateTime<Utc>> {
        let until = ban_expiry(Utc::now(), days)?;
        Self::ban_until(&self.db, user_id, until).await?;
        Ok(until)
    }

    /// Write ban fields through any executor, so callers can ban inside a transaction
    pub async fn ban_until<'e, E>(executor: E, user_id: i64, until: DateTime<Utc>) -> CivicResult<u64>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE account SET is_banned = 1, banned_until = ?1 WHERE id = ?2")
            .bind(until)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lift a ban immediately
    pub async fn unban(&self, user_id: i64) -> CivicResult<()> {
        sqlx::query("UPDATE account SET is_banned = 0, banned_until = NULL WHERE id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Current ban status of `user`; an expired ban is cleared in storage and on `user`
    pub async fn refresh(&self, user: &mut User) -> CivicResult<BanStatus> {
        let now = Utc::now();

        match evaluate_ban(user.is_banned, user.banned_until, now) {
            BanStatus::Expired => {
                self.unban(user.id).await?;
                user.is_banned = false;
                user.banned_until = None;
                tracing::info!(user_id = user.id, "Ban expired, account reactivated");
                Ok(BanStatus::Active)
            }
            status => Ok(status),
        }
    }

    /// Clear every ban whose expiry has passed
    pub async fn sweep_expired(&self) -> CivicResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE account
            SET is_banned = 0,
                banned_until = NULL
            WHERE is_banned = 1
              AND banned_until IS NOT NULL
              AND banned_until <= ?1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
