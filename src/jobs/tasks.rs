/// Background task implementations
use crate::{context::AppContext, error::CivicResult};

/// Lift bans whose expiry has passed
pub async fn sweep_expired_bans(ctx: &AppContext) -> CivicResult<u64> {
    ctx.bans.sweep_expired().await
}

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> CivicResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Health check - verify the database answers
pub async fn health_check(ctx: &AppContext) -> CivicResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
