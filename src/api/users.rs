/// Citizen management: listing, bans and unbans
use crate::{
    auth::{AuthContext, Requirement, Role},
    context::AppContext,
    error::CivicResult,
    metrics,
    moderation::{AuditAction, AuditRecord},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

const MODERATORS: &[Role] = &[Role::Moderator, Role::SuperAdmin];

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/manage-users/", get(manage_users))
        .route("/ban-user/:id/", post(ban_user))
        .route("/unban-user/:id/", post(unban_user))
}

/// Citizens, newest first
async fn manage_users(
    State(ctx): State<AppContext>,
    caller: AuthContext,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::AnyRole(MODERATORS))?;

    let citizens = ctx.account_manager.list_citizens().await?;
    Ok(Json(json!({ "citizens": citizens })))
}

#[derive(Debug, Default, Deserialize)]
struct BanForm {
    days: Option<i64>,
}

async fn ban_user(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
    form: Option<Json<BanForm>>,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::AnyRole(MODERATORS))?;

    let days = form
        .and_then(|Json(f)| f.days)
        .unwrap_or(ctx.config.moderation.default_ban_days);

    let citizen = ctx.account_manager.get_citizen(id).await?;
    // Out-of-range durations are rejected with 400
    let until = ctx.bans.ban(citizen.id, days).await?;

    let details = format!("{} days", days);
    ctx.audit
        .record(AuditRecord {
            actor_id: caller.user_id(),
            action: AuditAction::Ban,
            subject_user_id: Some(citizen.id),
            subject_issue_id: None,
            details: Some(&details),
        })
        .await;
    metrics::record_moderation_action(AuditAction::Ban.as_str());
    tracing::info!(user = %citizen.username, by = %caller.user.username, days, "User banned");

    Ok(Json(json!({
        "message": format!("{} has been banned for {} days.", citizen.username, days),
        "banned_until": until,
    })))
}

async fn unban_user(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::AnyRole(MODERATORS))?;

    let citizen = ctx.account_manager.get_citizen(id).await?;
    ctx.bans.unban(citizen.id).await?;

    ctx.audit
        .record(AuditRecord {
            actor_id: caller.user_id(),
            action: AuditAction::Unban,
            subject_user_id: Some(citizen.id),
            subject_issue_id: None,
            details: None,
        })
        .await;
    metrics::record_moderation_action(AuditAction::Unban.as_str());
    tracing::info!(user = %citizen.username, by = %caller.user.username, "User unbanned");

    Ok(Json(json!({
        "message": format!("{} has been unbanned.", citizen.username),
    })))
}
