/// Public landing page
use crate::{
    auth::OptionalAuthContext,
    context::AppContext,
    error::CivicResult,
    issues::IssueFilter,
};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

const RECENT_ISSUES: i64 = 3;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/", get(home))
}

/// Site-wide counters and the latest issues
async fn home(
    State(ctx): State<AppContext>,
    caller: OptionalAuthContext,
) -> CivicResult<Json<Value>> {
    let stats = ctx.reports.home_stats().await?;
    let recent_issues = ctx
        .issues
        .list(&IssueFilter::all().limit(RECENT_ISSUES), caller.user_id())
        .await?;

    Ok(Json(json!({
        "total_issues": stats.total_issues,
        "resolved_issues": stats.resolved_issues,
        "active_users": stats.active_users,
        "total_departments": stats.total_departments,
        "recent_issues": recent_issues,
    })))
}
