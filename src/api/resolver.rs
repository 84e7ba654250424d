/// Department dashboard and status updates for resolvers
use crate::{
    auth::{AuthContext, Requirement, Role},
    context::AppContext,
    error::CivicResult,
    issues::{IssueFilter, StatusChange},
    moderation::{AuditAction, AuditRecord},
};
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

const DASHBOARD_PATH: &str = "/department/";

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/department/", get(department_dashboard))
        .route("/update-issue-status/:id/", post(update_issue_status))
}

/// Issues assigned to the caller's departments
async fn department_dashboard(
    State(ctx): State<AppContext>,
    caller: AuthContext,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::Role(Role::Resolver))?;

    let departments = ctx.departments.departments_for_user(caller.user_id()).await?;
    let issues = ctx
        .issues
        .list(
            &IssueFilter::all().in_departments(caller.department_ids.clone()),
            Some(caller.user_id()),
        )
        .await?;

    Ok(Json(json!({
        "departments": departments,
        "issues": issues,
    })))
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    #[serde(default)]
    status: String,
}

/// Move an issue to `in_progress` or `resolved`
///
/// Always answers with a redirect to the dashboard. Issues outside the caller's
/// departments and statuses a resolver may not set are left untouched.
async fn update_issue_status(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
    form: Option<Json<StatusForm>>,
) -> CivicResult<Redirect> {
    caller.require(Requirement::Role(Role::Resolver))?;

    let issue = ctx.issues.get(id).await?;
    if !caller.satisfies(Requirement::DepartmentMember(issue.department_id)) {
        tracing::warn!(
            user = %caller.user.username,
            issue_id = id,
            "Status update outside the resolver's departments"
        );
        return Ok(Redirect::to(DASHBOARD_PATH));
    }

    let requested = form.map(|Json(f)| f.status).unwrap_or_default();
    if let StatusChange::Applied(updated) = ctx.issues.resolver_update(id, &requested).await? {
        tracing::info!(
            issue_id = id,
            status = updated.status.as_str(),
            user = %caller.user.username,
            "Issue status updated"
        );
        ctx.audit
            .record(AuditRecord {
                actor_id: caller.user_id(),
                action: AuditAction::UpdateStatus,
                subject_user_id: None,
                subject_issue_id: Some(id),
                details: Some(updated.status.as_str()),
            })
            .await;
    }

    Ok(Redirect::to(DASHBOARD_PATH))
}
