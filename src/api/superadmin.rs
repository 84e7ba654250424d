/// Superadmin dashboard, departments, issue triage, reports and audit log
use crate::{
    account::{NewAccount, RoleFlags},
    auth::{AuthContext, Requirement, Role},
    context::AppContext,
    departments::DepartmentUpdate,
    error::{CivicError, CivicResult},
    issues::IssueFilter,
    moderation::{AuditAction, AuditRecord},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 1000;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/superadmin/", get(dashboard))
        .route(
            "/superadmin/departments/",
            get(list_departments).post(create_department),
        )
        .route(
            "/superadmin/departments/:id/",
            get(department_detail)
                .post(department_action)
                .delete(delete_department),
        )
        .route("/superadmin/manage/", get(manage_issues).post(manage_assign))
        .route(
            "/superadmin/assign-department/:issue_id/",
            post(assign_department),
        )
        .route("/superadmin/reports/", get(reports))
        .route("/reports/", get(reports))
        .route("/superadmin/audit/", get(audit_log))
}

fn require_superadmin(caller: &AuthContext) -> CivicResult<()> {
    caller.require(Requirement::Role(Role::SuperAdmin))
}

async fn dashboard(State(ctx): State<AppContext>, caller: AuthContext) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let summary = ctx.reports.dashboard_summary().await?;
    Ok(Json(json!({ "summary": summary })))
}

async fn list_departments(
    State(ctx): State<AppContext>,
    caller: AuthContext,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let departments = ctx.departments.list().await?;
    Ok(Json(json!({ "departments": departments })))
}

#[derive(Debug, Deserialize)]
struct CreateDepartment {
    #[serde(default)]
    name: String,
    description: Option<String>,
}

async fn create_department(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Json(form): Json<CreateDepartment>,
) -> CivicResult<impl IntoResponse> {
    require_superadmin(&caller)?;

    let department = ctx
        .departments
        .create(&form.name, form.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "department": department }))))
}

/// Department with its members and admin
async fn department_view(ctx: &AppContext, id: i64) -> CivicResult<Value> {
    let department = ctx.departments.get(id).await?;
    let members = ctx.departments.members(id).await?;
    let admin = match department.admin_id {
        Some(admin_id) => Some(ctx.account_manager.get_user(admin_id).await?),
        None => None,
    };

    Ok(json!({
        "department": department,
        "members": members,
        "admin": admin,
    }))
}

async fn department_detail(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    Ok(Json(department_view(&ctx, id).await?))
}

/// Actions on a department, tagged by `action`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum DepartmentAction {
    CreateUser {
        username: String,
        #[serde(default)]
        email: String,
        password: String,
    },
    AddMember {
        user_id: i64,
    },
    RemoveMember {
        user_id: i64,
    },
    AssignAdmin {
        admin_user_id: i64,
    },
    RemoveAdmin,
    Update {
        name: Option<String>,
        description: Option<String>,
    },
}

async fn department_action(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
    Json(action): Json<DepartmentAction>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;
    let department = ctx.departments.get(id).await?;

    let message = match action {
        DepartmentAction::CreateUser {
            username,
            email,
            password,
        } => {
            let username = username.trim().to_string();
            let password = password.trim().to_string();
            if username.is_empty() || password.is_empty() {
                return Err(CivicError::Validation(
                    "Username and password are required".to_string(),
                ));
            }

            let user = ctx
                .account_manager
                .create_account(NewAccount {
                    username,
                    email: email.trim().to_string(),
                    phone: None,
                    password,
                    roles: RoleFlags::resolver(),
                })
                .await?;
            ctx.departments.add_member(id, user.id).await?;

            format!("User '{}' created and added to department.", user.username)
        }
        DepartmentAction::AddMember { user_id } => {
            ctx.departments.add_member(id, user_id).await?;
            "Member added.".to_string()
        }
        DepartmentAction::RemoveMember { user_id } => {
            ctx.departments.remove_member(id, user_id).await?;
            "Member removed.".to_string()
        }
        DepartmentAction::AssignAdmin { admin_user_id } => {
            let admin = ctx.departments.assign_admin(id, admin_user_id).await?;
            format!("{} is now the admin of {}.", admin.username, department.name)
        }
        DepartmentAction::RemoveAdmin => {
            ctx.departments.remove_admin(id).await?;
            "Department admin removed.".to_string()
        }
        DepartmentAction::Update { name, description } => {
            ctx.departments
                .update(id, DepartmentUpdate { name, description })
                .await?;
            "Department updated.".to_string()
        }
    };

    tracing::info!(department_id = id, actor = %caller.user.username, "{}", message);

    let mut view = department_view(&ctx, id).await?;
    view["message"] = json!(message);
    Ok(Json(view))
}

async fn delete_department(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let department = ctx.departments.get(id).await?;
    ctx.departments.delete(id).await?;

    Ok(Json(json!({
        "message": format!("Department {} deleted.", department.name),
    })))
}

/// All issues with the departments they can be assigned to
async fn manage_issues(
    State(ctx): State<AppContext>,
    caller: AuthContext,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let issues = ctx
        .issues
        .list(&IssueFilter::all(), Some(caller.user_id()))
        .await?;
    let departments = ctx.departments.list().await?;

    Ok(Json(json!({
        "issues": issues,
        "departments": departments,
    })))
}

#[derive(Debug, Deserialize)]
struct ManageAssign {
    issue_id: i64,
    department: Option<i64>,
}

/// Assign from the triage table; an empty department selection changes nothing
async fn manage_assign(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Json(form): Json<ManageAssign>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let issue = match form.department {
        Some(department_id) => assign(&ctx, &caller, form.issue_id, department_id).await?,
        None => ctx.issues.get(form.issue_id).await?,
    };

    Ok(Json(json!({ "issue": issue })))
}

#[derive(Debug, Deserialize)]
struct AssignForm {
    department_id: Option<i64>,
}

async fn assign_department(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(issue_id): Path<i64>,
    Json(form): Json<AssignForm>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let department_id = form
        .department_id
        .ok_or_else(|| CivicError::Validation("Please select a department.".to_string()))?;
    let issue = assign(&ctx, &caller, issue_id, department_id).await?;
    let department = ctx.departments.get(department_id).await?;

    Ok(Json(json!({
        "message": format!("Issue '{}' assigned to {}.", issue.title, department.name),
        "issue": issue,
    })))
}

async fn assign(
    ctx: &AppContext,
    caller: &AuthContext,
    issue_id: i64,
    department_id: i64,
) -> CivicResult<crate::db::models::Issue> {
    let issue = ctx.issues.assign_department(issue_id, department_id).await?;

    let details = format!("department_id={}", department_id);
    ctx.audit
        .record(AuditRecord {
            actor_id: caller.user_id(),
            action: AuditAction::AssignDepartment,
            subject_user_id: None,
            subject_issue_id: Some(issue_id),
            details: Some(&details),
        })
        .await;

    Ok(issue)
}

async fn reports(State(ctx): State<AppContext>, caller: AuthContext) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let report = ctx.reports.issue_report(Utc::now()).await?;
    Ok(Json(json!(report)))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
}

async fn audit_log(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Query(query): Query<AuditQuery>,
) -> CivicResult<Json<Value>> {
    require_superadmin(&caller)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = ctx.audit.recent(limit).await?;

    Ok(Json(json!({ "entries": entries })))
}
