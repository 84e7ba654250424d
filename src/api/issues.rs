/// Issue reporting, browsing, comments, votes and fake-issue removal
use crate::{
    auth::{AuthContext, OptionalAuthContext, Requirement, Role},
    context::AppContext,
    db::models::IssueStatus,
    error::{CivicError, CivicResult},
    issues::{IssueFilter, NewIssue},
    metrics,
    moderation::AuditAction,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Room for the text fields of the report form on top of the photo
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    let upload_limit = ctx.photos.max_size() + FORM_OVERHEAD;

    Router::new()
        .route(
            "/report-issue/",
            post(report_issue).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/issues/", get(list_issues))
        .route("/issues/:id/", get(issue_detail))
        .route("/issues/:id/comment/", post(add_comment))
        .route("/issues/:id/comment/:parent_id/", post(add_reply))
        .route("/issues/:id/delete_fake/", post(delete_fake_issue))
        .route("/vote/:id/", post(vote_issue))
}

/// Submit an issue from a multipart form
async fn report_issue(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    mut multipart: Multipart,
) -> CivicResult<impl IntoResponse> {
    caller.require(Requirement::Role(Role::Citizen))?;

    let mut new = NewIssue::default();
    let mut photo: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CivicError::Validation(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let filename = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| CivicError::Validation(format!("Invalid photo upload: {}", e)))?;
                // Browsers send an empty part when no file is chosen
                if !data.is_empty() || filename.as_deref().is_some_and(|f| !f.is_empty()) {
                    photo = Some((filename, data.to_vec()));
                }
            }
            "title" | "description" | "location" | "latitude" | "longitude" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| CivicError::Validation(format!("Invalid form data: {}", e)))?;
                match name.as_str() {
                    "title" => new.title = value,
                    "description" => new.description = value,
                    "location" => new.location = value,
                    "latitude" => new.latitude = parse_coordinate("latitude", &value)?,
                    _ => new.longitude = parse_coordinate("longitude", &value)?,
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    if let Some((filename, data)) = photo {
        let stored = ctx.photos.save(filename.as_deref(), data).await?;
        new.photo = Some(stored.key);
    }

    let issue = match ctx.issues.report(caller.user_id(), new.clone()).await {
        Ok(issue) => issue,
        Err(e) => {
            if let Some(key) = &new.photo {
                discard_unused_photo(&ctx, key).await;
            }
            return Err(e);
        }
    };

    metrics::record_issue_reported();

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Issue reported successfully!",
            "issue": issue,
        })),
    ))
}

fn parse_coordinate(field: &str, value: &str) -> CivicResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| CivicError::Validation(format!("Enter a number for {}", field)))
}

async fn discard_unused_photo(ctx: &AppContext, key: &str) {
    match ctx.issues.photo_in_use(key).await {
        Ok(false) => {
            if let Err(e) = ctx.photos.remove(key).await {
                tracing::warn!(key, "Failed to remove photo: {}", e);
            }
        }
        Ok(true) => {}
        Err(e) => tracing::warn!(key, "Failed to check photo usage: {}", e),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
}

/// All issues, newest first, optionally filtered by status
async fn list_issues(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Query(query): Query<ListQuery>,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::Role(Role::Citizen))?;

    let selected = query.status.unwrap_or_default();
    let status = match selected.trim() {
        "" => None,
        s => Some(IssueStatus::from_str(s)?),
    };

    let issues = ctx
        .issues
        .list(&IssueFilter::all().with_status(status), Some(caller.user_id()))
        .await?;

    Ok(Json(json!({
        "issues": issues,
        "selected_status": selected,
    })))
}

/// Issue with its comment thread
async fn issue_detail(
    State(ctx): State<AppContext>,
    caller: OptionalAuthContext,
    Path(id): Path<i64>,
) -> CivicResult<Json<Value>> {
    let issue = ctx.issues.view(id, caller.user_id()).await?;
    let comments = ctx.comments.thread(id).await?;

    Ok(Json(json!({
        "issue": issue,
        "comments": comments,
    })))
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    #[serde(default)]
    content: String,
}

async fn add_comment(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
    Json(form): Json<CommentForm>,
) -> CivicResult<impl IntoResponse> {
    post_comment(ctx, caller, id, None, form).await
}

async fn add_reply(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path((id, parent_id)): Path<(i64, i64)>,
    Json(form): Json<CommentForm>,
) -> CivicResult<impl IntoResponse> {
    post_comment(ctx, caller, id, Some(parent_id), form).await
}

async fn post_comment(
    ctx: AppContext,
    caller: AuthContext,
    issue_id: i64,
    parent_id: Option<i64>,
    form: CommentForm,
) -> CivicResult<impl IntoResponse> {
    caller.require(Requirement::Authenticated)?;

    let comment = ctx
        .comments
        .add(issue_id, caller.user_id(), &form.content, parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

/// Toggle the caller's vote
///
/// Failures keep the `{success: false, error}` shape and never carry internal error text.
async fn vote_issue(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match ctx.votes.toggle(caller.user_id(), id).await {
        Ok(outcome) => {
            metrics::record_vote(outcome.voted);
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "voted": outcome.voted,
                    "vote_count": outcome.vote_count,
                })),
            )
        }
        Err(CivicError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Issue not found" })),
        ),
        Err(e) => {
            tracing::error!(issue_id = id, "Vote toggle failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Could not record your vote. Please try again." })),
            )
        }
    }
}

/// Delete an issue as fake and ban its reporter
async fn delete_fake_issue(
    State(ctx): State<AppContext>,
    caller: AuthContext,
    Path(id): Path<i64>,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::Role(Role::SuperAdmin))?;

    let days = ctx.config.moderation.default_ban_days;
    let removal = ctx
        .issues
        .delete_fake(id, caller.user_id(), days)
        .await?;

    metrics::record_moderation_action(AuditAction::DeleteFakeIssue.as_str());

    if let Some(key) = &removal.issue.photo {
        discard_unused_photo(&ctx, key).await;
    }

    Ok(Json(json!({
        "message": format!(
            "Issue deleted and user {} has been banned for {} days.",
            removal.reporter_username, days
        ),
        "reporter_id": removal.issue.reporter_id,
        "banned_until": removal.banned_until,
    })))
}
