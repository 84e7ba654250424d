/// Registration, login, logout and the citizen dashboard
use crate::{
    account::{LoginRequest, RegisterRequest, SessionResponse},
    auth::{AuthContext, Requirement, Role, SESSION_COOKIE},
    context::AppContext,
    db::models::IssueStatus,
    error::{CivicError, CivicResult},
    issues::IssueFilter,
    metrics,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};

const DASHBOARD_ISSUES: i64 = 5;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", get(logout))
        .route("/dashboard/", get(citizen_dashboard))
}

/// Citizen sign-up
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> CivicResult<impl IntoResponse> {
    let user = ctx.account_manager.register_citizen(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful! Please login.",
            "user": user,
        })),
    ))
}

/// Password login; the token is returned and also set as a cookie
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> CivicResult<impl IntoResponse> {
    let (user, session) = match ctx.account_manager.login(&req.username, &req.password).await {
        Ok(result) => result,
        Err(e) => {
            let outcome = match &e {
                CivicError::AccountBanned(_) => "banned",
                CivicError::Authentication(_) => "invalid",
                _ => "error",
            };
            metrics::record_login(outcome);
            return Err(e);
        }
    };

    metrics::record_login("success");
    tracing::info!(user = %user.username, "User logged in");

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    let body = SessionResponse {
        message: format!("Welcome back, {}!", user.username),
        token: session.token,
        expires_at: session.expires_at,
        user,
    };

    Ok((jar.add(cookie), Json(body)))
}

/// End the current session
async fn logout(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    caller: AuthContext,
) -> CivicResult<impl IntoResponse> {
    ctx.account_manager.delete_session(&caller.session_id).await?;
    tracing::info!(user = %caller.user.username, "User logged out");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));

    Ok((jar, Json(json!({ "message": "You have been logged out." }))))
}

/// Latest own issues and counters
async fn citizen_dashboard(
    State(ctx): State<AppContext>,
    caller: AuthContext,
) -> CivicResult<Json<Value>> {
    caller.require(Requirement::Role(Role::Citizen))?;
    let user_id = caller.user_id();

    let user_issues = ctx
        .issues
        .list(
            &IssueFilter::all().reported_by(user_id).limit(DASHBOARD_ISSUES),
            Some(user_id),
        )
        .await?;
    let resolved_count = ctx
        .issues
        .count(Some(IssueStatus::Resolved), Some(user_id))
        .await?;
    let total_count = ctx.issues.count(None, Some(user_id)).await?;

    Ok(Json(json!({
        "user": caller.user,
        "user_issues": user_issues,
        "resolved_count": resolved_count,
        "total_count": total_count,
    })))
}
