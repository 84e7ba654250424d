/// Per-request session resolution and ban enforcement
use crate::{
    account::AccountManager,
    auth::{self, session_token},
    context::AppContext,
    error::CivicError,
    moderation::BanStatus,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Paths a banned user can still reach
const BAN_EXEMPT_PATHS: [&str; 1] = ["/logout/"];

/// Ban enforcement middleware
///
/// Resolves the caller once per request and stores it in the request
/// extensions. A ban that has lapsed is cleared; a live ban rejects the
/// request with 403. Superusers are exempt.
pub async fn enforce_bans(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, CivicError> {
    if let Some(token) = session_token(req.headers()) {
        // Invalid tokens fall through; handlers that need a session reject them
        if let Ok(mut caller) = auth::resolve(&ctx, &token).await {
            if !caller.is_superadmin() {
                let status = ctx.bans.refresh(&mut caller.user).await?;
                let exempt = BAN_EXEMPT_PATHS.contains(&req.uri().path());

                if matches!(status, BanStatus::Banned { .. }) && !exempt {
                    tracing::warn!(
                        user = %caller.user.username,
                        path = %req.uri().path(),
                        "Rejected request from banned account"
                    );
                    return Err(AccountManager::banned_error(&caller.user));
                }
            }

            req.extensions_mut().insert(caller);
        }
    }

    Ok(next.run(req).await)
}
