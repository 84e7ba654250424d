/// HTTP handlers
pub mod account;
pub mod home;
pub mod issues;
pub mod middleware;
pub mod photos;
pub mod resolver;
pub mod superadmin;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    Router::new()
        .merge(home::routes())
        .merge(account::routes())
        .merge(issues::routes(ctx))
        .merge(superadmin::routes())
        .merge(resolver::routes())
        .merge(users::routes())
        .merge(photos::routes())
}
