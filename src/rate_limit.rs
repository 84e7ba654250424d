/// Request rate limiting
use crate::{auth::session_token, context::AppContext, error::CivicError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter quotas
#[derive(Debug, Clone)]
pub struct RateLimitQuotas {
    /// Requests per second carrying a session token
    pub authenticated_rps: u32,
    /// Requests per second without a session
    pub anonymous_rps: u32,
    /// Requests per second on superadmin routes
    pub admin_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitQuotas {
    fn default() -> Self {
        Self {
            authenticated_rps: 100,
            anonymous_rps: 10,
            admin_rps: 500,
            burst_size: 50,
        }
    }
}

/// Request tier, chosen from the path and whether a session token is present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Anonymous,
    Authenticated,
    Admin,
}

impl Tier {
    pub fn classify(path: &str, has_session: bool) -> Self {
        match (has_session, path.starts_with("/superadmin/")) {
            (false, _) => Tier::Anonymous,
            (true, true) => Tier::Admin,
            (true, false) => Tier::Authenticated,
        }
    }
}

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter with one bucket per tier
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    anonymous: Arc<DirectLimiter>,
    admin: Arc<DirectLimiter>,
}

fn quota(rps: u32, burst: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

impl RateLimiter {
    pub fn new(quotas: RateLimitQuotas, enabled: bool) -> Self {
        Self {
            enabled,
            authenticated: Arc::new(GovernorLimiter::direct(quota(
                quotas.authenticated_rps,
                quotas.burst_size,
            ))),
            anonymous: Arc::new(GovernorLimiter::direct(quota(
                quotas.anonymous_rps,
                quotas.burst_size / 5,
            ))),
            admin: Arc::new(GovernorLimiter::direct(quota(
                quotas.admin_rps,
                quotas.burst_size * 2,
            ))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Take one request from the tier's bucket
    pub fn check(&self, tier: Tier) -> Result<(), CivicError> {
        if !self.enabled {
            return Ok(());
        }

        let limiter = match tier {
            Tier::Anonymous => &self.anonymous,
            Tier::Authenticated => &self.authenticated,
            Tier::Admin => &self.admin,
        };

        limiter.check().map_err(|_| CivicError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let tier = Tier::classify(
        request.uri().path(),
        session_token(request.headers()).is_some(),
    );

    match ctx.rate_limiter.check(tier) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(?tier, path = %request.uri().path(), "Rate limit exceeded");
            e.into_response()
        }
    }
}
