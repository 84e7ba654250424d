/// Access policy and authentication extractors
///
/// Every handler states what it needs as a [`Requirement`] and checks it with
/// [`AuthContext::require`]. A superadmin satisfies every requirement.
use crate::{
    context::AppContext,
    db::models::User,
    error::{CivicError, CivicResult},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;

/// Name of the session cookie set at login
pub const SESSION_COOKIE: &str = "civicfix_session";

/// Roles a user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Moderator,
    Resolver,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Moderator => "moderator",
            Role::Resolver => "resolver",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Whether `user` holds this role
    pub fn held_by(&self, user: &User) -> bool {
        match self {
            Role::Citizen => user.is_citizen,
            Role::Moderator => user.is_moderator,
            Role::Resolver => user.is_resolver,
            Role::SuperAdmin => user.is_superuser,
        }
    }
}

/// What an operation needs from its caller
#[derive(Debug, Clone, Copy)]
pub enum Requirement<'a> {
    Authenticated,
    Role(Role),
    AnyRole(&'a [Role]),
    /// Member of the given department; `None` (unassigned) matches nobody
    DepartmentMember(Option<i64>),
}

/// The authenticated caller: user, session and department memberships
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session_id: String,
    pub department_ids: Vec<i64>,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn is_superadmin(&self) -> bool {
        self.user.is_superuser
    }

    /// Evaluate a requirement without failing
    pub fn satisfies(&self, requirement: Requirement<'_>) -> bool {
        if self.is_superadmin() {
            return true;
        }

        match requirement {
            Requirement::Authenticated => true,
            Requirement::Role(role) => role.held_by(&self.user),
            Requirement::AnyRole(roles) => roles.iter().any(|role| role.held_by(&self.user)),
            Requirement::DepartmentMember(Some(department_id)) => {
                self.department_ids.contains(&department_id)
            }
            Requirement::DepartmentMember(None) => false,
        }
    }

    /// Check a requirement, failing with 403
    pub fn require(&self, requirement: Requirement<'_>) -> CivicResult<()> {
        if self.satisfies(requirement) {
            return Ok(());
        }

        tracing::warn!(
            user = %self.user.username,
            ?requirement,
            "Access denied"
        );

        let message = match requirement {
            Requirement::Authenticated => "Authentication required".to_string(),
            Requirement::Role(role) => format!("Access denied. {} role required.", role.as_str()),
            Requirement::AnyRole(roles) => format!(
                "Access denied. One of {} required.",
                roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
            ),
            Requirement::DepartmentMember(_) => {
                "Access denied. Department membership required.".to_string()
            }
        };

        Err(CivicError::Authorization(message))
    }
}

/// Session token from `Authorization: Bearer` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Resolve a token into a caller
pub async fn resolve(ctx: &AppContext, token: &str) -> CivicResult<AuthContext> {
    let session = ctx.account_manager.validate_session(token).await?;
    let user = ctx.account_manager.get_user(session.user_id).await.map_err(|e| match e {
        CivicError::NotFound(_) => CivicError::Authentication("Invalid or expired session".to_string()),
        other => other,
    })?;

    if !user.is_active {
        return Err(CivicError::Authentication("Account is inactive".to_string()));
    }

    let department_ids = ctx.departments.department_ids_for_user(user.id).await?;

    Ok(AuthContext {
        user,
        session_id: session.session_id,
        department_ids,
    })
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = CivicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved by the ban enforcement layer
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(auth.clone());
        }

        let token = session_token(&parts.headers)
            .ok_or_else(|| CivicError::Authentication("Login required".to_string()))?;

        resolve(state, &token).await
    }
}

/// Optional caller; anonymous requests and stale tokens yield `None`
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

impl OptionalAuthContext {
    pub fn user_id(&self) -> Option<i64> {
        self.auth.as_ref().map(AuthContext::user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = CivicError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(OptionalAuthContext {
                auth: Some(auth.clone()),
            });
        }

        let auth = match session_token(&parts.headers) {
            Some(token) => resolve(state, &token).await.ok(),
            None => None,
        };

        Ok(OptionalAuthContext { auth })
    }
}
