/// Account manager implementation using runtime queries
use crate::{
    account::{
        password::{hash_password, verify_password},
        NewAccount, RegisterRequest, RoleFlags, ValidatedSession,
    },
    config::{BootstrapConfig, ServerConfig},
    db::models::{Session, User},
    error::{CivicError, CivicResult},
    moderation::{BanManager, BanStatus},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    sid: String,
    iat: i64,
    exp: i64,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    bans: BanManager,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        let bans = BanManager::new(db.clone());
        Self { db, config, bans }
    }

    /// Register a citizen from the public sign-up form
    pub async fn register_citizen(&self, req: RegisterRequest) -> CivicResult<User> {
        req.validate()
            .map_err(|e| CivicError::Validation(e.to_string()))?;

        if req.password1 != req.password2 {
            return Err(CivicError::Validation(
                "The two password fields didn't match".to_string(),
            ));
        }

        let phone = req.phone.filter(|p| !p.trim().is_empty());

        self.create_account(NewAccount {
            username: req.username,
            email: req.email,
            phone,
            password: req.password1,
            roles: RoleFlags::citizen(),
        })
        .await
    }

    /// Create an account with the given role flags
    pub async fn create_account(&self, new: NewAccount) -> CivicResult<User> {
        let username = new.username.trim().to_string();
        self.validate_username(&username)?;

        if new.password.is_empty() {
            return Err(CivicError::Validation("Password cannot be empty".to_string()));
        }

        if self.get_user_by_username(&username).await?.is_some() {
            return Err(CivicError::Conflict("Username already exists.".to_string()));
        }

        let password_hash = hash_password(&new.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO account (username, password_hash, email, phone, is_citizen, is_moderator, is_resolver, is_superuser, is_active, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
        )
        .bind(&username)
        .bind(&password_hash)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.roles.citizen)
        .bind(new.roles.moderator)
        .bind(new.roles.resolver)
        .bind(new.roles.superuser)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| CivicError::conflict_on_unique(e, "Username already exists."))?;

        tracing::info!(username = %username, "Account created");

        self.get_user(result.last_insert_rowid()).await
    }

    /// Authenticate and open a session
    ///
    /// A ban that has lapsed is cleared before the session is issued; a live ban
    /// rejects the login with the number of days left.
    pub async fn login(&self, username: &str, password: &str) -> CivicResult<(User, Session)> {
        let invalid = || CivicError::Authentication("Invalid username or password.".to_string());

        let mut user = self
            .get_user_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        if !user.is_active {
            return Err(invalid());
        }

        if let BanStatus::Banned { .. } = self.bans.refresh(&mut user).await? {
            return Err(Self::banned_error(&user));
        }

        let session = self.create_session(user.id).await?;

        Ok((user, session))
    }

    /// Error for a user whose ban is still in force
    pub fn banned_error(user: &User) -> CivicError {
        let status = crate::moderation::evaluate_ban(user.is_banned, user.banned_until, Utc::now());
        match status.days_left(Utc::now()) {
            Some(days) => CivicError::AccountBanned(format!(
                "Your account is banned for {} more days for reporting a fake issue.",
                days
            )),
            None => CivicError::AccountBanned("Your account is banned.".to_string()),
        }
    }

    /// Create a session for a user
    pub async fn create_session(&self, user_id: i64) -> CivicResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.authentication.session_ttl_hours);

        let token = self.generate_token(user_id, &session_id, now.timestamp(), expires_at.timestamp())?;

        sqlx::query(
            "INSERT INTO session (id, user_id, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(Session {
            id: session_id,
            user_id,
            token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate a session token and return session info
    pub async fn validate_session(&self, token: &str) -> CivicResult<ValidatedSession> {
        self.decode_token(token)?;

        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token, created_at, expires_at FROM session WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| CivicError::Authentication("Invalid or expired session".to_string()))?;

        if Utc::now() > session.expires_at {
            return Err(CivicError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            user_id: session.user_id,
            session_id: session.id,
        })
    }

    /// Delete a session (logout)
    pub async fn delete_session(&self, session_id: &str) -> CivicResult<()> {
        sqlx::query("DELETE FROM session WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Get user by id
    pub async fn get_user(&self, id: i64) -> CivicResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM account WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| CivicError::NotFound(format!("User {} not found", id)))
    }

    /// Get user by username
    pub async fn get_user_by_username(&self, username: &str) -> CivicResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM account WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Get a citizen by id; non-citizens are reported as not found
    pub async fn get_citizen(&self, id: i64) -> CivicResult<User> {
        let user = self.get_user(id).await?;
        if !user.is_citizen {
            return Err(CivicError::NotFound(format!("Citizen {} not found", id)));
        }
        Ok(user)
    }

    /// All citizens, newest first
    pub async fn list_citizens(&self) -> CivicResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM account WHERE is_citizen = 1 ORDER BY date_joined DESC, id DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Create the configured superuser if it does not exist yet
    pub async fn ensure_superuser(&self, bootstrap: &BootstrapConfig) -> CivicResult<Option<User>> {
        let (Some(username), Some(password)) = (
            bootstrap.superuser_username.as_deref(),
            bootstrap.superuser_password.as_deref(),
        ) else {
            tracing::warn!("CIVICFIX_SUPERUSER_* variables not set, skipping superuser bootstrap");
            return Ok(None);
        };

        if self.get_user_by_username(username).await?.is_some() {
            tracing::info!("Superuser '{}' already exists", username);
            return Ok(None);
        }

        let user = self
            .create_account(NewAccount {
                username: username.to_string(),
                email: bootstrap.superuser_email.clone().unwrap_or_default(),
                phone: None,
                password: password.to_string(),
                roles: RoleFlags::superuser(),
            })
            .await?;

        tracing::info!("Superuser '{}' created", user.username);
        Ok(Some(user))
    }

    /// Cleanup expired sessions, returning the number removed
    pub async fn cleanup_expired_sessions(&self) -> CivicResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");
        } else {
            tracing::debug!("Session cleanup: no expired sessions found");
        }

        Ok(deleted)
    }

    /// Sign a session token
    fn generate_token(&self, user_id: i64, session_id: &str, iat: i64, exp: i64) -> CivicResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.secret_key.as_bytes()),
        )
        .map_err(|e| CivicError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Check a session token's signature and expiry
    fn decode_token(&self, token: &str) -> CivicResult<Claims> {
        use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

        let decoding_key =
            DecodingKey::from_secret(self.config.authentication.secret_key.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Session token rejected: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        CivicError::Authentication("Session expired".to_string())
                    }
                    _ => CivicError::Authentication("Invalid or expired session".to_string()),
                }
            })
    }

    /// Validate username format
    fn validate_username(&self, username: &str) -> CivicResult<()> {
        if username.is_empty() {
            return Err(CivicError::Validation("Username cannot be empty".to_string()));
        }

        if username.len() > 150 {
            return Err(CivicError::Validation("Username too long".to_string()));
        }

        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            return Err(CivicError::Validation(
                "Username may contain only letters, digits and @/./+/-/_".to_string(),
            ));
        }

        Ok(())
    }
}
