/// Application context and dependency injection
use crate::{
    account::AccountManager,
    comments::CommentThread,
    config::ServerConfig,
    db,
    departments::DepartmentRegistry,
    error::{CivicError, CivicResult},
    issues::IssueTracker,
    moderation::{AuditLog, BanManager},
    photos::PhotoStore,
    rate_limit::{RateLimitQuotas, RateLimiter},
    reports::Reports,
    votes::VoteLedger,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub bans: BanManager,
    pub audit: AuditLog,
    pub departments: DepartmentRegistry,
    pub issues: IssueTracker,
    pub votes: VoteLedger,
    pub comments: CommentThread,
    pub reports: Reports,
    pub photos: PhotoStore,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CivicResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        Ok(Self::with_pool(config, db))
    }

    /// Wire services around an already-migrated pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> Self {
        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));
        let photos = PhotoStore::disk(
            config.storage.photo_directory.clone(),
            config.service.photo_upload_limit,
        );
        let rate_limiter = Arc::new(RateLimiter::new(
            RateLimitQuotas::default(),
            config.rate_limit.enabled,
        ));

        Self {
            account_manager,
            bans: BanManager::new(db.clone()),
            audit: AuditLog::new(db.clone()),
            departments: DepartmentRegistry::new(db.clone()),
            issues: IssueTracker::new(db.clone()),
            votes: VoteLedger::new(db.clone()),
            comments: CommentThread::new(db.clone()),
            reports: Reports::new(db.clone()),
            photos,
            rate_limiter,
            config,
            db,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> CivicResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.photo_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    CivicError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
