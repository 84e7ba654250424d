use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::ban_expiry_sweep_job(Arc::clone(&self)));
        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Clear lapsed bans (default every 15 minutes)
    async fn ban_expiry_sweep_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.moderation.ban_sweep_interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::sweep_expired_bans(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("ban_sweep", "success", started.elapsed().as_secs_f64());
                    if count > 0 {
                        info!("Lifted {} expired bans", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job("ban_sweep", "failure", started.elapsed().as_secs_f64());
                    error!("Failed to sweep expired bans: {}", e);
                }
            }
        }
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            let started = Instant::now();

            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(_) => {
                    metrics::record_background_job("session_cleanup", "success", started.elapsed().as_secs_f64());
                }
                Err(e) => {
                    metrics::record_background_job("session_cleanup", "failure", started.elapsed().as_secs_f64());
                    error!("Failed to cleanup expired sessions: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!("Health check failed: {}", e);
            }
        }
    }
}
