/// CivicFix - municipal issue reporting
///
/// Citizens report civic issues with photos and locations, vote and comment
/// on them; departments triage and resolve them; a superadmin manages
/// departments, users and bans.

pub mod account;
pub mod api;
pub mod auth;
pub mod comments;
pub mod config;
pub mod context;
pub mod db;
pub mod departments;
pub mod error;
pub mod issues;
pub mod jobs;
pub mod metrics;
pub mod moderation;
pub mod photos;
pub mod rate_limit;
pub mod reports;
pub mod server;
pub mod votes;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{CivicError, CivicResult};
