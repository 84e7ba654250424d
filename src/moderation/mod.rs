/// Moderation System
///
/// Ban state machine with lazy and scheduled expiry, plus the audit log of
/// privileged actions (bans, fake-issue removals, assignments, status changes).

pub mod audit;
pub mod bans;

pub use audit::{AuditAction, AuditLog, AuditRecord};
pub use bans::{ban_expiry, evaluate_ban, BanManager, BanStatus, MAX_BAN_DAYS};
