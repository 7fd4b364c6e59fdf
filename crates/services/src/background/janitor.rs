use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::InviteService;

/// Periodically rewrites pending invites past their expiry to `expired`.
/// Housekeeping only: acceptance already rejects expired tokens on its own.
pub fn spawn_invite_janitor(invites: Arc<InviteService>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Invite janitor started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Failures are logged by the service; the next tick retries.
            if let Ok(expired) = invites.expire_stale().await {
                debug!(expired, "Invite sweep finished");
            }
        }
    })
}
