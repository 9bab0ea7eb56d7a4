use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::SessionManager;

/// Default interval between expired-session purges: 15 minutes.
pub const DEFAULT_SWEEP_INTERVAL_S: u64 = 15 * 60;

/// Run `purge_expired` every `interval` until the returned task is aborted.
///
/// Purging is housekeeping only; `get` already hides expired records, so a
/// failed sweep is logged and retried on the next tick.
pub fn spawn_sweeper(manager: SessionManager, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match manager.purge_expired().await {
                Ok(0) => debug!("Sweeper: no expired sessions"),
                Ok(_) => {}
                Err(e) => warn!("Sweeper: purge failed: {}", e),
            }
        }
    })
}
