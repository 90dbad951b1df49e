// ABOUTME: Health reconciler: restarts the daemon when it is found stopped.
// ABOUTME: Container cleanup after a restart is best effort and never fails the pass.

use crate::daemon::Daemon;
use crate::error::DaemonError;
use crate::state::BindAddress;

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No address bound yet; nothing to reconcile.
    Unbound,
    Running,
    Restarted,
}

/// One check-and-repair pass over the daemon.
pub async fn reconcile(
    daemon: &dyn Daemon,
    address: Option<&BindAddress>,
) -> Result<ReconcileOutcome, DaemonError> {
    let Some(address) = address else {
        tracing::debug!("No bound address, skipping reconciliation");
        return Ok(ReconcileOutcome::Unbound);
    };

    let status = daemon.status().await?;
    if status.running {
        return Ok(ReconcileOutcome::Running);
    }

    tracing::warn!(status = %status.status_text.trim(), "Daemon not running, restarting");
    daemon.start(address).await?;

    if let Err(e) = daemon.remove_stopped_containers().await {
        tracing::error!(error = %e, "Failed to clean up stopped containers");
    }
    Ok(ReconcileOutcome::Restarted)
}
