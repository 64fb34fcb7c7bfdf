//! Shutdown signalling shared by the consume loop and the retry engine.

use tokio::sync::watch;

/// Resolve once the shutdown flag is set.
///
/// A dropped sender means nobody can ask for shutdown anymore, so this never
/// resolves in that case.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Whether shutdown has already been requested.
pub fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}
