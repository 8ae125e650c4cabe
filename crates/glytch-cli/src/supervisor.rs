//! Reconnect loop around [`IngestionPipeline::run`].
//!
//! The pipeline itself never reconnects: each lost connection ends a
//! session.  The supervisor opens a new connection after the configured
//! delay until shutdown is requested, or gives up after the first session
//! when reconnecting is disabled.

use std::time::Duration;

use glytch_runtime::IngestionPipeline;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::device::DeviceTarget;

/// Resolves once `shutdown` reads `true`.  Never resolves if the sender is
/// gone without having signalled.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

pub async fn supervise(
    mut pipeline: IngestionPipeline,
    target: DeviceTarget,
    reconnect_delay: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) -> IngestionPipeline {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let opened = tokio::select! {
            _ = stopped(&mut shutdown) => break,
            opened = target.open() => opened,
        };

        match opened {
            Ok(stream) => {
                info!(device = %target, attempt, "device connected");
                attempt = 0;
                match pipeline.run(stream, shutdown.clone()).await {
                    Ok(()) => break,
                    Err(e) => warn!(device = %target, error = %e, "device session ended"),
                }
            }
            Err(e) => warn!(device = %target, attempt, error = %e, "device connection failed"),
        }

        let Some(delay) = reconnect_delay else {
            info!("reconnect disabled; supervisor stopping");
            break;
        };
        info!(delay_secs = delay.as_secs(), "reconnecting");
        tokio::select! {
            _ = stopped(&mut shutdown) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    pipeline
}
