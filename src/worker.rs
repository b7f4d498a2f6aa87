use tokio::sync::watch;

use crate::delivery::{DEFAULT_PASS_SIZE, processor};
use crate::state::SharedState;

/// Start the delivery poller on a dedicated OS thread with its own Tokio
/// runtime. It keeps running system-wide passes until shutdown is signaled;
/// this is what drains batches too large for the creator's single
/// synchronous pass.
pub fn run_poller(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("delivery-poller".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build poller runtime");

            runtime.block_on(run(state, shutdown));
        })
        .expect("Failed to spawn poller thread")
}

async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("Delivery poller started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match processor::run_pass(&state, None, DEFAULT_PASS_SIZE).await {
            Ok(outcome) if outcome.processed + outcome.failed > 0 => {
                tracing::debug!(
                    "Pass delivered {} items, {} failed, {} remaining",
                    outcome.processed,
                    outcome.failed,
                    outcome.remaining
                );
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Delivery pass error: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(state.config.poll_interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Delivery poller stopped");
}
