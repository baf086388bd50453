//! Periodic cycle scheduling

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use treemirror_core::{CycleOutcome, Mirror};

/// Run a cycle immediately and then once per `interval` until `shutdown`
/// resolves. Returns the number of cycles started.
///
/// Cycles run on the blocking pool, so a slow cycle can still be running when
/// the next tick fires; the mirror drops such overlapping calls itself. On
/// shutdown no new cycles start and running ones are awaited.
pub async fn run_until(
    mirror: Arc<Mirror>,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut running: Vec<JoinHandle<CycleOutcome>> = Vec::new();
    let mut started = 0;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Termination requested, stopping synchronization.");
                break;
            }
            _ = ticker.tick() => {
                running.retain(|handle| !handle.is_finished());

                let mirror = Arc::clone(&mirror);
                running.push(tokio::task::spawn_blocking(move || mirror.sync()));
                started += 1;
                debug!("Scheduled cycle #{started}");
            }
        }
    }

    for handle in running {
        if let Err(e) = handle.await {
            error!("Synchronization task failed: {e}");
        }
    }

    started
}

/// Resolves on Ctrl+C. If the handler cannot be installed the process keeps
/// running and must be stopped externally.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use treemirror_core::MirrorOptions;

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let source = TempDir::new().unwrap();
        let replica = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.txt"), "hello").unwrap();

        let mirror = Arc::new(Mirror::new(MirrorOptions::new(
            source.path(),
            replica.path(),
        )));
        let started = run_until(
            Arc::clone(&mirror),
            Duration::from_secs(3600),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

        assert_eq!(started, 1);
        assert!(!mirror.is_syncing());
        assert_eq!(
            std::fs::read_to_string(replica.path().join("a.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_cycles_repeat_on_interval() {
        let source = TempDir::new().unwrap();
        let replica = TempDir::new().unwrap();

        let mirror = Arc::new(Mirror::new(MirrorOptions::new(
            source.path(),
            replica.path(),
        )));
        let started = run_until(
            mirror,
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_millis(275)),
        )
        .await;

        assert!(started >= 3, "only {started} cycles started");
    }

    #[tokio::test]
    async fn test_immediate_shutdown_starts_nothing_after() {
        let source = TempDir::new().unwrap();
        let replica = TempDir::new().unwrap();

        let mirror = Arc::new(Mirror::new(MirrorOptions::new(
            source.path(),
            replica.path(),
        )));
        let started = run_until(mirror, Duration::from_secs(3600), std::future::ready(())).await;

        assert!(started <= 1);
    }
}
