//! Shared helpers for supervisor integration tests
#![allow(dead_code)]

use process_supervisor::{ManagedProcess, ProcessGroup, ProcessState};
use std::time::{Duration, Instant};

/// Opt-in test logging, driven by `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Poll until `condition` holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        smol::Timer::after(Duration::from_millis(10)).await;
    }
    condition()
}

/// Poll until the process reaches `target` or `timeout` elapses
pub async fn wait_for_process_state(
    process: &ManagedProcess,
    target: ProcessState,
    timeout: Duration,
) -> bool {
    wait_until(timeout, || process.state() == target).await
}

/// Poll until the group reaches `target` or `timeout` elapses
pub async fn wait_for_group_state(
    group: &ProcessGroup,
    target: ProcessState,
    timeout: Duration,
) -> bool {
    wait_until(timeout, || group.state() == target).await
}

/// Receive one update or give up after `timeout`
pub async fn recv_timeout<T>(rx: &async_channel::Receiver<T>, timeout: Duration) -> Option<T> {
    smol::future::or(async { rx.recv().await.ok() }, async {
        smol::Timer::after(timeout).await;
        None
    })
    .await
}

/// Drain everything currently queued on a subscription
pub fn drain<T>(rx: &async_channel::Receiver<T>) -> Vec<T> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}
