//! Worker-thread helpers for the crawler: named spawns whose launch failures are
//! logged rather than fatal.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL: Duration = Duration::from_millis(20);

/// Spawn a named worker. A failed launch is logged and yields `None`; the crawl goes
/// on with the workers that did start.
pub fn spawn_worker<F>(name: &str, f: F) -> Option<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name.to_string()).spawn(f) {
        Ok(handle) => {
            tracing::info!("{} thread started", name);
            Some(handle)
        }
        Err(e) => {
            tracing::error!("error launching {} thread: {}", name, e);
            None
        }
    }
}

/// Join every started worker, logging any that panicked. Returns how many ended cleanly.
pub fn join_all(handles: Vec<JoinHandle<()>>) -> usize {
    let mut clean = 0;
    for h in handles {
        let name = h.thread().name().unwrap_or("worker").to_string();
        match h.join() {
            Ok(()) => clean += 1,
            Err(_) => tracing::error!("{} thread panicked", name),
        }
    }
    clean
}

/// Like [`join_all`], but stops waiting once `grace` has passed. Workers still running
/// then are detached with a warning and end with the process.
pub fn join_within(handles: Vec<JoinHandle<()>>, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    let mut pending = handles;
    let mut clean = 0;
    loop {
        let (done, running): (Vec<_>, Vec<_>) = pending.into_iter().partition(|h| h.is_finished());
        clean += join_all(done);
        pending = running;
        if pending.is_empty() || Instant::now() >= deadline {
            break;
        }
        thread::sleep(JOIN_POLL);
    }
    for h in &pending {
        tracing::warn!(
            "{} thread still busy {:?} after shutdown, leaving it behind",
            h.thread().name().unwrap_or("worker"),
            grace
        );
    }
    clean
}
