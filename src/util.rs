use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- file ops with backoff (AV scanners / sync clients briefly holding files) --------

const TRIES: usize = 16;
const DELAY_MS: u64 = 50;

/// Transient errors worth retrying: sharing/lock violations and AV blocks on Windows,
/// plus the portable would-block / interrupted kinds.
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 225 | 1006 | 1117 | 1224))
        || matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

/// Run `op` until it succeeds, fails permanently, or `tries` retriable failures pile up.
/// Back-off grows linearly with the attempt number.
fn with_backoff<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err = None;
    for attempt in 1..=tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

pub fn open_with_backoff(path: &Path) -> io::Result<File> {
    with_backoff(TRIES, DELAY_MS, || File::open(path))
}

pub fn create_with_backoff(path: &Path) -> io::Result<File> {
    with_backoff(TRIES, DELAY_MS, || File::create(path))
}

pub fn append_with_backoff(path: &Path) -> io::Result<File> {
    with_backoff(TRIES, DELAY_MS, || {
        fs::OpenOptions::new().create(true).append(true).open(path)
    })
}

/// Remove a file; a missing file is not an error.
pub fn remove_with_backoff(path: &Path) -> Result<()> {
    match with_backoff(TRIES, DELAY_MS, || fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Replace `dest` with `tmp`. Falls back to copy + remove when the rename is refused.
pub fn replace_file_atomic(tmp: &Path, dest: &Path) -> Result<()> {
    if with_backoff(20, DELAY_MS, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    with_backoff(20, DELAY_MS, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp)
}
