//! Periodic refresh ticks for live displays.
//!
//! A helper thread sends a tick every `interval` over a channel that holds at
//! most one pending tick; a slow consumer sees one tick, not a backlog.
//! Dropping the `Ticker` stops and joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Longest the worker sleeps before re-checking the stop flag
const STOP_POLL: Duration = Duration::from_millis(50);

pub struct Ticker {
    rx: Receiver<Instant>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Ticker {
    pub fn start(interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("antikoala-ticker".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                while !worker_stop.load(Ordering::Relaxed) {
                    let now = Instant::now();
                    if now < next {
                        std::thread::sleep((next - now).min(STOP_POLL));
                        continue;
                    }
                    next = now + interval;
                    match tx.try_send(now) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            })?;

        tracing::debug!("Ticker started ({:?})", interval);
        Ok(Self {
            rx,
            stop,
            handle: Some(handle),
            interval,
        })
    }

    /// Block until the next tick; None once the ticker has stopped
    pub fn wait(&self) -> Option<Instant> {
        loop {
            match self.rx.recv_timeout(STOP_POLL.max(self.interval)) {
                Ok(at) => return Some(at),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop.load(Ordering::Relaxed) {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Ticks already delivered, without blocking (0 or 1)
    pub fn pending(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Ticker thread panicked");
            }
            tracing::debug!("Ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
