//! Async timer driver
//!
//! The session itself is synchronous. This task owns the clock side: it
//! sleeps until the session's earliest deadline, runs `Session::tick`, and
//! wakes early whenever the host signals that new work was queued.

use crate::clock::Clock;
use crate::session::Session;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub type SharedSession = Arc<Mutex<Session>>;

/// Milliseconds since the clock was created, on tokio's time source.
///
/// Follows paused and auto-advanced time in tokio tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

pub struct TimerDriver {
    session: SharedSession,
    clock: Arc<dyn Clock>,
    notify: Arc<Notify>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// `clock` must be the clock the session was built with.
    pub fn new(session: SharedSession, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            clock,
            notify: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Signal that the session has new work; the driver recomputes its
    /// deadline.
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the driver loop on the current runtime.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(&self.session);
        let clock = Arc::clone(&self.clock);
        let notify = Arc::clone(&self.notify);
        let running = Arc::clone(&self.running);
        self.handle = Some(tokio::spawn(async move {
            Self::run(session, clock, notify, running).await;
        }));
        info!("timer driver started");
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("timer driver stopped");
    }

    async fn run(
        session: SharedSession,
        clock: Arc<dyn Clock>,
        notify: Arc<Notify>,
        running: Arc<AtomicBool>,
    ) {
        while running.load(Ordering::SeqCst) {
            let deadline = {
                let mut session = session.lock();
                session.tick(clock.now_ms());
                if session.is_shut_down() {
                    debug!("session shut down, driver exiting");
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                session.next_deadline()
            };

            match deadline {
                Some(at) => {
                    let wait = at.saturating_sub(clock.now_ms());
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(wait)) => {}
                        _ = notify.notified() => {}
                    }
                }
                None => notify.notified().await,
            }
        }
    }
}
