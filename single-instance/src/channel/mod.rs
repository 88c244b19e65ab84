//! Named local channel used purely as a signal: a later launch connects and
//! disconnects, and the connection itself is the message.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use self::unix as platform;
#[cfg(windows)]
use self::windows as platform;

use crate::Error;
use crate::IdentityKey;
use crate::Options;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub(crate) type Callback = Arc<dyn Fn() + Send + Sync + 'static>;
pub(crate) type FaultCallback = Arc<dyn Fn(&Error) + Send + Sync + 'static>;

/// Outcome of waiting on the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Connected,
    Cancelled,
}

/// Server side of the channel. Exactly one endpoint is armed at any time
/// while the listener lives.
pub struct Listener {
    endpoint: platform::Endpoint,
}

impl Listener {
    /// Binds the endpoint for `key`. Must be called within a tokio runtime.
    pub fn bind(key: &IdentityKey) -> Result<Self, Error> {
        let endpoint = platform::Endpoint::bind(key).map_err(Error::Listener)?;
        Ok(Self { endpoint })
    }

    /// Waits for a single connection and closes it without reading. The
    /// endpoint is armed for the next connection before this returns.
    pub async fn accept(&mut self) -> Result<(), Error> {
        self.endpoint.accept().await.map_err(Error::Listener)
    }

    /// Like `accept`, but gives up when `cancel` fires or its sender is
    /// dropped.
    pub async fn await_connection(
        &mut self,
        cancel: &mut oneshot::Receiver<()>,
    ) -> Result<Wake, Error> {
        tokio::select! {
            _ = cancel => Ok(Wake::Cancelled),
            accepted = self.accept() => accepted.map(|_| Wake::Connected),
        }
    }
}

/// Tells the listener of `key` that another launch happened.
///
/// Best effort: returns `false` on any failure (no listener, timeout,
/// transport error) and never blocks longer than `timeout`.
pub fn try_notify(key: &IdentityKey, timeout: Duration) -> bool {
    // The caller may already be inside a runtime, so the client gets a
    // runtime of its own on a short-lived thread
    let result = std::thread::scope(|scope| {
        scope
            .spawn(|| -> io::Result<()> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(async {
                    match tokio::time::timeout(timeout, platform::connect(key)).await {
                        Ok(connected) => connected,
                        Err(_) => Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "connect timed out",
                        )),
                    }
                })
            })
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("notify thread panicked")))
    });

    match result {
        Ok(()) => {
            log::debug!("Notified the primary instance of {}", key.name());
            true
        }
        Err(e) => {
            log::debug!("Could not notify the primary instance of {}: {}", key.name(), e);
            false
        }
    }
}

pub(crate) struct Handlers {
    pub on_attempt: Option<Callback>,
    pub on_fault: Option<FaultCallback>,
}

/// Accept loop of the primary instance: accept, re-arm, notify, repeat.
/// Runs until `shutdown` fires or its sender is dropped.
pub(crate) async fn serve(
    mut listener: Listener,
    handlers: Handlers,
    options: Options,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut streak = FailureStreak::new(options.max_rearm_failures);

    loop {
        match listener.await_connection(&mut shutdown).await {
            Ok(Wake::Cancelled) => {
                log::debug!("Listener shut down");
                return;
            }
            Ok(Wake::Connected) => {
                streak.reset();
                log::trace!("Another instance attempted to start");
                if let Some(on_attempt) = &handlers.on_attempt {
                    guarded("attempt handler", || on_attempt());
                }
            }
            Err(e) => {
                let report = streak.fail();
                log::warn!("Listener failed {} time(s) in a row: {}", streak.failures(), e);

                if report {
                    log::error!("Listener keeps failing, notifications may be lost: {}", e);
                    if let Some(on_fault) = &handlers.on_fault {
                        guarded("fault handler", || on_fault(&e));
                    }
                }

                tokio::select! {
                    _ = &mut shutdown => {
                        log::debug!("Listener shut down");
                        return;
                    }
                    _ = tokio::time::sleep(options.backoff_for(streak.failures())) => {}
                }
            }
        }
    }
}

/// Consecutive accept failures. A streak is reported once, when it reaches
/// the threshold, and a successful accept starts a new one.
struct FailureStreak {
    failures: u32,
    threshold: u32,
}

impl FailureStreak {
    fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// Counts a failure and tells whether the streak should be reported now
    fn fail(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        self.failures == self.threshold
    }

    fn reset(&mut self) {
        self.failures = 0;
    }

    fn failures(&self) -> u32 {
        self.failures
    }
}

/// Host callbacks must not take the listener down with them
pub(crate) fn guarded(what: &str, f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("The {} panicked", what);
    }
}
