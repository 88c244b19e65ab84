use std::path::PathBuf;
use std::time::Duration;

/// How widely the single instance guarantee applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One instance per machine, across all user sessions
    #[default]
    Machine,
    /// One instance per user session
    Session,
}

/// Which primitive decides the election
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateBackend {
    /// Lock file on unix, named mutex on windows
    #[default]
    Native,
    /// Well-known name on the D-Bus session bus. The session bus belongs to
    /// one user session, so this backend is per session whatever `scope`
    /// says.
    #[cfg(feature = "dbus")]
    DBus,
}

/// Tunables for the coordinator.
///
/// ```
/// use std::time::Duration;
/// use single_instance::Options;
/// use single_instance::Scope;
///
/// let options = Options::default()
///     .scope(Scope::Session)
///     .connect_timeout(Duration::from_millis(20));
/// assert_eq!(options.scope, Scope::Session);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    pub scope: Scope,

    /// Directory for the lock file and the socket (unix only). When not set
    /// it is picked from `scope`.
    pub runtime_dir: Option<PathBuf>,

    /// How long a later launch waits for the primary to accept
    pub connect_timeout: Duration,

    /// Initial delay before re-arming after a failed accept, doubled on
    /// every consecutive failure
    pub rearm_backoff: Duration,

    /// Consecutive accept failures before the fault callback is invoked
    pub max_rearm_failures: u32,

    pub gate_backend: GateBackend,
}

pub(crate) const MAX_REARM_BACKOFF: Duration = Duration::from_secs(5);

/// Same for every user and session on the machine, unlike `$TMPDIR`
#[cfg(unix)]
pub(crate) const MACHINE_RUNTIME_DIR: &str = "/tmp";

impl Default for Options {
    fn default() -> Self {
        Self {
            scope: Scope::Machine,
            runtime_dir: None,
            connect_timeout: Duration::from_millis(100),
            rearm_backoff: Duration::from_millis(100),
            max_rearm_failures: 5,
            gate_backend: GateBackend::Native,
        }
    }
}

impl Options {
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn rearm_backoff(mut self, backoff: Duration) -> Self {
        self.rearm_backoff = backoff;
        self
    }

    pub fn max_rearm_failures(mut self, failures: u32) -> Self {
        self.max_rearm_failures = failures.max(1);
        self
    }

    pub fn gate_backend(mut self, backend: GateBackend) -> Self {
        self.gate_backend = backend;
        self
    }

    /// Directory holding the lock file and socket when none is configured
    #[cfg(unix)]
    pub(crate) fn resolved_runtime_dir(&self) -> PathBuf {
        if let Some(dir) = &self.runtime_dir {
            return dir.clone();
        }
        match self.scope {
            Scope::Machine => PathBuf::from(MACHINE_RUNTIME_DIR),
            Scope::Session => dirs::runtime_dir().unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Backoff to wait after `failures` consecutive accept errors
    pub(crate) fn backoff_for(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.rearm_backoff
            .saturating_mul(1 << shift)
            .min(MAX_REARM_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn configured_runtime_dir_wins_over_scope() {
        let options = Options::default()
            .scope(Scope::Session)
            .runtime_dir("/some/where");
        assert_eq!(options.resolved_runtime_dir(), PathBuf::from("/some/where"));
    }

    #[cfg(unix)]
    #[test]
    fn machine_scope_uses_fixed_dir() {
        let options = Options::default();
        assert_eq!(options.resolved_runtime_dir(), PathBuf::from("/tmp"));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let options = Options::default().rearm_backoff(Duration::from_millis(100));
        assert_eq!(options.backoff_for(1), Duration::from_millis(100));
        assert_eq!(options.backoff_for(2), Duration::from_millis(200));
        assert_eq!(options.backoff_for(3), Duration::from_millis(400));
        assert_eq!(options.backoff_for(30), MAX_REARM_BACKOFF);
    }

    #[test]
    fn max_rearm_failures_is_at_least_one() {
        let options = Options::default().max_rearm_failures(0);
        assert_eq!(options.max_rearm_failures, 1);
    }
}
