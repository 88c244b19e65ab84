use std::io;

/// Errors that can occur while electing or serving the primary instance
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The exclusive-ownership primitive could not be created or opened.
    /// Single instance status is unknown, so this is always fatal.
    #[error("Election failed: {0}")]
    Election(#[source] io::Error),

    /// The notification listener could not be armed or accepted a broken
    /// connection. Only reported through the listener fault callback.
    #[error("Listener error: {0}")]
    Listener(#[source] io::Error),

    /// Another instance owns the application id. The caller must end the
    /// process.
    #[error("Another instance is already running")]
    AlreadyRunning,

    #[error("Election has already been run for this coordinator")]
    AlreadyElected,

    #[error("Invalid application id: {0}")]
    InvalidAppId(String),

    #[cfg(feature = "dbus")]
    #[error("D-Bus error: {0}")]
    DBus(String),
}

#[cfg(feature = "dbus")]
impl From<zbus::Error> for Error {
    fn from(e: zbus::Error) -> Self {
        Error::DBus(e.to_string())
    }
}

#[cfg(feature = "dbus")]
impl From<zbus::fdo::Error> for Error {
    fn from(e: zbus::fdo::Error) -> Self {
        Error::DBus(e.to_string())
    }
}
