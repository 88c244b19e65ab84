//! Election primitive: a named, systemwide exclusive lock that is acquired
//! without ever waiting for another holder.

#[cfg(feature = "dbus")]
mod dbus;
#[cfg(unix)]
mod lock_file;
#[cfg(windows)]
mod named_mutex;

use crate::Error;
use crate::GateBackend;
use crate::IdentityKey;

/// Live handle of the exclusive-ownership primitive.
///
/// The primitive stays held for as long as this value lives. Dropping it
/// releases ownership; so does process exit or crash, which the OS
/// guarantees.
#[derive(Debug)]
pub struct Ownership {
    _held: Held,
}

#[derive(Debug)]
enum Held {
    #[cfg(unix)]
    LockFile(std::fs::File),
    #[cfg(windows)]
    Mutex(named_mutex::MutexHandle),
    #[cfg(feature = "dbus")]
    BusName(zbus::Connection),
}

/// Attempts to become the owner of `key` without blocking.
///
/// Returns `Ok(Some(_))` when this call created ownership, `Ok(None)` when
/// another live process holds it, and `Err(Error::Election)` when the
/// primitive could not be created or opened at all.
pub fn try_acquire(key: &IdentityKey, backend: GateBackend) -> Result<Option<Ownership>, Error> {
    let held = match backend {
        #[cfg(unix)]
        GateBackend::Native => lock_file::try_lock(key.lock_path())?.map(Held::LockFile),
        #[cfg(windows)]
        GateBackend::Native => named_mutex::try_create(key.mutex_name())?.map(Held::Mutex),
        #[cfg(feature = "dbus")]
        GateBackend::DBus => dbus::request_name(&key.bus_name())?.map(Held::BusName),
    };
    Ok(held.map(|held| Ownership { _held: held }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppId;
    use crate::Options;
    use uuid::Uuid;

    fn key_in(dir: &std::path::Path) -> IdentityKey {
        let id = AppId::from_uuid(Uuid::new_v4());
        IdentityKey::derive(&id, &Options::default().runtime_dir(dir))
    }

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let key = key_in(dir.path());

        let first = try_acquire(&key, GateBackend::Native).unwrap();
        assert!(first.is_some());

        let second = try_acquire(&key, GateBackend::Native).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn release_allows_reacquire() {
        let dir = tempfile::tempdir().unwrap();
        let key = key_in(dir.path());

        let first = try_acquire(&key, GateBackend::Native).unwrap();
        assert!(first.is_some());
        drop(first);

        let again = try_acquire(&key, GateBackend::Native).unwrap();
        assert!(again.is_some());
    }

    #[test]
    fn different_keys_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let a = key_in(dir.path());
        let b = key_in(dir.path());

        let _a = try_acquire(&a, GateBackend::Native).unwrap().unwrap();
        let b = try_acquire(&b, GateBackend::Native).unwrap();
        assert!(b.is_some());
    }

    #[cfg(feature = "dbus")]
    #[test]
    fn bus_name_is_held_exclusively() {
        let dir = tempfile::tempdir().unwrap();
        let key = key_in(dir.path());

        let first = match try_acquire(&key, GateBackend::DBus) {
            Ok(first) => first,
            Err(e) => {
                eprintln!("No session bus, skipping: {}", e);
                return;
            }
        };
        assert!(first.is_some());
        assert!(try_acquire(&key, GateBackend::DBus).unwrap().is_none());

        // The bus daemon releases the name once it sees the connection close
        drop(first);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let mut again = try_acquire(&key, GateBackend::DBus).unwrap();
        while again.is_none() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
            again = try_acquire(&key, GateBackend::DBus).unwrap();
        }
        assert!(again.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn unusable_runtime_dir_is_an_election_failure() {
        // A regular file cannot be used as a directory
        let file = tempfile::NamedTempFile::new().unwrap();
        let key = key_in(&file.path().join("nested"));

        let err = try_acquire(&key, GateBackend::Native).unwrap_err();
        assert!(matches!(err, Error::Election(_)));
    }
}
