use crate::Error;
use fs2::FileExt;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Takes an exclusive `flock` on `path`. The lock belongs to the returned
/// file description and is dropped with it, or by the kernel when the
/// process dies.
pub(super) fn try_lock(path: &Path) -> Result<Option<File>, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::Election)?;
    }

    let file = open(path).map_err(Error::Election)?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            log::debug!("Locked {}", path.display());
            Ok(Some(file))
        }
        Err(e) if is_contended(&e) => {
            log::debug!("{} is locked by another process", path.display());
            Ok(None)
        }
        Err(e) => Err(Error::Election(e)),
    }
}

fn open(path: &Path) -> io::Result<File> {
    let read_write = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o666)
        .open(path);

    match read_write {
        // Created by another user, flock still works on a read-only file
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            OpenOptions::new().read(true).open(path)
        }
        other => other,
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
