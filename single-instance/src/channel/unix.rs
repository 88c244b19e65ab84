use crate::IdentityKey;
use std::io;
use tokio::net::UnixListener;
use tokio::net::UnixStream;

pub(super) struct Endpoint {
    listener: UnixListener,
}

impl Endpoint {
    pub(super) fn bind(key: &IdentityKey) -> io::Result<Self> {
        let path = key.socket_path();

        // Only the ownership holder binds, so whatever is at the path was
        // left behind by a previous holder that died
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed stale socket {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = std::os::unix::net::UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;
        log::debug!("Listening on {}", path.display());

        Ok(Self {
            listener: UnixListener::from_std(listener)?,
        })
    }

    /// The listening socket stays armed across accepts; concurrent
    /// connections wait in the backlog.
    pub(super) async fn accept(&mut self) -> io::Result<()> {
        let (stream, _) = self.listener.accept().await?;
        drop(stream);
        Ok(())
    }
}

pub(super) async fn connect(key: &IdentityKey) -> io::Result<()> {
    let stream = UnixStream::connect(key.socket_path()).await?;
    drop(stream);
    Ok(())
}
