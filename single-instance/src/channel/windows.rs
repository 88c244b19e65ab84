use crate::IdentityKey;
use std::io;
use tokio::net::windows::named_pipe::ClientOptions;
use tokio::net::windows::named_pipe::NamedPipeServer;
use tokio::net::windows::named_pipe::ServerOptions;
use winapi::shared::winerror::ERROR_NO_DATA;

/// A named pipe server instance serves a single client, so a fresh instance
/// is created after every connection.
pub(super) struct Endpoint {
    name: String,
    server: Option<NamedPipeServer>,
}

impl Endpoint {
    pub(super) fn bind(key: &IdentityKey) -> io::Result<Self> {
        let name = key.pipe_name().to_string();
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .access_outbound(false)
            .create(&name)?;
        log::debug!("Listening on {}", name);
        Ok(Self {
            name,
            server: Some(server),
        })
    }

    fn create_instance(&self) -> io::Result<NamedPipeServer> {
        ServerOptions::new().access_outbound(false).create(&self.name)
    }

    pub(super) async fn accept(&mut self) -> io::Result<()> {
        let server = match self.server.take() {
            Some(server) => server,
            None => self.create_instance()?,
        };
        let connected = match server.connect().await {
            Ok(()) => Ok(()),
            // The client opened and closed the instance before the wait was
            // issued, which is still a launch
            Err(e) if e.raw_os_error() == Some(ERROR_NO_DATA as i32) => Ok(()),
            Err(e) => Err(e),
        };

        // Arm the next instance before letting go of this one, whether the
        // connection succeeded or not
        match self.create_instance() {
            Ok(next) => self.server = Some(next),
            Err(e) => log::warn!("Could not re-arm {}: {}", self.name, e),
        }
        drop(server);
        connected
    }
}

/// A busy or missing pipe fails right away instead of waiting
pub(super) async fn connect(key: &IdentityKey) -> io::Result<()> {
    let client = ClientOptions::new()
        .read(false)
        .write(true)
        .open(key.pipe_name())?;
    drop(client);
    Ok(())
}
