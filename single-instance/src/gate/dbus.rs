use crate::Error;
use futures::executor::block_on;
use zbus::Connection;

/// Requests `bus_name` on the session bus without queueing. The returned
/// connection owns the name; the bus daemon releases it when the
/// connection closes, including on process death.
pub(super) fn request_name(bus_name: &str) -> Result<Option<Connection>, Error> {
    block_on(async {
        let connection = Connection::session().await?;
        let reply = zbus::fdo::DBusProxy::new(&connection)
            .await?
            .request_name(
                zbus::names::WellKnownName::from_string_unchecked(bus_name.to_string()),
                zbus::fdo::RequestNameFlags::DoNotQueue.into(),
            )
            .await?;

        match reply {
            zbus::fdo::RequestNameReply::PrimaryOwner => {
                log::debug!("Acquired bus name {}", bus_name);
                Ok(Some(connection))
            }
            zbus::fdo::RequestNameReply::Exists => {
                log::debug!("Bus name {} is owned by another process", bus_name);
                Ok(None)
            }
            _ => Err(Error::DBus(
                "Unexpected reply when requesting name".to_string(),
            )),
        }
    })
}
