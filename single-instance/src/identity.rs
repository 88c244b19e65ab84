use crate::Error;
use crate::Options;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(unix)]
use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;

/// Globally unique identifier of one logical application, shared by all of
/// its versions and processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(Uuid);

impl AppId {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        AppId(uuid)
    }

    /// Derives a stable id from an arbitrary unique string (e.g. a database
    /// path), for applications that do not carry a uuid of their own
    pub fn from_name(name: &str) -> Self {
        AppId(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for AppId {
    fn from(uuid: Uuid) -> Self {
        AppId(uuid)
    }
}

impl FromStr for AppId {
    type Err = Error;

    /// Accepts the hyphenated, simple, braced and urn forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(AppId)
            .map_err(|e| Error::InvalidAppId(format!("{}: {}", s, e)))
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.braced())
    }
}

// Includes the trailing NUL
#[cfg(unix)]
const SUN_PATH_MAX: usize = 108;

/// Names of the named resources belonging to one application id.
///
/// Deriving a key has no side effects: no directory is created and nothing
/// is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    name: String,
    #[cfg(unix)]
    lock_path: PathBuf,
    #[cfg(unix)]
    socket_path: PathBuf,
    #[cfg(windows)]
    mutex_name: String,
    #[cfg(windows)]
    pipe_name: String,
}

impl IdentityKey {
    pub fn derive(app_id: &AppId, options: &Options) -> Self {
        let name = app_id.to_string();

        #[cfg(unix)]
        {
            let dir = options.resolved_runtime_dir();
            let lock_path = dir.join(format!("{}.lock", name));
            let mut socket_path = dir.join(format!("{}.sock", name));
            if !fits_sun_path(&socket_path) {
                socket_path = short_socket_path(&socket_path);
            }
            IdentityKey {
                name,
                lock_path,
                socket_path,
            }
        }

        #[cfg(windows)]
        {
            let namespace = match options.scope {
                crate::Scope::Machine => "Global",
                crate::Scope::Session => "Local",
            };
            IdentityKey {
                mutex_name: format!("{}\\{}", namespace, name),
                pipe_name: format!("\\\\.\\pipe\\{}", name),
                name,
            }
        }
    }

    /// Canonical textual form of the application id, e.g. `{6f9619ff-...}`
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(unix)]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    #[cfg(unix)]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    #[cfg(windows)]
    pub fn mutex_name(&self) -> &str {
        &self.mutex_name
    }

    #[cfg(windows)]
    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }

    /// Well-known D-Bus name. Elements may not start with a digit and
    /// hyphens are discouraged, so the uuid is written in its simple form.
    #[cfg(feature = "dbus")]
    pub fn bus_name(&self) -> String {
        let simple: String = self
            .name
            .chars()
            .filter(|c| c.is_ascii_hexdigit())
            .collect();
        format!("org.singleinstance.App_{}", simple)
    }
}

#[cfg(unix)]
fn fits_sun_path(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().len() < SUN_PATH_MAX
}

/// Stand-in for a socket path too long for `sun_path`. Lives in the fixed
/// machine directory and is named after the full original path, so each
/// runtime directory still gets its own socket.
#[cfg(unix)]
fn short_socket_path(socket_path: &Path) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, socket_path.as_os_str().as_bytes());
    Path::new(crate::options::MACHINE_RUNTIME_DIR).join(format!("{}.sock", digest.simple()))
}
