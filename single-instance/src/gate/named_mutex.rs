use crate::Error;
use std::io;
use std::ptr;
use winapi::shared::minwindef::FALSE;
use winapi::shared::winerror::ERROR_ALREADY_EXISTS;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::synchapi::CreateMutexW;
use winapi::um::winnt::HANDLE;

/// Open handle to a named mutex. The mutex object lives until the last
/// handle to it is closed.
#[derive(Debug)]
pub(super) struct MutexHandle(HANDLE);

// The handle is only ever closed, never waited on
unsafe impl Send for MutexHandle {}
unsafe impl Sync for MutexHandle {}

impl Drop for MutexHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

pub(super) fn try_create(name: &str) -> Result<Option<MutexHandle>, Error> {
    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();

    unsafe {
        let handle = CreateMutexW(ptr::null_mut(), FALSE, wide.as_ptr());
        if handle.is_null() {
            return Err(Error::Election(io::Error::last_os_error()));
        }

        if GetLastError() == ERROR_ALREADY_EXISTS {
            // We only got a handle to the existing mutex
            CloseHandle(handle);
            log::debug!("Mutex {} already exists", name);
            return Ok(None);
        }

        log::debug!("Created mutex {}", name);
        Ok(Some(MutexHandle(handle)))
    }
}
