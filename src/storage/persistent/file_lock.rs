//! Exclusive directory lock.
//!
//! Only one process may own a journal directory at a time. The lock lives on
//! a `.lock` file inside the directory that records the owner's process id,
//! and is released when the handle drops.

use std::fs::{self, File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

/// Name of the lock file inside a journal directory.
pub const LOCK_FILE: &str = ".lock";

/// Exclusive lock on a journal directory, held for the lifetime of this value.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Attempt to acquire the lock without blocking, then stamp it with this process id.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if another process (or another open journal)
    ///   holds it; the message names the holder's pid when it is known
    /// - `ErrorKind::Unsupported` on platforms without advisory locking
    pub fn acquire(dir: &Path) -> IoResult<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if !lock_exclusive(&file)? {
            let message = match holder_pid(dir) {
                Some(pid) => format!("journal is locked by process {pid}"),
                None => "journal is locked by another process".to_string(),
            };
            return Err(IoError::new(ErrorKind::WouldBlock, message));
        }

        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        Ok(Self { _file: file, path })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Process id recorded by the last holder of `dir`'s lock, if readable.
///
/// A stale value survives a crash; only a failed [`FileLock::acquire`] proves
/// the process is still alive.
#[must_use]
pub fn holder_pid(dir: &Path) -> Option<u32> {
    fs::read_to_string(dir.join(LOCK_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Returns `Ok(false)` when someone else holds the lock.
#[cfg(unix)]
fn lock_exclusive(file: &File) -> IoResult<bool> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
        return Ok(true);
    }
    let err = IoError::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EWOULDBLOCK => Ok(false),
        _ => Err(err),
    }
}

#[cfg(windows)]
fn lock_exclusive(file: &File) -> IoResult<bool> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    // SAFETY: the handle is owned by `file`; OVERLAPPED is plain data and may be zeroed.
    let locked = unsafe {
        let mut overlapped = std::mem::zeroed::<OVERLAPPED>();
        LockFileEx(
            file.as_raw_handle() as HANDLE,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if locked != 0 {
        return Ok(true);
    }
    let err = IoError::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == ERROR_LOCK_VIOLATION as i32 => Ok(false),
        _ => Err(err),
    }
}

#[cfg(not(any(unix, windows)))]
fn lock_exclusive(_file: &File) -> IoResult<bool> {
    Err(IoError::new(
        ErrorKind::Unsupported,
        "file locking not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let lock = FileLock::acquire(dir.path()).unwrap();
            assert!(lock.path().ends_with(LOCK_FILE));
        }
        assert!(FileLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_second_acquire_names_the_holder() {
        let dir = tempdir().unwrap();
        let _held = FileLock::acquire(dir.path()).unwrap();
        assert_eq!(holder_pid(dir.path()), Some(std::process::id()));

        let err = FileLock::acquire(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert!(err.to_string().contains(&std::process::id().to_string()));
    }

    #[test]
    fn test_stale_stamp_is_overwritten() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LOCK_FILE), "999999999 leftover").unwrap();
        assert_eq!(holder_pid(dir.path()), None);

        let _lock = FileLock::acquire(dir.path()).unwrap();
        assert_eq!(holder_pid(dir.path()), Some(std::process::id()));
    }
}
