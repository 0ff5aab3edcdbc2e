//! DOS error taxonomy.
//!
//! The wire protocol surfaces failures as a single `AX` status word, not a
//! rich error type. [`DosError`] enumerates exactly the codes the dispatcher
//! is allowed to produce (`spec.md` §7) and [`DosError::from_io`] classifies
//! a host [`io::Error`] down to one of them. Anything finer-grained than this
//! (the raw errno) is only ever logged, never sent to the client.

use std::io;

/// A DOS redirector error code, as placed in `AX` on a failing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DosError {
    /// File not found (`AX=2`): a path did not resolve, or `stat` failed.
    FileNotFound = 2,
    /// Path not found (`AX=3`): a parent directory does not exist.
    PathNotFound = 3,
    /// Access denied (`AX=5`): write to read-only, rename target exists,
    /// bad handle on read.
    AccessDenied = 5,
    /// No more files (`AX=18`): find-family exhausted.
    NoMoreFiles = 18,
    /// Disk full / write fault (`AX=29`): mkdir/rmdir failed.
    DiskFull = 29,
}

impl DosError {
    /// The raw `AX` value for this error.
    pub fn ax(self) -> u16 {
        self as u16
    }

    /// Classify a host I/O error down to a DOS error code, for handlers
    /// whose table (`spec.md` §7) gives exactly one non-success code.
    ///
    /// Handlers that must choose between two codes (e.g. `RENAME`'s
    /// malformed-request-vs-failed-rename split) do not use this helper;
    /// they construct the `DosError` directly.
    pub fn from_io(err: &io::Error, not_found: DosError) -> DosError {
        match err.kind() {
            io::ErrorKind::NotFound => not_found,
            io::ErrorKind::PermissionDenied => DosError::AccessDenied,
            io::ErrorKind::AlreadyExists => DosError::AccessDenied,
            _ => match err.raw_os_error() {
                Some(libc::ENOTEMPTY) | Some(libc::ENOSPC) => DosError::DiskFull,
                Some(libc::ENOTDIR) | Some(libc::ENOENT) => not_found,
                _ => not_found,
            },
        }
    }

    /// Like [`DosError::from_io`] but for handlers whose documented error
    /// set (`spec.md` §4.7) has no `DiskFull` member — `RENAME` and
    /// `DELETE` restrict to `{FileNotFound/PathNotFound, AccessDenied}`,
    /// so an `ENOSPC`/`ENOTEMPTY` failure is reported as `not_found`
    /// rather than a status word the client's error table doesn't expect.
    pub fn from_io_restricted(err: &io::Error, not_found: DosError) -> DosError {
        match err.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::AlreadyExists => {
                DosError::AccessDenied
            }
            _ => not_found,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classifies_not_found() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(
            DosError::from_io(&err, DosError::PathNotFound),
            DosError::PathNotFound
        );
    }

    #[test]
    fn classifies_permission() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            DosError::from_io(&err, DosError::FileNotFound),
            DosError::AccessDenied
        );
    }
}
