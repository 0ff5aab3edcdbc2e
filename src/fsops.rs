//! Filesystem ops (`spec.md` §4.8): thin verbs, each one host call,
//! errno-based failure, wrapping host syscalls one-to-one rather than
//! building an abstraction over them.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::names::{fcb_name, mask_matches};

pub fn mkdir(path: &Path) -> io::Result<()> {
    fs::create_dir(path)
}

pub fn rmdir(path: &Path) -> io::Result<()> {
    fs::remove_dir(path)
}

/// `CHDIR` has no state to enter on a stateless per-request server; it only
/// confirms the target exists and is a directory.
pub fn chdir(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(io::ErrorKind::NotFound, "not a directory"))
    }
}

/// Fails with `AlreadyExists` if `to` is already present — the name
/// translator resolves `from` but deliberately not `to` (`spec.md` §9).
pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "rename target already exists",
        ));
    }
    fs::rename(from, to)
}

pub fn truncate(path: &Path, len: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)
}

pub fn unlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

pub fn create(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(())
}

/// Reads up to `len` bytes starting at `offset`. A short read at EOF is not
/// an error (`spec.md` §4.8).
pub fn read_at(path: &Path, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Writes `data` at `offset`. An empty `data` reinterprets `offset` as a
/// truncate target instead of writing zero bytes (`spec.md` §4.8).
pub fn write_at(path: &Path, offset: u64, data: &[u8]) -> io::Result<usize> {
    if data.is_empty() {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(offset)?;
        return Ok(0);
    }
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(data.len())
}

/// `DELETE` (`spec.md` §4.8, §9): a literal path is unlinked directly; a
/// mask containing `?` enumerates `dir` and unlinks every non-directory
/// entry whose FCB form matches. Does not recurse into subdirectories.
pub fn delete_glob(dir: &Path, mask: &[u8; 11]) -> io::Result<()> {
    let mut matched = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else {
            continue;
        };
        if mask_matches(&fcb_name(name_str), mask) {
            fs::remove_file(entry.path())?;
            matched = true;
        }
    }
    if matched {
        Ok(())
    } else {
        Err(io::Error::new(io::ErrorKind::NotFound, "no match for delete mask"))
    }
}

/// `(total_bytes, free_bytes)` for the volume containing `root`
/// (`spec.md` §4.8). The dispatcher clamps and converts to 32 KiB clusters.
pub fn statvfs(root: &Path) -> io::Result<(u64, u64)> {
    let stat = nix::sys::statvfs::statvfs(root).map_err(io::Error::from)?;
    let frag = stat.fragment_size();
    Ok((stat.blocks() * frag, stat.blocks_available() * frag))
}
