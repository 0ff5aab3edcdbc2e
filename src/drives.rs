//! Drive table (`spec.md` §3): a fixed array indexed by drive number 2..25
//! (C:–Z:), each entry an absolute canonical host root plus a FAT-backed
//! flag probed once at startup. Roots are parsed once at startup and never
//! mutated afterward.

use std::io;
use std::path::{Path, PathBuf};

/// First drive letter a server ever assigns (`C:`). `A:`/`B:` are reserved
/// for local floppy drives on the DOS side and never mapped.
pub const FIRST_DRIVE: u8 = 2;
/// Last assignable drive number (`Z:`).
pub const LAST_DRIVE: u8 = 25;

/// One mapped drive: its canonical host root and whether that root sits on
/// a real FAT filesystem (in which case on-disk DOS attributes are
/// authoritative rather than synthesized — `spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct Drive {
    pub root: PathBuf,
    pub fat_backed: bool,
}

/// The full C:–Z: drive table. Slot `n` holds the drive whose number is
/// `FIRST_DRIVE + n`.
#[derive(Debug, Default)]
pub struct DriveTable {
    slots: Vec<Option<Drive>>,
}

impl DriveTable {
    /// Builds a table from a list of host roots, assigned to consecutive
    /// drive letters starting at `C:` (`spec.md` §6 CLI: "each `<path>` is
    /// assigned to the next drive letter starting at C").
    ///
    /// Each root must be an existing directory with no trailing `/` in its
    /// original form; trailing slashes are rejected by the caller before
    /// this constructor ever sees the path (`spec.md` §6).
    pub fn build(roots: &[PathBuf]) -> io::Result<DriveTable> {
        let max = (LAST_DRIVE - FIRST_DRIVE + 1) as usize;
        if roots.len() > max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "more paths than drive letters (C:-Z:) available",
            ));
        }
        let mut slots = Vec::with_capacity(max);
        for root in roots {
            let canonical = root.canonicalize()?;
            if !canonical.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a directory", canonical.display()),
                ));
            }
            let fat_backed = probe_fat_backed(&canonical);
            slots.push(Some(Drive {
                root: canonical,
                fat_backed,
            }));
        }
        Ok(DriveTable { slots })
    }

    /// Looks up the drive at `number` (0=A..25=Z). Returns `None` for
    /// out-of-range or unmapped drives — the dispatcher treats both as
    /// "unmapped drive" (`spec.md` §4.7, silently ignored).
    pub fn get(&self, number: u8) -> Option<&Drive> {
        if number < FIRST_DRIVE {
            return None;
        }
        self.slots.get((number - FIRST_DRIVE) as usize)?.as_ref()
    }

    pub fn is_mapped(&self, number: u8) -> bool {
        self.get(number).is_some()
    }

    /// Host root for `number`, or `None` if unmapped.
    pub fn root(&self, number: u8) -> Option<&Path> {
        self.get(number).map(|d| d.root.as_path())
    }
}

/// Probes whether `root` lives on a FAT filesystem by checking the
/// filesystem type `statfs` reports. Any failure is treated as "not
/// FAT-backed" — conservative, since a synthesized attribute byte is
/// always a safe fallback (`spec.md` §4.6, §9).
fn probe_fat_backed(root: &Path) -> bool {
    const MSDOS_SUPER_MAGIC: i64 = 0x4d44;
    match nix::sys::statfs::statfs(root) {
        Ok(stat) => stat.filesystem_type().0 == MSDOS_SUPER_MAGIC,
        Err(_) => false,
    }
}
