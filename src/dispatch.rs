//! Request dispatcher (`spec.md` §4.7): validates the drive, routes by
//! subfunction, builds the reply payload, and picks the `AX` status.
//!
//! Every reply payload here begins with a little-endian `AX` word followed
//! by the subfunction's success-case fields (empty when the table lists
//! none). This is an implementation decision, not spelled out by the byte
//! tables in `spec.md` §4.7 — recorded in `DESIGN.md`.

use std::path::{Path, PathBuf};

use crate::attrs::{self, FileProps};
use crate::drives::DriveTable;
use crate::error::DosError;
use crate::fsdb::Fsdb;
use crate::fsops;
use crate::names::{self, Resolution};

pub mod al {
    pub const INSTALLCHK: u8 = 0x00;
    pub const RMDIR: u8 = 0x01;
    pub const MKDIR: u8 = 0x03;
    pub const CHDIR: u8 = 0x05;
    pub const CLSFIL: u8 = 0x06;
    pub const CMMTFIL: u8 = 0x07;
    pub const READFIL: u8 = 0x08;
    pub const WRITEFIL: u8 = 0x09;
    pub const LOCK: u8 = 0x0A;
    pub const UNLOCK: u8 = 0x0B;
    pub const DISKSPACE: u8 = 0x0C;
    pub const SETATTR: u8 = 0x0E;
    pub const GETATTR: u8 = 0x0F;
    pub const RENAME: u8 = 0x11;
    pub const DELETE: u8 = 0x13;
    pub const OPEN: u8 = 0x16;
    pub const CREATE: u8 = 0x17;
    pub const FINDFIRST: u8 = 0x1B;
    pub const FINDNEXT: u8 = 0x1C;
    pub const SKFMEND: u8 = 0x21;
    pub const SPOPNFIL: u8 = 0x2E;
}

/// The 32 KiB cluster size DISKSPACE reports (`spec.md` §4.7).
const CLUSTER_SIZE: u64 = 32768;
/// Cluster counts are clamped so the reported volume stays under 2 GiB.
const MAX_CLUSTERS: u64 = (1u64 << 31) / CLUSTER_SIZE - 1;

/// Everything a handler needs: which drive, which host root, the shared
/// handle cache.
pub struct Dispatcher<'a> {
    pub drives: &'a DriveTable,
    pub fsdb: &'a mut Fsdb,
}

impl<'a> Dispatcher<'a> {
    pub fn new(drives: &'a DriveTable, fsdb: &'a mut Fsdb) -> Dispatcher<'a> {
        Dispatcher { drives, fsdb }
    }

    /// Dispatches one decoded request. Returns `None` when the drive is
    /// invalid or unmapped — the caller drops the frame silently
    /// (`spec.md` §4.7).
    pub fn dispatch(&mut self, drive: u8, subfunction: u8, payload: &[u8]) -> Option<Vec<u8>> {
        let root = self.drives.root(drive)?.to_path_buf();
        let fat_backed = self.drives.get(drive)?.fat_backed;

        let reply = match subfunction {
            al::INSTALLCHK => success(&[]),
            al::RMDIR => self.rmdir(&root, payload),
            al::MKDIR => self.mkdir(&root, payload),
            al::CHDIR => self.chdir(&root, payload),
            al::CLSFIL => self.clsfil(payload),
            al::CMMTFIL => success(&[]),
            al::READFIL => self.readfil(payload),
            al::WRITEFIL => self.writefil(payload),
            al::LOCK | al::UNLOCK => success(&[]),
            al::DISKSPACE => self.diskspace(&root),
            al::SETATTR => self.setattr(&root, fat_backed, payload),
            al::GETATTR => self.getattr(&root, fat_backed, payload),
            al::RENAME => self.rename(&root, fat_backed, payload),
            al::DELETE => self.delete(&root, fat_backed, payload),
            al::OPEN => self.open(&root, fat_backed, payload),
            al::CREATE => self.create(&root, fat_backed, payload),
            al::FINDFIRST => self.findfirst(&root, fat_backed, payload),
            al::FINDNEXT => self.findnext(&root, fat_backed, payload),
            al::SKFMEND => self.skfmend(payload),
            al::SPOPNFIL => self.spopnfil(&root, fat_backed, payload),
            _ => return None, // unknown subfunction: silent drop (spec.md §7)
        };
        Some(reply)
    }

    fn handle_path(&mut self, id: u16) -> Option<PathBuf> {
        self.fsdb.lookup(id).map(Path::to_path_buf)
    }

    fn rmdir(&self, root: &Path, payload: &[u8]) -> Vec<u8> {
        let Some(name) = take_str(payload) else { return error(DosError::PathNotFound) };
        match names::resolve(root, &name) {
            Resolution::Resolved(p) => match fsops::rmdir(&p) {
                Ok(()) => success(&[]),
                Err(e) => error(DosError::from_io(&e, DosError::DiskFull)),
            },
            Resolution::Partial { .. } => error(DosError::DiskFull),
        }
    }

    fn mkdir(&self, root: &Path, payload: &[u8]) -> Vec<u8> {
        let Some(name) = take_str(payload) else { return error(DosError::PathNotFound) };
        match names::resolve(root, &name) {
            Resolution::Partial { prefix, tail } if !tail.contains('/') => {
                match fsops::mkdir(&prefix.join(tail)) {
                    Ok(()) => success(&[]),
                    Err(e) => error(DosError::from_io(&e, DosError::DiskFull)),
                }
            }
            _ => error(DosError::DiskFull),
        }
    }

    fn chdir(&self, root: &Path, payload: &[u8]) -> Vec<u8> {
        let Some(name) = take_str(payload) else { return error(DosError::PathNotFound) };
        match names::resolve(root, &name) {
            Resolution::Resolved(p) => match fsops::chdir(&p) {
                Ok(()) => success(&[]),
                Err(_) => error(DosError::PathNotFound),
            },
            Resolution::Partial { .. } => error(DosError::PathNotFound),
        }
    }

    fn clsfil(&mut self, payload: &[u8]) -> Vec<u8> {
        let _ = take_u16(payload, 0); // handle is accepted but CLSFIL always succeeds
        success(&[])
    }

    fn readfil(&mut self, payload: &[u8]) -> Vec<u8> {
        let Some(off) = take_u32(payload, 0) else { return error(DosError::AccessDenied) };
        let Some(handle) = take_u16(payload, 4) else { return error(DosError::AccessDenied) };
        let Some(len) = take_u16(payload, 6) else { return error(DosError::AccessDenied) };
        let Some(path) = self.handle_path(handle) else { return error(DosError::AccessDenied) };
        match fsops::read_at(&path, off as u64, len as usize) {
            Ok(data) => success(&data),
            Err(_) => error(DosError::AccessDenied),
        }
    }

    fn writefil(&mut self, payload: &[u8]) -> Vec<u8> {
        let Some(off) = take_u32(payload, 0) else { return error(DosError::AccessDenied) };
        let Some(handle) = take_u16(payload, 4) else { return error(DosError::AccessDenied) };
        let data = payload.get(6..).unwrap_or(&[]);
        let Some(path) = self.handle_path(handle) else { return error(DosError::AccessDenied) };
        match fsops::write_at(&path, off as u64, data) {
            Ok(n) => success(&(n as u16).to_le_bytes()),
            Err(_) => error(DosError::AccessDenied),
        }
    }

    fn diskspace(&self, root: &Path) -> Vec<u8> {
        let Ok((total, free)) = fsops::statvfs(root) else { return error(DosError::DiskFull) };
        let total_clusters = (total / CLUSTER_SIZE).min(MAX_CLUSTERS);
        let free_clusters = (free / CLUSTER_SIZE).min(total_clusters);
        // DISKSPACE's AX is a disk descriptor, not a status word (`spec.md`
        // §4.7): media descriptor in the high byte (0 — there is no real
        // FAT media byte behind a synthesized volume) and sectors-per-
        // cluster in the low byte (fixed at 1, since CLUSTER_SIZE already
        // reports the full per-cluster byte count).
        const DISK_DESCRIPTOR: u16 = 0x0001;
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&DISK_DESCRIPTOR.to_le_bytes()); // AX
        out.extend_from_slice(&(total_clusters as u16).to_le_bytes()); // BX
        out.extend_from_slice(&(CLUSTER_SIZE as u16).to_le_bytes()); // CX
        out.extend_from_slice(&(free_clusters as u16).to_le_bytes()); // DX
        out
    }

    fn setattr(&self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(&attr) = payload.first() else { return error(DosError::FileNotFound) };
        let Some(name) = take_str(payload.get(1..).unwrap_or(&[])) else {
            return error(DosError::FileNotFound);
        };
        match names::resolve(root, &name) {
            Resolution::Resolved(p) if fat_backed => match attrs::write_fat_attr(&p, attr) {
                Ok(()) => success(&[]),
                Err(_) => error(DosError::FileNotFound),
            },
            // No attribute store to write through to on a general-purpose
            // host filesystem (spec.md §4.6, C6).
            Resolution::Resolved(_) => success(&[]),
            Resolution::Partial { .. } => error(DosError::FileNotFound),
        }
    }

    fn getattr(&self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(name) = take_str(payload) else { return error(DosError::FileNotFound) };
        match names::resolve(root, &name) {
            Resolution::Resolved(p) => {
                let base = name.rsplit(['/', '\\']).next().unwrap_or(&name);
                let props = attrs::file_props(&p, base, fat_backed);
                if props.fattr == attrs::ATTR_ERROR {
                    return error(DosError::FileNotFound);
                }
                let mut out = Vec::with_capacity(9);
                out.extend_from_slice(&props.ftime.to_le_bytes());
                out.extend_from_slice(&props.fsize.to_le_bytes());
                out.push(props.fattr);
                success(&out)
            }
            Resolution::Partial { .. } => error(DosError::FileNotFound),
        }
    }

    fn rename(&self, root: &Path, _fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(&len1) = payload.first() else { return error(DosError::FileNotFound) };
        let rest = payload.get(1..).unwrap_or(&[]);
        if rest.len() < len1 as usize {
            return error(DosError::FileNotFound);
        }
        let Ok(from_name) = std::str::from_utf8(&rest[..len1 as usize]) else {
            return error(DosError::FileNotFound);
        };
        let Some(to_name) = take_str(&rest[len1 as usize..]) else {
            return error(DosError::FileNotFound);
        };

        // Deliberate: only the source path goes through the name
        // translator. The destination is a literal FCB name taken under
        // the source's own directory, not re-resolved itself (spec.md §9).
        match names::resolve(root, from_name) {
            Resolution::Resolved(from) => {
                let parent = from.parent().unwrap_or(root);
                let to = parent.join(to_name.trim_start_matches(['/', '\\']));
                match fsops::rename(&from, &to) {
                    Ok(()) => success(&[]),
                    Err(e) => error(DosError::from_io_restricted(&e, DosError::FileNotFound)),
                }
            }
            Resolution::Partial { .. } => error(DosError::FileNotFound),
        }
    }

    fn delete(&self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(name) = take_str(payload) else { return error(DosError::FileNotFound) };
        let has_mask = name.contains('?') || name.contains('*');
        if has_mask {
            let dir = root.join(name.rsplit_once(['/', '\\']).map(|(d, _)| d).unwrap_or(""));
            let pattern = name.rsplit(['/', '\\']).next().unwrap_or(&name);
            let mask = names::fcb_name(pattern);
            if glob_has_read_only_match(&dir, &mask, fat_backed) {
                return error(DosError::AccessDenied);
            }
            match fsops::delete_glob(&dir, &mask) {
                Ok(()) => success(&[]),
                Err(e) => error(DosError::from_io_restricted(&e, DosError::FileNotFound)),
            }
        } else {
            match names::resolve(root, &name) {
                Resolution::Resolved(p) => {
                    let base = name.rsplit(['/', '\\']).next().unwrap_or(&name);
                    let props = attrs::file_props(&p, base, fat_backed);
                    if props.fattr & attrs::ATTR_RO != 0 {
                        return error(DosError::AccessDenied);
                    }
                    match fsops::unlink(&p) {
                        Ok(()) => success(&[]),
                        Err(e) => error(DosError::from_io_restricted(&e, DosError::FileNotFound)),
                    }
                }
                Resolution::Partial { .. } => error(DosError::FileNotFound),
            }
        }
    }

    fn open(&mut self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(openmode) = take_u16(payload, 0) else { return error(DosError::FileNotFound) };
        let Some(name) = take_str(payload.get(2..).unwrap_or(&[])) else {
            return error(DosError::FileNotFound);
        };
        match names::resolve(root, &name) {
            Resolution::Resolved(p) => {
                let base = name.rsplit(['/', '\\']).next().unwrap_or(&name);
                let props = attrs::file_props(&p, base, fat_backed);
                let handle = self.fsdb.intern(&p);
                open_reply(&props, handle, openmode as u8)
            }
            Resolution::Partial { .. } => error(DosError::FileNotFound),
        }
    }

    fn create(&mut self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(_attr) = take_u16(payload, 0) else { return error(DosError::FileNotFound) };
        let Some(name) = take_str(payload.get(2..).unwrap_or(&[])) else {
            return error(DosError::FileNotFound);
        };
        let target = match names::resolve(root, &name) {
            Resolution::Resolved(p) => p,
            Resolution::Partial { prefix, tail } if !tail.contains('/') => prefix.join(tail),
            Resolution::Partial { .. } => return error(DosError::FileNotFound),
        };
        if fsops::create(&target).is_err() {
            return error(DosError::FileNotFound);
        }
        let base = name.rsplit(['/', '\\']).next().unwrap_or(&name);
        let props = attrs::file_props(&target, base, fat_backed);
        let handle = self.fsdb.intern(&target);
        open_reply(&props, handle, 2)
    }

    fn findfirst(&mut self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(&attr) = payload.first() else { return error(DosError::NoMoreFiles) };
        let Some(pattern) = take_str(payload.get(1..).unwrap_or(&[])) else {
            return error(DosError::NoMoreFiles);
        };
        // Opportunistic reclaim of slots idle over an hour, done in the
        // course of a scan rather than on a dedicated timer (spec.md §4.4).
        self.fsdb.evict_idle();

        let (dir, mask) = split_dir_and_mask(&pattern);
        let dir_path = match names::resolve(root, &dir) {
            Resolution::Resolved(p) => p,
            Resolution::Partial { .. } => return error(DosError::NoMoreFiles),
        };
        let dir_slot = self.fsdb.intern(&dir_path);
        let is_root = dir_path == root;
        // FINDFIRST always (re-)opens the directory: any snapshot left from
        // a previous scan of this slot is discarded (spec.md §4.4,
        // "discarded ... when ... re-opened").
        self.fsdb.clear_snapshot(dir_slot);
        let snapshot = build_snapshot(&dir_path, fat_backed);
        self.fsdb.set_snapshot(dir_slot, snapshot);

        scan_from(self.fsdb, dir_slot, 0, &mask, attr, is_root)
    }

    fn findnext(&mut self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(dir_slot) = take_u16(payload, 0) else { return error(DosError::NoMoreFiles) };
        let Some(position) = take_u16(payload, 2) else { return error(DosError::NoMoreFiles) };
        let Some(&attr) = payload.get(4) else { return error(DosError::NoMoreFiles) };
        let mask: [u8; 11] = match payload.get(5..16) {
            Some(m) => m.try_into().unwrap(),
            None => return error(DosError::NoMoreFiles),
        };

        let Some(dir_path) = self.handle_path(dir_slot) else {
            return error(DosError::NoMoreFiles);
        };
        let is_root = dir_path == root;

        if self.fsdb.snapshot(dir_slot).is_none() {
            let snapshot = build_snapshot(&dir_path, fat_backed);
            self.fsdb.set_snapshot(dir_slot, snapshot);
        }
        // FINDNEXT skips root-level dotfiles itself (spec.md §4.7), same as
        // FINDFIRST — it is not a first-call-only behavior.
        scan_from(self.fsdb, dir_slot, position as usize + 1, &mask, attr, is_root)
    }

    fn skfmend(&mut self, payload: &[u8]) -> Vec<u8> {
        let Some(offset) = payload.get(0..4).map(|b| i32::from_le_bytes(b.try_into().unwrap()))
        else {
            return error(DosError::FileNotFound);
        };
        let Some(handle) = take_u16(payload, 4) else { return error(DosError::FileNotFound) };
        let Some(path) = self.handle_path(handle) else { return error(DosError::FileNotFound) };
        let Ok(meta) = std::fs::metadata(&path) else { return error(DosError::FileNotFound) };
        let size = meta.len() as i64;
        let clamped_offset = offset.min(0) as i64;
        let new_offset = (size + clamped_offset).max(0) as u32;
        success(&new_offset.to_le_bytes())
    }

    fn spopnfil(&mut self, root: &Path, fat_backed: bool, payload: &[u8]) -> Vec<u8> {
        let Some(_attr) = take_u16(payload, 0) else { return error(DosError::FileNotFound) };
        let Some(action) = take_u16(payload, 2) else { return error(DosError::FileNotFound) };
        let Some(openmode) = take_u16(payload, 4) else { return error(DosError::FileNotFound) };
        let Some(name) = take_str(payload.get(6..).unwrap_or(&[])) else {
            return error(DosError::FileNotFound);
        };

        let resolution = names::resolve(root, &name);
        let (target, exists) = match &resolution {
            Resolution::Resolved(p) => (p.clone(), true),
            Resolution::Partial { prefix, tail } if !tail.contains('/') => {
                (prefix.join(tail), false)
            }
            Resolution::Partial { .. } => return error(DosError::FileNotFound),
        };

        let create_if_absent = action & 0x10 != 0;
        let low = action & 0x0f;

        let spopres: u16 = if !exists {
            if !create_if_absent {
                return error(DosError::FileNotFound);
            }
            if fsops::create(&target).is_err() {
                return error(DosError::FileNotFound);
            }
            2
        } else {
            let meta = std::fs::metadata(&target).ok();
            if meta.as_ref().map(|m| m.is_dir()).unwrap_or(true) {
                return error(DosError::FileNotFound);
            }
            match low {
                1 => 1,
                2 => {
                    if fsops::truncate(&target, 0).is_err() {
                        return error(DosError::FileNotFound);
                    }
                    3
                }
                _ => return error(DosError::FileNotFound),
            }
        };

        let base = name.rsplit(['/', '\\']).next().unwrap_or(&name);
        let props = attrs::file_props(&target, base, fat_backed);
        let handle = self.fsdb.intern(&target);
        let mut body = open_reply_body(&props, handle, openmode as u8);
        let mut reply = Vec::with_capacity(2 + body.len() + 2);
        reply.extend_from_slice(&0u16.to_le_bytes());
        reply.append(&mut body);
        reply.extend_from_slice(&spopres.to_le_bytes());
        reply
    }
}

fn success(extra: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + extra.len());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(extra);
    out
}

fn error(code: DosError) -> Vec<u8> {
    code.ax().to_le_bytes().to_vec()
}

fn open_reply_body(props: &FileProps, handle: u16, openmode: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + 2 + 2 + 1);
    out.extend_from_slice(&props.to_bytes());
    out.extend_from_slice(&handle.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // result
    out.push(openmode);
    out
}

fn open_reply(props: &FileProps, handle: u16, openmode: u8) -> Vec<u8> {
    let mut body = open_reply_body(props, handle, openmode);
    let mut reply = Vec::with_capacity(2 + body.len());
    reply.extend_from_slice(&0u16.to_le_bytes());
    reply.append(&mut body);
    reply
}

fn build_snapshot(dir: &Path, fat_backed: bool) -> Vec<FileProps> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name();
            let name_str = name.to_str()?;
            if name_str == "." || name_str == ".." {
                return None;
            }
            Some(attrs::file_props(&e.path(), name_str, fat_backed))
        })
        .collect()
}

/// Whether any non-directory entry in `dir` matching `mask` is marked
/// read-only — used by `DELETE` to reject a glob that would otherwise
/// unlink a read-only file (spec.md §7, AL=0x13 "5 if read-only").
fn glob_has_read_only_match(dir: &Path, mask: &[u8; 11], fat_backed: bool) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else { return false };
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
            continue;
        }
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else { continue };
        if !names::mask_matches(&names::fcb_name(name_str), mask) {
            continue;
        }
        let props = attrs::file_props(&entry.path(), name_str, fat_backed);
        if props.fattr & attrs::ATTR_RO != 0 {
            return true;
        }
    }
    false
}

fn scan_from(
    fsdb: &Fsdb,
    dir_slot: u16,
    start: usize,
    mask: &[u8; 11],
    attr: u8,
    skip_dotfiles: bool,
) -> Vec<u8> {
    let Some(snapshot) = fsdb.snapshot(dir_slot) else { return error(DosError::NoMoreFiles) };
    for (idx, props) in snapshot.iter().enumerate().skip(start) {
        if skip_dotfiles && props.fcbname[0] == b'.' {
            continue;
        }
        if !names::mask_matches(&props.fcbname, mask) {
            continue;
        }
        if !names::attr_included(props.fattr, attr) {
            continue;
        }
        let mut out = Vec::with_capacity(2 + 20 + 2 + 2);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&props.to_bytes());
        out.extend_from_slice(&dir_slot.to_le_bytes());
        out.extend_from_slice(&(idx as u16).to_le_bytes());
        return out;
    }
    error(DosError::NoMoreFiles)
}

fn split_dir_and_mask(pattern: &str) -> (String, [u8; 11]) {
    let slashed = pattern.replace('\\', "/");
    match slashed.rsplit_once('/') {
        Some((dir, leaf)) => (dir.to_string(), names::fcb_name(leaf)),
        None => (String::new(), names::fcb_name(&slashed)),
    }
}

fn take_str(payload: &[u8]) -> Option<String> {
    if payload.is_empty() {
        return None;
    }
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    Some(String::from_utf8_lossy(&payload[..end]).into_owned())
}

fn take_u16(payload: &[u8], offset: usize) -> Option<u16> {
    payload
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes(b.try_into().unwrap()))
}

fn take_u32(payload: &[u8], offset: usize) -> Option<u32> {
    payload
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn one_drive(dir: &Path) -> DriveTable {
        DriveTable::build(&[dir.to_path_buf()]).unwrap()
    }

    #[test]
    fn installchk_is_bare_success() {
        let dir = tempfile::tempdir().unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);
        let reply = d.dispatch(2, al::INSTALLCHK, &[]).unwrap();
        assert_eq!(reply, 0u16.to_le_bytes());
    }

    #[test]
    fn unmapped_drive_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);
        assert!(d.dispatch(5, al::INSTALLCHK, &[]).is_none());
    }

    #[test]
    fn getattr_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello world").unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);
        let mut payload = b"README.TXT".to_vec();
        payload.push(0);
        let reply = d.dispatch(2, al::GETATTR, &payload).unwrap();
        assert_eq!(u16::from_le_bytes([reply[0], reply[1]]), 0);
        let fsize = u32::from_le_bytes(reply[5..9].try_into().unwrap());
        assert_eq!(fsize, 11);
    }

    #[test]
    fn getattr_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);
        let mut payload = b"NOPE.TXT".to_vec();
        payload.push(0);
        let reply = d.dispatch(2, al::GETATTR, &payload).unwrap();
        assert_eq!(u16::from_le_bytes([reply[0], reply[1]]), DosError::FileNotFound.ax());
    }

    #[test]
    fn open_then_read_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello world").unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);

        let mut open_payload = 0u16.to_le_bytes().to_vec();
        open_payload.extend_from_slice(b"README.TXT\0");
        let open_reply = d.dispatch(2, al::OPEN, &open_payload).unwrap();
        let handle = u16::from_le_bytes(open_reply[22..24].try_into().unwrap());

        let mut read_payload = 0u32.to_le_bytes().to_vec();
        read_payload.extend_from_slice(&handle.to_le_bytes());
        read_payload.extend_from_slice(&5u16.to_le_bytes());
        let read_reply = d.dispatch(2, al::READFIL, &read_payload).unwrap();
        assert_eq!(&read_reply[2..], b"hello");
    }

    #[test]
    fn findfirst_then_findnext_exhausts_and_reports_no_more_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);

        let mut payload = vec![0x20u8];
        payload.extend_from_slice(b"*.*\0");
        let first = d.dispatch(2, al::FINDFIRST, &payload).unwrap();
        assert_eq!(u16::from_le_bytes([first[0], first[1]]), 0);
        let dir_slot = u16::from_le_bytes(first[22..24].try_into().unwrap());
        let position = u16::from_le_bytes(first[24..26].try_into().unwrap());

        let mut next_payload = dir_slot.to_le_bytes().to_vec();
        next_payload.extend_from_slice(&position.to_le_bytes());
        next_payload.push(0x20);
        next_payload.extend_from_slice(&[b'?'; 11]);
        let next = d.dispatch(2, al::FINDNEXT, &next_payload).unwrap();
        assert_eq!(u16::from_le_bytes([next[0], next[1]]), DosError::NoMoreFiles.ax());
    }

    #[test]
    fn rename_targets_the_source_directory_not_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.txt"), b"a").unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);

        let from = b"SUB\\A.TXT";
        let to = b"B.TXT\0";
        let mut payload = vec![from.len() as u8];
        payload.extend_from_slice(from);
        payload.extend_from_slice(to);
        let reply = d.dispatch(2, al::RENAME, &payload).unwrap();

        assert_eq!(u16::from_le_bytes([reply[0], reply[1]]), 0);
        assert!(dir.path().join("sub/B.TXT").exists());
        assert!(!dir.path().join("B.TXT").exists());
    }

    #[test]
    fn diskspace_packs_media_descriptor_into_ax() {
        let dir = tempfile::tempdir().unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);

        let reply = d.dispatch(2, al::DISKSPACE, &[]).unwrap();
        assert_eq!(u16::from_le_bytes([reply[0], reply[1]]), 0x0001);
    }

    #[test]
    fn retransmitted_create_does_not_update_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let drives = one_drive(dir.path());
        let mut fsdb = Fsdb::new();
        let mut d = Dispatcher::new(&drives, &mut fsdb);

        let mut payload = 0u16.to_le_bytes().to_vec();
        payload.extend_from_slice(b"NEW.TXT\0");
        let first = d.dispatch(2, al::CREATE, &payload).unwrap();
        assert_eq!(u16::from_le_bytes([first[0], first[1]]), 0);
        assert!(dir.path().join("NEW.TXT").exists());
        // A real retransmit is suppressed one layer up, by the answer
        // cache, before dispatch() is ever called again.
    }
}
