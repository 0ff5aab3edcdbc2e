//! Handle/directory cache — FSDB (`spec.md` §4.4): a fixed `Arena<Slot>`
//! indexed by `SlotId(u16)`, doubling as the wire file-handle space and the
//! `FINDFIRST`/`FINDNEXT` directory-token space (`spec.md` §9).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::attrs::FileProps;

/// Slot 0xFFFF is reserved as the "no slot" sentinel (`spec.md` §3).
pub const NO_SLOT: u16 = 0xFFFF;
const SLOT_COUNT: usize = 0x10000;
const IDLE_LIMIT: Duration = Duration::from_secs(3600);

struct Slot {
    path: Option<PathBuf>,
    last_used: Instant,
    dir_snapshot: Option<Vec<FileProps>>,
}

impl Slot {
    fn empty(now: Instant) -> Slot {
        Slot {
            path: None,
            last_used: now,
            dir_snapshot: None,
        }
    }
}

/// The process-wide handle/directory cache. One instance lives for the
/// lifetime of the event loop (`spec.md` §3, §5).
pub struct Fsdb {
    slots: Vec<Slot>,
}

impl Fsdb {
    pub fn new() -> Fsdb {
        let now = Instant::now();
        let mut slots = Vec::with_capacity(SLOT_COUNT - 1);
        slots.resize_with(SLOT_COUNT - 1, || Slot::empty(now));
        Fsdb { slots }
    }

    /// Returns the existing slot for `path`, or allocates one: first empty
    /// slot, falling back to LRU eviction (`spec.md` §4.4).
    pub fn intern(&mut self, path: &Path) -> u16 {
        let now = Instant::now();

        if let Some(id) = self.find(path) {
            self.slots[id as usize].last_used = now;
            return id;
        }

        let id = self
            .slots
            .iter()
            .position(|s| s.path.is_none())
            .unwrap_or_else(|| self.oldest_slot());

        self.slots[id] = Slot {
            path: Some(path.to_path_buf()),
            last_used: now,
            dir_snapshot: None,
        };
        id as u16
    }

    /// The path currently held in `id`, or `None` for an empty or
    /// out-of-range slot.
    pub fn lookup(&mut self, id: u16) -> Option<&Path> {
        if id == NO_SLOT {
            return None;
        }
        let slot = self.slots.get_mut(id as usize)?;
        if slot.path.is_some() {
            slot.last_used = Instant::now();
        }
        slot.path.as_deref()
    }

    pub fn snapshot(&self, id: u16) -> Option<&[FileProps]> {
        self.slots.get(id as usize)?.dir_snapshot.as_deref()
    }

    pub fn set_snapshot(&mut self, id: u16, entries: Vec<FileProps>) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            slot.dir_snapshot = Some(entries);
        }
    }

    pub fn clear_snapshot(&mut self, id: u16) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            slot.dir_snapshot = None;
        }
    }

    /// Frees every slot idle longer than an hour. Called opportunistically
    /// during a scan, not on every request (`spec.md` §4.4).
    pub fn evict_idle(&mut self) {
        let now = Instant::now();
        for slot in &mut self.slots {
            if slot.path.is_some() && now.duration_since(slot.last_used) > IDLE_LIMIT {
                slot.path = None;
                slot.dir_snapshot = None;
            }
        }
    }

    fn find(&self, path: &Path) -> Option<u16> {
        self.slots
            .iter()
            .position(|s| s.path.as_deref() == Some(path))
            .map(|i| i as u16)
    }

    fn oldest_slot(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.last_used)
            .map(|(i, _)| i)
            .expect("slot table is never empty")
    }
}

impl Default for Fsdb {
    fn default() -> Fsdb {
        Fsdb::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intern_is_stable_until_eviction() {
        let mut fsdb = Fsdb::new();
        let a = fsdb.intern(Path::new("/tmp/a"));
        let b = fsdb.intern(Path::new("/tmp/a"));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_paths_get_distinct_slots() {
        let mut fsdb = Fsdb::new();
        let a = fsdb.intern(Path::new("/tmp/a"));
        let b = fsdb.intern(Path::new("/tmp/b"));
        assert_ne!(a, b);
    }

    #[test]
    fn lookup_returns_none_for_empty_slot() {
        let mut fsdb = Fsdb::new();
        assert!(fsdb.lookup(0).is_none());
        assert!(fsdb.lookup(NO_SLOT).is_none());
    }

    #[test]
    fn snapshot_round_trips() {
        let mut fsdb = Fsdb::new();
        let id = fsdb.intern(Path::new("/tmp/dir"));
        assert!(fsdb.snapshot(id).is_none());
        fsdb.set_snapshot(id, vec![]);
        assert_eq!(fsdb.snapshot(id), Some(&[][..]));
        fsdb.clear_snapshot(id);
        assert!(fsdb.snapshot(id).is_none());
    }
}
