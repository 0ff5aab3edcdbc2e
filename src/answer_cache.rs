//! Answer cache (`spec.md` §4.3): 16 slots keyed by client MAC, suppressing
//! re-execution of non-idempotent handlers on retransmit.

use std::time::Instant;

const SLOT_COUNT: usize = 16;

struct Entry {
    mac: [u8; 6],
    seq: u8,
    frame: Vec<u8>,
    timestamp: Instant,
}

/// Per-client memo of the last reply sent, addressed by source MAC.
pub struct AnswerCache {
    slots: Vec<Option<Entry>>,
}

impl AnswerCache {
    pub fn new() -> AnswerCache {
        AnswerCache {
            slots: (0..SLOT_COUNT).map(|_| None).collect(),
        }
    }

    /// If the stored entry for `mac` has `seq` and a non-empty frame,
    /// returns it — the caller resends without re-dispatching
    /// (`spec.md` §4.3, §8 invariant 6).
    pub fn lookup(&self, mac: [u8; 6], seq: u8) -> Option<&[u8]> {
        let entry = self.slots.iter().flatten().find(|e| e.mac == mac)?;
        if entry.seq == seq && !entry.frame.is_empty() {
            Some(&entry.frame)
        } else {
            None
        }
    }

    /// Records the outcome of handling `(mac, seq)`. `frame` empty means
    /// "ignored silently" — the entry still updates so a later byte-for-byte
    /// retransmit at the same sequence also gets ignored rather than
    /// accidentally matching a stale reply (`spec.md` §4.3).
    pub fn record(&mut self, mac: [u8; 6], seq: u8, frame: Vec<u8>) {
        let now = Instant::now();
        if let Some(slot) = self.slots.iter_mut().find(|s| matches!(s, Some(e) if e.mac == mac)) {
            *slot = Some(Entry {
                mac,
                seq,
                frame,
                timestamp: now,
            });
            return;
        }
        let victim = self.oldest_slot();
        self.slots[victim] = Some(Entry {
            mac,
            seq,
            frame,
            timestamp: now,
        });
    }

    fn oldest_slot(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.as_ref().map(|e| e.timestamp))
            .map(|(i, _)| i)
            .expect("slot table is never empty")
    }
}

impl Default for AnswerCache {
    fn default() -> AnswerCache {
        AnswerCache::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MAC_A: [u8; 6] = [0x02, 0, 0, 0, 0, 2];
    const MAC_B: [u8; 6] = [0x02, 0, 0, 0, 0, 3];

    #[test]
    fn replay_returns_stored_frame() {
        let mut cache = AnswerCache::new();
        cache.record(MAC_A, 0x42, b"reply-bytes".to_vec());
        assert_eq!(cache.lookup(MAC_A, 0x42), Some(&b"reply-bytes"[..]));
    }

    #[test]
    fn different_sequence_is_a_miss() {
        let mut cache = AnswerCache::new();
        cache.record(MAC_A, 0x42, b"reply".to_vec());
        assert!(cache.lookup(MAC_A, 0x43).is_none());
    }

    #[test]
    fn ignored_entry_never_matches() {
        let mut cache = AnswerCache::new();
        cache.record(MAC_A, 0x10, Vec::new());
        assert!(cache.lookup(MAC_A, 0x10).is_none());
    }

    #[test]
    fn distinct_macs_get_distinct_entries() {
        let mut cache = AnswerCache::new();
        cache.record(MAC_A, 1, b"a".to_vec());
        cache.record(MAC_B, 1, b"b".to_vec());
        assert_eq!(cache.lookup(MAC_A, 1), Some(&b"a"[..]));
        assert_eq!(cache.lookup(MAC_B, 1), Some(&b"b"[..]));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut cache = AnswerCache::new();
        for i in 0..SLOT_COUNT {
            let mac = [0x02, 0, 0, 0, 0, i as u8];
            cache.record(mac, 1, vec![i as u8]);
        }
        let overflow_mac = [0x02, 0, 0, 0, 0, 99];
        cache.record(overflow_mac, 1, vec![99]);
        assert_eq!(cache.lookup(overflow_mac, 1), Some(&[99u8][..]));
    }
}
