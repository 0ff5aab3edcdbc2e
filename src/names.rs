//! DOS↔host name translation (`spec.md` §4.5): FCB canonicalization, `?`
//! mask matching, and component-wise path resolution against a
//! case-sensitive host tree.

use std::path::{Path, PathBuf};

use crate::attrs::DosAttr;

/// Bits an entry must share with the query to be hidden from it.
const HIDE_SET: DosAttr = DosAttr::HID.union(DosAttr::SYS).union(DosAttr::DIR);

/// The outcome of resolving a DOS virtual path against a host root
/// (`spec.md` §9, replacing `shorttolong`'s mixed success/partial buffer
/// with a sum type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every component matched an existing host entry.
    Resolved(PathBuf),
    /// Components up to `prefix` matched; `tail` (still `/`-joined DOS
    /// components) did not. Usable as a create target; not as a read target.
    Partial { prefix: PathBuf, tail: String },
}

impl Resolution {
    pub fn resolved(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(p) => Some(p),
            Resolution::Partial { .. } => None,
        }
    }
}

/// Canonicalizes a DOS name (one path component, no separators) into its
/// 11-byte FCB form (`spec.md` §4.5).
pub fn fcb_name(name: &str) -> [u8; 11] {
    let mut out = [b' '; 11];
    let bytes = name.as_bytes();

    let mut dots = 0;
    while dots < bytes.len() && dots < out.len() && bytes[dots] == b'.' {
        out[dots] = b'.';
        dots += 1;
    }
    if dots > 0 {
        return out;
    }

    let dot = bytes.iter().position(|&b| b == b'.');
    let (base, ext) = match dot {
        Some(p) => (&bytes[..p], &bytes[p + 1..]),
        None => (bytes, &b""[..]),
    };

    let mut i = 0;
    for &b in base {
        if b == b' ' {
            continue;
        }
        if i >= 8 {
            break;
        }
        out[i] = b.to_ascii_uppercase();
        i += 1;
    }
    let mut j = 0;
    for &b in ext {
        if b == b' ' {
            continue;
        }
        if j >= 3 {
            break;
        }
        out[8 + j] = b.to_ascii_uppercase();
        j += 1;
    }
    out
}

/// `?` in `mask` matches any byte at that position; all other positions
/// must match case-insensitively (`spec.md` §4.5).
pub fn mask_matches(fcb: &[u8; 11], mask: &[u8; 11]) -> bool {
    fcb.iter()
        .zip(mask.iter())
        .all(|(&f, &m)| m == b'?' || m.eq_ignore_ascii_case(&f))
}

/// Whether an entry with `entry_attr` is visible to a find query carrying
/// `query_attr` (`spec.md` §4.5). Volume-label queries are a distinct mode:
/// they return only entries carrying [`DosAttr::VOL`].
pub fn attr_included(entry_attr: u8, query_attr: u8) -> bool {
    let entry = DosAttr::from_bits_truncate(entry_attr);
    let query = DosAttr::from_bits_truncate(query_attr);
    if query.contains(DosAttr::VOL) {
        return entry.contains(DosAttr::VOL);
    }
    (entry & HIDE_SET) & !query == DosAttr::empty()
}

/// Resolves a DOS path (drive prefix already stripped by the caller is not
/// required — this strips it too) against `root`, matching one component
/// at a time via FCB comparison against the host's real, case-sensitive
/// entries (`spec.md` §4.5).
pub fn resolve(root: &Path, dos_path: &str) -> Resolution {
    let stripped = strip_drive_prefix(dos_path);
    let slashed = stripped.replace('\\', "/");
    let components: Vec<&str> = slashed.split('/').filter(|c| !c.is_empty()).collect();

    let mut prefix = root.to_path_buf();
    for (idx, comp) in components.iter().enumerate() {
        let has_more = idx + 1 < components.len();
        let target = fcb_name(comp);
        match find_matching_entry(&prefix, &target, has_more) {
            Some(real_name) => prefix.push(real_name),
            None => {
                let tail = components[idx..].join("/");
                return Resolution::Partial { prefix, tail };
            }
        }
    }
    Resolution::Resolved(prefix)
}

fn strip_drive_prefix(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[2..]
    } else {
        path
    }
}

fn find_matching_entry(dir: &Path, target_fcb: &[u8; 11], must_be_dir: bool) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name_str = name.to_str()?;
        if name_str == "." || name_str == ".." {
            continue;
        }
        if &fcb_name(name_str) != target_fcb {
            continue;
        }
        if must_be_dir {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
        }
        return Some(name_str.to_string());
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::attrs::{ATTR_DIR, ATTR_HID, ATTR_VOL};

    #[test]
    fn fcb_examples_from_spec() {
        assert_eq!(&fcb_name("foo.txt"), b"FOO     TXT");
        assert_eq!(&fcb_name("."), b".          ");
        assert_eq!(&fcb_name(".."), b"..         ");
        assert_eq!(&fcb_name("longname.extensn"), b"LONGNAMEEXT");
    }

    #[test]
    fn mask_wildcard_matches_any_byte() {
        let fcb = fcb_name("readme.txt");
        let all_wild = [b'?'; 11];
        assert!(mask_matches(&fcb, &all_wild));
    }

    #[test]
    fn mask_is_case_insensitive() {
        let fcb = fcb_name("readme.txt");
        let mut mask = fcb_name("readme.txt");
        mask[0] = b'r'; // lowercase in mask, fcb is uppercase
        assert!(mask_matches(&fcb, &mask));
    }

    #[test]
    fn attr_query_zero_excludes_dirs_and_hidden() {
        assert!(attr_included(0x20, 0x00)); // plain archive file
        assert!(!attr_included(ATTR_DIR, 0x00));
        assert!(!attr_included(ATTR_HID, 0x00));
    }

    #[test]
    fn attr_query_dir_includes_files_and_dirs() {
        assert!(attr_included(0x20, ATTR_DIR));
        assert!(attr_included(ATTR_DIR, ATTR_DIR));
    }

    #[test]
    fn volume_label_query_is_exclusive() {
        assert!(attr_included(ATTR_VOL, ATTR_VOL));
        assert!(!attr_included(0x20, ATTR_VOL));
        assert!(!attr_included(ATTR_DIR, ATTR_VOL));
    }

    #[test]
    fn resolve_partial_on_missing_component() {
        let dir = tempfile::tempdir().unwrap();
        let res = resolve(dir.path(), "NOPE.TXT");
        match res {
            Resolution::Partial { tail, .. } => assert_eq!(tail, "NOPE.TXT"),
            Resolution::Resolved(_) => panic!("expected partial resolution"),
        }
    }

    #[test]
    fn resolve_matches_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.TXT"), b"hi").unwrap();
        let res = resolve(dir.path(), "readme.txt");
        assert_eq!(res.resolved().unwrap(), dir.path().join("README.TXT"));
    }
}
