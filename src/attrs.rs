//! Attribute adapter (`spec.md` §4.6): DOS attribute byte over a host
//! inode, native on FAT mounts, synthesized otherwise.

use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use bitflags::bitflags;

use crate::time;

bitflags! {
    /// The DOS attribute byte (`spec.md` §4.6): RO/HID/SYS/VOL/DIR/ARC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DosAttr: u8 {
        const RO  = 0x01;
        const HID = 0x02;
        const SYS = 0x04;
        const VOL = 0x08;
        const DIR = 0x10;
        const ARC = 0x20;
    }
}

pub const ATTR_RO: u8 = DosAttr::RO.bits();
pub const ATTR_HID: u8 = DosAttr::HID.bits();
pub const ATTR_SYS: u8 = DosAttr::SYS.bits();
pub const ATTR_VOL: u8 = DosAttr::VOL.bits();
pub const ATTR_DIR: u8 = DosAttr::DIR.bits();
pub const ATTR_ARC: u8 = DosAttr::ARC.bits();
/// Sentinel attribute byte for "stat failed" (`spec.md` §4.6); not a real
/// combination of DOS attribute bits.
pub const ATTR_ERROR: u8 = 0xFF;

/// `{ fcbname, fattr, ftime, fsize }` (`spec.md` §3): the unit FINDFIRST,
/// FINDNEXT, GETATTR, OPEN, and CREATE all hand back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProps {
    pub fcbname: [u8; 11],
    pub fattr: u8,
    pub ftime: u32,
    pub fsize: u32,
}

impl FileProps {
    /// Serializes in wire order: fcbname, fattr, ftime (LE), fsize (LE).
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out[0..11].copy_from_slice(&self.fcbname);
        out[11] = self.fattr;
        out[12..16].copy_from_slice(&self.ftime.to_le_bytes());
        out[16..20].copy_from_slice(&self.fsize.to_le_bytes());
        out
    }
}

/// Reads attributes and size of `path` off the host filesystem, computing
/// `fattr` per `spec.md` §4.6 and `fcbname` from `dos_name`.
pub fn file_props(path: &Path, dos_name: &str, fat_backed: bool) -> FileProps {
    let fcbname = crate::names::fcb_name(dos_name);
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return FileProps {
                fcbname,
                fattr: ATTR_ERROR,
                ftime: 0,
                fsize: 0,
            }
        }
    };

    let ftime = meta.modified().map(time::pack).unwrap_or(0);

    if meta.is_dir() {
        return FileProps {
            fcbname,
            fattr: ATTR_DIR,
            ftime,
            fsize: 0,
        };
    }

    let fattr = if fat_backed {
        read_fat_attr(path).unwrap_or(ATTR_ARC)
    } else {
        ATTR_ARC
    };

    FileProps {
        fcbname,
        fattr,
        ftime,
        fsize: u32::try_from(meta.len()).unwrap_or(u32::MAX),
    }
}

// FAT_IOCTL_GET_ATTRIBUTES, from the Linux msdos/vfat driver (`_IOR('r',
// 0x10, __u32)`). Only meaningful when the backing store really is FAT;
// any other filesystem returns `ENOTTY` and we fall back to synthesized
// attributes.
nix::ioctl_read!(fat_get_attributes, b'r', 0x10, u32);

/// FAT_IOCTL_SET_ATTRIBUTES (`_IOW('r', 0x11, __u32)`), the write-through
/// counterpart of [`fat_get_attributes`] (`spec.md` §4.6, C6).
nix::ioctl_write_ptr!(fat_set_attributes, b'r', 0x11, u32);

fn read_fat_attr(path: &Path) -> Option<u8> {
    let file = std::fs::File::open(path).ok()?;
    let mut raw: u32 = 0;
    let rc = unsafe { fat_get_attributes(file.as_raw_fd(), &mut raw) };
    rc.ok()?;
    Some((raw & 0xff) as u8)
}

/// Writes `attr` through to the host FAT filesystem backing `path`
/// (`spec.md` §4.6, C6). Only meaningful when `path`'s mount really is FAT;
/// any other filesystem returns `ENOTTY`.
pub fn write_fat_attr(path: &Path, attr: u8) -> io::Result<()> {
    let file = std::fs::File::open(path)?;
    let raw: u32 = attr as u32;
    unsafe { fat_set_attributes(file.as_raw_fd(), &raw) }.map_err(io::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_path_is_error_attr() {
        let props = file_props(Path::new("/nonexistent/path/xyz"), "X.TXT", false);
        assert_eq!(props.fattr, ATTR_ERROR);
    }

    #[test]
    fn directory_has_dir_attr_and_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let props = file_props(dir.path(), "GAMES", false);
        assert_eq!(props.fattr, ATTR_DIR);
        assert_eq!(props.fsize, 0);
    }

    #[test]
    fn non_fat_file_is_synthesized_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, b"hello world").unwrap();
        let props = file_props(&path, "README.TXT", false);
        assert_eq!(props.fattr, ATTR_ARC);
        assert_eq!(props.fsize, 11);
    }

    #[test]
    fn serializes_to_20_bytes() {
        let props = FileProps {
            fcbname: *b"README  TXT",
            fattr: ATTR_ARC,
            ftime: 0x5A2F_53C0,
            fsize: 11,
        };
        let bytes = props.to_bytes();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..11], b"README  TXT");
        assert_eq!(bytes[11], ATTR_ARC);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), props.ftime);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 11);
    }
}
