//! EDF5 frame header layout (`spec.md` §4.2, offsets 0..60 of the raw
//! Ethernet frame). Decoded with `zerocopy` rather than hand-rolled cursor
//! arithmetic.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Ethernet MAC address length.
pub const MAC_LEN: usize = 6;
/// EtherType value EtherDFS frames are filtered on.
pub const ETHER_TYPE_EDF5: u16 = 0xEDF5;
/// Length of the fixed EDF5 header preceding the request/reply payload.
pub const HEADER_LEN: usize = 60;
/// Required protocol version (low 7 bits of byte 56).
pub const PROTOCOL_VERSION: u8 = 2;

/// Raw, byte-exact view of the 60-byte EDF5 header.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RawHeader {
    pub dst_mac: [u8; MAC_LEN],
    pub src_mac: [u8; MAC_LEN],
    /// Big-endian per Ethernet, should equal [`ETHER_TYPE_EDF5`].
    pub ethertype: [u8; 2],
    /// Opaque pass-through bytes, not interpreted by the server.
    pub opaque: [u8; 38],
    /// Total EDF5 frame length, little-endian; 0 means "use link length".
    pub frame_len: [u8; 2],
    /// BSD checksum, little-endian, valid iff bit 7 of `flags` is set.
    pub checksum: [u8; 2],
    /// Bits 0..6 = protocol version (must be 2); bit 7 = checksum-present.
    pub flags: u8,
    /// Per-client sequence byte, echoed back verbatim in the reply.
    pub sequence: u8,
    /// Low 5 bits = drive number (0=A..25=Z); high 3 bits = request flags.
    pub drive_and_flags: u8,
    /// Subfunction opcode (AL register in the original DOS redirector).
    pub subfunction: u8,
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == HEADER_LEN);

impl RawHeader {
    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes(self.ethertype)
    }

    pub fn frame_len(&self) -> u16 {
        u16::from_le_bytes(self.frame_len)
    }

    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes(self.checksum)
    }

    pub fn protocol_version(&self) -> u8 {
        self.flags & 0x7f
    }

    pub fn checksum_present(&self) -> bool {
        self.flags & 0x80 != 0
    }

    /// The drive number (0=A..25=Z) from the low 5 bits of byte 58.
    pub fn drive(&self) -> u8 {
        self.drive_and_flags & 0x1f
    }

    /// The 3 high bits of byte 58, passed through unopinionated.
    pub fn request_flags(&self) -> u8 {
        (self.drive_and_flags >> 5) & 0x07
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn size_is_60_bytes() {
        assert_eq!(std::mem::size_of::<RawHeader>(), HEADER_LEN);
    }

    #[test]
    fn field_accessors() {
        let mut raw = [0u8; HEADER_LEN];
        raw[56] = 0x82; // version 2, checksum present
        raw[57] = 0x11;
        raw[58] = (1 << 5) | 2; // request_flags=1, drive=2 (C:)
        raw[59] = 0x16;
        let header = RawHeader::read_from_bytes(&raw).unwrap();
        assert_eq!(header.protocol_version(), 2);
        assert!(header.checksum_present());
        assert_eq!(header.sequence, 0x11);
        assert_eq!(header.drive(), 2);
        assert_eq!(header.request_flags(), 1);
        assert_eq!(header.subfunction, 0x16);
    }
}
