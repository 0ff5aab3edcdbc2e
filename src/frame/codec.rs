//! Parsing and emitting EDF5 frames (`spec.md` §4.2).
//!
//! A frame is well-formed iff: (a) link length >= 60; (b) if byte 52 is
//! non-zero, `60 <= byte52 <= link length` and the frame is truncated to
//! `byte52`; (c) the protocol version bits equal 2; (d) if the checksum
//! flag is set, the BSD checksum over bytes `[56..end)` matches the stored
//! value. Any violation is a silent drop — no reply, no cache update,
//! matching the client-polling-tolerance policy of `spec.md` §7.

use super::checksum::bsd_checksum;
use super::header::{RawHeader, ETHER_TYPE_EDF5, HEADER_LEN, PROTOCOL_VERSION};
use zerocopy::FromBytes;

/// A successfully decoded EDF5 request: the fixed header plus the
/// subfunction-specific payload bytes (offset 60 onward).
#[derive(Debug)]
pub struct Request<'a> {
    pub header: RawHeader,
    pub payload: &'a [u8],
}

/// Parses and validates a raw link-layer frame. Returns `None` for any
/// malformed frame (caller silently drops it).
pub fn parse_request(frame: &[u8]) -> Option<Request<'_>> {
    if frame.len() < HEADER_LEN {
        return None;
    }

    let declared_len = u16::from_le_bytes([frame[52], frame[53]]) as usize;
    let effective = if declared_len == 0 {
        frame.len()
    } else {
        if declared_len < HEADER_LEN || declared_len > frame.len() {
            return None;
        }
        declared_len
    };
    let frame = &frame[..effective];

    let header = RawHeader::read_from_bytes(&frame[..HEADER_LEN]).ok()?;

    if header.ethertype() != ETHER_TYPE_EDF5 {
        return None;
    }
    if header.protocol_version() != PROTOCOL_VERSION {
        return None;
    }
    if header.checksum_present() {
        let computed = bsd_checksum(&frame[56..]);
        if computed != header.checksum() {
            return None;
        }
    }

    Some(Request {
        header,
        payload: &frame[HEADER_LEN..],
    })
}

/// Builds the outgoing reply frame for `request`, reusing its header
/// verbatim except for the swapped/overwritten MAC addresses, the frame
/// length, and (if the request carried a checksum) a freshly computed one.
///
/// `server_mac` overwrites the source MAC; the original source MAC becomes
/// the destination. The client's sequence byte, drive+flags byte, and
/// subfunction byte are echoed unchanged (`spec.md` §4.2, invariant 1).
pub fn build_reply(request_header: &RawHeader, server_mac: [u8; 6], payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN + payload.len()];
    out[..HEADER_LEN].copy_from_slice(zerocopy::IntoBytes::as_bytes(request_header));
    out[HEADER_LEN..].copy_from_slice(payload);

    // Swap dst/src MAC, then overwrite the source with our own.
    out[0..6].copy_from_slice(&request_header.src_mac);
    out[6..12].copy_from_slice(&server_mac);

    let total_len = (HEADER_LEN + payload.len()) as u16;
    out[52..54].copy_from_slice(&total_len.to_le_bytes());

    if request_header.checksum_present() {
        let computed = bsd_checksum(&out[56..]);
        out[54..56].copy_from_slice(&computed.to_le_bytes());
        out[56] |= 0x80;
    } else {
        out[56] &= 0x7f;
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_request(checksum_flag: bool, seq: u8, drive: u8, subfn: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; HEADER_LEN + payload.len()];
        frame[0..6].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]); // dst = server
        frame[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 2]); // src = client
        frame[12..14].copy_from_slice(&ETHER_TYPE_EDF5.to_be_bytes());
        let total_len = (HEADER_LEN + payload.len()) as u16;
        frame[52..54].copy_from_slice(&total_len.to_le_bytes());
        frame[56] = PROTOCOL_VERSION | if checksum_flag { 0x80 } else { 0 };
        frame[57] = seq;
        frame[58] = drive;
        frame[59] = subfn;
        frame[HEADER_LEN..].copy_from_slice(payload);
        if checksum_flag {
            let sum = bsd_checksum(&frame[56..]);
            frame[54..56].copy_from_slice(&sum.to_le_bytes());
        }
        frame
    }

    #[test]
    fn rejects_short_frames() {
        assert!(parse_request(&[0u8; 10]).is_none());
    }

    #[test]
    fn rejects_wrong_version() {
        let mut frame = sample_request(false, 1, 2, 0, &[]);
        frame[56] = 3;
        assert!(parse_request(&frame).is_none());
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut frame = sample_request(true, 1, 2, 0, b"hi");
        *frame.last_mut().unwrap() ^= 0xff;
        assert!(parse_request(&frame).is_none());
    }

    #[test]
    fn accepts_well_formed_frame() {
        let frame = sample_request(true, 0x11, 2, 0x00, &[]);
        let req = parse_request(&frame).unwrap();
        assert_eq!(req.header.sequence, 0x11);
        assert_eq!(req.header.drive(), 2);
        assert!(req.payload.is_empty());
    }

    #[test]
    fn truncates_to_declared_length() {
        let mut frame = sample_request(false, 1, 2, 0, b"abc");
        let declared = HEADER_LEN as u16;
        frame[52..54].copy_from_slice(&declared.to_le_bytes());
        let req = parse_request(&frame).unwrap();
        assert!(req.payload.is_empty());
    }

    #[test]
    fn reply_swaps_mac_and_keeps_seq_and_drive() {
        let frame = sample_request(true, 0x42, 2, 0x16, &[]);
        let req = parse_request(&frame).unwrap();
        let reply = build_reply(&req.header, [0x02, 0, 0, 0, 0, 9], b"ok");
        assert_eq!(&reply[0..6], &[0x02, 0, 0, 0, 0, 2]); // dst = original src
        assert_eq!(&reply[6..12], &[0x02, 0, 0, 0, 0, 9]); // src = server mac
        assert_eq!(reply[57], 0x42);
        assert_eq!(reply[58], 2);
        assert_eq!(&reply[HEADER_LEN..], b"ok");
        let computed = bsd_checksum(&reply[56..]);
        let stored = u16::from_le_bytes([reply[54], reply[55]]);
        assert_eq!(computed, stored);
        assert_eq!(reply[56] & 0x80, 0x80);
    }

    #[test]
    fn replay_is_byte_identical() {
        let frame = sample_request(true, 0x42, 2, 0x17, b"create");
        let req1 = parse_request(&frame).unwrap();
        let req2 = parse_request(&frame).unwrap();
        let r1 = build_reply(&req1.header, [0x02, 0, 0, 0, 0, 9], b"reply-data");
        let r2 = build_reply(&req2.header, [0x02, 0, 0, 0, 0, 9], b"reply-data");
        assert_eq!(r1, r2);
    }
}
