//! EDF5 frame codec (`spec.md` §4.2): header layout, BSD checksum, and
//! request/reply (de)serialization.

mod checksum;
mod codec;
mod header;

pub use checksum::bsd_checksum;
pub use codec::{build_reply, parse_request, Request};
pub use header::{RawHeader, ETHER_TYPE_EDF5, HEADER_LEN, MAC_LEN, PROTOCOL_VERSION};
