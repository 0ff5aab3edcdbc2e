//! Raw-frame I/O (`spec.md` §4.1): an `AF_PACKET` socket bound to a single
//! interface in promiscuous mode, filtered to the EtherDFS EtherType.
//!
//! Opens a raw kernel-facing fd, exposes `receive`/`send`, and treats
//! `open`/`bind`/`ioctl` failure as fatal at construction time
//! (`spec.md` §4.1, §7).

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::frame::ETHER_TYPE_EDF5;

/// Maximum frame size we ever read or write (`spec.md` §4.1: "up to 2048
/// bytes" on receive).
pub const MAX_FRAME: usize = 2048;

/// A raw Ethernet socket bound to one interface, filtered to `0xEDF5`.
#[derive(Debug)]
pub struct RawSocket {
    fd: OwnedFd,
    mac: [u8; 6],
}

impl RawSocket {
    /// Opens a promiscuous, non-blocking `AF_PACKET` socket on `ifname`,
    /// filtered to [`ETHER_TYPE_EDF5`]. Any failure here is fatal at
    /// startup (`spec.md` §4.1).
    pub fn open(ifname: &str) -> io::Result<RawSocket> {
        let ethertype_be = ETHER_TYPE_EDF5.to_be();
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK,
                i32::from(ethertype_be),
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let ifindex = if_index(fd.as_raw_fd(), ifname)?;
        let mac = if_hwaddr(fd.as_raw_fd(), ifname)?;
        set_promiscuous(fd.as_raw_fd(), ifindex)?;
        bind_to_interface(fd.as_raw_fd(), ifindex, ethertype_be)?;

        Ok(RawSocket { fd, mac })
    }

    /// The interface's hardware address, exposed as this server's MAC.
    pub fn local_mac(&self) -> [u8; 6] {
        self.mac
    }

    /// Blocks (interruptibly by signal delivery, surfaced as `EINTR`) until
    /// the socket is readable or a signal arrives.
    pub fn wait_readable(&self) -> io::Result<()> {
        let borrowed: BorrowedFd = self.fd.as_fd();
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => Ok(()),
            Err(nix::errno::Errno::EINTR) => {
                Err(io::Error::from_raw_os_error(libc::EINTR))
            }
            Err(e) => Err(io::Error::from(e)),
        }
    }

    /// Receives one frame into `buf`, non-blocking. Returns `Ok(None)` on
    /// `EAGAIN`/`EWOULDBLOCK` (no datagram ready) or `EINTR` (signal).
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n >= 0 {
            return Ok(Some(n as usize));
        }
        match io::Error::last_os_error().raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) | Some(libc::EINTR) => Ok(None),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Sends one frame, best-effort (`spec.md` §4.1).
    pub fn send(&self, frame: &[u8]) -> io::Result<()> {
        let n = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// `ifreq` as used by `SIOCGIFINDEX`: name in, interface index out. We hand
/// roll this rather than lean on `libc::ifreq` — that type's `ifr_ifru`
/// union isn't exposed uniformly across `libc`'s target configurations, and
/// only these two layouts are actually needed here.
#[repr(C)]
struct IfreqIndex {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_ifindex: libc::c_int,
}

/// `ifreq` as used by `SIOCGIFHWADDR`: name in, link-layer address out.
#[repr(C)]
struct IfreqHwaddr {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_hwaddr: libc::sockaddr,
}

fn if_index(fd: RawFd, ifname: &str) -> io::Result<i32> {
    let name = CString::new(ifname)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name has NUL byte"))?;
    let mut req: IfreqIndex = unsafe { std::mem::zeroed() };
    copy_ifname(&mut req.ifr_name, &name)?;
    let rc = unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut req) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(req.ifr_ifindex)
}

fn if_hwaddr(fd: RawFd, ifname: &str) -> io::Result<[u8; 6]> {
    let name = CString::new(ifname)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name has NUL byte"))?;
    let mut req: IfreqHwaddr = unsafe { std::mem::zeroed() };
    copy_ifname(&mut req.ifr_name, &name)?;
    let rc = unsafe { libc::ioctl(fd, libc::SIOCGIFHWADDR, &mut req) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    let mut mac = [0u8; 6];
    for (i, slot) in mac.iter_mut().enumerate() {
        *slot = req.ifr_hwaddr.sa_data[i] as u8;
    }
    Ok(mac)
}

fn set_promiscuous(fd: RawFd, ifindex: i32) -> io::Result<()> {
    let mreq = libc::packet_mreq {
        mr_ifindex: ifindex,
        mr_type: libc::PACKET_MR_PROMISC as u16,
        mr_alen: 0,
        mr_address: [0; 8],
    };
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_PACKET,
            libc::PACKET_ADD_MEMBERSHIP,
            &mreq as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::packet_mreq>() as u32,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn bind_to_interface(fd: RawFd, ifindex: i32, ethertype_be: u16) -> io::Result<()> {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as u16;
    addr.sll_protocol = ethertype_be;
    addr.sll_ifindex = ifindex;
    let rc = unsafe {
        libc::bind(
            fd,
            &addr as *const _ as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_ll>() as u32,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn copy_ifname(dst: &mut [libc::c_char; libc::IFNAMSIZ], name: &CString) -> io::Result<()> {
    let bytes = name.as_bytes_with_nul();
    if bytes.len() > dst.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "interface name too long",
        ));
    }
    for (i, &b) in bytes.iter().enumerate() {
        dst[i] = b as libc::c_char;
    }
    Ok(())
}
