//! The event loop (`spec.md` §5): single-threaded, cooperative, one raw
//! socket. Blocking receive, retry on transient errors, exit on fatal ones —
//! no thread pool, since a single-client DOS redirector has no use for one.

use log::{debug, error, info, trace};

use crate::answer_cache::AnswerCache;
use crate::dispatch::Dispatcher;
use crate::drives::DriveTable;
use crate::frame;
use crate::fsdb::Fsdb;
use crate::net::{RawSocket, MAX_FRAME};
use crate::signal;

/// Runs the event loop until a termination signal is observed. Returns
/// once shutdown has been requested and the current iteration drains.
pub fn run(socket: &RawSocket, drives: &DriveTable) {
    let mut fsdb = Fsdb::new();
    let mut cache = AnswerCache::new();
    let server_mac = socket.local_mac();
    let mut buf = vec![0u8; MAX_FRAME];

    info!("event loop starting on mac {:02x?}", server_mac);

    while !signal::shutdown_requested() {
        if let Err(e) = socket.wait_readable() {
            if e.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            error!("poll failed: {e}");
            break;
        }

        match socket.recv(&mut buf) {
            Ok(Some(n)) => handle_frame(&buf[..n], socket, server_mac, drives, &mut fsdb, &mut cache),
            Ok(None) => continue,
            Err(e) => {
                error!("recv failed: {e}");
                break;
            }
        }
    }

    info!("shutdown requested, event loop exiting");
}

fn handle_frame(
    frame: &[u8],
    socket: &RawSocket,
    server_mac: [u8; 6],
    drives: &DriveTable,
    fsdb: &mut Fsdb,
    cache: &mut AnswerCache,
) {
    let Some(req) = frame::parse_request(frame) else {
        trace!("dropped malformed frame ({} bytes)", frame.len());
        return;
    };

    let client_mac = req.header.src_mac;
    let seq = req.header.sequence;

    if let Some(cached) = cache.lookup(client_mac, seq) {
        trace!("replaying cached reply for seq {seq:#x}");
        let _ = socket.send(cached);
        return;
    }

    let mut dispatcher = Dispatcher::new(drives, fsdb);
    let outcome = dispatcher.dispatch(req.header.drive(), req.header.subfunction, req.payload);

    let Some(payload) = outcome else {
        debug!(
            "dropping request for unmapped/invalid drive {}",
            req.header.drive()
        );
        cache.record(client_mac, seq, Vec::new());
        return;
    };

    let reply = frame::build_reply(&req.header, server_mac, &payload);
    if let Err(e) = socket.send(&reply) {
        debug!("send failed: {e}");
    }
    cache.record(client_mac, seq, reply);
}
