//! Shutdown signaling (`spec.md` §5): SIGTERM/SIGINT/SIGQUIT set a volatile
//! `AtomicBool` flag the event loop checks between iterations. No async
//! plumbing — a single-threaded server has no use for it.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Installs handlers for SIGTERM, SIGINT, and SIGQUIT that flip the shared
/// shutdown flag. Safe to call once at startup.
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGTERM, &action)?;
        signal::sigaction(Signal::SIGINT, &action)?;
        signal::sigaction(Signal::SIGQUIT, &action)?;
    }
    Ok(())
}

/// Whether a termination signal has arrived since [`install`].
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}
