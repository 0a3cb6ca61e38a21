//! Non-blocking TCP connect on unix.

use std::net::SocketAddrV4;
use std::os::fd::AsRawFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, SockaddrIn};
use tracing::debug;

use crate::error::{Error, Result};

/// Put a SYN on the wire towards `target` and return immediately.
///
/// The connect result is not inspected. The socket is closed when this
/// function returns, on every path.
pub(super) fn send_syn(target: SocketAddrV4) -> Result<()> {
    let fd = socket(AddressFamily::Inet, SockType::Stream, SockFlag::empty(), None)
        .map_err(|e| Error::TransportFailure(format!("socket: {}", e)))?;

    let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)
        .map_err(|e| Error::TransportFailure(format!("fcntl: {}", e)))?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))
        .map_err(|e| Error::TransportFailure(format!("fcntl: {}", e)))?;

    match connect(fd.as_raw_fd(), &SockaddrIn::from(target)) {
        Ok(()) | Err(Errno::EINPROGRESS) => debug!(%target, "TCP knock sent"),
        Err(e) => debug!(%target, error = %e, "TCP knock connect returned early"),
    }

    Ok(())
}
