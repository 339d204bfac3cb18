//! Owned socket endpoints.
//!
//! An [`Endpoint`] owns exactly one OS socket descriptor and, once bound, the
//! filesystem entry it created. Dropping the endpoint closes the descriptor
//! and removes that entry.
//!
//! ```no_run
//! use udsock_core::{Domain, Endpoint, SocketType};
//!
//! let mut server = Endpoint::new(Domain::Unix, SocketType::Stream)?;
//! server.bind("/tmp/example.sock")?;
//! server.listen(10)?;
//!
//! let mut client = Endpoint::new(Domain::Unix, SocketType::Stream)?;
//! client.connect("/tmp/example.sock")?;
//! client.send_all(&42i32.to_ne_bytes())?;
//!
//! let conn = server.accept()?.expect("blocking accept always yields");
//! let mut buf = [0u8; 4];
//! conn.recv_all(&mut buf)?;
//! assert_eq!(i32::from_ne_bytes(buf), 42);
//! # Ok::<(), udsock_core::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::kind::{Domain, Kind, MAX_PATH_LEN, SocketFlags, SocketType, TransferFlags};
use nix::sys::socket::{MsgFlags, UnixAddr};
use socket2::{SockAddr, Socket};
use std::fmt;
use std::io;
use std::net::Shutdown;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Handshake value meaning "acknowledged". Sent in host byte order, so both
/// parties must share an architecture.
pub const ACK_MAGIC: u16 = 0xACDC;

/// Address of the peer behind an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddr {
    /// The peer never bound a name (the usual case for unix clients).
    Unnamed,
    Path(PathBuf),
    Inet(std::net::SocketAddr),
}

impl PeerAddr {
    fn from_accepted(socket: &Socket, addr: &SockAddr) -> Self {
        if let Some(inet) = addr.as_socket() {
            return Self::Inet(inet);
        }
        if addr.domain() != socket2::Domain::UNIX {
            return Self::Unnamed;
        }
        match nix::sys::socket::getpeername::<UnixAddr>(socket.as_raw_fd()) {
            Ok(unix) => unix
                .path()
                .map_or(Self::Unnamed, |path| Self::Path(path.to_path_buf())),
            Err(_) => Self::Unnamed,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unnamed => f.write_str("(unnamed)"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Inet(addr) => write!(f, "{addr}"),
        }
    }
}

/// One socket descriptor plus the filesystem path it claimed, if any.
///
/// `socket` is `None` once the descriptor has been released; every I/O
/// operation on a released endpoint fails with [`Error::Closed`].
#[derive(Debug)]
pub struct Endpoint {
    socket: Option<Socket>,
    domain: Domain,
    kind: Kind,
    protocol: i32,
    bound_path: Option<PathBuf>,
    peer_path: Option<PathBuf>,
}

impl Endpoint {
    /// Allocate a new descriptor with the default protocol.
    pub fn new(domain: Domain, kind: impl Into<Kind>) -> Result<Self> {
        Self::with_protocol(domain, kind, 0)
    }

    pub fn with_protocol(domain: Domain, kind: impl Into<Kind>, protocol: i32) -> Result<Self> {
        let kind = kind.into();
        let socket = Socket::new_raw(
            domain.into(),
            socket2::Type::from(kind.socket_type().as_raw()),
            Some(socket2::Protocol::from(protocol)),
        )
        .map_err(|err| Error::resource("socket creation failed", err))?;
        apply_flags(&socket, kind.flags())
            .map_err(|err| Error::resource("applying socket flags failed", err))?;

        let endpoint = Self::from_socket(socket, domain, kind, protocol);
        tracing::debug!(%domain, %kind, protocol, "Created socket <{endpoint}>");
        Ok(endpoint)
    }

    /// A connected pair of unix endpoints, useful for in-process peers.
    pub fn pair(kind: impl Into<Kind>) -> Result<(Self, Self)> {
        let kind = kind.into();
        let (a, b) = Socket::pair_raw(
            socket2::Domain::UNIX,
            socket2::Type::from(kind.socket_type().as_raw()),
            None,
        )
        .map_err(|err| Error::resource("socketpair creation failed", err))?;
        for socket in [&a, &b] {
            apply_flags(socket, kind.flags())
                .map_err(|err| Error::resource("applying socket flags failed", err))?;
        }

        let a = Self::from_socket(a, Domain::Unix, kind, 0);
        let b = Self::from_socket(b, Domain::Unix, kind, 0);
        tracing::debug!(%kind, "Created socket pair <{a}> <{b}>");
        Ok((a, b))
    }

    fn from_socket(socket: Socket, domain: Domain, kind: Kind, protocol: i32) -> Self {
        Self {
            socket: Some(socket),
            domain,
            kind,
            protocol,
            bound_path: None,
            peer_path: None,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn socket_type(&self) -> SocketType {
        self.kind.socket_type()
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    /// The path this endpoint bound and will remove on drop.
    pub fn bound_path(&self) -> Option<&Path> {
        self.bound_path.as_deref()
    }

    /// The path this endpoint connected to.
    pub fn peer_path(&self) -> Option<&Path> {
        self.peer_path.as_deref()
    }

    /// The descriptor number, or `None` once closed.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn is_valid(&self) -> bool {
        self.socket.is_some()
    }

    fn socket(&self) -> Result<&Socket> {
        self.socket.as_ref().ok_or(Error::Closed)
    }

    /// Release the descriptor.
    ///
    /// Returns `true` when the endpoint was already closed or the release
    /// succeeded. A failed release is logged, not returned as an error; the
    /// endpoint counts as closed either way.
    pub fn close(&mut self) -> bool {
        let Some(socket) = self.socket.take() else {
            return true;
        };
        let fd = socket.into_raw_fd();
        // Not retried on EINTR: Linux has already released the descriptor.
        match nix::unistd::close(fd) {
            Ok(()) => {
                tracing::debug!(fd, "Closed socket <{fd}>");
                true
            }
            Err(errno) => {
                tracing::error!(fd, %errno, "Closing socket <{fd}> failed: {}", errno.desc());
                false
            }
        }
    }

    /// Claim `path` in the filesystem and bind the descriptor to it.
    pub fn bind(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let addr = self.path_address(path)?;
        let socket = self.socket()?;
        retry_interrupted(|| socket.bind(&addr)).map_err(|err| {
            Error::resource(
                format!(
                    "Binding socket '{}' to '{}' failed",
                    socket.as_raw_fd(),
                    path.display()
                ),
                err,
            )
        })?;

        self.bound_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Bound socket <{self}>");
        Ok(())
    }

    /// Mark the endpoint passive with room for `backlog` pending connections.
    pub fn listen(&self, backlog: i32) -> Result<()> {
        let socket = self.socket()?;
        socket.listen(backlog).map_err(|err| {
            Error::resource(
                format!("Listening on socket '{}' failed", socket.as_raw_fd()),
                err,
            )
        })?;
        tracing::debug!(backlog, "Listening on socket <{self}>");
        Ok(())
    }

    /// Wait for an inbound connection.
    ///
    /// Returns `Ok(None)` when the listener is non-blocking and nothing is
    /// queued. The accepted endpoint copies this endpoint's domain, kind and
    /// protocol, and the kind's flags are applied to the new descriptor.
    pub fn accept(&self) -> Result<Option<Endpoint>> {
        Ok(self.accept_with_addr()?.map(|(endpoint, _)| endpoint))
    }

    /// Like [`Endpoint::accept`], also reporting the peer's address.
    pub fn accept_with_addr(&self) -> Result<Option<(Endpoint, PeerAddr)>> {
        let listener = self.socket()?;
        let (socket, addr) = match retry_interrupted(|| listener.accept()) {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!("No pending connection on socket <{self}>");
                return Ok(None);
            }
            Err(err) => {
                return Err(Error::resource(
                    format!("Accepting on socket '{}' failed", listener.as_raw_fd()),
                    err,
                ));
            }
        };
        apply_flags(&socket, self.kind.flags())
            .map_err(|err| Error::resource("applying socket flags failed", err))?;

        let peer = PeerAddr::from_accepted(&socket, &addr);
        let accepted = Self::from_socket(socket, self.domain, self.kind, self.protocol);
        tracing::debug!(%peer, "Accepted socket <{accepted}> on socket <{self}>");
        Ok(Some((accepted, peer)))
    }

    /// Connect to the endpoint bound at `path`.
    pub fn connect(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let addr = self.path_address(path)?;
        let socket = self.socket()?;
        retry_interrupted(|| socket.connect(&addr)).map_err(|err| {
            Error::resource(
                format!(
                    "Connecting socket '{}' to '{}' failed",
                    socket.as_raw_fd(),
                    path.display()
                ),
                err,
            )
        })?;

        self.peer_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Connected socket <{self}>");
        Ok(())
    }

    fn path_address(&self, path: &Path) -> Result<SockAddr> {
        if !self.domain.is_path_addressed() {
            return Err(Error::InvalidArgument(format!(
                "{} sockets cannot be addressed by filesystem path",
                self.domain
            )));
        }
        let len = path.as_os_str().len();
        if len == 0 {
            return Err(Error::InvalidArgument("Socket path is empty".to_string()));
        }
        if len >= MAX_PATH_LEN {
            return Err(Error::InvalidArgument(format!(
                "Socket path is too long: {len} bytes, limit is {}",
                MAX_PATH_LEN - 1
            )));
        }
        SockAddr::unix(path).map_err(|err| {
            Error::InvalidArgument(format!("Socket path '{}' rejected: {err}", path.display()))
        })
    }

    /// Switch blocking mode after creation; the endpoint's kind follows.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        let socket = self.socket()?;
        socket
            .set_nonblocking(nonblocking)
            .map_err(|err| Error::resource("changing non-blocking mode failed", err))?;
        self.kind = if nonblocking {
            self.kind.with(SocketFlags::NONBLOCK)
        } else {
            self.kind.without(SocketFlags::NONBLOCK)
        };
        Ok(())
    }

    /// Shut down one or both directions so the peer observes end of stream.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        let socket = self.socket()?;
        socket.shutdown(how).map_err(|err| {
            Error::resource(
                format!("Shutting down socket '{}' failed", socket.as_raw_fd()),
                err,
            )
        })
    }

    pub fn send_all(&self, data: &[u8]) -> Result<()> {
        self.send_all_with_flags(data, TransferFlags::empty())
    }

    /// Send every byte of `data`, looping over partial sends.
    ///
    /// An error on any attempt aborts the whole transfer; how much got
    /// through before it is not reported.
    pub fn send_all_with_flags(&self, data: &[u8], flags: TransferFlags) -> Result<()> {
        let fd = self.socket()?.as_raw_fd();
        let msg_flags = flags.to_msg_flags();
        let total = data.len();
        let mut sent = 0;

        while sent < total {
            let n = retry_interrupted(|| os_send(fd, &data[sent..], msg_flags)).map_err(|err| {
                Error::resource(format!("Sending data to socket <{self}> failed"), err)
            })?;
            sent += n;
            tracing::debug!(sent, total, "Sent {sent}/{total} on socket <{self}>");
        }
        Ok(())
    }

    pub fn recv_all(&self, buf: &mut [u8]) -> Result<()> {
        self.recv_all_with_flags(buf, TransferFlags::empty())
    }

    /// Fill all of `buf`, looping over partial receives.
    ///
    /// A zero-length read before `buf` is full means the peer shut down its
    /// side; that ends the transfer with [`Error::ConnectionClosed`].
    ///
    /// [`TransferFlags::PEEK`] must be combined with
    /// [`TransferFlags::WAITALL`]: a peek never consumes data, so the whole
    /// buffer is peeked from the head of the queue in one call.
    pub fn recv_all_with_flags(&self, buf: &mut [u8], flags: TransferFlags) -> Result<()> {
        if flags.contains(TransferFlags::PEEK) {
            return self.peek_all(buf, flags);
        }
        let fd = self.socket()?.as_raw_fd();
        let msg_flags = flags.to_msg_flags();
        let total = buf.len();
        let mut received = 0;

        while received < total {
            let n = retry_interrupted(|| os_recv(fd, &mut buf[received..], msg_flags))
                .map_err(|err| {
                    Error::resource(format!("Receiving data from socket <{self}> failed"), err)
                })?;
            if n == 0 {
                tracing::debug!(
                    received,
                    total,
                    "Peer closed socket <{self}> after {received}/{total}"
                );
                return Err(Error::ConnectionClosed {
                    transferred: received,
                    expected: total,
                });
            }
            received += n;
            tracing::debug!(received, total, "Received {received}/{total} on socket <{self}>");
        }
        Ok(())
    }

    fn peek_all(&self, buf: &mut [u8], flags: TransferFlags) -> Result<()> {
        if !flags.contains(TransferFlags::WAITALL) {
            return Err(Error::InvalidArgument(
                "PEEK requires WAITALL for a full-buffer receive".to_string(),
            ));
        }
        let fd = self.socket()?.as_raw_fd();
        let msg_flags = flags.to_msg_flags();
        let total = buf.len();
        let mut peeked = 0;

        while peeked < total {
            let n = retry_interrupted(|| os_recv(fd, buf, msg_flags)).map_err(|err| {
                Error::resource(format!("Peeking data from socket <{self}> failed"), err)
            })?;
            // A short peek that did not grow means the peer stopped sending.
            if n <= peeked && n < total {
                tracing::debug!(
                    received = n,
                    total,
                    "Peer closed socket <{self}> after {n}/{total}"
                );
                return Err(Error::ConnectionClosed {
                    transferred: n,
                    expected: total,
                });
            }
            peeked = n;
            tracing::debug!(received = n, total, "Peeked {n}/{total} on socket <{self}>");
        }
        Ok(())
    }

    pub fn send_ack(&self) -> Result<()> {
        self.send_all(&ACK_MAGIC.to_ne_bytes())?;
        tracing::debug!("Sent ack {ACK_MAGIC:#06x} to socket <{self}>");
        Ok(())
    }

    /// Read one handshake value and require it to be [`ACK_MAGIC`].
    pub fn recv_ack(&self) -> Result<()> {
        let mut raw = [0u8; 2];
        self.recv_all(&mut raw)?;
        let received = u16::from_ne_bytes(raw);

        if received != ACK_MAGIC {
            tracing::debug!(
                "Received incorrect ack {received:#06x} instead of {ACK_MAGIC:#06x} from socket <{self}>"
            );
            return Err(Error::AckMismatch {
                received,
                expected: ACK_MAGIC,
            });
        }

        tracing::debug!("Received ack {ACK_MAGIC:#06x} from socket <{self}>");
        Ok(())
    }

    /// Identity used in log lines; same as `Display`.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_fd() {
            Some(fd) => write!(f, "fd {fd}")?,
            None => f.write_str("closed")?,
        }
        #[cfg(debug_assertions)]
        write!(f, " | ptr {:p}", self)?;
        if let Some(path) = &self.bound_path {
            write!(f, " | path '{}'", path.display())?;
        }
        if let Some(path) = &self.peer_path {
            write!(f, " | peer '{}'", path.display())?;
        }
        Ok(())
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
        if let Some(path) = self.bound_path.take() {
            tracing::debug!(path = %path.display(), "Removing socket '{}' from filesystem", path.display());
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), %err, "Removing socket path failed");
            }
        }
    }
}

fn apply_flags(socket: &Socket, flags: SocketFlags) -> io::Result<()> {
    if flags.contains(SocketFlags::NONBLOCK) {
        socket.set_nonblocking(true)?;
    }
    if flags.contains(SocketFlags::CLOEXEC) {
        socket.set_cloexec(true)?;
    }
    Ok(())
}

/// Run `op` until it fails with something other than EINTR.
fn retry_interrupted<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match op() {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}

fn os_send(fd: RawFd, data: &[u8], flags: MsgFlags) -> io::Result<usize> {
    nix::sys::socket::send(fd, data, flags).map_err(io::Error::from)
}

fn os_recv(fd: RawFd, buf: &mut [u8], flags: MsgFlags) -> io::Result<usize> {
    nix::sys::socket::recv(fd, buf, flags).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_socket_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(format!("{name}.sock"))
    }

    #[test]
    fn new_endpoint_is_valid_until_closed() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        assert!(ep.is_valid());
        assert!(ep.raw_fd().is_some());
        assert!(ep.close());
        assert!(!ep.is_valid());
        assert_eq!(ep.raw_fd(), None);
    }

    #[test]
    fn close_is_idempotent() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        assert!(ep.close());
        assert!(ep.close());
        assert!(!ep.is_valid());
    }

    #[test]
    fn io_on_closed_endpoint_fails_with_closed() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        ep.close();
        assert!(matches!(ep.send_all(b"x"), Err(Error::Closed)));
        let mut buf = [0u8; 1];
        assert!(matches!(ep.recv_all(&mut buf), Err(Error::Closed)));
        assert!(matches!(ep.listen(1), Err(Error::Closed)));
        assert!(matches!(ep.accept(), Err(Error::Closed)));
        assert!(matches!(ep.send_ack(), Err(Error::Closed)));
    }

    #[test]
    fn attributes_are_recorded() {
        let kind = SocketType::Datagram | SocketFlags::CLOEXEC;
        let ep = Endpoint::new(Domain::LOCAL, kind).unwrap();
        assert_eq!(ep.domain(), Domain::Unix);
        assert_eq!(ep.kind(), kind);
        assert_eq!(ep.socket_type(), SocketType::Datagram);
        assert_eq!(ep.protocol(), 0);
        assert!(ep.bound_path().is_none());
    }

    #[test]
    fn display_shows_fd_and_closed_state() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        let fd = ep.raw_fd().unwrap();
        assert!(ep.describe().starts_with(&format!("fd {fd}")));
        ep.close();
        assert!(ep.to_string().starts_with("closed"));
    }

    #[test]
    fn display_includes_bound_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_socket_path(&dir, "display");
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        ep.bind(&path).unwrap();
        assert!(ep.to_string().contains(&format!("path '{}'", path.display())));
    }

    #[test]
    fn bind_rejects_path_at_capacity() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        let path = format!("/tmp/{}", "a".repeat(MAX_PATH_LEN - 5));
        assert_eq!(path.len(), MAX_PATH_LEN);
        let err = ep.bind(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(ep.bound_path().is_none());
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn bind_rejects_empty_path() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        assert!(matches!(ep.bind(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn path_addressing_requires_unix_domain() {
        let mut ep = Endpoint::new(Domain::Inet, SocketType::Stream).unwrap();
        assert!(matches!(
            ep.bind("/tmp/never-created.sock"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ep.connect("/tmp/never-created.sock"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn bind_records_path_and_drop_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_socket_path(&dir, "bind");
        {
            let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
            ep.bind(&path).unwrap();
            assert_eq!(ep.bound_path(), Some(path.as_path()));
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn bind_to_missing_directory_is_resource_error() {
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        let err = ep.bind("/nonexistent/dir/socket.sock").unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
        assert!(err.to_string().contains("/nonexistent/dir/socket.sock"));
    }

    #[test]
    fn connect_to_missing_socket_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream).unwrap();
        let err = ep.connect(temp_socket_path(&dir, "absent")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
        assert!(ep.peer_path().is_none());
    }

    #[test]
    fn nonblocking_accept_without_pending_connection_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_socket_path(&dir, "nonblock");
        let mut ep = Endpoint::new(Domain::Unix, SocketType::Stream | SocketFlags::NONBLOCK).unwrap();
        ep.bind(&path).unwrap();
        ep.listen(4).unwrap();
        assert!(ep.accept().unwrap().is_none());
        assert!(ep.is_valid());
    }

    #[test]
    fn pair_exchanges_ack() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_ack().unwrap();
        b.recv_ack().unwrap();
    }

    #[test]
    fn recv_ack_rejects_other_values() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(&0x1234u16.to_ne_bytes()).unwrap();
        match b.recv_ack() {
            Err(Error::AckMismatch { received, expected }) => {
                assert_eq!(received, 0x1234);
                assert_eq!(expected, ACK_MAGIC);
            }
            other => panic!("expected AckMismatch, got {other:?}"),
        }
    }

    #[test]
    fn recv_all_reports_peer_shutdown() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(b"abc").unwrap();
        drop(a);
        let mut buf = [0u8; 8];
        match b.recv_all(&mut buf) {
            Err(Error::ConnectionClosed {
                transferred,
                expected,
            }) => {
                assert_eq!(transferred, 3);
                assert_eq!(expected, 8);
            }
            other => panic!("expected ConnectionClosed, got {other:?}"),
        }
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn empty_transfers_make_no_calls() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(&[]).unwrap();
        b.recv_all(&mut []).unwrap();
    }

    #[test]
    fn set_nonblocking_updates_kind() {
        let (mut a, _b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.set_nonblocking(true).unwrap();
        assert!(a.kind().is_nonblocking());
        let mut buf = [0u8; 1];
        let err = a.recv_all(&mut buf).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
        a.set_nonblocking(false).unwrap();
        assert!(!a.kind().is_nonblocking());
    }

    #[test]
    fn dontwait_flag_does_not_block() {
        let (a, _b) = Endpoint::pair(SocketType::Stream).unwrap();
        let mut buf = [0u8; 1];
        let err = a
            .recv_all_with_flags(&mut buf, TransferFlags::DONTWAIT)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
    }

    #[test]
    fn peek_leaves_data_queued() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(b"hi").unwrap();
        let mut peeked = [0u8; 2];
        b.recv_all_with_flags(&mut peeked, TransferFlags::PEEK | TransferFlags::WAITALL)
            .unwrap();
        let mut read = [0u8; 2];
        b.recv_all(&mut read).unwrap();
        assert_eq!(peeked, read);
    }

    #[test]
    fn peek_without_waitall_is_rejected() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(b"a").unwrap();
        let mut buf = [0u8; 2];
        let err = b
            .recv_all_with_flags(&mut buf, TransferFlags::PEEK)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(buf, [0, 0]);

        let mut read = [0u8; 1];
        b.recv_all(&mut read).unwrap();
        assert_eq!(&read, b"a");
    }

    #[test]
    fn peek_short_of_buffer_reports_closed_peer() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.send_all(b"a").unwrap();
        drop(a);
        let mut buf = [0u8; 2];
        let err = b
            .recv_all_with_flags(&mut buf, TransferFlags::PEEK | TransferFlags::WAITALL)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConnectionClosed {
                transferred: 1,
                expected: 2
            }
        ));
        assert_eq!(buf[1], 0);
    }

    #[test]
    fn shutdown_write_ends_peer_stream() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        a.shutdown(Shutdown::Write).unwrap();
        let mut buf = [0u8; 1];
        assert!(b.recv_all(&mut buf).unwrap_err().is_connection_closed());
    }

    #[test]
    fn send_to_dropped_peer_fails() {
        let (a, b) = Endpoint::pair(SocketType::Stream).unwrap();
        drop(b);
        let err = a
            .send_all_with_flags(&[0u8; 64], TransferFlags::NOSIGNAL)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EPIPE));
    }

    #[test]
    fn retry_interrupted_retries_only_eintr() {
        let mut calls = 0;
        let result = retry_interrupted(|| {
            calls += 1;
            if calls < 3 {
                Err(io::Error::from_raw_os_error(libc::EINTR))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);

        let mut calls = 0;
        let result: io::Result<()> = retry_interrupted(|| {
            calls += 1;
            Err(io::Error::from_raw_os_error(libc::EBADF))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn peer_addr_display() {
        assert_eq!(PeerAddr::Unnamed.to_string(), "(unnamed)");
        let addr = PeerAddr::Path(PathBuf::from("/tmp/x.sock"));
        assert_eq!(addr.to_string(), "/tmp/x.sock");
        assert_eq!(addr.path(), Some(Path::new("/tmp/x.sock")));
        assert_eq!(PeerAddr::Unnamed.path(), None);
    }
}
