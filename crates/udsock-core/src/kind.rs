//! Address families, socket kinds and flag sets.
//!
//! A socket kind is one base [`SocketType`] plus a set of [`SocketFlags`].
//! The two compose with `|` in either order:
//!
//! ```
//! use udsock_core::{SocketFlags, SocketType};
//!
//! let kind = SocketFlags::NONBLOCK | SocketFlags::CLOEXEC | SocketType::Stream;
//! assert_eq!(kind.socket_type(), SocketType::Stream);
//! assert!(kind.contains(SocketFlags::NONBLOCK));
//! assert_eq!(kind, SocketType::Stream | SocketFlags::CLOEXEC | SocketFlags::NONBLOCK);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Capacity of `sockaddr_un::sun_path` on this platform, including the
/// terminating NUL. Paths of this length or longer cannot be bound.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_PATH_LEN: usize = 108;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_PATH_LEN: usize = 104;

/// Address family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Local interprocess sockets addressed by filesystem path.
    Unix,
    Inet,
    Inet6,
}

impl Domain {
    /// `AF_LOCAL` is the POSIX spelling of `AF_UNIX`.
    pub const LOCAL: Self = Self::Unix;

    pub fn as_raw(self) -> libc::c_int {
        match self {
            Self::Unix => libc::AF_UNIX,
            Self::Inet => libc::AF_INET,
            Self::Inet6 => libc::AF_INET6,
        }
    }

    /// Whether endpoints of this family are addressed by filesystem path.
    pub fn is_path_addressed(self) -> bool {
        matches!(self, Self::Unix)
    }
}

impl From<Domain> for socket2::Domain {
    fn from(domain: Domain) -> Self {
        Self::from(domain.as_raw())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unix => "unix",
            Self::Inet => "inet",
            Self::Inet6 => "inet6",
        };
        f.write_str(name)
    }
}

/// Base communication semantics of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    Stream,
    Datagram,
    SeqPacket,
    Raw,
    Rdm,
}

impl SocketType {
    pub fn as_raw(self) -> libc::c_int {
        match self {
            Self::Stream => libc::SOCK_STREAM,
            Self::Datagram => libc::SOCK_DGRAM,
            Self::SeqPacket => libc::SOCK_SEQPACKET,
            Self::Raw => libc::SOCK_RAW,
            Self::Rdm => libc::SOCK_RDM,
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stream => "stream",
            Self::Datagram => "dgram",
            Self::SeqPacket => "seqpacket",
            Self::Raw => "raw",
            Self::Rdm => "rdm",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Creation-time modifiers applied to a new descriptor.
    #[derive(Default)]
    pub struct SocketFlags: u8 {
        const NONBLOCK = 0b01;
        const CLOEXEC = 0b10;
    }
}

bitflags! {
    /// Per-call flags for `send`/`recv`.
    #[derive(Default)]
    pub struct TransferFlags: u8 {
        const PEEK = 0b0_0001;
        const WAITALL = 0b0_0010;
        const DONTWAIT = 0b0_0100;
        const NOSIGNAL = 0b0_1000;
        const OOB = 0b1_0000;
    }
}

impl TransferFlags {
    pub(crate) fn to_msg_flags(self) -> nix::sys::socket::MsgFlags {
        use nix::sys::socket::MsgFlags;

        let mut flags = MsgFlags::empty();
        if self.contains(Self::PEEK) {
            flags |= MsgFlags::MSG_PEEK;
        }
        if self.contains(Self::WAITALL) {
            flags |= MsgFlags::MSG_WAITALL;
        }
        if self.contains(Self::DONTWAIT) {
            flags |= MsgFlags::MSG_DONTWAIT;
        }
        // Apple platforms have no MSG_NOSIGNAL; there the flag is a no-op.
        #[cfg(any(target_os = "linux", target_os = "android"))]
        if self.contains(Self::NOSIGNAL) {
            flags |= MsgFlags::MSG_NOSIGNAL;
        }
        if self.contains(Self::OOB) {
            flags |= MsgFlags::MSG_OOB;
        }
        flags
    }
}

/// A socket type together with its creation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind {
    socket_type: SocketType,
    flags: SocketFlags,
}

impl Kind {
    pub fn new(socket_type: SocketType, flags: SocketFlags) -> Self {
        Self { socket_type, flags }
    }

    pub fn socket_type(self) -> SocketType {
        self.socket_type
    }

    pub fn flags(self) -> SocketFlags {
        self.flags
    }

    pub fn contains(self, flags: SocketFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_nonblocking(self) -> bool {
        self.contains(SocketFlags::NONBLOCK)
    }

    #[must_use]
    pub fn with(self, flags: SocketFlags) -> Self {
        Self::new(self.socket_type, self.flags | flags)
    }

    #[must_use]
    pub fn without(self, flags: SocketFlags) -> Self {
        Self::new(self.socket_type, self.flags - flags)
    }
}

impl From<SocketType> for Kind {
    fn from(socket_type: SocketType) -> Self {
        Self::new(socket_type, SocketFlags::empty())
    }
}

impl BitOr<SocketFlags> for SocketType {
    type Output = Kind;

    fn bitor(self, flags: SocketFlags) -> Kind {
        Kind::new(self, flags)
    }
}

impl BitOr<SocketType> for SocketFlags {
    type Output = Kind;

    fn bitor(self, socket_type: SocketType) -> Kind {
        Kind::new(socket_type, self)
    }
}

impl BitOr<SocketFlags> for Kind {
    type Output = Self;

    fn bitor(self, flags: SocketFlags) -> Self {
        self.with(flags)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_type)?;
        if self.contains(SocketFlags::NONBLOCK) {
            f.write_str("|nonblock")?;
        }
        if self.contains(SocketFlags::CLOEXEC) {
            f.write_str("|cloexec")?;
        }
        Ok(())
    }
}
