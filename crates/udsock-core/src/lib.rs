//! Owned unix domain socket endpoints.
//!
//! `udsock-core` wraps one OS socket descriptor in an [`Endpoint`] that:
//!
//! - releases the descriptor, and removes any path it bound, when dropped
//! - retries interrupted `bind`/`accept`/`connect`/`send`/`recv` calls
//! - reports "nothing to accept" on a non-blocking listener as `Ok(None)`
//! - transfers whole buffers with [`Endpoint::send_all`] and
//!   [`Endpoint::recv_all`], looping over partial I/O
//! - offers a two-byte acknowledgement handshake ([`Endpoint::send_ack`],
//!   [`Endpoint::recv_ack`])
//!
//! The model is blocking and single-owner: one thread drives an endpoint at a
//! time, and every accepted connection is an independent endpoint.
//!
//! ```no_run
//! use udsock_core::{Domain, Endpoint, SocketFlags, SocketType};
//!
//! let mut listener = Endpoint::new(Domain::Unix, SocketType::Stream | SocketFlags::CLOEXEC)?;
//! listener.bind("/tmp/udsock-demo.sock")?;
//! listener.listen(10)?;
//!
//! while let Some(conn) = listener.accept()? {
//!     conn.recv_ack()?;
//!     conn.send_ack()?;
//! }
//! # Ok::<(), udsock_core::Error>(())
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod kind;
pub mod logging;

pub use endpoint::{ACK_MAGIC, Endpoint, PeerAddr};
pub use error::{Error, Result};
pub use kind::{Domain, Kind, MAX_PATH_LEN, SocketFlags, SocketType, TransferFlags};
