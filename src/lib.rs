//! HDLC (High-Level Data Link Control) link layer for unreliable byte
//! streams such as serial lines.
//!
//! The crate is split into a stateless framing codec (byte stuffing plus a
//! CRC-16/X-25 frame check sequence) and a stateful link protocol built on
//! top of it: a [`Receiver`] that extracts frames from raw inbound bytes, a
//! [`Sender`] with a priority-ordered retransmission queue, and a [`Link`]
//! implementing the master/slave handshake and acknowledgment state machine.
//!
//! All components are synchronous and clock-free; the caller drives
//! retransmission by reporting elapsed time. For async transports,
//! [`codec::Codec`] adapts the framing layer to `tokio_util::codec`.

pub mod codec;
pub mod consts;
pub mod decoder;
pub mod encoder;
pub mod fcs;
pub mod frame;
pub mod link;
pub mod receiver;
pub mod sender;

mod error;

pub use error::Error;
pub use frame::{Frame, FrameKind, SupervisoryKind, UnnumberedKind};
pub use link::{Config, Link, Mode, Role};
pub use receiver::Receiver;
pub use sender::Sender;
