//! Master/slave handshake and sliding-window acknowledgment state machine,
//! layered over [`Receiver`] and [`Sender`].

use std::time::Duration;

use bytes::BytesMut;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::error::Error;
use crate::frame::{Frame, FrameKind, SupervisoryKind, UnnumberedKind};
use crate::receiver::Receiver;
use crate::sender::{self, Sender};


/// Link operating mode requested during the handshake.
#[non_exhaustive]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
pub enum Mode {
    NormalResponse = 0x08,

    #[num_enum(catch_all)]
    Unknown(u8) = 0xFF,
}

impl Mode {
    fn handshake_kind(self) -> Option<UnnumberedKind> {
        match self {
            Mode::NormalResponse => Some(UnnumberedKind::SetNormalResponseMode),
            Mode::Unknown(_) => None,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiates the handshake by sending a mode-setting frame.
    Master,

    /// Stays silent until the master establishes the link.
    Slave,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Byte budget for both the inbound buffer and the pending payload
    /// queue.
    pub buffer_capacity: usize,

    /// Time between transmission attempts of an unacknowledged frame.
    pub write_timeout: Duration,

    /// Number of re-transmissions before a frame is dropped and the failure
    /// reported.
    pub write_retries: u32,

    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_capacity: 128,
            write_timeout: Duration::from_millis(500),
            write_retries: 1,
            mode: Mode::NormalResponse,
        }
    }
}


/// A single point-to-point HDLC link.
///
/// The address identifies the secondary (slave) station and is carried by
/// frames in both directions, so master and slave are configured with the
/// same value. Frames carrying any other address are ignored.
///
/// All operations are synchronous; the caller feeds raw transport bytes into
/// [`Link::write_raw`], drains outbound bytes via [`Link::read_raw`] with
/// the elapsed time since the previous call, and exchanges payloads through
/// [`Link::write`] and [`Link::read`].
#[derive(Debug)]
pub struct Link {
    receiver: Receiver,
    sender: Sender,
    role: Role,
    address: u8,
    handshake: UnnumberedKind,
    sequence_number: u8,
    initialized: bool,
}

impl Link {
    /// Create the master side of a link. The mode-setting handshake frame is
    /// queued immediately and blocks all other traffic until acknowledged.
    pub fn master(address: u8, config: Config) -> Result<Self, Error> {
        Self::new(Role::Master, address, config)
    }

    /// Create the slave side of a link.
    pub fn slave(address: u8, config: Config) -> Result<Self, Error> {
        Self::new(Role::Slave, address, config)
    }

    fn new(role: Role, address: u8, config: Config) -> Result<Self, Error> {
        let handshake = config.mode.handshake_kind().ok_or(Error::UnsupportedMode)?;

        let mut link = Self {
            receiver: Receiver::new(config.buffer_capacity),
            sender: Sender::new(
                config.buffer_capacity,
                config.write_timeout,
                config.write_retries,
            ),
            role,
            address,
            handshake,
            sequence_number: 0,
            initialized: false,
        };

        if role == Role::Master {
            link.enqueue_handshake()?;
        }

        Ok(link)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True once the handshake has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Send sequence number expected on the next inbound information frame.
    pub fn sequence_number(&self) -> u8 {
        self.sequence_number
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Number of frames waiting for transmission or acknowledgment.
    pub fn pending(&self) -> usize {
        self.sender.pending()
    }

    /// Queue an outbound payload, acknowledging up to the currently expected
    /// inbound sequence number.
    pub fn write(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.write_with(payload, self.sequence_number, true)
    }

    /// Queue an outbound payload with an explicit acknowledgment number and
    /// poll/final flag.
    pub fn write_with(
        &mut self,
        payload: &[u8],
        receive_sequence_number: u8,
        poll_final: bool,
    ) -> Result<(), Error> {
        self.sender
            .write(payload, self.address, receive_sequence_number, poll_final)
    }

    /// Feed raw inbound transport bytes into the link.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<(), Error> {
        self.receiver.write(data)
    }

    /// Drain the next due outbound frame into `buf`, returning the number of
    /// encoded bytes (0 if nothing is due). `elapsed` is the time since the
    /// previous call and drives retransmission.
    pub fn read_raw(&mut self, buf: &mut BytesMut, elapsed: Duration) -> Result<usize, Error> {
        self.sender.read(buf, elapsed)
    }

    /// Process the next buffered inbound frame, if any.
    ///
    /// Returns the number of payload bytes delivered into `payload`: nonzero
    /// only for a valid, in-sequence information frame. Protocol frames and
    /// rejected frames are handled internally (response frames are queued on
    /// the sender) and deliver zero bytes. At most one frame is processed
    /// per call.
    pub fn read(&mut self, payload: &mut BytesMut) -> Result<usize, Error> {
        let Some((frame, valid)) = self.receiver.read_frame(payload) else {
            payload.clear();
            return Ok(0);
        };

        self.handle_frame(&frame, payload, valid)
    }

    /// Drop the session back to disconnected, discarding all buffered and
    /// in-flight data. A master immediately re-initiates the handshake.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.initialized = false;
        self.sequence_number = 0;
        self.receiver.reset();
        self.sender.reset();

        if self.role == Role::Master {
            self.enqueue_handshake()?;
        }

        Ok(())
    }

    fn enqueue_handshake(&mut self) -> Result<(), Error> {
        let frame = Frame::unnumbered(self.address, self.handshake, true);

        self.sender
            .write_frame(frame, &[], sender::PRIORITY_HANDSHAKE, true)
    }

    fn handle_frame(
        &mut self,
        frame: &Frame,
        payload: &mut BytesMut,
        valid: bool,
    ) -> Result<usize, Error> {
        if frame.address != self.address {
            payload.clear();
            return Ok(0);
        }

        let delivered = match frame.kind {
            FrameKind::Unnumbered { kind } => self.on_unnumbered(frame, kind, valid)?,
            FrameKind::Supervisory { receive_sequence_number, kind } => {
                self.on_supervisory(frame, receive_sequence_number, kind, valid)?
            },
            FrameKind::Information { send_sequence_number, .. } => {
                return self.on_information(frame, send_sequence_number, payload, valid);
            },
        };

        payload.clear();
        Ok(delivered)
    }

    fn on_unnumbered(
        &mut self,
        frame: &Frame,
        kind: UnnumberedKind,
        valid: bool,
    ) -> Result<usize, Error> {
        if !valid {
            return Ok(0);
        }

        match (self.role, kind) {
            // a fresh handshake always wins: discard anything in flight
            (Role::Slave, kind) if kind == self.handshake => {
                tracing::debug!(address = frame.address, "link established, state reset");

                self.sequence_number = 0;
                self.receiver.reset();
                self.sender.reset();
                self.initialized = true;

                let response = Frame::unnumbered(
                    frame.address,
                    UnnumberedKind::UnnumberedAcknowledge,
                    true,
                );

                self.sender
                    .write_frame(response, &[], sender::PRIORITY_CONTROL, false)?;

                Ok(0)
            },
            (Role::Master, UnnumberedKind::UnnumberedAcknowledge) if !self.initialized => {
                tracing::debug!(address = frame.address, "handshake acknowledged");

                self.initialized = true;
                self.sender.remove_unnumbered(self.handshake);

                Ok(0)
            },
            _ => self.notify_disconnected(frame),
        }
    }

    fn on_supervisory(
        &mut self,
        frame: &Frame,
        receive_sequence_number: u8,
        kind: SupervisoryKind,
        valid: bool,
    ) -> Result<usize, Error> {
        if !valid {
            return Ok(0);
        }

        if !self.initialized {
            return self.notify_disconnected(frame);
        }

        match kind {
            SupervisoryKind::ReceiveReady => {
                self.sender.acknowledge(receive_sequence_number);
            },
            SupervisoryKind::SelectiveReject => {
                // the affected frame is re-sent once its retry timer elapses
                tracing::trace!(receive_sequence_number, "selective reject observed");
            },
            SupervisoryKind::Reject | SupervisoryKind::ReceiveNotReady => {
                tracing::trace!(?kind, "unhandled supervisory frame");
            },
        }

        Ok(0)
    }

    fn on_information(
        &mut self,
        frame: &Frame,
        send_sequence_number: u8,
        payload: &mut BytesMut,
        valid: bool,
    ) -> Result<usize, Error> {
        if !self.initialized {
            let delivered = if valid {
                self.notify_disconnected(frame)?
            } else {
                0
            };

            payload.clear();
            return Ok(delivered);
        }

        if valid && send_sequence_number == self.sequence_number {
            self.sequence_number = (self.sequence_number + 1) % 8;

            let response = Frame::supervisory(
                frame.address,
                self.sequence_number,
                false,
                SupervisoryKind::ReceiveReady,
            );

            self.sender
                .write_frame(response, &[], sender::PRIORITY_CONTROL, false)?;

            Ok(payload.len())
        } else {
            tracing::warn!(
                valid,
                send_sequence_number,
                expected = self.sequence_number,
                "rejecting information frame"
            );

            let response = Frame::supervisory(
                frame.address,
                self.sequence_number,
                true,
                SupervisoryKind::SelectiveReject,
            );

            self.sender
                .write_frame(response, &[], sender::PRIORITY_CONTROL, false)?;

            payload.clear();
            Ok(0)
        }
    }

    // Tell the peer this station is not connected yet. Only the slave
    // responds; a master quietly keeps waiting for its handshake ack.
    fn notify_disconnected(&mut self, frame: &Frame) -> Result<usize, Error> {
        if self.role != Role::Slave || self.initialized {
            return Ok(0);
        }

        tracing::debug!(address = frame.address, "notifying disconnected mode");

        let response = Frame::unnumbered(
            frame.address,
            UnnumberedKind::DisconnectedMode,
            true,
        );

        self.sender
            .write_frame(response, &[], sender::PRIORITY_CONTROL, false)?;

        Ok(0)
    }
}
