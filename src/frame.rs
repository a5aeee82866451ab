//! Frame model and control-byte packing.

use num_enum::{FromPrimitive, IntoPrimitive};


/// Type of a supervisory frame, from bits [3:2] of the control byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
pub enum SupervisoryKind {
    ReceiveReady = 0x00,
    Reject = 0x01,
    ReceiveNotReady = 0x02,
    SelectiveReject = 0x03,
}

/// Type of an unnumbered frame, a 5-bit code split across bits [7:5] and
/// [3:2] of the control byte.
#[non_exhaustive]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
pub enum UnnumberedKind {
    DisconnectedMode = 0x03,
    SetNormalResponseMode = 0x08,
    UnnumberedAcknowledge = 0x0C,

    #[num_enum(catch_all)]
    Unknown(u8) = 0x1F,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Information {
        receive_sequence_number: u8,
        send_sequence_number: u8,
    },
    Supervisory {
        receive_sequence_number: u8,
        kind: SupervisoryKind,
    },
    Unnumbered {
        kind: UnnumberedKind,
    },
}


/// An immutable HDLC frame header. Payload bytes are carried separately;
/// only information frames have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub address: u8,
    pub poll_final: bool,
    pub kind: FrameKind,
}

impl Frame {
    pub fn information(
        address: u8,
        receive_sequence_number: u8,
        poll_final: bool,
        send_sequence_number: u8,
    ) -> Self {
        Self {
            address,
            poll_final,
            kind: FrameKind::Information {
                receive_sequence_number,
                send_sequence_number,
            },
        }
    }

    pub fn supervisory(
        address: u8,
        receive_sequence_number: u8,
        poll_final: bool,
        kind: SupervisoryKind,
    ) -> Self {
        Self {
            address,
            poll_final,
            kind: FrameKind::Supervisory { receive_sequence_number, kind },
        }
    }

    pub fn unnumbered(address: u8, kind: UnnumberedKind, poll_final: bool) -> Self {
        Self {
            address,
            poll_final,
            kind: FrameKind::Unnumbered { kind },
        }
    }

    /// Pack the control byte.
    ///
    /// Information: `RRRP SSS0`, supervisory: `RRRP TT01`, unnumbered:
    /// `MMMP MM11` with the 5-bit code split as high 3 + low 2 bits.
    pub fn control(&self) -> u8 {
        let pf = u8::from(self.poll_final) << 4;

        match self.kind {
            FrameKind::Information { receive_sequence_number, send_sequence_number } => {
                (receive_sequence_number & 0x07) << 5
                    | pf
                    | (send_sequence_number & 0x07) << 1
            },
            FrameKind::Supervisory { receive_sequence_number, kind } => {
                (receive_sequence_number & 0x07) << 5
                    | pf
                    | (u8::from(kind) & 0x03) << 2
                    | 0x01
            },
            FrameKind::Unnumbered { kind } => {
                let code = u8::from(kind);
                (code & 0x1C) << 3 | pf | (code & 0x03) << 2 | 0x03
            },
        }
    }

    /// Unpack a control byte, the inverse of [`Frame::control`].
    pub fn from_control(address: u8, control: u8) -> Self {
        let poll_final = (control >> 4) & 0x01 == 0x01;

        let kind = if control & 0x01 == 0 {
            FrameKind::Information {
                receive_sequence_number: (control >> 5) & 0x07,
                send_sequence_number: (control >> 1) & 0x07,
            }
        } else if control & 0x02 == 0 {
            let kind = match (control >> 2) & 0x03 {
                0x00 => SupervisoryKind::ReceiveReady,
                0x01 => SupervisoryKind::Reject,
                0x02 => SupervisoryKind::ReceiveNotReady,
                _ => SupervisoryKind::SelectiveReject,
            };

            FrameKind::Supervisory {
                receive_sequence_number: (control >> 5) & 0x07,
                kind,
            }
        } else {
            let code = ((control >> 3) & 0x1C) | ((control >> 2) & 0x03);

            FrameKind::Unnumbered { kind: UnnumberedKind::from_primitive(code) }
        };

        Self { address, poll_final, kind }
    }
}
