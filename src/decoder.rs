//! Streaming frame extraction from a raw byte buffer.

use bytes::{BufMut, BytesMut};

use crate::consts;
use crate::fcs::Fcs;
use crate::frame::Frame;


/// Result of a single decode pass over a buffer.
///
/// `consumed` is the number of leading bytes the caller can discard. The
/// closing flag of a complete frame is not consumed; it doubles as the
/// opening flag of the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub consumed: usize,
    pub frame: Option<Frame>,
    pub valid: bool,
}

impl Decoded {
    fn garbage(consumed: usize) -> Self {
        Self { consumed, frame: None, valid: false }
    }
}


/// Scan `buf` for the next frame, writing decoded payload bytes to
/// `payload` (cleared first).
///
/// - No flag byte: the whole buffer is garbage and consumed.
/// - Opening flag but no closing flag yet: nothing is consumed, more data
///   is needed.
/// - Complete but malformed frame (too short, trailing escape, or FCS
///   mismatch): consumed up to the closing flag, `valid` is false, and
///   `payload` holds whatever raw bytes were parsed (including the FCS
///   trailer) so best-effort callers can still inspect them.
/// - Well-formed frame: as above with `valid` set and the two FCS bytes
///   stripped from `payload`.
///
/// Two adjacent flag bytes are a single boundary; a new frame never starts
/// on the second of a pair.
pub fn decode(buf: &[u8], payload: &mut BytesMut) -> Decoded {
    payload.clear();

    let mut start = None;
    let mut end = None;
    let mut escape = false;
    let mut fcs = Fcs::new();

    let mut address = 0;
    let mut frame = None;
    let mut decoded = 0usize;

    for (i, &b) in buf.iter().enumerate() {
        if start.is_none() {
            if b == consts::flags::FRAME {
                // shared closing/opening flag: skip the first of a pair
                if i + 1 < buf.len() && buf[i + 1] == consts::flags::FRAME {
                    continue;
                }

                start = Some(i);
            }
        } else if b == consts::flags::FRAME {
            end = Some(i);
            break;
        } else if b == consts::flags::ESCAPE {
            escape = true;
        } else {
            let value = if escape {
                escape = false;
                b ^ consts::escape::MASK
            } else {
                b
            };

            fcs.put_u8(value);

            match decoded {
                0 => address = value,
                1 => frame = Some(Frame::from_control(address, value)),
                _ => payload.put_u8(value),
            }

            decoded += 1;
        }
    }

    let (Some(start), Some(end)) = (start, end) else {
        return match start {
            // no frame start: discard everything
            None => Decoded::garbage(buf.len()),
            // started but not terminated: wait for more data
            Some(_) => {
                payload.clear();
                Decoded::garbage(0)
            },
        };
    };

    if start + 4 > end || escape || !fcs.is_valid() {
        Decoded { consumed: end, frame, valid: false }
    } else {
        payload.truncate(payload.len().saturating_sub(2));
        Decoded { consumed: end, frame, valid: true }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::encoder;
    use crate::frame::{FrameKind, SupervisoryKind, UnnumberedKind};

    fn decode_bytes(buf: &[u8]) -> (Decoded, BytesMut) {
        let mut payload = BytesMut::new();
        let decoded = decode(buf, &mut payload);
        (decoded, payload)
    }

    #[test]
    fn test_decode_unnumbered() {
        let (d, payload) = decode_bytes(&[0x7E, 0xAA, 0x53, 0xD6, 0x3D, 0x7E]);

        assert_eq!(d.consumed, 5);
        assert!(d.valid);
        assert!(payload.is_empty());
        assert_eq!(d.frame, Some(Frame::unnumbered(
            0xAA,
            UnnumberedKind::SetNormalResponseMode,
            true,
        )));
    }

    #[test]
    fn test_decode_information() {
        let raw = [0x7E, 0xAA, 0x70, b't', b'e', b's', b't', 0xE6, 0xB0, 0x7E];
        let (d, payload) = decode_bytes(&raw);

        assert_eq!(d.consumed, 9);
        assert!(d.valid);
        assert_eq!(&payload[..], b"test");
        assert_eq!(d.frame, Some(Frame::information(0xAA, 3, true, 0)));
    }

    #[test]
    fn test_decode_garbage() {
        let (d, payload) = decode_bytes(b"garbage");

        assert_eq!(d, Decoded { consumed: 7, frame: None, valid: false });
        assert!(payload.is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        // opening flag only, no terminator yet
        let (d, _) = decode_bytes(&[0x7E, 0xAA, 0x70, b't', b'e']);
        assert_eq!(d, Decoded { consumed: 0, frame: None, valid: false });

        let (d, _) = decode_bytes(&[0x7E]);
        assert_eq!(d, Decoded { consumed: 0, frame: None, valid: false });
    }

    #[test]
    fn test_decode_paired_flags() {
        let raw = [0x7E, 0x7E, 0xAA, 0x53, 0xD6, 0x3D, 0x7E];
        let (d, _) = decode_bytes(&raw);

        assert_eq!(d.consumed, 6);
        assert!(d.valid);
        assert_eq!(d.frame, Some(Frame::unnumbered(
            0xAA,
            UnnumberedKind::SetNormalResponseMode,
            true,
        )));
    }

    #[test]
    fn test_decode_corrupted_fcs() {
        let raw = [0x7E, 0xAA, 0x70, b't', b'e', b's', b't', 0xE6, 0x00, 0x7E];
        let (d, payload) = decode_bytes(&raw);

        assert_eq!(d.consumed, 9);
        assert!(!d.valid);
        // raw parsed payload, FCS bytes included
        assert_eq!(&payload[..], &[b't', b'e', b's', b't', 0xE6, 0x00]);
        assert_eq!(d.frame, Some(Frame::information(0xAA, 3, true, 0)));
    }

    #[test]
    fn test_decode_too_short() {
        let (d, _) = decode_bytes(&[0x7E, 0xAA, 0x53, 0x7E]);

        assert_eq!(d.consumed, 3);
        assert!(!d.valid);
        assert!(d.frame.is_some());
    }

    #[test]
    fn test_decode_trailing_escape() {
        let (d, _) = decode_bytes(&[0x7E, 0xAA, 0x21, 0x43, 0x7D, 0x7E]);

        assert_eq!(d.consumed, 5);
        assert!(!d.valid);
    }

    #[test]
    fn test_roundtrip_with_escapes() {
        let frame = Frame::information(0x7E, 2, false, 5);
        let data = [0x7E, 0x7D, 0x20, 0x00, 0xFF];

        let mut buf = BytesMut::new();
        encoder::encode(&mut buf, &frame, &data);

        let (d, payload) = decode_bytes(&buf);

        assert!(d.valid);
        assert_eq!(d.frame, Some(frame));
        assert_eq!(&payload[..], &data);
        assert_eq!(d.consumed, buf.len() - 1);
    }

    #[test]
    fn test_roundtrip_supervisory() {
        let frame = Frame::supervisory(0x42, 6, true, SupervisoryKind::ReceiveNotReady);

        let mut buf = BytesMut::new();
        encoder::encode(&mut buf, &frame, &[]);

        let (d, payload) = decode_bytes(&buf);

        assert!(d.valid);
        assert!(payload.is_empty());
        assert_eq!(d.frame, Some(frame));

        match d.frame.map(|f| f.kind) {
            Some(FrameKind::Supervisory { kind, .. }) => {
                assert_eq!(kind, SupervisoryKind::ReceiveNotReady)
            },
            other => panic!("unexpected frame kind: {other:?}"),
        }
    }

    #[test]
    fn test_single_bit_corruption() {
        let raw = [0x7E, 0xAA, 0x70, b't', b'e', b's', b't', 0xE6, 0xB0, 0x7E];

        for i in 1..raw.len() - 1 {
            for bit in 0..8 {
                let mut corrupted = raw;
                corrupted[i] ^= 1 << bit;

                // flips that produce flag or escape bytes change the framing
                // instead of the checksum; skip those
                if corrupted[i] == 0x7E || corrupted[i] == 0x7D {
                    continue;
                }

                let (d, _) = decode_bytes(&corrupted);
                assert!(!d.valid, "bit {bit} of byte {i} not detected");
            }
        }
    }
}
