//! On-wire frame construction: byte stuffing, control packing, and FCS
//! trailer.

use arrayvec::ArrayVec;
use bytes::{BufMut, BytesMut};

use crate::consts;
use crate::fcs::Fcs;
use crate::frame::Frame;


/// Escape a single byte: flag and escape octets expand to the escape octet
/// followed by the value with bit 5 flipped, everything else passes through.
pub fn escape(value: u8) -> ArrayVec<u8, 2> {
    let mut out = ArrayVec::new();

    match value {
        consts::flags::FRAME | consts::flags::ESCAPE => {
            out.push(consts::flags::ESCAPE);
            out.push(value ^ consts::escape::MASK);
        },
        _ => out.push(value),
    }

    out
}


struct ByteEscape<'a> {
    buf: &'a mut BytesMut,
    written: usize,
}

impl<'a> ByteEscape<'a> {
    fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf, written: 0 }
    }

    fn put_u8(&mut self, byte: u8) {
        let escaped = escape(byte);

        self.buf.put_slice(&escaped);
        self.written += escaped.len();
    }

    fn put_frame_flag(&mut self) {
        self.buf.put_u8(consts::flags::FRAME);
        self.written += 1;
    }
}


struct Encoder<'a> {
    buf: ByteEscape<'a>,
    fcs: Fcs,
}

impl<'a> Encoder<'a> {
    fn new(buf: &'a mut BytesMut) -> Self {
        Self {
            buf: ByteEscape::new(buf),
            fcs: Fcs::new(),
        }
    }

    fn flag(&mut self) -> &mut Self {
        self.buf.put_frame_flag();
        self
    }

    fn put_u8(&mut self, byte: u8) -> &mut Self {
        self.fcs.put_u8(byte);
        self.buf.put_u8(byte);
        self
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for b in bytes {
            self.put_u8(*b);
        }
        self
    }

    fn finalize(&mut self) -> usize {
        let fcs = self.fcs.finalize().to_le_bytes();

        // the checksum itself is escaped but not folded
        self.buf.put_u8(fcs[0]);
        self.buf.put_u8(fcs[1]);
        self.flag();

        self.buf.written
    }
}


/// Encode a frame and its payload into `buf`, returning the number of bytes
/// written. Worst case is `2 * (2 + payload.len()) + 4` bytes when every
/// content byte needs escaping.
pub fn encode(buf: &mut BytesMut, frame: &Frame, payload: &[u8]) -> usize {
    let mut enc = Encoder::new(buf);

    enc.flag()
        .put_u8(frame.address)
        .put_u8(frame.control())
        .put_bytes(payload);

    enc.finalize()
}
