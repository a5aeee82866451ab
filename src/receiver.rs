//! Inbound byte buffer with frame extraction and compaction.

use bytes::{Buf, BytesMut};

use crate::decoder;
use crate::error::Error;
use crate::frame::Frame;


/// Accumulates raw transport bytes and extracts frames from them.
///
/// The buffer has a fixed logical capacity; garbage spans, duplicate flag
/// bytes, and consumed frames are compacted away automatically.
#[derive(Debug)]
pub struct Receiver {
    buf: BytesMut,
    capacity: usize,
}

impl Receiver {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Remaining space for [`Receiver::write`].
    pub fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Append raw bytes to the buffer tail. Fails without writing anything
    /// if `data` does not fit.
    pub fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > self.available() {
            return Err(Error::BufferOverflow);
        }

        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Extract the next frame from the buffer, writing its payload bytes to
    /// `payload`.
    ///
    /// Leading garbage and empty flag pairs are discarded silently; a single
    /// call keeps scanning until it either produces a frame (valid or not)
    /// or runs out of buffered data (`None`, wait for more bytes).
    pub fn read_frame(&mut self, payload: &mut BytesMut) -> Option<(Frame, bool)> {
        loop {
            let decoded = decoder::decode(&self.buf, payload);

            if decoded.consumed > 0 {
                self.buf.advance(decoded.consumed);
            }

            if let Some(frame) = decoded.frame {
                return Some((frame, decoded.valid));
            }

            if decoded.consumed == 0 {
                return None;
            }
        }
    }

    /// Discard all buffered bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::UnnumberedKind;

    const UA: [u8; 6] = [0x7E, 0xAA, 0x73, 0xD4, 0x1C, 0x7E];
    const IFRAME: [u8; 10] = [0x7E, 0xAA, 0x70, b't', b'e', b's', b't', 0xE6, 0xB0, 0x7E];

    #[test]
    fn test_write_overflow() {
        let mut receiver = Receiver::new(64);

        assert_eq!(receiver.len(), 0);
        assert_eq!(receiver.available(), 64);

        assert_eq!(receiver.write(&[0; 65]), Err(Error::BufferOverflow));
        assert_eq!(receiver.len(), 0);

        receiver.write(&[0; 64]).unwrap();
        assert_eq!(receiver.available(), 0);
        assert_eq!(receiver.write(&[0]), Err(Error::BufferOverflow));
    }

    #[test]
    fn test_read_frame() {
        let mut receiver = Receiver::new(64);
        let mut payload = BytesMut::new();

        assert_eq!(receiver.read_frame(&mut payload), None);

        receiver.write(&IFRAME).unwrap();

        let (frame, valid) = receiver.read_frame(&mut payload).unwrap();
        assert!(valid);
        assert_eq!(frame, Frame::information(0xAA, 3, true, 0));
        assert_eq!(&payload[..], b"test");

        // only the shared closing flag is left over
        assert_eq!(receiver.len(), 1);
        assert_eq!(receiver.read_frame(&mut payload), None);
    }

    #[test]
    fn test_read_frame_incomplete() {
        let mut receiver = Receiver::new(64);
        let mut payload = BytesMut::new();

        receiver.write(&IFRAME[..6]).unwrap();
        assert_eq!(receiver.read_frame(&mut payload), None);

        receiver.write(&IFRAME[6..]).unwrap();

        let (frame, valid) = receiver.read_frame(&mut payload).unwrap();
        assert!(valid);
        assert_eq!(frame, Frame::information(0xAA, 3, true, 0));
        assert_eq!(&payload[..], b"test");
    }

    #[test]
    fn test_garbage_tolerance() {
        let mut receiver = Receiver::new(128);
        let mut payload = BytesMut::new();

        receiver.write(b"garbage").unwrap();
        receiver.write(&UA).unwrap();
        receiver.write(b"garbage").unwrap();
        receiver.write(&IFRAME).unwrap();

        let mut valid_frames = Vec::new();

        while let Some((frame, valid)) = receiver.read_frame(&mut payload) {
            if valid {
                valid_frames.push((frame, payload.clone()));
            }
        }

        assert_eq!(valid_frames.len(), 2);

        assert_eq!(valid_frames[0].0, Frame::unnumbered(
            0xAA,
            UnnumberedKind::UnnumberedAcknowledge,
            true,
        ));
        assert!(valid_frames[0].1.is_empty());

        assert_eq!(valid_frames[1].0, Frame::information(0xAA, 3, true, 0));
        assert_eq!(&valid_frames[1].1[..], b"test");

        // everything but the final shared flag has been consumed
        assert_eq!(receiver.len(), 1);
    }

    #[test]
    fn test_reset() {
        let mut receiver = Receiver::new(64);
        let mut payload = BytesMut::new();

        receiver.write(&IFRAME[..4]).unwrap();
        assert_eq!(receiver.len(), 4);

        receiver.reset();
        assert_eq!(receiver.len(), 0);
        assert_eq!(receiver.read_frame(&mut payload), None);
    }
}
