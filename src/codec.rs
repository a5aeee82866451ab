//! Adapter implementing [`tokio_util::codec`] over the frame encoder and
//! decoder, for wiring a link to an async byte transport.

use bytes::{Buf, Bytes, BytesMut};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::decoder;
use crate::encoder;
use crate::frame::Frame;


/// Stateless frame codec. Invalid frames and garbage spans are logged and
/// skipped; only well-formed frames are yielded.
#[derive(Debug, Default)]
pub struct Codec {}

impl Codec {
    pub fn new() -> Self {
        Self {}
    }

    pub fn wrap<T>(self, io: T) -> Framed<T, Codec>
    where
        T: AsyncRead + AsyncWrite,
    {
        Framed::with_capacity(io, self, 4096 as _)
    }
}

impl tokio_util::codec::Decoder for Codec {
    type Item = (Frame, Bytes);
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut payload = BytesMut::new();

        loop {
            let decoded = decoder::decode(src, &mut payload);

            if decoded.consumed > 0 {
                src.advance(decoded.consumed);
            }

            match decoded.frame {
                Some(frame) if decoded.valid => {
                    return Ok(Some((frame, payload.freeze())));
                },
                Some(frame) => {
                    tracing::warn!(?frame, "dropping invalid frame");
                },
                None if decoded.consumed == 0 => return Ok(None),
                None => {
                    tracing::warn!(discarded = decoded.consumed, "discarding garbage bytes");
                },
            }
        }
    }
}

impl tokio_util::codec::Encoder<(&Frame, &[u8])> for Codec {
    type Error = std::io::Error;

    fn encode(
        &mut self,
        (frame, payload): (&Frame, &[u8]),
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        encoder::encode(dst, frame, payload);
        Ok(())
    }
}
