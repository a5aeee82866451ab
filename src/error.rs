#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A write would exceed the remaining buffer capacity. Nothing was
    /// written; the caller must drain the buffer and retry.
    BufferOverflow,

    /// A retryable frame exhausted its retry budget without being
    /// acknowledged and has been dropped from the queue.
    AckTimeout,

    /// The requested link mode is not supported.
    UnsupportedMode,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferOverflow => write!(f, "buffer length exceeded"),
            Error::AckTimeout => write!(f, "did not receive ack within timeout"),
            Error::UnsupportedMode => write!(f, "unsupported link mode"),
        }
    }
}

impl std::error::Error for Error {}
