//! Outbound frame queue with per-frame retry and timeout bookkeeping.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::binary_heap::PeekMut;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::encoder;
use crate::error::Error;
use crate::frame::{Frame, FrameKind, UnnumberedKind};


/// Queue priority for application data frames.
pub const PRIORITY_DATA: u8 = 0;

/// Queue priority for protocol control responses (acknowledgments,
/// rejects, disconnected-mode notices).
pub const PRIORITY_CONTROL: u8 = 1;

/// Queue priority for handshake initiation. Outranks everything else so
/// that no ordinary traffic goes out before the link is established.
pub const PRIORITY_HANDSHAKE: u8 = 3;


#[derive(Debug)]
struct PendingFrame {
    frame: Frame,
    payload: Bytes,
    priority: u8,
    order: u64,
    retryable: bool,
    age: Duration,
    attempts: u32,
}

impl PartialEq for PendingFrame {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingFrame {}

impl PartialOrd for PendingFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingFrame {
    // descending priority, FIFO among equal priorities
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}


/// Owns the pending-frame queue and emits encoded frames on demand.
///
/// The caller drives time by passing the elapsed duration since the previous
/// [`Sender::read`] call; there is no internal clock.
#[derive(Debug)]
pub struct Sender {
    queue: BinaryHeap<PendingFrame>,
    len: usize,
    capacity: usize,
    write_timeout: Duration,
    write_retries: u32,
    sequence_number: u8,
    next_order: u64,
}

impl Sender {
    pub fn new(capacity: usize, write_timeout: Duration, write_retries: u32) -> Self {
        Self {
            queue: BinaryHeap::new(),
            len: 0,
            capacity,
            write_timeout,
            write_retries,
            sequence_number: 0,
            next_order: 0,
        }
    }

    /// Total payload bytes held by pending frames.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remaining payload byte budget.
    pub fn available(&self) -> usize {
        self.capacity - self.len
    }

    /// Number of frames waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Send sequence number of the next information frame.
    pub fn sequence_number(&self) -> u8 {
        self.sequence_number
    }

    /// Queue a frame for transmission. Fails without queuing anything if the
    /// payload does not fit into the remaining byte budget.
    pub fn write_frame(
        &mut self,
        frame: Frame,
        payload: &[u8],
        priority: u8,
        retryable: bool,
    ) -> Result<(), Error> {
        if payload.len() > self.available() {
            return Err(Error::BufferOverflow);
        }

        self.len += payload.len();

        let order = self.next_order;
        self.next_order += 1;

        self.queue.push(PendingFrame {
            frame,
            payload: Bytes::copy_from_slice(payload),
            priority,
            order,
            retryable,
            age: Duration::ZERO,
            attempts: 0,
        });

        Ok(())
    }

    /// Queue an information frame carrying `payload`, stamped with the next
    /// send sequence number.
    pub fn write(
        &mut self,
        payload: &[u8],
        address: u8,
        receive_sequence_number: u8,
        poll_final: bool,
    ) -> Result<(), Error> {
        let frame = Frame::information(
            address,
            receive_sequence_number,
            poll_final,
            self.sequence_number,
        );

        self.write_frame(frame, payload, PRIORITY_DATA, true)?;
        self.sequence_number = (self.sequence_number + 1) % 8;

        Ok(())
    }

    /// Encode the head-of-queue frame into `buf` if it is due, returning the
    /// number of bytes written (0 if nothing is due yet).
    ///
    /// A frame is sent immediately the first time it reaches the head.
    /// Afterwards `elapsed` accumulates into its age and it is re-sent once
    /// the write timeout is reached. A retryable frame that has been sent
    /// `write_retries + 1` times without being acknowledged is dropped and
    /// reported as [`Error::AckTimeout`]; non-retryable frames are removed
    /// right after their single transmission.
    pub fn read(&mut self, buf: &mut BytesMut, elapsed: Duration) -> Result<usize, Error> {
        let retries = self.write_retries;
        let timeout = self.write_timeout;

        let Some(mut item) = self.queue.peek_mut() else {
            return Ok(0);
        };

        if item.attempts == 0 {
            item.attempts = 1;
        } else {
            item.age += elapsed;

            if item.age < timeout {
                return Ok(0);
            }

            item.age = Duration::ZERO;
            item.attempts += 1;
        }

        if item.attempts > retries + 1 {
            let item = PeekMut::pop(item);
            self.len -= item.payload.len();

            return Err(Error::AckTimeout);
        }

        let written = encoder::encode(buf, &item.frame, &item.payload);

        if !item.retryable {
            let item = PeekMut::pop(item);
            self.len -= item.payload.len();
        }

        Ok(written)
    }

    /// Consume an acknowledgment: remove the in-flight information frame
    /// whose send sequence number precedes `receive_sequence_number`.
    pub fn acknowledge(&mut self, receive_sequence_number: u8) {
        let acked = (receive_sequence_number + 7) % 8;

        self.remove_first(|frame| {
            matches!(
                frame.kind,
                FrameKind::Information { send_sequence_number, .. }
                    if send_sequence_number == acked
            )
        });
    }

    /// Remove the pending unnumbered frame matching `kind`, if any.
    pub fn remove_unnumbered(&mut self, kind: UnnumberedKind) {
        self.remove_first(|frame| {
            matches!(frame.kind, FrameKind::Unnumbered { kind: k } if k == kind)
        });
    }

    // Removes the first queued frame matching the predicate that has been
    // transmitted at least once.
    fn remove_first<F: Fn(&Frame) -> bool>(&mut self, predicate: F) {
        let mut removed = None;

        self.queue.retain(|item| {
            if removed.is_none() && item.attempts > 0 && predicate(&item.frame) {
                removed = Some(item.payload.len());
                false
            } else {
                true
            }
        });

        if let Some(n) = removed {
            self.len -= n;
        }
    }

    /// Discard all pending frames and restart the send sequence.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.len = 0;
        self.sequence_number = 0;
    }
}
