//! Flag bytes, bit masks, and FCS constants used in the HDLC encoding.

pub mod flags {
    pub const FRAME: u8 = 0x7E;
    pub const ESCAPE: u8 = 0x7D;
}

pub mod escape {
    pub const MASK: u8 = 0x20;
}

pub mod fcs {
    /// Initial accumulator value for the frame check sequence.
    pub const INITIAL: u16 = 0xFFFF;

    /// Residue left in the accumulator after folding a valid frame,
    /// including its two (complemented) FCS bytes.
    pub const RESIDUE: u16 = 0xF0B8;
}
