//! Fixed-size command framer.
//!
//! Every CAT command is exactly [`FRAME_LEN`] bytes; there is no preamble,
//! no terminator, and no checksum. The assembler counts bytes and yields a
//! frame every 5th one.
//!
//! There is deliberately no resynchronization: a single dropped or
//! duplicated byte on the line misaligns every subsequent frame boundary
//! until the transport is restarted. That drift is inherent to the FT-817
//! wire protocol itself, so this assembler carries it forward rather than
//! inventing a recovery scheme the real radio does not have.

/// Wire size of a CAT command.
pub const FRAME_LEN: usize = 5;

/// A complete 5-byte CAT command.
///
/// `payload` semantics depend on the opcode: a packed-BCD frequency for
/// Set Frequency, a mode code in `payload[0]` for Set Mode, ignored for
/// most others. Immutable once assembled; consumed by exactly one
/// dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// The four payload bytes (`data[0..3]` on the wire).
    pub payload: [u8; 4],
    /// The opcode byte (`data[4]` on the wire).
    pub opcode: u8,
}

impl CommandFrame {
    /// Build a frame from its 5 wire bytes.
    pub fn from_wire(bytes: [u8; FRAME_LEN]) -> Self {
        CommandFrame {
            payload: [bytes[0], bytes[1], bytes[2], bytes[3]],
            opcode: bytes[4],
        }
    }
}

/// Byte-at-a-time accumulator for 5-byte command frames.
///
/// State is just the count of bytes collected so far. Feeding the 5th byte
/// yields the completed frame and resets the accumulator unconditionally,
/// regardless of what the dispatcher later makes of the frame.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the completed frame on every 5th byte.
    pub fn push(&mut self, byte: u8) -> Option<CommandFrame> {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len == FRAME_LEN {
            self.len = 0;
            Some(CommandFrame::from_wire(self.buf))
        } else {
            None
        }
    }

    /// Number of bytes collected toward the in-progress frame (0-4).
    pub fn pending(&self) -> usize {
        self.len
    }
}
