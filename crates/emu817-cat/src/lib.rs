//! emu817-cat: the FT-817 CAT protocol responder.
//!
//! The FT-817 CAT protocol is binary and fixed-size: every command from the
//! client is exactly 5 bytes, four payload bytes followed by an opcode byte.
//! Responses are 0 to 5 bytes with no framing; the client knows how many
//! bytes each command it sent will produce.
//!
//! # Command format
//!
//! ```text
//! <p0> <p1> <p2> <p3> <opcode>
//! ```
//!
//! For frequency commands the payload is a packed-BCD frequency at 10 Hz
//! resolution (see [`bcd`]); for most other commands it is ignored.
//!
//! # Pipeline
//!
//! [`FrameAssembler`](frame::FrameAssembler) turns the raw byte stream into
//! [`CommandFrame`](frame::CommandFrame)s,
//! [`CommandDispatcher`](dispatch::CommandDispatcher) maps each frame to a
//! state transition plus response bytes, and
//! [`CatResponder`](responder::CatResponder) drives the whole thing from a
//! [`Transport`](emu817_core::Transport).

pub mod bcd;
pub mod dispatch;
pub mod frame;
pub mod responder;

pub use dispatch::CommandDispatcher;
pub use frame::{CommandFrame, FrameAssembler, FRAME_LEN};
pub use responder::CatResponder;
