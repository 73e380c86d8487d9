//! Serial transport for the CAT responder.
//!
//! The emulator sits on the radio side of the serial link, usually a pty
//! created with `socat` so that logging software believes it is talking
//! to a real FT-817 on a USB adapter.

pub mod serial;

pub use serial::{SerialConfig, SerialTransport, StopBits};
