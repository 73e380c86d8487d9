//! Transport trait for the CAT byte stream.
//!
//! The [`Transport`] trait abstracts over the serial-like duplex link the
//! remote CAT client talks through. The responder consumes raw request bytes
//! and writes raw response bytes; all framing (the fixed 5-byte command
//! size) lives above this seam.
//!
//! Implementations exist for real serial ports / PTY pairs
//! (`SerialTransport` in `emu817-transport`) and for deterministic tests
//! (`ScriptedTransport` in `emu817-harness`).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport carrying CAT traffic.
///
/// The responder does bounded-timeout reads so it can interleave shutdown
/// checks; a read timeout means the line is idle, not broken.
#[async_trait]
pub trait Transport: Send {
    /// Write response bytes to the remote client.
    ///
    /// Implementations should not return until all bytes are handed to the
    /// underlying device.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read available request bytes into `buf`, waiting up to `timeout`.
    ///
    /// Returns the number of bytes read. Returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) when nothing arrives
    /// within the deadline and
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) when
    /// the peer is gone.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport is currently usable.
    fn is_connected(&self) -> bool;
}
