//! Backend controller trait: the SDR signal-chain collaborator.
//!
//! The dispatcher mutates the [`TransceiverState`] first and then asks the
//! backend to make reality match, passing the state store itself rather
//! than parameters. A slow or failed restart must never corrupt the store;
//! the dispatcher logs the failure and leaves the requested state standing,
//! so subsequent queries reflect what the client asked for even if the
//! signal chain is down.

use async_trait::async_trait;

use crate::error::Result;
use crate::state::TransceiverState;

/// Controller for the receive/transmit signal chains behind the emulator.
///
/// Implementations spawn and kill external SDR pipelines (`ProcessBackend`
/// in the daemon) or just record calls (`MockBackend` in the harness).
#[async_trait]
pub trait BackendController: Send {
    /// Start, or restart, the signal chain for the current state.
    ///
    /// Called after every frequency, mode, or VFO change. Implementations
    /// read the frequency and mode out of `state`; a previously running
    /// chain is torn down first. Expected to complete in bounded time,
    /// observing a readiness signal where the underlying process offers one.
    async fn apply(&mut self, state: &TransceiverState) -> Result<()>;

    /// Stop any running signal chain.
    ///
    /// Must be idempotent: calling `stop` with nothing running is a no-op.
    /// Invoked on orderly shutdown, on interrupt, and on fatal transport
    /// errors, before the process exits.
    async fn stop(&mut self) -> Result<()>;
}
