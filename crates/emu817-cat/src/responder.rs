//! The CAT session loop: transport in, dispatcher out.

use std::time::Duration;

use tracing::{debug, info, warn};

use emu817_core::{Error, Result, Transport};

use crate::dispatch::CommandDispatcher;
use crate::frame::FrameAssembler;

/// Default idle poll interval for the serial read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

const READ_BUF_LEN: usize = 64;

/// Drives one CAT session: reads bytes from a [`Transport`], assembles
/// them into frames, dispatches each frame, and writes the response
/// bytes back.
///
/// Strictly sequential: one frame is fully dispatched and answered
/// before the next byte is considered, which is what a real radio's
/// single CAT UART guarantees.
pub struct CatResponder {
    transport: Box<dyn Transport>,
    dispatcher: CommandDispatcher,
    read_timeout: Duration,
}

impl CatResponder {
    pub fn new(transport: Box<dyn Transport>, dispatcher: CommandDispatcher) -> Self {
        CatResponder {
            transport,
            dispatcher,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the idle read timeout (mainly for tests).
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Read access to the dispatcher's state store.
    pub fn state(&self) -> &emu817_core::TransceiverState {
        self.dispatcher.state()
    }

    /// Serve the session until the client hangs up or the transport
    /// fails.
    ///
    /// A read timeout is an idle line, not an error. A zero-length read
    /// is a clean hangup and returns `Ok(())`. Any other transport error
    /// ends the session with that error. On every exit path the backend
    /// is stopped and the transport closed before this returns, so no
    /// signal-chain process or open port outlives the session.
    pub async fn run(&mut self) -> Result<()> {
        let mut assembler = FrameAssembler::new();
        let mut buf = [0u8; READ_BUF_LEN];

        loop {
            let n = match self.transport.receive(&mut buf, self.read_timeout).await {
                Ok(0) => {
                    info!("client closed the connection");
                    self.teardown().await;
                    return Ok(());
                }
                Ok(n) => n,
                Err(Error::Timeout) => continue,
                Err(e) => {
                    warn!(error = %e, "transport failed, ending session");
                    self.teardown().await;
                    return Err(e);
                }
            };

            for &byte in &buf[..n] {
                let Some(frame) = assembler.push(byte) else {
                    continue;
                };
                debug!(opcode = frame.opcode, payload = ?frame.payload, "frame received");
                let response = self.dispatcher.dispatch(&frame).await;
                if response.is_empty() {
                    continue;
                }
                if let Err(e) = self.transport.send(&response).await {
                    warn!(error = %e, "response write failed, ending session");
                    self.teardown().await;
                    return Err(e);
                }
            }
        }
    }

    /// Stop the backend and close the transport. For callers that end the
    /// session from outside `run`, e.g. on a shutdown signal.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stop_backend().await;
        self.transport.close().await
    }

    async fn teardown(&mut self) {
        self.stop_backend().await;
        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "transport close failed");
        }
    }

    async fn stop_backend(&mut self) {
        if let Err(e) = self.dispatcher.shutdown().await {
            warn!(error = %e, "backend stop failed");
        }
    }
}
