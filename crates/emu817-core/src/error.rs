//! Error types for emu817.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! backend-layer errors are all captured here.

/// The error type for all emu817 operations.
///
/// Variants cover the failure modes of a protocol responder fronting an SDR
/// back end: serial transport failures, malformed CAT frames, and signal
/// chain (backend) process failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, PTY pair).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed BCD payload, bad frame).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The SDR backend failed to start, restart, or stop a signal chain.
    #[error("backend error: {0}")]
    Backend(String),

    /// Timed out waiting for data or a backend readiness signal.
    #[error("timed out")]
    Timeout,

    /// No transport connection has been established.
    #[error("not connected")]
    NotConnected,

    /// The transport connection was lost unexpectedly.
    ///
    /// For the responder this is fatal: the run loop tears down the backend
    /// and propagates this error.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_protocol() {
        let e = Error::Protocol("invalid BCD nibble".into());
        assert_eq!(e.to_string(), "protocol error: invalid BCD nibble");
    }

    #[test]
    fn error_display_backend() {
        let e = Error::Backend("rtl_sdr exited".into());
        assert_eq!(e.to_string(), "backend error: rtl_sdr exited");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
