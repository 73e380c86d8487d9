//! emu817-core: Core types, traits, and error definitions for emu817.
//!
//! This crate defines the abstractions shared by the protocol responder,
//! the transport implementations, and the daemon binary:
//!
//! - [`TransceiverState`] -- the mutable operating state of the emulated rig
//! - [`Transport`] -- byte-level duplex channel carrying CAT traffic
//! - [`BackendController`] -- the SDR signal-chain collaborator
//! - [`Error`] / [`Result`] -- error handling

pub mod backend;
pub mod config;
pub mod error;
pub mod state;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use emu817_core::*`.
pub use backend::BackendController;
pub use config::{RadioConfig, DEFAULT_BAUD_RATE, DEFAULT_FREQUENCY};
pub use error::{Error, Result};
pub use state::TransceiverState;
pub use transport::Transport;
pub use types::{Mode, ParseModeError, Vfo};
