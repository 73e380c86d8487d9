//! Test doubles for the emu817 workspace.
//!
//! [`ScriptedTransport`] replays a pre-recorded byte stream through the
//! [`Transport`](emu817_core::Transport) trait and records everything the
//! code under test writes back. [`MockBackend`] records every state the
//! responder hands to the backend seam and can inject failures.
//!
//! Both live in a library crate rather than test modules so that the
//! protocol and daemon crates can share them.

pub mod mock_backend;
pub mod scripted_transport;

pub use mock_backend::MockBackend;
pub use scripted_transport::ScriptedTransport;
