//! Startup configuration for the emulator.
//!
//! Consumed exactly once at initialization to seed the
//! [`TransceiverState`](crate::state::TransceiverState) and open the
//! transport. Nothing is persisted; every process start begins from this
//! configuration.

use crate::types::Mode;

/// The FT-817's default CAT baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 4800;

/// Default boot frequency: 14.074 MHz, the 20 m FT8 calling frequency.
pub const DEFAULT_FREQUENCY: u64 = 14_074_000;

/// Startup configuration, typically produced by the daemon's CLI layer.
#[derive(Debug, Clone)]
pub struct RadioConfig {
    /// Serial device path (conventionally one end of a PTY pair, e.g.
    /// `/tmp/ttyv1`).
    pub port: String,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Initial frequency in Hz for both VFOs.
    pub frequency: u64,
    /// Initial operating mode.
    pub mode: Mode,
    /// Boot with the front panel locked.
    pub lock: bool,
    /// Boot with split operation enabled.
    pub split: bool,
    /// Boot with the clarifier enabled.
    pub clarifier: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            port: "/tmp/ttyv1".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            frequency: DEFAULT_FREQUENCY,
            mode: Mode::USB,
            lock: false,
            split: false,
            clarifier: false,
        }
    }
}
