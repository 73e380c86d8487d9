//! The mutable operating state of the emulated transceiver.
//!
//! A single [`TransceiverState`] instance is owned by the command dispatcher
//! and mutated only in response to CAT frames. The run loop is single
//! threaded by construction (one serial stream, awaited dispatch), so the
//! store needs no interior locking; if a second transport is ever added,
//! this struct becomes the one value to put behind a mutex.

use std::fmt;

use crate::config::RadioConfig;
use crate::types::{Mode, Vfo};

/// Operating state of the emulated FT-817.
///
/// Frequencies are in hertz at the protocol's 10 Hz resolution. The state is
/// seeded from [`RadioConfig`] at startup and lives for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiverState {
    /// VFO A frequency in Hz.
    pub vfo_a: u64,
    /// VFO B frequency in Hz.
    pub vfo_b: u64,
    /// Which VFO is active for tuning and queries.
    pub active_vfo: Vfo,
    /// Current operating mode.
    pub mode: Mode,
    /// Transmit-key state.
    pub ptt: bool,
    /// Split operation (TX on the inactive VFO).
    pub split: bool,
    /// Clarifier (receive offset) enabled.
    pub clarifier: bool,
    /// Front-panel lock.
    pub lock: bool,
}

impl TransceiverState {
    /// Seed the state store from startup configuration.
    ///
    /// Both VFOs start on the configured frequency; there is no persisted
    /// state to restore.
    pub fn from_config(config: &RadioConfig) -> Self {
        TransceiverState {
            vfo_a: config.frequency,
            vfo_b: config.frequency,
            active_vfo: Vfo::A,
            mode: config.mode,
            ptt: false,
            split: config.split,
            clarifier: config.clarifier,
            lock: config.lock,
        }
    }

    /// Frequency of the active VFO in Hz.
    pub fn active_frequency(&self) -> u64 {
        match self.active_vfo {
            Vfo::A => self.vfo_a,
            Vfo::B => self.vfo_b,
        }
    }

    /// Retune the active VFO.
    pub fn set_active_frequency(&mut self, freq_hz: u64) {
        match self.active_vfo {
            Vfo::A => self.vfo_a = freq_hz,
            Vfo::B => self.vfo_b = freq_hz,
        }
    }

    /// Switch the active VFO between A and B.
    pub fn toggle_vfo(&mut self) {
        self.active_vfo = self.active_vfo.toggled();
    }

    /// One-line operator status summary, logged after every state change.
    ///
    /// Example: `(14074000/14074000) <VFO-A> USB RX <S> <+> <*>` where the
    /// trailing markers appear only when split, clarifier, and lock are on.
    pub fn status_line(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for TransceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}/{}) <{}> {} {}",
            self.vfo_a,
            self.vfo_b,
            self.active_vfo,
            self.mode,
            if self.ptt { "TX" } else { "RX" },
        )?;
        if self.split {
            write!(f, " <S>")?;
        }
        if self.clarifier {
            write!(f, " <+>")?;
        }
        if self.lock {
            write!(f, " <*>")?;
        }
        Ok(())
    }
}
