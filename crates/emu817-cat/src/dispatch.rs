//! Command dispatcher: the CAT protocol state machine.
//!
//! Dispatch is a total `match` keyed on the opcode byte; the state that
//! persists between commands is the [`TransceiverState`] store, not the
//! dispatcher itself. Each handler applies its state transition, invokes
//! the backend where the contract requires it, and returns the response
//! bytes (0 to 5 of them, no framing).
//!
//! # Acknowledgement bytes
//!
//! Single-byte acks use `0x00` and `0xF0`. Roughly, `0xF0` means "already
//! in the requested or terminal state" and `0x00` means "changed by this
//! command", but the ON/OFF opcode families are not consistent with each
//! other (0x08 and 0x88 invert the rule relative to one another). Real
//! clients depend on the exact bytes, so each handler pins its observed
//! behavior verbatim instead of normalizing to one rule; the per-opcode
//! tests are the contract.

use bytes::{BufMut, BytesMut};
use tracing::{debug, error, info, warn};

use emu817_core::{BackendController, Mode, Result, TransceiverState};

use crate::bcd::{decode_freq, encode_freq};
use crate::frame::CommandFrame;

/// CAT opcodes understood by the responder.
pub mod opcode {
    /// Toggle the front-panel lock.
    pub const LOCK_TOGGLE: u8 = 0x00;
    /// Set the active VFO frequency (payload: packed-BCD frequency).
    pub const SET_FREQUENCY: u8 = 0x01;
    /// Split on (toggle-coded in practice).
    pub const SPLIT_ON: u8 = 0x02;
    /// Query the active VFO frequency and mode.
    pub const QUERY_FREQUENCY: u8 = 0x03;
    /// Clarifier on.
    pub const CLAR_ON: u8 = 0x05;
    /// Set the operating mode (payload byte 0: mode code).
    pub const SET_MODE: u8 = 0x07;
    /// Key the transmitter.
    pub const PTT_ON: u8 = 0x08;
    /// Read the TX keyed state (undocumented on the real radio).
    pub const READ_KEYED: u8 = 0x10;
    /// Release the front-panel lock.
    pub const LOCK_OFF: u8 = 0x80;
    /// Switch the active VFO between A and B.
    pub const TOGGLE_VFO: u8 = 0x81;
    /// Split off.
    pub const SPLIT_OFF: u8 = 0x82;
    /// Clarifier off.
    pub const CLAR_OFF: u8 = 0x85;
    /// Unkey the transmitter.
    pub const PTT_OFF: u8 = 0x88;
    /// Read EEPROM (no persistent storage is modeled).
    pub const READ_EEPROM: u8 = 0xBB;
    /// Read TX metering (stub).
    pub const READ_TX_METER: u8 = 0xBD;
    /// Read RX status (signal/squelch metering is not modeled).
    pub const READ_RX_STATUS: u8 = 0xE7;
    /// Set the clarifier frequency (stub).
    pub const SET_CLAR_FREQ: u8 = 0xF5;
    /// Read TX status bitmask.
    pub const READ_TX_STATUS: u8 = 0xF7;
}

/// Opcodes the emulator recognizes but deliberately ignores: repeater
/// offsets, CTCSS/DCS, power on/off, EEPROM writes, factory reset. The
/// contract for these is zero response bytes.
const UNSUPPORTED: &[u8] = &[
    0x09, 0x0A, 0x0B, 0x0C, 0x0F, 0x8F, 0xA7, 0xBA, 0xBC, 0xBE, 0xF9,
];

/// The CAT command dispatcher.
///
/// Owns the single [`TransceiverState`] instance and the backend
/// controller. One frame in, one state transition, one response out.
/// The state store is always updated before the backend is invoked; the
/// backend reads state, not parameters, and a backend failure neither
/// rolls the state back nor retracts the response.
pub struct CommandDispatcher {
    state: TransceiverState,
    backend: Box<dyn BackendController>,
}

impl CommandDispatcher {
    /// Create a dispatcher over a seeded state store and a backend.
    pub fn new(state: TransceiverState, backend: Box<dyn BackendController>) -> Self {
        CommandDispatcher { state, backend }
    }

    /// Read access to the state store, for status display and tests.
    pub fn state(&self) -> &TransceiverState {
        &self.state
    }

    /// Start the backend for the initial state.
    ///
    /// The receiver chain comes up before any CAT traffic is served; a
    /// failure here is fatal to startup, unlike mid-session restarts.
    pub async fn start_backend(&mut self) -> Result<()> {
        self.backend.apply(&self.state).await
    }

    /// Stop the backend. Called on every exit path.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.backend.stop().await
    }

    /// Process one command frame and return the response bytes.
    ///
    /// Never fails: malformed payloads and unknown opcodes are handled per
    /// the protocol contract (logged, state preserved, response as
    /// documented), not surfaced as errors.
    pub async fn dispatch(&mut self, frame: &CommandFrame) -> Vec<u8> {
        let before = self.state.clone();
        let response = self.dispatch_inner(frame).await;
        if self.state != before {
            info!(status = %self.state, "state changed");
        }
        response
    }

    async fn dispatch_inner(&mut self, frame: &CommandFrame) -> Vec<u8> {
        match frame.opcode {
            opcode::SET_FREQUENCY => self.set_frequency(frame).await,
            opcode::QUERY_FREQUENCY => self.query_frequency(),
            opcode::READ_TX_STATUS => self.read_tx_status(),
            opcode::READ_RX_STATUS => vec![0x00],
            opcode::READ_EEPROM => vec![0x00, 0x00],
            opcode::TOGGLE_VFO => self.toggle_vfo().await,
            opcode::LOCK_TOGGLE => self.lock_toggle(),
            opcode::LOCK_OFF => self.lock_off(),
            opcode::SPLIT_ON => self.split_on(),
            opcode::SPLIT_OFF => self.split_off(),
            opcode::CLAR_ON => self.clarifier_on(),
            opcode::CLAR_OFF => self.clarifier_off(),
            opcode::SET_MODE => self.set_mode(frame).await,
            opcode::PTT_ON => self.ptt_on(),
            opcode::PTT_OFF => self.ptt_off(),
            opcode::READ_KEYED => self.read_keyed(),
            // Stub ack so the client's blocking read returns instead of
            // hanging on a command we do not model.
            opcode::READ_TX_METER => {
                debug!("CAT[0xBD] TX metering not modeled, stub ack");
                vec![0x00]
            }
            opcode::SET_CLAR_FREQ => {
                debug!("CAT[0xF5] clarifier frequency not modeled, stub ack");
                vec![0x00]
            }
            op if UNSUPPORTED.contains(&op) => {
                debug!("CAT[0x{op:02X}] unsupported, ignored");
                Vec::new()
            }
            op => {
                warn!(payload = ?frame.payload, "CAT[0x{op:02X}] unrecognized opcode, ignored");
                Vec::new()
            }
        }
    }

    /// Re-apply the backend after a frequency/mode/VFO change.
    ///
    /// The state already holds the new value when this runs. A failure is
    /// reported to the operator and the requested state stands; subsequent
    /// queries reflect what the client asked for, not what the signal
    /// chain achieved.
    async fn apply_backend(&mut self) {
        if let Err(e) = self.backend.apply(&self.state).await {
            error!(error = %e, "backend restart failed");
        }
    }

    async fn set_frequency(&mut self, frame: &CommandFrame) -> Vec<u8> {
        match decode_freq(&frame.payload) {
            Ok(freq_hz) => {
                let vfo = self.state.active_vfo;
                self.state.set_active_frequency(freq_hz);
                self.apply_backend().await;
                debug!(%vfo, freq_hz, "CAT[0x01] set frequency");
            }
            Err(e) => {
                // Malformed payload: state untouched, backend not called,
                // but the client still gets the ack it will read.
                warn!(payload = ?frame.payload, error = %e, "CAT[0x01] malformed frequency");
            }
        }
        vec![0x00]
    }

    fn query_frequency(&self) -> Vec<u8> {
        let freq_hz = self.state.active_frequency();
        let mut buf = BytesMut::with_capacity(5);
        match encode_freq(freq_hz) {
            Ok(bcd) => buf.put_slice(&bcd),
            Err(e) => {
                // Unreachable through CAT (decode caps at 8 digits), but a
                // hostile config could seed an oversized frequency.
                error!(freq_hz, error = %e, "CAT[0x03] frequency not encodable");
                buf.put_slice(&[0x00; 4]);
            }
        }
        buf.put_u8(self.state.mode.code());
        buf.to_vec()
    }

    fn read_tx_status(&self) -> Vec<u8> {
        // bit7: set when NOT transmitting; bit5: set when split is on.
        let mut status = 0u8;
        if !self.state.ptt {
            status |= 0b1000_0000;
        }
        if self.state.split {
            status |= 0b0010_0000;
        }
        vec![status]
    }

    async fn toggle_vfo(&mut self) -> Vec<u8> {
        self.state.toggle_vfo();
        self.apply_backend().await;
        debug!(vfo = %self.state.active_vfo, "CAT[0x81] VFO switched");
        vec![0x00]
    }

    fn lock_toggle(&mut self) -> Vec<u8> {
        self.state.lock = !self.state.lock;
        // 0xF0 when the toggle lands on "locked".
        vec![if self.state.lock { 0xF0 } else { 0x00 }]
    }

    fn lock_off(&mut self) -> Vec<u8> {
        let was = self.state.lock;
        self.state.lock = false;
        vec![if was { 0x00 } else { 0xF0 }]
    }

    fn split_on(&mut self) -> Vec<u8> {
        // Toggle-coded: the "on" opcode flips, and 0xF0 reports it was
        // already on.
        let was = self.state.split;
        self.state.split = !was;
        vec![if was { 0xF0 } else { 0x00 }]
    }

    fn split_off(&mut self) -> Vec<u8> {
        let was = self.state.split;
        self.state.split = false;
        vec![if was { 0x00 } else { 0xF0 }]
    }

    fn clarifier_on(&mut self) -> Vec<u8> {
        let was = self.state.clarifier;
        self.state.clarifier = true;
        vec![if was { 0xF0 } else { 0x00 }]
    }

    fn clarifier_off(&mut self) -> Vec<u8> {
        let was = self.state.clarifier;
        self.state.clarifier = false;
        vec![if was { 0x00 } else { 0xF0 }]
    }

    async fn set_mode(&mut self, frame: &CommandFrame) -> Vec<u8> {
        let code = frame.payload[0];
        match Mode::from_code(code) {
            Some(mode) if mode != self.state.mode => {
                self.state.mode = mode;
                self.apply_backend().await;
                debug!(%mode, "CAT[0x07] mode changed");
            }
            Some(mode) => {
                debug!(%mode, "CAT[0x07] mode unchanged");
            }
            None => {
                warn!("CAT[0x07] invalid mode code 0x{code:02X}, ignored");
            }
        }
        // Acked even when the mode code is rejected.
        vec![0x00]
    }

    fn ptt_on(&mut self) -> Vec<u8> {
        let was = self.state.ptt;
        self.state.ptt = true;
        vec![if was { 0xF0 } else { 0x00 }]
    }

    fn ptt_off(&mut self) -> Vec<u8> {
        // Note the inversion against 0x08: here 0x00 reports a change.
        let was = self.state.ptt;
        self.state.ptt = false;
        vec![if was { 0x00 } else { 0xF0 }]
    }

    fn read_keyed(&self) -> Vec<u8> {
        vec![if self.state.ptt { 0xF0 } else { 0x00 }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu817_core::{RadioConfig, Vfo};
    use emu817_harness::MockBackend;

    fn frame(payload: [u8; 4], op: u8) -> CommandFrame {
        CommandFrame { payload, opcode: op }
    }

    fn cmd(op: u8) -> CommandFrame {
        frame([0; 4], op)
    }

    fn dispatcher() -> (CommandDispatcher, MockBackend) {
        let backend = MockBackend::new();
        let state = TransceiverState::from_config(&RadioConfig::default());
        (CommandDispatcher::new(state, Box::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn set_frequency_updates_active_vfo_and_acks() {
        let (mut d, backend) = dispatcher();
        let resp = d
            .dispatch(&frame([0x01, 0x40, 0x74, 0x00], opcode::SET_FREQUENCY))
            .await;
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().vfo_a, 14_074_000);
        // Backend saw the new value, because state is written first.
        assert_eq!(backend.applied().last().unwrap().vfo_a, 14_074_000);
    }

    #[tokio::test]
    async fn set_frequency_malformed_bcd_keeps_state_and_still_acks() {
        let (mut d, backend) = dispatcher();
        let resp = d
            .dispatch(&frame([0xFF, 0x40, 0x74, 0x00], opcode::SET_FREQUENCY))
            .await;
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().vfo_a, 14_074_000);
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn query_frequency_returns_bcd_plus_mode() {
        let (mut d, _backend) = dispatcher();
        let resp = d.dispatch(&cmd(opcode::QUERY_FREQUENCY)).await;
        // 14,074,000 Hz in USB (0x01)
        assert_eq!(resp, [0x01, 0x40, 0x74, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn query_follows_vfo_toggle() {
        let (mut d, backend) = dispatcher();
        d.dispatch(&frame([0x00, 0x70, 0x74, 0x00], opcode::SET_FREQUENCY))
            .await;
        let resp = d.dispatch(&cmd(opcode::TOGGLE_VFO)).await;
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().active_vfo, Vfo::B);
        // VFO B still holds the boot frequency.
        let resp = d.dispatch(&cmd(opcode::QUERY_FREQUENCY)).await;
        assert_eq!(resp, [0x01, 0x40, 0x74, 0x00, 0x01]);
        // Set frequency + VFO toggle both notified the backend.
        assert_eq!(backend.applied().len(), 2);
    }

    #[tokio::test]
    async fn tx_status_bitmask() {
        let (mut d, _backend) = dispatcher();
        // Receiving, no split: bit7 set.
        assert_eq!(d.dispatch(&cmd(opcode::READ_TX_STATUS)).await, [0b1000_0000]);

        d.dispatch(&cmd(opcode::PTT_ON)).await;
        d.dispatch(&cmd(opcode::SPLIT_ON)).await;
        // Transmitting with split: only bit5 set.
        assert_eq!(d.dispatch(&cmd(opcode::READ_TX_STATUS)).await, [0b0010_0000]);
    }

    #[tokio::test]
    async fn rx_status_and_eeprom_are_fixed() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::READ_RX_STATUS)).await, [0x00]);
        assert_eq!(d.dispatch(&cmd(opcode::READ_EEPROM)).await, [0x00, 0x00]);
    }

    #[tokio::test]
    async fn ptt_on_twice_flags_the_second() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::PTT_ON)).await, [0x00]);
        assert!(d.state().ptt);
        assert_eq!(d.dispatch(&cmd(opcode::PTT_ON)).await, [0xF0]);
        assert!(d.state().ptt);
    }

    #[tokio::test]
    async fn ptt_off_inverts_the_ack_rule() {
        let (mut d, _backend) = dispatcher();
        d.dispatch(&cmd(opcode::PTT_ON)).await;
        // Change reports 0x00...
        assert_eq!(d.dispatch(&cmd(opcode::PTT_OFF)).await, [0x00]);
        // ...and already-off reports 0xF0, the opposite of 0x08's rule.
        assert_eq!(d.dispatch(&cmd(opcode::PTT_OFF)).await, [0xF0]);
    }

    #[tokio::test]
    async fn read_keyed_reflects_ptt() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::READ_KEYED)).await, [0x00]);
        d.dispatch(&cmd(opcode::PTT_ON)).await;
        assert_eq!(d.dispatch(&cmd(opcode::READ_KEYED)).await, [0xF0]);
    }

    #[tokio::test]
    async fn lock_toggle_acks_the_new_state() {
        let (mut d, _backend) = dispatcher();
        // Unlocked -> locked: 0xF0.
        assert_eq!(d.dispatch(&cmd(opcode::LOCK_TOGGLE)).await, [0xF0]);
        assert!(d.state().lock);
        // Locked -> unlocked: 0x00.
        assert_eq!(d.dispatch(&cmd(opcode::LOCK_TOGGLE)).await, [0x00]);
        assert!(!d.state().lock);
    }

    #[tokio::test]
    async fn lock_off_acks_the_prior_state() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::LOCK_OFF)).await, [0xF0]);
        d.dispatch(&cmd(opcode::LOCK_TOGGLE)).await;
        assert_eq!(d.dispatch(&cmd(opcode::LOCK_OFF)).await, [0x00]);
        assert!(!d.state().lock);
    }

    #[tokio::test]
    async fn split_on_is_toggle_coded() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::SPLIT_ON)).await, [0x00]);
        assert!(d.state().split);
        // "On" again actually toggles off, reporting it was on.
        assert_eq!(d.dispatch(&cmd(opcode::SPLIT_ON)).await, [0xF0]);
        assert!(!d.state().split);
    }

    #[tokio::test]
    async fn split_off_always_clears() {
        let (mut d, _backend) = dispatcher();
        d.dispatch(&cmd(opcode::SPLIT_ON)).await;
        assert_eq!(d.dispatch(&cmd(opcode::SPLIT_OFF)).await, [0x00]);
        assert!(!d.state().split);
        assert_eq!(d.dispatch(&cmd(opcode::SPLIT_OFF)).await, [0xF0]);
        assert!(!d.state().split);
    }

    #[tokio::test]
    async fn clarifier_pair() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::CLAR_ON)).await, [0x00]);
        assert_eq!(d.dispatch(&cmd(opcode::CLAR_ON)).await, [0xF0]);
        assert!(d.state().clarifier);
        assert_eq!(d.dispatch(&cmd(opcode::CLAR_OFF)).await, [0x00]);
        assert_eq!(d.dispatch(&cmd(opcode::CLAR_OFF)).await, [0xF0]);
        assert!(!d.state().clarifier);
    }

    #[tokio::test]
    async fn set_mode_accepts_known_codes_and_notifies_backend() {
        let (mut d, backend) = dispatcher();
        let resp = d.dispatch(&frame([0x02, 0, 0, 0], opcode::SET_MODE)).await;
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().mode, Mode::CW);
        assert_eq!(backend.applied().last().unwrap().mode, Mode::CW);
    }

    #[tokio::test]
    async fn set_mode_unknown_code_keeps_mode_and_still_acks() {
        let (mut d, backend) = dispatcher();
        let resp = d.dispatch(&frame([0x99, 0, 0, 0], opcode::SET_MODE)).await;
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().mode, Mode::USB);
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn set_mode_same_mode_skips_backend() {
        let (mut d, backend) = dispatcher();
        let resp = d.dispatch(&frame([0x01, 0, 0, 0], opcode::SET_MODE)).await;
        assert_eq!(resp, [0x00]);
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn stub_opcodes_ack_one_byte() {
        let (mut d, _backend) = dispatcher();
        assert_eq!(d.dispatch(&cmd(opcode::READ_TX_METER)).await, [0x00]);
        assert_eq!(d.dispatch(&cmd(opcode::SET_CLAR_FREQ)).await, [0x00]);
    }

    #[tokio::test]
    async fn unsupported_opcodes_produce_no_bytes_and_no_state_change() {
        let (mut d, backend) = dispatcher();
        let before = d.state().clone();
        for &op in super::UNSUPPORTED {
            assert!(d.dispatch(&cmd(op)).await.is_empty(), "opcode 0x{op:02X}");
        }
        assert_eq!(*d.state(), before);
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn unknown_opcode_produces_no_bytes() {
        let (mut d, _backend) = dispatcher();
        let before = d.state().clone();
        assert!(d.dispatch(&cmd(0x42)).await.is_empty());
        assert_eq!(*d.state(), before);
    }

    #[tokio::test]
    async fn backend_failure_keeps_requested_state_and_ack() {
        let backend = MockBackend::new();
        backend.fail_next_apply();
        let state = TransceiverState::from_config(&RadioConfig::default());
        let mut d = CommandDispatcher::new(state, Box::new(backend.clone()));

        let resp = d
            .dispatch(&frame([0x00, 0x70, 0x74, 0x00], opcode::SET_FREQUENCY))
            .await;
        // Ack stands and the state keeps the requested value.
        assert_eq!(resp, [0x00]);
        assert_eq!(d.state().vfo_a, 7_074_000);
    }
}
