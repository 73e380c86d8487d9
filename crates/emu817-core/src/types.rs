//! Operating-mode and VFO types for the emulated FT-817.
//!
//! The FT-817 CAT protocol identifies modes by a single wire byte. Only the
//! eight codes the radio documents are valid; anything else on the wire is
//! rejected by the dispatcher.

use std::fmt;
use std::str::FromStr;

/// One of the two tunable frequency registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vfo {
    /// VFO A, the power-on default.
    #[default]
    A,
    /// VFO B.
    B,
}

impl Vfo {
    /// Return the other VFO.
    pub fn toggled(self) -> Vfo {
        match self {
            Vfo::A => Vfo::B,
            Vfo::B => Vfo::A,
        }
    }
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vfo::A => write!(f, "VFO-A"),
            Vfo::B => write!(f, "VFO-B"),
        }
    }
}

/// Operating mode of the emulated transceiver.
///
/// Each variant maps to the wire byte the FT-817 CAT protocol uses for it.
/// The set is fixed; there are no data sub-modes on this radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Lower sideband voice (0x00).
    LSB,
    /// Upper sideband voice (0x01).
    USB,
    /// CW, upper sideband offset (0x02).
    CW,
    /// CW reverse (0x03).
    CWR,
    /// Amplitude modulation (0x04).
    AM,
    /// Frequency modulation (0x08).
    FM,
    /// Digital (AFSK sound-card modes, 0x0A).
    DIG,
    /// Packet (0x0C).
    PKT,
}

impl Mode {
    /// The wire byte for this mode.
    pub fn code(self) -> u8 {
        match self {
            Mode::LSB => 0x00,
            Mode::USB => 0x01,
            Mode::CW => 0x02,
            Mode::CWR => 0x03,
            Mode::AM => 0x04,
            Mode::FM => 0x08,
            Mode::DIG => 0x0A,
            Mode::PKT => 0x0C,
        }
    }

    /// Look up a mode by its wire byte. Returns `None` for codes the
    /// FT-817 does not define; the dispatcher treats those as a rejected
    /// mode change.
    pub fn from_code(code: u8) -> Option<Mode> {
        match code {
            0x00 => Some(Mode::LSB),
            0x01 => Some(Mode::USB),
            0x02 => Some(Mode::CW),
            0x03 => Some(Mode::CWR),
            0x04 => Some(Mode::AM),
            0x08 => Some(Mode::FM),
            0x0A => Some(Mode::DIG),
            0x0C => Some(Mode::PKT),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::LSB => "LSB",
            Mode::USB => "USB",
            Mode::CW => "CW",
            Mode::CWR => "CWR",
            Mode::AM => "AM",
            Mode::FM => "FM",
            Mode::DIG => "DIG",
            Mode::PKT => "PKT",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode: '{}'. Expected: lsb, usb, cw, cwr, am, fm, dig, pkt",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LSB" => Ok(Mode::LSB),
            "USB" => Ok(Mode::USB),
            "CW" => Ok(Mode::CW),
            "CWR" => Ok(Mode::CWR),
            "AM" => Ok(Mode::AM),
            "FM" => Ok(Mode::FM),
            "DIG" => Ok(Mode::DIG),
            "PKT" => Ok(Mode::PKT),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
