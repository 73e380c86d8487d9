//! Packed-BCD frequency codec.
//!
//! The FT-817 carries frequencies as four packed-BCD bytes at 10 Hz
//! resolution, most significant byte first: 14.074 MHz divides down to
//! 1407400, zero-pads to the 8 digits `01407400`, and packs to
//! `[0x01, 0x40, 0x74, 0x00]`. (Note this is the opposite byte order from
//! Icom CI-V, which sends BCD least significant byte first.)

use emu817_core::{Error, Result};

/// Number of BCD bytes in a wire frequency.
pub const FREQ_BYTES: usize = 4;

/// Largest encodable frequency: 8 BCD digits at 10 Hz resolution.
pub const MAX_FREQ_HZ: u64 = 999_999_990;

/// Encode a frequency in hertz as 4 packed-BCD bytes (MSB first).
///
/// Fails with [`Error::Protocol`] when the frequency needs more than
/// 8 decimal digits at 10 Hz resolution, i.e. at 1 GHz and above; the
/// codec never saturates. Sub-10 Hz precision is truncated.
///
/// # Example
///
/// ```
/// use emu817_cat::bcd::encode_freq;
///
/// let bcd = encode_freq(14_074_000).unwrap();
/// assert_eq!(bcd, [0x01, 0x40, 0x74, 0x00]);
/// ```
pub fn encode_freq(freq_hz: u64) -> Result<[u8; FREQ_BYTES]> {
    let mut v = freq_hz / 10;
    if v > 99_999_999 {
        return Err(Error::Protocol(format!(
            "frequency {freq_hz} Hz exceeds 8 BCD digits"
        )));
    }

    let mut result = [0u8; FREQ_BYTES];
    for byte in result.iter_mut().rev() {
        let lo = (v % 10) as u8;
        v /= 10;
        let hi = (v % 10) as u8;
        v /= 10;
        *byte = (hi << 4) | lo;
    }
    Ok(result)
}

/// Decode 4 packed-BCD bytes (MSB first) back to a frequency in hertz.
///
/// Any nibble above 9 is malformed input and fails with
/// [`Error::Protocol`]; the dispatcher logs the event and leaves state
/// untouched. Exact inverse of [`encode_freq`] for every representable
/// frequency.
///
/// # Example
///
/// ```
/// use emu817_cat::bcd::decode_freq;
///
/// let freq = decode_freq(&[0x01, 0x40, 0x74, 0x00]).unwrap();
/// assert_eq!(freq, 14_074_000);
/// ```
pub fn decode_freq(bcd: &[u8; FREQ_BYTES]) -> Result<u64> {
    let mut v: u64 = 0;
    for (i, &byte) in bcd.iter().enumerate() {
        let hi = (byte >> 4) as u64;
        let lo = (byte & 0x0F) as u64;
        if hi > 9 || lo > 9 {
            return Err(Error::Protocol(format!(
                "invalid BCD digit at byte {i}: 0x{byte:02X}"
            )));
        }
        v = v * 100 + hi * 10 + lo;
    }
    Ok(v * 10)
}
