//! Core types for the CAN signal library
//!
//! This module defines the error type, the byte order convention, and the
//! values the codec hands back to callers. Frame buffers themselves are plain
//! byte slices owned by the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for signal operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Largest CAN FD payload in bytes
pub const MAX_FRAME_LEN: usize = 64;

/// Errors that can occur while building signal definitions or running the codec
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid length: {0} (must be between 1 and 64 bits)")]
    InvalidLength(i64),

    #[error("Invalid offset: {0} is less than 0")]
    InvalidOffset(i64),

    #[error("Invalid name: `{0}`")]
    InvalidName(String),

    #[error("Signal `{signal}` ends at bit {end_bit} but the frame only has {frame_bits} bits")]
    OutOfBounds {
        signal: String,
        end_bit: u64,
        frame_bits: u64,
    },

    #[error("Value {value} does not fit in the {length} bits of signal `{signal}`")]
    ValueOverflow {
        signal: String,
        value: i128,
        length: u32,
    },

    #[error("Message `{message}` expects {expected} data bytes, got {actual}")]
    FrameLengthMismatch {
        message: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid frame length: {0} bytes (CAN FD allows at most 64)")]
    InvalidFrameLength(usize),

    #[error("Signal `{0}` specified multiple times")]
    DuplicateSignal(String),

    #[error("Signal `{signal}` overlaps signal `{existing}`")]
    SignalOverlap { signal: String, existing: String },

    #[error("Invalid scale {scale} for signal `{signal}` (must be finite and non-zero)")]
    InvalidScaling { signal: String, scale: f64 },

    #[error("Enumerated value name `{0}` already exists")]
    DuplicateEnumName(String),

    #[error("Enumerated value {0} is already named")]
    DuplicateEnumValue(u64),

    #[error("Signal `{signal}` has no enumerated value named `{label}`")]
    UnknownLabel { signal: String, label: String },

    #[error("Physical value {value} is not representable for signal `{signal}`")]
    InvalidPhysicalValue { signal: String, value: f64 },

    #[error("Message with name `{0}` already exists")]
    DuplicateMessageName(String),

    #[error("Message with id 0x{0:X} already exists")]
    DuplicateMessageId(u32),

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("Message not found: CAN ID 0x{0:X}")]
    MessageNotFound(u32),
}

/// Byte order for signal extraction and insertion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    #[default]
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

impl ByteOrder {
    /// Convert a DBC-style Motorola start bit into a sequential big-endian offset.
    ///
    /// DBC files name the MSB of a Motorola signal using the sawtooth numbering
    /// (bit 7 is the MSB of byte 0, bit 8 the LSB of byte 1). The codec counts
    /// big-endian bits in transmission order instead, with offset 0 being the
    /// MSB of byte 0.
    pub fn motorola_offset(start_bit: u32) -> u32 {
        (start_bit / 8) * 8 + (7 - start_bit % 8)
    }

    /// Physical bit index of the `position`-th signal bit position
    ///
    /// Physical bits are numbered LSB first within each byte (bit 0 is the LSB
    /// of byte 0). Little-endian positions already use that numbering;
    /// big-endian positions count from the MSB of each byte.
    pub fn frame_bit(self, position: u64) -> u64 {
        match self {
            ByteOrder::LittleEndian => position,
            ByteOrder::BigEndian => (position / 8) * 8 + (7 - position % 8),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "little-endian"),
            ByteOrder::BigEndian => write!(f, "big-endian"),
        }
    }
}

/// Raw CAN frame as exchanged with a bus driver or log reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// CAN message ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
    /// True if this is a CAN-FD frame
    pub is_fd: bool,
}

impl CanFrame {
    /// Create a frame, deriving the extended and FD flags from the ID and payload size
    pub fn new(can_id: u32, data: Vec<u8>) -> Self {
        Self {
            can_id,
            is_extended: can_id > 0x7FF,
            is_fd: data.len() > 8,
            data,
        }
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Signal value as handed back by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Unsigned integer value
    Unsigned(u64),
    /// Two's complement value after sign extension
    Signed(i64),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Unsigned(v) => write!(f, "{}", v),
            SignalValue::Signed(v) => write!(f, "{}", v),
        }
    }
}

impl From<u64> for SignalValue {
    fn from(value: u64) -> Self {
        SignalValue::Unsigned(value)
    }
}

impl From<i64> for SignalValue {
    fn from(value: i64) -> Self {
        SignalValue::Signed(value)
    }
}

impl SignalValue {
    /// Pick the variant for an integer, preferring `Unsigned` for non-negative values
    pub fn from_i128(value: i128) -> Option<Self> {
        match u64::try_from(value) {
            Ok(v) => Some(SignalValue::Unsigned(v)),
            Err(_) => i64::try_from(value).ok().map(SignalValue::Signed),
        }
    }

    /// Widen to i128, which holds both variants exactly
    pub fn as_i128(&self) -> i128 {
        match self {
            SignalValue::Unsigned(v) => i128::from(*v),
            SignalValue::Signed(v) => i128::from(*v),
        }
    }

    /// Convert signal value to f64
    pub fn as_f64(&self) -> f64 {
        match self {
            SignalValue::Unsigned(v) => *v as f64,
            SignalValue::Signed(v) => *v as f64,
        }
    }

    /// Convert signal value to i64 if it fits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SignalValue::Unsigned(v) => i64::try_from(*v).ok(),
            SignalValue::Signed(v) => Some(*v),
        }
    }

    /// Check if this value is non-zero
    pub fn as_bool(&self) -> bool {
        match self {
            SignalValue::Unsigned(v) => *v != 0,
            SignalValue::Signed(v) => *v != 0,
        }
    }
}

/// A decoded signal with its current value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSignal {
    /// Signal name
    pub name: String,
    /// Value with the signal's signedness applied
    pub value: SignalValue,
    /// Raw bit pattern as read from the frame
    pub raw: u64,
    /// Scaled engineering value, for signals with a scale/offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<f64>,
    /// Name of the enumerated value, if the raw value has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A decoded CAN message with all its signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMessage {
    /// CAN message ID
    pub can_id: u32,
    /// Message name from the signal table
    pub name: String,
    /// All decoded signals, in layout order
    pub signals: Vec<DecodedSignal>,
}

impl DecodedMessage {
    /// Look up a decoded signal by name
    pub fn signal(&self, name: &str) -> Option<&DecodedSignal> {
        self.signals.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_value_conversions() {
        let unsigned = SignalValue::Unsigned(42);
        assert_eq!(unsigned.as_f64(), 42.0);
        assert_eq!(unsigned.as_i64(), Some(42));
        assert!(unsigned.as_bool());

        let signed = SignalValue::Signed(-3);
        assert_eq!(signed.as_f64(), -3.0);
        assert_eq!(signed.as_i64(), Some(-3));

        assert_eq!(SignalValue::Unsigned(u64::MAX).as_i64(), None);
        assert!(!SignalValue::Unsigned(0).as_bool());
    }

    #[test]
    fn test_signal_value_display() {
        assert_eq!(format!("{}", SignalValue::Unsigned(42)), "42");
        assert_eq!(format!("{}", SignalValue::Signed(-128)), "-128");
    }

    #[test]
    fn test_motorola_offset() {
        // MSB of byte 0
        assert_eq!(ByteOrder::motorola_offset(7), 0);
        // LSB of byte 0
        assert_eq!(ByteOrder::motorola_offset(0), 7);
        // MSB of byte 1
        assert_eq!(ByteOrder::motorola_offset(15), 8);
        assert_eq!(ByteOrder::motorola_offset(60), 59);
    }

    #[test]
    fn test_frame_bit_numbering() {
        assert_eq!(ByteOrder::LittleEndian.frame_bit(12), 12);
        // Big-endian position 0 is the MSB of byte 0
        assert_eq!(ByteOrder::BigEndian.frame_bit(0), 7);
        assert_eq!(ByteOrder::BigEndian.frame_bit(7), 0);
        assert_eq!(ByteOrder::BigEndian.frame_bit(12), 11);
    }

    #[test]
    fn test_signal_value_from_i128() {
        assert_eq!(SignalValue::from_i128(5), Some(SignalValue::Unsigned(5)));
        assert_eq!(SignalValue::from_i128(-5), Some(SignalValue::Signed(-5)));
        assert_eq!(
            SignalValue::from_i128(i128::from(u64::MAX)),
            Some(SignalValue::Unsigned(u64::MAX))
        );
        assert_eq!(SignalValue::from_i128(i128::from(u64::MAX) + 1), None);
        assert_eq!(SignalValue::from_i128(i128::from(i64::MIN) - 1), None);
        assert_eq!(SignalValue::Signed(-1).as_i128(), -1);
    }

    #[test]
    fn test_can_frame_flags() {
        let classic = CanFrame::new(0x123, vec![0; 8]);
        assert!(!classic.is_extended);
        assert!(!classic.is_fd);
        assert_eq!(classic.dlc(), 8);

        let fd = CanFrame::new(0x1234_5678, vec![0; 64]);
        assert!(fd.is_extended);
        assert!(fd.is_fd);
    }

    #[test]
    fn test_error_messages() {
        let err = SignalError::OutOfBounds {
            signal: "Speed".to_string(),
            end_bit: 69,
            frame_bits: 64,
        };
        assert_eq!(
            err.to_string(),
            "Signal `Speed` ends at bit 69 but the frame only has 64 bits"
        );
        assert_eq!(
            SignalError::MessageNotFound(0x3F2).to_string(),
            "Message not found: CAN ID 0x3F2"
        );
    }
}
