//! Frame Codec
//!
//! Reads and writes signal values in raw CAN frame payloads. Handles bit
//! extraction, bit insertion, endianness and sign extension. The codec holds no
//! state; every call works on a caller-supplied buffer.

use crate::signals::descriptor::{SignalDescriptor, ValueType};
use crate::types::{ByteOrder, Result, SignalError, SignalValue};

/// Frame codec - moves signal values in and out of CAN frame data
pub struct FrameCodec;

impl FrameCodec {
    /// Decode the raw unsigned value of a signal
    ///
    /// # Arguments
    /// * `frame` - Frame payload bytes
    /// * `descriptor` - Signal to read
    /// * `byte_order` - Intel (little-endian) or Motorola (big-endian) layout
    ///
    /// # Returns
    /// * `Ok(value)` with the `length` bits of the signal
    /// * `Err(OutOfBounds)` if the signal does not fit in the frame
    ///
    /// # Example
    /// ```
    /// use can_signal::{ByteOrder, FrameCodec, SignalDescriptor};
    ///
    /// let sig = SignalDescriptor::new("EngineSpeed", 0, 16).unwrap();
    /// let data = [0xAB, 0xCD, 0, 0, 0, 0, 0, 0];
    /// let value = FrameCodec::decode(&data, &sig, ByteOrder::LittleEndian).unwrap();
    /// assert_eq!(value, 0xCDAB);
    /// ```
    pub fn decode(frame: &[u8], descriptor: &SignalDescriptor, byte_order: ByteOrder) -> Result<u64> {
        Self::check_bounds(frame, descriptor)?;

        let start_bit = descriptor.offset() as usize;
        let length = descriptor.length() as usize;

        let value = match byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(frame, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(frame, start_bit, length),
        };

        log::trace!(
            "Decoded `{}` ({}, {}) = {:#x}",
            descriptor.name(),
            descriptor.field(),
            byte_order,
            value
        );
        Ok(value)
    }

    /// Decode a signal and sign-extend it from its bit length
    pub fn decode_signed(
        frame: &[u8],
        descriptor: &SignalDescriptor,
        byte_order: ByteOrder,
    ) -> Result<i64> {
        let raw = Self::decode(frame, descriptor, byte_order)?;
        Ok(Self::sign_extend(raw, descriptor.length() as usize))
    }

    /// Decode a signal, applying the value type of its bit field
    pub fn decode_value(
        frame: &[u8],
        descriptor: &SignalDescriptor,
        byte_order: ByteOrder,
    ) -> Result<SignalValue> {
        let raw = Self::decode(frame, descriptor, byte_order)?;
        Ok(Self::interpret(raw, descriptor))
    }

    /// Interpret a raw bit pattern according to the descriptor's value type
    pub(crate) fn interpret(raw: u64, descriptor: &SignalDescriptor) -> SignalValue {
        match descriptor.field().value_type() {
            ValueType::Unsigned => SignalValue::Unsigned(raw),
            ValueType::Signed => {
                SignalValue::Signed(Self::sign_extend(raw, descriptor.length() as usize))
            }
        }
    }

    /// Encode an unsigned value into the bits of a signal
    ///
    /// Only the bits covered by the signal are modified. The frame is left
    /// untouched when an error is returned.
    ///
    /// # Errors
    /// * `OutOfBounds` if the signal does not fit in the frame
    /// * `ValueOverflow` if `value >= 2^length`
    pub fn encode(
        frame: &mut [u8],
        descriptor: &SignalDescriptor,
        value: u64,
        byte_order: ByteOrder,
    ) -> Result<()> {
        Self::check_bounds(frame, descriptor)?;

        if !descriptor.field().fits_unsigned(value) {
            return Err(SignalError::ValueOverflow {
                signal: descriptor.name().to_string(),
                value: i128::from(value),
                length: descriptor.length(),
            });
        }

        let start_bit = descriptor.offset() as usize;
        let length = descriptor.length() as usize;

        match byte_order {
            ByteOrder::LittleEndian => Self::insert_little_endian(frame, start_bit, length, value),
            ByteOrder::BigEndian => Self::insert_big_endian(frame, start_bit, length, value),
        }

        log::trace!(
            "Encoded `{}` ({}, {}) = {:#x}",
            descriptor.name(),
            descriptor.field(),
            byte_order,
            value
        );
        Ok(())
    }

    /// Encode a signed value as a two's complement bit pattern
    ///
    /// # Errors
    /// * `OutOfBounds` if the signal does not fit in the frame
    /// * `ValueOverflow` if `value` is outside `[-2^(length-1), 2^(length-1))`
    pub fn encode_signed(
        frame: &mut [u8],
        descriptor: &SignalDescriptor,
        value: i64,
        byte_order: ByteOrder,
    ) -> Result<()> {
        Self::check_bounds(frame, descriptor)?;

        if !descriptor.field().fits_signed(value) {
            return Err(SignalError::ValueOverflow {
                signal: descriptor.name().to_string(),
                value: i128::from(value),
                length: descriptor.length(),
            });
        }

        let raw = (value as u64) & descriptor.field().max_raw();
        Self::encode(frame, descriptor, raw, byte_order)
    }

    /// Encode a value of either sign, following the value type of the bit field
    ///
    /// Unsigned fields take the full `0..2^length` range, so an `Unsigned`
    /// value goes straight to [`encode`](Self::encode). Negative values only
    /// fit signed fields.
    pub fn encode_value(
        frame: &mut [u8],
        descriptor: &SignalDescriptor,
        value: SignalValue,
        byte_order: ByteOrder,
    ) -> Result<()> {
        Self::check_bounds(frame, descriptor)?;

        let overflow = || SignalError::ValueOverflow {
            signal: descriptor.name().to_string(),
            value: value.as_i128(),
            length: descriptor.length(),
        };

        match (descriptor.field().value_type(), value) {
            (ValueType::Unsigned, SignalValue::Unsigned(v)) => {
                Self::encode(frame, descriptor, v, byte_order)
            }
            (ValueType::Unsigned, SignalValue::Signed(v)) => {
                let v = u64::try_from(v).map_err(|_| overflow())?;
                Self::encode(frame, descriptor, v, byte_order)
            }
            (ValueType::Signed, SignalValue::Signed(v)) => {
                Self::encode_signed(frame, descriptor, v, byte_order)
            }
            (ValueType::Signed, SignalValue::Unsigned(v)) => {
                let v = i64::try_from(v).map_err(|_| overflow())?;
                Self::encode_signed(frame, descriptor, v, byte_order)
            }
        }
    }

    fn check_bounds(frame: &[u8], descriptor: &SignalDescriptor) -> Result<()> {
        let frame_bits = frame.len() as u64 * 8;
        if !descriptor.fits_within(frame_bits) {
            return Err(SignalError::OutOfBounds {
                signal: descriptor.name().to_string(),
                end_bit: descriptor.end_bit(),
                frame_bits,
            });
        }
        Ok(())
    }

    /// Extract signal with little-endian (Intel) byte order
    ///
    /// Little-endian format:
    /// - Start bit points to the LSB (least significant bit)
    /// - Bits are numbered from LSB to MSB within each byte
    /// - Byte 0 is the first byte in the CAN frame
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << i;
        }

        result
    }

    /// Extract signal with big-endian (Motorola) byte order
    ///
    /// Big-endian format:
    /// - Start bit points to the MSB (most significant bit) of the signal
    /// - Bit numbering: bit 0 = MSB of byte 0, bit 7 = LSB of byte 0
    /// - Signal grows towards higher bit numbers
    fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << (length - 1 - i);
        }

        result
    }

    /// Insert signal bits with little-endian (Intel) byte order
    fn insert_little_endian(data: &mut [u8], start_bit: usize, length: usize, value: u64) {
        for i in 0..length {
            let bit_pos = start_bit + i;
            let bit_value = ((value >> i) & 0x01) as u8;
            Self::write_bit(data, bit_pos / 8, bit_pos % 8, bit_value);
        }
    }

    /// Insert signal bits with big-endian (Motorola) byte order
    fn insert_big_endian(data: &mut [u8], start_bit: usize, length: usize, value: u64) {
        for i in 0..length {
            let bit_pos = start_bit + i;
            let bit_value = ((value >> (length - 1 - i)) & 0x01) as u8;
            Self::write_bit(data, bit_pos / 8, 7 - (bit_pos % 8), bit_value);
        }
    }

    fn write_bit(data: &mut [u8], byte_idx: usize, bit_in_byte: usize, bit_value: u8) {
        let mask = 1u8 << bit_in_byte;
        data[byte_idx] = (data[byte_idx] & !mask) | (bit_value << bit_in_byte);
    }

    /// Sign-extend a value from N bits to 64 bits
    ///
    /// If the value's MSB is 1, fill the upper bits with 1s.
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}
