//! Main decoder API
//!
//! This module provides the primary interface for the library. The Decoder
//! struct owns a signal database and decodes or builds whole CAN frames by ID.

use crate::config::SignalTable;
use crate::signals::{DatabaseStats, SignalDatabase};
use crate::types::{CanFrame, DecodedMessage, Result, SignalError, SignalValue};

/// The main decoder struct - entry point for frame-level operations
pub struct Decoder {
    /// Internal signal database (loaded from signal tables)
    signal_db: SignalDatabase,
}

impl Decoder {
    /// Create a new decoder instance
    pub fn new() -> Self {
        Self {
            signal_db: SignalDatabase::new(),
        }
    }

    /// Create a decoder from a signal table
    ///
    /// # Example
    /// ```
    /// use can_signal::{CanFrame, Decoder, MessageConfig, SignalConfig, SignalTable};
    ///
    /// let table = SignalTable::new().add_message(
    ///     MessageConfig::new("VCFRONT_Occupancy", 0x3F2)
    ///         .add_signal(SignalConfig::new("VCFRONT_driverIsLeaving", 1, 1)),
    /// );
    /// let decoder = Decoder::from_table(&table).unwrap();
    ///
    /// let frame = CanFrame::new(0x3F2, vec![0x02, 0, 0, 0, 0, 0, 0, 0]);
    /// let message = decoder.decode_frame(&frame).unwrap();
    /// assert_eq!(message.signals[0].raw, 1);
    /// ```
    pub fn from_table(table: &SignalTable) -> Result<Self> {
        Ok(Self {
            signal_db: table.build_database()?,
        })
    }

    /// Add the messages of a signal table to the database
    ///
    /// The table is validated as a whole first; on error the decoder is unchanged.
    pub fn load_table(&mut self, table: &SignalTable) -> Result<()> {
        log::info!("Loading signal table with {} messages", table.messages.len());

        let mut merged = self.signal_db.clone();
        for message in table.build_database()?.messages() {
            merged.add_message(message.clone())?;
        }
        self.signal_db = merged;

        log::info!("Signal table loaded successfully");
        Ok(())
    }

    /// Decode all signals of a frame
    ///
    /// # Errors
    /// * `MessageNotFound` if no message is defined for the frame's CAN ID
    /// * `FrameLengthMismatch` if the payload size differs from the definition
    pub fn decode_frame(&self, frame: &CanFrame) -> Result<DecodedMessage> {
        let message_def = self
            .signal_db
            .message_by_id(frame.can_id)
            .ok_or(SignalError::MessageNotFound(frame.can_id))?;

        log::debug!("Decoding message: {} (ID 0x{:X})", message_def.name(), frame.can_id);

        Ok(DecodedMessage {
            can_id: frame.can_id,
            name: message_def.name().to_string(),
            signals: message_def.decode(&frame.data)?,
        })
    }

    /// Build a frame for `can_id` from named signal values
    ///
    /// Signals not listed stay zero.
    pub fn encode_frame(&self, can_id: u32, values: &[(&str, SignalValue)]) -> Result<CanFrame> {
        let message_def = self
            .signal_db
            .message_by_id(can_id)
            .ok_or(SignalError::MessageNotFound(can_id))?;

        let mut data = message_def.new_frame();
        for (name, value) in values {
            message_def.encode_signal(&mut data, name, *value)?;
        }

        log::debug!("Encoded message: {} (ID 0x{:X})", message_def.name(), can_id);
        Ok(CanFrame::new(can_id, data))
    }

    pub fn database(&self) -> &SignalDatabase {
        &self.signal_db
    }

    /// Get statistics about the loaded signal database
    pub fn database_stats(&self) -> DatabaseStats {
        self.signal_db.stats()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MessageConfig, SignalConfig};
    use crate::types::ByteOrder;

    fn table() -> SignalTable {
        SignalTable::new().add_message(
            MessageConfig::new("Powertrain", 0x100)
                .add_signal(SignalConfig::new("EngineSpeed", 0, 16))
                .add_signal(
                    SignalConfig::new("CoolantTemp", 16, 8)
                        .with_byte_order(ByteOrder::BigEndian)
                        .with_signed(true),
                ),
        )
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::new();
        let stats = decoder.database_stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
    }

    #[test]
    fn test_unknown_message() {
        let decoder = Decoder::new();
        let frame = CanFrame::new(0x7FF, vec![0; 8]);
        assert!(matches!(
            decoder.decode_frame(&frame),
            Err(SignalError::MessageNotFound(0x7FF))
        ));
        assert!(matches!(
            decoder.encode_frame(0x7FF, &[]),
            Err(SignalError::MessageNotFound(0x7FF))
        ));
    }

    #[test]
    fn test_encode_then_decode_frame() {
        let decoder = Decoder::from_table(&table()).unwrap();

        let frame = decoder
            .encode_frame(
                0x100,
                &[
                    ("EngineSpeed", SignalValue::Unsigned(3000)),
                    ("CoolantTemp", SignalValue::Signed(-40)),
                ],
            )
            .unwrap();
        assert_eq!(frame.data, vec![0xB8, 0x0B, 0xD8, 0, 0, 0, 0, 0]);

        let message = decoder.decode_frame(&frame).unwrap();
        assert_eq!(message.name, "Powertrain");
        assert_eq!(
            message.signal("EngineSpeed").unwrap().value,
            SignalValue::Unsigned(3000)
        );
        assert_eq!(
            message.signal("CoolantTemp").unwrap().value,
            SignalValue::Signed(-40)
        );
    }

    #[test]
    fn test_encode_frame_full_unsigned_range() {
        let table = SignalTable::new().add_message(
            MessageConfig::new("Counter", 0x300).add_signal(SignalConfig::new("Ticks", 0, 64)),
        );
        let decoder = Decoder::from_table(&table).unwrap();

        let ticks = u64::MAX - 1;
        let frame = decoder
            .encode_frame(0x300, &[("Ticks", SignalValue::Unsigned(ticks))])
            .unwrap();
        let message = decoder.decode_frame(&frame).unwrap();
        assert_eq!(message.signals[0].value, SignalValue::Unsigned(ticks));
    }

    #[test]
    fn test_load_table_is_all_or_nothing() {
        let mut decoder = Decoder::from_table(&table()).unwrap();

        // Second table clashes with the first on the CAN ID
        let clash = SignalTable::new()
            .add_message(MessageConfig::new("Chassis", 0x200))
            .add_message(MessageConfig::new("Other", 0x100));
        assert!(matches!(
            decoder.load_table(&clash),
            Err(SignalError::DuplicateMessageId(0x100))
        ));
        assert_eq!(decoder.database_stats().num_messages, 1);

        decoder
            .load_table(&SignalTable::new().add_message(MessageConfig::new("Chassis", 0x200)))
            .unwrap();
        assert_eq!(decoder.database().can_ids(), vec![0x100, 0x200]);
    }
}
