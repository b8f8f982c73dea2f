//! Signal table configuration types
//!
//! A signal table is the serializable description of messages and their
//! signals. It carries raw integers exactly as written by the user; turning it
//! into a [`SignalDatabase`] runs every entry through the validating
//! constructors, so a table with one bad entry yields no database at all.

use crate::signals::{
    BitField, MessageDefinition, SignalDatabase, SignalDescriptor, ValueTable, ValueType,
};
use crate::types::{ByteOrder, Result};
use serde::{Deserialize, Serialize};

/// Top-level signal table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    #[serde(default)]
    pub messages: Vec<MessageConfig>,
}

/// One message of the signal table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageConfig {
    pub name: String,

    /// CAN message ID
    pub id: u32,

    /// Payload size in bytes (default: 8)
    #[serde(default = "default_message_length")]
    pub length: usize,

    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

/// One signal of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub name: String,

    /// Bit offset within the payload
    pub offset: i64,

    /// Length in bits (default: narrowest width holding every enumerated value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,

    /// Byte order (default: little_endian)
    #[serde(default)]
    pub byte_order: ByteOrder,

    /// Two's complement signal (default: false)
    #[serde(default)]
    pub signed: bool,

    /// Physical value per raw unit (default: 1.0 when `physical_offset` is set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,

    /// Added to the scaled value (default: 0.0 when `scale` is set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_offset: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Enumerated values, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueConfig>,
}

/// A named raw value of a signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueConfig {
    pub name: String,

    /// Raw value (default: one past the highest value declared so far)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

fn default_message_length() -> usize {
    8
}

impl SignalTable {
    /// Create an empty signal table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a message
    pub fn add_message(mut self, message: MessageConfig) -> Self {
        self.messages.push(message);
        self
    }

    /// Validate every entry and build the signal database
    pub fn build_database(&self) -> Result<SignalDatabase> {
        let mut db = SignalDatabase::new();
        for message in &self.messages {
            db.add_message(message.build()?)?;
        }
        log::debug!(
            "Built signal database with {} messages",
            db.stats().num_messages
        );
        Ok(db)
    }
}

impl MessageConfig {
    /// Create a message entry with the default length of 8 bytes
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
            length: default_message_length(),
            signals: Vec::new(),
        }
    }

    /// Builder method: set the payload length
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Builder method: add a signal
    pub fn add_signal(mut self, signal: SignalConfig) -> Self {
        self.signals.push(signal);
        self
    }

    /// Validate this entry and build the message layout
    pub fn build(&self) -> Result<MessageDefinition> {
        let mut message = MessageDefinition::new(self.name.clone(), self.id, self.length)?;
        for signal in &self.signals {
            let (descriptor, byte_order) = signal.build()?;
            message.add_signal(descriptor, byte_order)?;
        }
        Ok(message)
    }
}

impl SignalConfig {
    /// Create an unsigned little-endian signal entry
    pub fn new(name: impl Into<String>, offset: i64, length: i64) -> Self {
        Self {
            length: Some(length),
            ..Self::enumerated(name, offset)
        }
    }

    /// Create a signal entry whose length follows from its enumerated values
    pub fn enumerated(name: impl Into<String>, offset: i64) -> Self {
        Self {
            name: name.into(),
            offset,
            length: None,
            byte_order: ByteOrder::default(),
            signed: false,
            scale: None,
            physical_offset: None,
            description: None,
            values: Vec::new(),
        }
    }

    /// Builder method: set the byte order
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Builder method: mark the signal as signed
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    /// Builder method: set the scaling to engineering units
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = Some(scale);
        self.physical_offset = Some(offset);
        self
    }

    /// Builder method: add an enumerated value (`None` takes the next free value)
    pub fn with_value(mut self, name: impl Into<String>, value: Option<u64>) -> Self {
        self.values.push(ValueConfig {
            name: name.into(),
            value,
        });
        self
    }

    /// Builder method: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn value_table(&self) -> Result<ValueTable> {
        let mut table = ValueTable::new();
        for entry in &self.values {
            match entry.value {
                Some(value) => table.insert(entry.name.clone(), value)?,
                None => {
                    table.push(entry.name.clone())?;
                }
            }
        }
        Ok(table)
    }

    fn value_type(&self) -> ValueType {
        if self.signed {
            ValueType::Signed
        } else {
            ValueType::Unsigned
        }
    }

    /// Validate this entry and build its descriptor
    pub fn build(&self) -> Result<(SignalDescriptor, ByteOrder)> {
        let values = self.value_table()?;
        let length = match self.length {
            Some(length) => length,
            None => i64::from(BitField::for_values(&values)?.length()),
        };

        let mut descriptor = SignalDescriptor::with_type(
            self.name.clone(),
            self.offset,
            length,
            self.value_type(),
        )?
        .with_values(values)?;

        if self.scale.is_some() || self.physical_offset.is_some() {
            descriptor = descriptor.with_scaling(
                self.scale.unwrap_or(1.0),
                self.physical_offset.unwrap_or(0.0),
            )?;
        }
        if let Some(description) = &self.description {
            descriptor = descriptor.with_description(description.clone());
        }
        Ok((descriptor, self.byte_order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalError;

    #[test]
    fn test_signal_table_builder() {
        let table = SignalTable::new().add_message(
            MessageConfig::new("VCFRONT_Occupancy", 0x3F2)
                .add_signal(SignalConfig::new("VCFRONT_driverIsLeaving", 1, 1))
                .add_signal(
                    SignalConfig::new("VCFRONT_seatTemp", 8, 8)
                        .with_byte_order(ByteOrder::BigEndian)
                        .with_signed(true),
                ),
        );

        let db = table.build_database().unwrap();
        let msg = db.message_by_id(0x3F2).unwrap();
        assert_eq!(msg.length(), 8);

        let temp = msg.signal("VCFRONT_seatTemp").unwrap();
        assert!(temp.descriptor.field().is_signed());
        assert_eq!(temp.byte_order, ByteOrder::BigEndian);
    }

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{
            "messages": [
                {
                    "name": "EngineData",
                    "id": 256,
                    "signals": [{ "name": "EngineSpeed", "offset": 0, "length": 16 }]
                }
            ]
        }"#;

        let table: SignalTable = serde_json::from_str(json).unwrap();
        let message = &table.messages[0];
        assert_eq!(message.length, 8);
        assert_eq!(message.signals[0].byte_order, ByteOrder::LittleEndian);
        assert!(!message.signals[0].signed);
    }

    #[test]
    fn test_byte_order_names() {
        let signal: SignalConfig = serde_json::from_str(
            r#"{ "name": "S", "offset": 0, "length": 4, "byte_order": "big_endian" }"#,
        )
        .unwrap();
        assert_eq!(signal.byte_order, ByteOrder::BigEndian);
    }

    #[test]
    fn test_invalid_entries_fail_whole_table() {
        let table = SignalTable::new()
            .add_message(
                MessageConfig::new("Good", 0x100).add_signal(SignalConfig::new("A", 0, 8)),
            )
            .add_message(
                MessageConfig::new("Bad", 0x101).add_signal(SignalConfig::new("B", -2, 0)),
            );

        assert!(matches!(
            table.build_database(),
            Err(SignalError::InvalidOffset(-2))
        ));
    }

    #[test]
    fn test_scaling_and_values_from_json() {
        let signal: SignalConfig = serde_json::from_str(
            r#"{
                "name": "Gear",
                "offset": 0,
                "scale": 2.0,
                "description": "Selected gear",
                "values": [{ "name": "Park" }, { "name": "Drive", "value": 4 }, { "name": "Sport" }]
            }"#,
        )
        .unwrap();
        assert_eq!(signal.length, None);

        let (descriptor, _) = signal.build().unwrap();
        // Highest value is 5, which needs 3 bits
        assert_eq!(descriptor.length(), 3);
        assert_eq!(descriptor.values().value_of("Sport"), Some(5));
        assert_eq!(descriptor.description(), Some("Selected gear"));

        let scaling = descriptor.scaling().unwrap();
        assert_eq!((scaling.scale, scaling.offset), (2.0, 0.0));
    }

    #[test]
    fn test_enumerated_entry_errors() {
        let no_values = SignalConfig::enumerated("Empty", 0);
        assert!(matches!(no_values.build(), Err(SignalError::InvalidLength(0))));

        let duplicate_name = SignalConfig::enumerated("Mode", 0)
            .with_value("Off", Some(0))
            .with_value("Off", Some(1));
        assert!(matches!(
            duplicate_name.build(),
            Err(SignalError::DuplicateEnumName(name)) if name == "Off"
        ));

        let duplicate_value = SignalConfig::enumerated("Mode", 0)
            .with_value("Off", Some(0))
            .with_value("Idle", Some(0));
        assert!(matches!(
            duplicate_value.build(),
            Err(SignalError::DuplicateEnumValue(0))
        ));

        let too_narrow = SignalConfig::new("Mode", 0, 1).with_value("High", Some(2));
        assert!(matches!(
            too_narrow.build(),
            Err(SignalError::ValueOverflow { value: 2, length: 1, .. })
        ));

        let bad_scale = SignalConfig::new("Speed", 0, 8).with_scaling(0.0, 1.0);
        assert!(matches!(
            bad_scale.build(),
            Err(SignalError::InvalidScaling { .. })
        ));
    }

    #[test]
    fn test_overlapping_entries_rejected() {
        let message = MessageConfig::new("Clash", 0x30)
            .add_signal(SignalConfig::new("A", 0, 8))
            .add_signal(SignalConfig::new("B", 4, 8));
        assert!(matches!(
            message.build(),
            Err(SignalError::SignalOverlap { .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_entry() {
        let message = MessageConfig::new("Short", 0x10)
            .with_length(2)
            .add_signal(SignalConfig::new("Wide", 12, 8));
        assert!(matches!(
            message.build(),
            Err(SignalError::OutOfBounds { end_bit: 20, frame_bits: 16, .. })
        ));
    }
}
