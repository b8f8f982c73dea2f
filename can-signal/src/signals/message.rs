//! Message layouts
//!
//! A message groups the signals that share one CAN ID and one payload size.

use crate::codec::FrameCodec;
use crate::signals::descriptor::SignalDescriptor;
use crate::types::{ByteOrder, DecodedSignal, Result, SignalError, SignalValue, MAX_FRAME_LEN};
use std::collections::HashMap;
use std::fmt;

/// One bit per physical bit of the largest frame
type Occupancy = [u64; MAX_FRAME_LEN / 8];

/// A signal together with the byte order it is laid out in
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSignal {
    pub descriptor: SignalDescriptor,
    pub byte_order: ByteOrder,
}

impl PlacedSignal {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Physical frame bits the signal occupies
    fn occupancy(&self) -> Occupancy {
        let mut bits = [0u64; MAX_FRAME_LEN / 8];
        for position in self.descriptor.offset()..self.descriptor.end_bit() {
            let bit = self.byte_order.frame_bit(position);
            if let Some(word) = bits.get_mut((bit / 64) as usize) {
                *word |= 1 << (bit % 64);
            }
        }
        bits
    }

    /// Whether the two signals share at least one physical frame bit
    pub fn overlaps(&self, other: &PlacedSignal) -> bool {
        self.occupancy()
            .iter()
            .zip(other.occupancy().iter())
            .any(|(a, b)| a & b != 0)
    }
}

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    name: String,
    id: u32,
    /// Payload size in bytes
    length: usize,
    /// Signals in the order they were added
    signals: Vec<PlacedSignal>,
    sig_map: HashMap<String, usize>,
}

impl MessageDefinition {
    /// Create an empty message layout
    ///
    /// Message names must be at least one character long and must contain
    /// only ASCII letters, numbers, and underscores.
    pub fn new(name: impl Into<String>, id: u32, length: usize) -> Result<Self> {
        let name = name.into();
        Self::check_name_validity(&name)?;

        if length > MAX_FRAME_LEN {
            return Err(SignalError::InvalidFrameLength(length));
        }

        Ok(Self {
            name,
            id,
            length,
            signals: Vec::new(),
            sig_map: HashMap::new(),
        })
    }

    fn check_name_validity(name: &str) -> Result<()> {
        if name.is_empty() || name.chars().any(|c| !c.is_ascii_alphanumeric() && c != '_') {
            return Err(SignalError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Add a signal to the layout
    ///
    /// # Errors
    /// * `DuplicateSignal` if a signal with the same name already exists
    /// * `OutOfBounds` if the signal does not fit in the message payload
    /// * `SignalOverlap` if the signal shares frame bits with an existing one
    pub fn add_signal(&mut self, descriptor: SignalDescriptor, byte_order: ByteOrder) -> Result<()> {
        if self.sig_map.contains_key(descriptor.name()) {
            return Err(SignalError::DuplicateSignal(descriptor.name().to_string()));
        }

        let frame_bits = self.frame_bits();
        if !descriptor.fits_within(frame_bits) {
            return Err(SignalError::OutOfBounds {
                signal: descriptor.name().to_string(),
                end_bit: descriptor.end_bit(),
                frame_bits,
            });
        }

        let placed = PlacedSignal {
            descriptor,
            byte_order,
        };
        if let Some(existing) = self.signals.iter().find(|s| s.overlaps(&placed)) {
            return Err(SignalError::SignalOverlap {
                signal: placed.name().to_string(),
                existing: existing.name().to_string(),
            });
        }

        self.sig_map.insert(placed.name().to_string(), self.signals.len());
        self.signals.push(placed);
        Ok(())
    }

    /// Builder-style variant of [`add_signal`](Self::add_signal)
    pub fn with_signal(mut self, descriptor: SignalDescriptor, byte_order: ByteOrder) -> Result<Self> {
        self.add_signal(descriptor, byte_order)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload size in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn frame_bits(&self) -> u64 {
        self.length as u64 * 8
    }

    pub fn signals(&self) -> &[PlacedSignal] {
        &self.signals
    }

    pub fn signal(&self, name: &str) -> Option<&PlacedSignal> {
        self.sig_map.get(name).and_then(|idx| self.signals.get(*idx))
    }

    /// A zeroed payload of the right size for this message
    pub fn new_frame(&self) -> Vec<u8> {
        vec![0; self.length]
    }

    /// Decode every signal of the message from a payload
    pub fn decode(&self, data: &[u8]) -> Result<Vec<DecodedSignal>> {
        self.check_frame_length(data)?;

        self.signals
            .iter()
            .map(|placed| -> Result<DecodedSignal> {
                let descriptor = &placed.descriptor;
                let raw = FrameCodec::decode(data, descriptor, placed.byte_order)?;
                let value = FrameCodec::interpret(raw, descriptor);
                Ok(DecodedSignal {
                    name: placed.name().to_string(),
                    value,
                    raw,
                    physical: descriptor.to_physical(value),
                    label: descriptor.values().name_of(raw).map(str::to_string),
                })
            })
            .collect()
    }

    /// Encode one named signal into a payload
    ///
    /// Signed signals take the value as two's complement; unsigned signals
    /// take the whole `0..2^length` range and reject negative values with
    /// `ValueOverflow`.
    pub fn encode_signal(&self, data: &mut [u8], name: &str, value: SignalValue) -> Result<()> {
        self.check_frame_length(data)?;
        let placed = self.placed(name)?;
        FrameCodec::encode_value(data, &placed.descriptor, value, placed.byte_order)
    }

    /// Encode one named signal from its engineering value
    pub fn encode_physical(&self, data: &mut [u8], name: &str, physical: f64) -> Result<()> {
        let value = self.placed(name)?.descriptor.from_physical(physical)?;
        self.encode_signal(data, name, value)
    }

    /// Encode one named signal from the name of one of its enumerated values
    pub fn encode_label(&self, data: &mut [u8], name: &str, label: &str) -> Result<()> {
        let value = self.placed(name)?.descriptor.value_of_label(label)?;
        self.encode_signal(data, name, SignalValue::Unsigned(value))
    }

    fn placed(&self, name: &str) -> Result<&PlacedSignal> {
        self.signal(name)
            .ok_or_else(|| SignalError::SignalNotFound(name.to_string()))
    }

    fn check_frame_length(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.length {
            log::warn!(
                "Message '{}' expects {} bytes but frame has {} bytes",
                self.name,
                self.length,
                data.len()
            );
            return Err(SignalError::FrameLengthMismatch {
                message: self.name.clone(),
                expected: self.length,
                actual: data.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for MessageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Message `{}` (id 0x{:X}, {} bytes)",
            self.name, self.id, self.length
        )?;
        for placed in &self.signals {
            write!(f, "{}", placed.descriptor)?;
            let descriptor = &placed.descriptor;
            writeln!(
                f,
                "           Type: {} {}",
                descriptor.field(),
                placed.byte_order
            )?;
            if let Some(scaling) = descriptor.scaling() {
                writeln!(
                    f,
                    "           Physical: value * {} + {}",
                    scaling.scale, scaling.offset
                )?;
            }
            if !descriptor.values().is_empty() {
                let values: Vec<String> = descriptor
                    .values()
                    .iter()
                    .map(|(value, name)| format!("{}={}", value, name))
                    .collect();
                writeln!(f, "           Values: {}", values.join(", "))?;
            }
            if let Some(description) = descriptor.description() {
                writeln!(f, "           Description: {}", description)?;
            }
        }
        Ok(())
    }
}
