//! Signal descriptors
//!
//! A signal is a named bit-field at a fixed offset within a CAN frame. The
//! descriptor only describes where the bits live; reading and writing them is
//! the job of [`crate::codec::FrameCodec`].
//!
//! A descriptor can also carry how raw values map to engineering units
//! ([`Scaling`]) and names for specific raw values ([`ValueTable`]).

use crate::types::{Result, SignalError, SignalValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Widest signal the codec can exchange as a single integer
pub const MAX_SIGNAL_LENGTH: u32 = 64;

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Unsigned integer
    #[default]
    Unsigned,
    /// Two's complement signed integer
    Signed,
}

/// Bit length and signedness of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    length: u32,
    value_type: ValueType,
}

impl BitField {
    /// Create an unsigned field of `length` bits
    pub fn new(length: i64) -> Result<Self> {
        Self::with_type(length, ValueType::Unsigned)
    }

    /// Create a signed (two's complement) field of `length` bits
    pub fn signed(length: i64) -> Result<Self> {
        Self::with_type(length, ValueType::Signed)
    }

    /// Narrowest unsigned field able to hold every value of `values`
    ///
    /// # Errors
    /// * `InvalidLength(0)` if the table is empty
    pub fn for_values(values: &ValueTable) -> Result<Self> {
        let highest = values.highest().ok_or(SignalError::InvalidLength(0))?;
        let width = (u64::BITS - highest.leading_zeros()).max(1);
        Self::new(i64::from(width))
    }

    /// Create a field of `length` bits with an explicit value type
    pub fn with_type(length: i64, value_type: ValueType) -> Result<Self> {
        if !(1..=i64::from(MAX_SIGNAL_LENGTH)).contains(&length) {
            return Err(SignalError::InvalidLength(length));
        }

        Ok(Self {
            length: length as u32,
            value_type,
        })
    }

    /// Number of bits in the field
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_signed(&self) -> bool {
        self.value_type == ValueType::Signed
    }

    /// Largest raw bit pattern the field can hold
    pub fn max_raw(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    /// Check whether `value` is representable as an unsigned field value
    pub fn fits_unsigned(&self, value: u64) -> bool {
        value <= self.max_raw()
    }

    /// Check whether `value` is representable in two's complement
    pub fn fits_signed(&self, value: i64) -> bool {
        if self.length >= 64 {
            return true;
        }
        let half = 1i64 << (self.length - 1);
        (-half..half).contains(&value)
    }
}

impl fmt::Display for BitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.value_type {
            ValueType::Unsigned => "u",
            ValueType::Signed => "s",
        };
        write!(f, "{}{}", prefix, self.length)
    }
}

/// Linear mapping from raw values to engineering units
///
/// `physical = value * scale + offset`, where `value` is the raw bit pattern
/// with the field's signedness applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    pub fn to_physical(&self, value: SignalValue) -> f64 {
        value.as_f64() * self.scale + self.offset
    }

    /// Nearest raw value for a physical value
    pub fn to_raw(&self, physical: f64) -> f64 {
        ((physical - self.offset) / self.scale).round()
    }
}

/// Names for specific raw values of a signal
///
/// Both directions are unique: a name maps to exactly one value and a value
/// has at most one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTable {
    by_value: BTreeMap<u64, String>,
    by_name: BTreeMap<String, u64>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name a raw value
    ///
    /// # Errors
    /// * `DuplicateEnumName` if the name is already used
    /// * `DuplicateEnumValue` if the value already has a name
    pub fn insert(&mut self, name: impl Into<String>, value: u64) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(SignalError::DuplicateEnumName(name));
        }
        if self.by_value.contains_key(&value) {
            return Err(SignalError::DuplicateEnumValue(value));
        }

        self.by_name.insert(name.clone(), value);
        self.by_value.insert(value, name);
        Ok(())
    }

    /// Name the value following the highest one named so far (0 for an empty table)
    pub fn push(&mut self, name: impl Into<String>) -> Result<u64> {
        let value = match self.highest() {
            Some(highest) => highest
                .checked_add(1)
                .ok_or(SignalError::DuplicateEnumValue(highest))?,
            None => 0,
        };
        self.insert(name, value)?;
        Ok(value)
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: u64) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }

    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    pub fn highest(&self) -> Option<u64> {
        self.by_value.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    /// Named values in ascending value order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.by_value.iter().map(|(v, n)| (*v, n.as_str()))
    }
}

/// A named signal located at a bit offset within a CAN frame
///
/// Descriptors are validated once at construction and are immutable
/// afterwards, so they can be shared freely between threads. Whether the
/// signal fits inside a particular frame is only known at decode/encode time.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDescriptor {
    name: String,
    offset: u64,
    field: BitField,
    description: Option<String>,
    scaling: Option<Scaling>,
    values: ValueTable,
}

impl SignalDescriptor {
    /// Create an unsigned signal descriptor
    ///
    /// # Errors
    /// * `InvalidOffset` if `offset < 0`
    /// * `InvalidLength` if `length` is outside `1..=64`
    /// * `InvalidName` if `name` is empty
    ///
    /// # Example
    /// ```
    /// use can_signal::SignalDescriptor;
    ///
    /// let sig = SignalDescriptor::new("VCFRONT_driverIsLeaving", 1, 1).unwrap();
    /// assert_eq!(sig.offset(), 1);
    /// assert_eq!(sig.length(), 1);
    /// ```
    pub fn new(name: impl Into<String>, offset: i64, length: i64) -> Result<Self> {
        Self::with_type(name, offset, length, ValueType::Unsigned)
    }

    /// Create a descriptor with an explicit value type, validating in the same order as [`new`](Self::new)
    pub fn with_type(
        name: impl Into<String>,
        offset: i64,
        length: i64,
        value_type: ValueType,
    ) -> Result<Self> {
        let offset = Self::check_offset(offset)?;
        let field = BitField::with_type(length, value_type)?;
        Self::build(name.into(), offset, field)
    }

    /// Create a descriptor from an already validated field (e.g. a signed one)
    pub fn with_field(name: impl Into<String>, offset: i64, field: BitField) -> Result<Self> {
        let offset = Self::check_offset(offset)?;
        Self::build(name.into(), offset, field)
    }

    fn check_offset(offset: i64) -> Result<u64> {
        u64::try_from(offset).map_err(|_| SignalError::InvalidOffset(offset))
    }

    fn build(name: String, offset: u64, field: BitField) -> Result<Self> {
        if name.is_empty() {
            return Err(SignalError::InvalidName(name));
        }

        Ok(Self {
            name,
            offset,
            field,
            description: None,
            scaling: None,
            values: ValueTable::new(),
        })
    }

    /// Attach a free-form description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a linear scaling to engineering units
    ///
    /// # Errors
    /// * `InvalidScaling` if `scale` is zero or not finite, or `offset` is not finite
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Result<Self> {
        if scale == 0.0 || !scale.is_finite() || !offset.is_finite() {
            return Err(SignalError::InvalidScaling {
                signal: self.name,
                scale,
            });
        }
        self.scaling = Some(Scaling { scale, offset });
        Ok(self)
    }

    /// Attach enumerated value names
    ///
    /// # Errors
    /// * `ValueOverflow` if a named value does not fit the field
    pub fn with_values(mut self, values: ValueTable) -> Result<Self> {
        if let Some(highest) = values.highest() {
            if !self.field.fits_unsigned(highest) {
                return Err(SignalError::ValueOverflow {
                    signal: self.name,
                    value: i128::from(highest),
                    length: self.field.length(),
                });
            }
        }
        self.values = values;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit offset of the signal within the frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the signal in bits
    pub fn length(&self) -> u32 {
        self.field.length()
    }

    pub fn field(&self) -> &BitField {
        &self.field
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn scaling(&self) -> Option<&Scaling> {
        self.scaling.as_ref()
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    /// First bit past the end of the signal
    pub fn end_bit(&self) -> u64 {
        self.offset + u64::from(self.field.length())
    }

    /// Engineering value of a decoded value, if the signal is scaled
    pub fn to_physical(&self, value: SignalValue) -> Option<f64> {
        self.scaling.map(|scaling| scaling.to_physical(value))
    }

    /// Integer value to encode for a physical value
    ///
    /// Signals without a scaling take the physical value as is, rounded to the
    /// nearest integer. Range checks against the field happen at encode time.
    pub fn from_physical(&self, physical: f64) -> Result<SignalValue> {
        let raw = match &self.scaling {
            Some(scaling) => scaling.to_raw(physical),
            None => physical.round(),
        };

        // i128 covers both u64 and i64, and `as` saturates out-of-range floats
        if !raw.is_finite() || raw.abs() > 2f64.powi(64) {
            return Err(SignalError::InvalidPhysicalValue {
                signal: self.name.clone(),
                value: physical,
            });
        }
        SignalValue::from_i128(raw as i128).ok_or_else(|| SignalError::ValueOverflow {
            signal: self.name.clone(),
            value: raw as i128,
            length: self.field.length(),
        })
    }

    /// Value named `label` in the signal's value table
    pub fn value_of_label(&self, label: &str) -> Result<u64> {
        self.values
            .value_of(label)
            .ok_or_else(|| SignalError::UnknownLabel {
                signal: self.name.clone(),
                label: label.to_string(),
            })
    }

    /// Check whether the signal fits inside a frame of `frame_bits` bits
    pub fn fits_within(&self, frame_bits: u64) -> bool {
        self.end_bit() <= frame_bits
    }

    /// Human-readable summary of the signal (name, length, offset)
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SignalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Signal Name: {}", self.name)?;
        writeln!(f, "           Length: {}", self.field.length())?;
        writeln!(f, "           Offset: {}", self.offset)
    }
}
