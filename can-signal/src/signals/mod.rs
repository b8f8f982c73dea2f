//! Signal descriptors, message layouts and the signal database
//!
//! This module contains the validated data model that the codec works on.

pub mod database;
pub mod descriptor;
pub mod message;

// Re-export key types for convenience
pub use database::{DatabaseStats, SignalDatabase};
pub use descriptor::{
    BitField, Scaling, SignalDescriptor, ValueTable, ValueType, MAX_SIGNAL_LENGTH,
};
pub use message::{MessageDefinition, PlacedSignal};
