//! CAN Signal Library
//!
//! A stateless library for describing CAN signals and reading/writing them
//! in raw frame payloads.
//!
//! # Architecture
//!
//! - [`SignalDescriptor`] names a bit-field (offset + [`BitField`]) and is
//!   validated once at construction; it may also carry a [`Scaling`] to
//!   engineering units and a [`ValueTable`] of named values
//! - [`FrameCodec`] decodes and encodes signal values in caller-owned byte
//!   buffers, with an explicit [`ByteOrder`] per call
//! - [`MessageDefinition`] and [`SignalDatabase`] group signals by CAN ID
//! - [`SignalTable`] is the serializable form of a database, and [`Decoder`]
//!   ties everything together at the frame level
//!
//! The library does NOT:
//! - Talk to CAN hardware or sockets
//! - Parse DBC files
//! - Reassemble multi-frame (ISO-TP) transfers
//!
//! # Example Usage
//!
//! ```
//! use can_signal::{ByteOrder, FrameCodec, SignalDescriptor};
//!
//! let signal = SignalDescriptor::new("VCFRONT_driverIsLeaving", 1, 1).unwrap();
//! let mut frame = [0u8; 8];
//!
//! FrameCodec::encode(&mut frame, &signal, 1, ByteOrder::LittleEndian).unwrap();
//! assert_eq!(frame[0], 0b10);
//! assert_eq!(FrameCodec::decode(&frame, &signal, ByteOrder::LittleEndian).unwrap(), 1);
//!
//! print!("{}", signal.summary());
//! ```

// Public modules
pub mod codec;
pub mod config;
pub mod decoder;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use codec::FrameCodec;
pub use config::{MessageConfig, SignalConfig, SignalTable, ValueConfig};
pub use decoder::Decoder;
pub use signals::{
    BitField, DatabaseStats, MessageDefinition, PlacedSignal, Scaling, SignalDatabase,
    SignalDescriptor, ValueTable, ValueType,
};
pub use types::{
    ByteOrder, CanFrame, DecodedMessage, DecodedSignal, Result, SignalError, SignalValue,
    MAX_FRAME_LEN,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
