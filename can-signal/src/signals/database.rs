//! Unified signal database
//!
//! Holds message layouts indexed by CAN ID and by name.

use crate::signals::message::{MessageDefinition, PlacedSignal};
use crate::types::{Result, SignalError};
use std::collections::HashMap;

/// The unified signal database
#[derive(Debug, Clone)]
pub struct SignalDatabase {
    messages: Vec<MessageDefinition>,

    /// Key: CAN ID, Value: index into `messages`
    messages_by_id: HashMap<u32, usize>,

    /// Key: message name, Value: index into `messages`
    messages_by_name: HashMap<String, usize>,

    /// Signal name lookup for quick access
    /// Key: Signal name, Value: list of CAN IDs carrying a signal with that name
    signal_lookup: HashMap<String, Vec<u32>>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            messages_by_id: HashMap::new(),
            messages_by_name: HashMap::new(),
            signal_lookup: HashMap::new(),
        }
    }

    /// Add a message definition to the database
    ///
    /// Both the CAN ID and the message name must be unique.
    pub fn add_message(&mut self, message: MessageDefinition) -> Result<()> {
        if self.messages_by_name.contains_key(message.name()) {
            return Err(SignalError::DuplicateMessageName(message.name().to_string()));
        }
        if self.messages_by_id.contains_key(&message.id()) {
            return Err(SignalError::DuplicateMessageId(message.id()));
        }

        let can_id = message.id();
        let msg_idx = self.messages.len();

        // Build signal lookup indices
        for signal in message.signals() {
            self.signal_lookup
                .entry(signal.name().to_string())
                .or_default()
                .push(can_id);
        }

        self.messages_by_id.insert(can_id, msg_idx);
        self.messages_by_name.insert(message.name().to_string(), msg_idx);

        log::debug!(
            "Added message {} (ID 0x{:X}) with {} signals",
            message.name(),
            can_id,
            message.signals().len()
        );
        self.messages.push(message);
        Ok(())
    }

    /// Get the message definition for a CAN ID
    pub fn message_by_id(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages_by_id
            .get(&can_id)
            .and_then(|idx| self.messages.get(*idx))
    }

    /// Get a message definition by name
    pub fn message_by_name(&self, name: &str) -> Option<&MessageDefinition> {
        self.messages_by_name
            .get(name)
            .and_then(|idx| self.messages.get(*idx))
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[MessageDefinition] {
        &self.messages
    }

    /// Find all messages containing a specific signal name
    pub fn find_signal(&self, signal_name: &str) -> Vec<(u32, &PlacedSignal)> {
        self.signal_lookup
            .get(signal_name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|can_id| {
                        self.message_by_id(*can_id)
                            .and_then(|msg| msg.signal(signal_name))
                            .map(|sig| (*can_id, sig))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.iter().map(|msg| msg.signals().len()).sum(),
        }
    }

    /// Get all CAN IDs in the database, sorted
    pub fn can_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.messages_by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}

impl Default for SignalDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::descriptor::SignalDescriptor;
    use crate::types::ByteOrder;

    fn engine_data(id: u32) -> MessageDefinition {
        MessageDefinition::new("EngineData", id, 8)
            .unwrap()
            .with_signal(
                SignalDescriptor::new("EngineSpeed", 0, 16).unwrap(),
                ByteOrder::LittleEndian,
            )
            .unwrap()
    }

    #[test]
    fn test_empty_database() {
        let db = SignalDatabase::new();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
        assert!(db.can_ids().is_empty());
    }

    #[test]
    fn test_add_message() {
        let mut db = SignalDatabase::new();
        db.add_message(engine_data(0x123)).unwrap();

        let stats = db.stats();
        assert_eq!(stats.num_messages, 1);
        assert_eq!(stats.num_signals, 1);

        let msg = db.message_by_id(0x123).unwrap();
        assert_eq!(msg.name(), "EngineData");
        assert_eq!(msg.signals()[0].name(), "EngineSpeed");
        assert_eq!(db.message_by_name("EngineData").unwrap().id(), 0x123);

        let found = db.find_signal("EngineSpeed");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 0x123);
        assert!(db.find_signal("Missing").is_empty());
    }

    #[test]
    fn test_duplicate_messages() {
        let mut db = SignalDatabase::new();
        db.add_message(engine_data(0x123)).unwrap();

        assert!(matches!(
            db.add_message(engine_data(0x124)),
            Err(SignalError::DuplicateMessageName(_))
        ));

        let other = MessageDefinition::new("Other", 0x123, 8).unwrap();
        assert!(matches!(
            db.add_message(other),
            Err(SignalError::DuplicateMessageId(0x123))
        ));
        assert_eq!(db.stats().num_messages, 1);
    }

    #[test]
    fn test_can_ids_sorted() {
        let mut db = SignalDatabase::new();
        db.add_message(MessageDefinition::new("B", 0x200, 8).unwrap()).unwrap();
        db.add_message(MessageDefinition::new("A", 0x100, 8).unwrap()).unwrap();
        assert_eq!(db.can_ids(), vec![0x100, 0x200]);
    }
}
