//! Signal table loading

use anyhow::{Context, Result};
use can_signal::SignalTable;
use std::fs;
use std::path::Path;

/// Load a signal table from a TOML file
pub fn load_table(path: &Path) -> Result<SignalTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read signal table: {:?}", path))?;

    parse_table(&content).with_context(|| format!("Failed to parse signal table: {:?}", path))
}

/// Parse a signal table from TOML text
pub fn parse_table(content: &str) -> Result<SignalTable> {
    let table: SignalTable = toml::from_str(content)?;
    log::debug!("Signal table has {} messages", table.messages.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_signal::ByteOrder;
    use std::io::Write;

    const OCCUPANCY: &str = r#"
        [[messages]]
        name = "VCFRONT_Occupancy"
        id = 0x3F2

        [[messages.signals]]
        name = "VCFRONT_driverIsLeaving"
        offset = 1
        length = 1

        [[messages.signals]]
        name = "VCFRONT_seatTemp"
        offset = 8
        length = 8
        byte_order = "big_endian"
        signed = true
    "#;

    #[test]
    fn test_table_deserialization() {
        let table = parse_table(OCCUPANCY).unwrap();
        assert_eq!(table.messages.len(), 1);

        let message = &table.messages[0];
        assert_eq!(message.id, 0x3F2);
        assert_eq!(message.length, 8);
        assert_eq!(message.signals.len(), 2);
        assert_eq!(message.signals[0].byte_order, ByteOrder::LittleEndian);
        assert_eq!(message.signals[1].byte_order, ByteOrder::BigEndian);
        assert!(message.signals[1].signed);
    }

    #[test]
    fn test_scaled_and_enumerated_signals() {
        let table = parse_table(
            r#"
            [[messages]]
            name = "VCFRONT_Climate"
            id = 0x2A0
            length = 2

            [[messages.signals]]
            name = "VCFRONT_cabinTemp"
            offset = 0
            length = 8
            scale = 0.5
            physical_offset = -40.0

            [[messages.signals]]
            name = "VCFRONT_fanMode"
            offset = 8
            values = [{ name = "Off" }, { name = "Low" }, { name = "Auto", value = 7 }]
            "#,
        )
        .unwrap();

        let db = table.build_database().unwrap();
        let message = db.message_by_id(0x2A0).unwrap();
        let fan = &message.signal("VCFRONT_fanMode").unwrap().descriptor;
        assert_eq!(fan.length(), 3);
        assert_eq!(fan.values().value_of("Low"), Some(1));

        let temp = &message.signal("VCFRONT_cabinTemp").unwrap().descriptor;
        assert_eq!(temp.scaling().unwrap().offset, -40.0);
    }

    #[test]
    fn test_load_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(OCCUPANCY.as_bytes()).unwrap();

        let table = load_table(file.path()).unwrap();
        let db = table.build_database().unwrap();
        assert_eq!(db.stats().num_signals, 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read signal table"));
    }

    #[test]
    fn test_malformed_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[[messages]]\nname = \"NoId\"\n").unwrap();

        let err = load_table(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse signal table"));
    }
}
