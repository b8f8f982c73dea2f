//! Output formatting for decoded messages and frames

use anyhow::Result;
use can_signal::{CanFrame, DecodedMessage, DecodedSignal};

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Txt,
    Json,
}

/// Render decoded messages in the chosen format
pub fn render_messages(messages: &[DecodedMessage], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(messages)?),
        OutputFormat::Txt => {
            let mut out = String::new();
            for message in messages {
                out.push_str(&format_message(message));
            }
            Ok(out)
        }
    }
}

/// Plain text view of one decoded message
pub fn format_message(message: &DecodedMessage) -> String {
    let mut out = format!("{} (0x{:X})\n", message.name, message.can_id);
    for signal in &message.signals {
        out.push_str(&format!("  {:<32} = {}\n", signal.name, format_value(signal)));
    }
    out
}

/// Label or physical value first when the signal has one, raw value last
fn format_value(signal: &DecodedSignal) -> String {
    match (&signal.label, signal.physical) {
        (Some(label), _) => format!("{} (value {}, raw 0x{:X})", label, signal.value, signal.raw),
        (None, Some(physical)) => {
            format!("{} (value {}, raw 0x{:X})", physical, signal.value, signal.raw)
        }
        (None, None) => format!("{} (raw 0x{:X})", signal.value, signal.raw),
    }
}

/// Hex view of a frame, e.g. `0x3F2 [8] 02 00 00 00 00 00 00 00`
pub fn format_frame(frame: &CanFrame) -> String {
    let bytes: Vec<String> = frame.data.iter().map(|b| format!("{:02X}", b)).collect();
    format!("0x{:X} [{}] {}", frame.can_id, frame.dlc(), bytes.join(" "))
}
