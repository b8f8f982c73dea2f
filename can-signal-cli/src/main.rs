//! CAN Signal CLI Application
//!
//! This is the command-line interface for the CAN signal library.
//! It uses the can-signal library and adds:
//! - Signal table loading (TOML)
//! - Decoding hex payloads, several frames in parallel
//! - Encoding signal values into payloads
//! - Text and JSON output

use anyhow::{anyhow, bail, Context, Result};
use can_signal::{
    ByteOrder, CanFrame, DecodedMessage, Decoder, FrameCodec, MessageDefinition, SignalDescriptor,
    SignalValue,
};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod report;

use report::OutputFormat;

/// CAN Signal - Describe, decode and encode CAN signals
#[derive(Parser, Debug)]
#[command(name = "can-signal-cli")]
#[command(about = "Decode and encode CAN signals from a signal table", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the signal table (TOML)
    #[arg(short, long, value_name = "FILE")]
    table: Option<PathBuf>,

    /// Message to work on, by name or CAN ID (e.g. 0x3F2)
    #[arg(short, long, value_name = "MESSAGE")]
    message: Option<String>,

    /// Frame payload as hex (can be repeated)
    #[arg(short, long = "frame", value_name = "HEX")]
    frames: Vec<String>,

    /// Signal value to encode (can be repeated). VALUE is a raw integer
    /// (e.g. 42, -3, 0xFF), a physical value with a decimal point (e.g. 21.5)
    /// or the name of an enumerated value
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    assignments: Vec<(String, Assignment)>,

    /// Print the signal layout of the table
    #[arg(long)]
    describe: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Value given to --set
#[derive(Debug, Clone, PartialEq)]
enum Assignment {
    Raw(SignalValue),
    Physical(f64),
    Label(String),
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assignment::Raw(value) => write!(f, "{}", value),
            Assignment::Physical(value) => write!(f, "{}", value),
            Assignment::Label(label) => write!(f, "{}", label),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Signal CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using can-signal library v{}", can_signal::VERSION);

    let mut out = open_output(&args)?;

    match &args.table {
        Some(table_path) => table_mode(table_path, &args, &mut out)?,
        None => demo_mode(&mut out)?,
    }

    out.flush()?;
    Ok(())
}

fn open_output(args: &Args) -> Result<Box<dyn Write>> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

/// Demo mode - build one signal, print it, encode it into an empty frame
fn demo_mode(out: &mut dyn Write) -> Result<()> {
    let signal = SignalDescriptor::new("VCFRONT_driverIsLeaving", 1, 1)?;

    writeln!(out, "Signal details:")?;
    write!(out, "{}", signal.summary())?;

    let mut data = vec![0u8; 8];
    FrameCodec::encode(&mut data, &signal, 1, ByteOrder::LittleEndian)?;
    let value = FrameCodec::decode(&data, &signal, ByteOrder::LittleEndian)?;

    writeln!(out, "Encoded 1: {}", hex::encode_upper(&data))?;
    writeln!(out, "Decoded:   {}", value)?;
    Ok(())
}

/// Table mode - describe, decode or encode using a signal table
fn table_mode(table_path: &PathBuf, args: &Args, out: &mut dyn Write) -> Result<()> {
    log::info!("Loading signal table from: {:?}", table_path);
    let table = config::load_table(table_path)?;
    let decoder = Decoder::from_table(&table)
        .with_context(|| format!("Invalid signal table: {:?}", table_path))?;

    let stats = decoder.database_stats();
    log::info!(
        "Signal database: {} messages, {} signals",
        stats.num_messages,
        stats.num_signals
    );

    if args.describe || (args.frames.is_empty() && args.assignments.is_empty()) {
        return describe(&decoder, args.message.as_deref(), out);
    }

    let message = select_message(&decoder, args.message.as_deref())?;
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Txt
    };

    if args.assignments.is_empty() {
        let decoded = decode_frames(&decoder, message, &args.frames)?;
        write!(out, "{}", report::render_messages(&decoded, format)?)?;
        return Ok(());
    }

    // Encode on top of the first given payload, or on an empty one
    let mut data = match args.frames.first() {
        Some(payload) => parse_payload(payload)?,
        None => message.new_frame(),
    };
    for (name, value) in &args.assignments {
        apply_assignment(message, &mut data, name, value)
            .with_context(|| format!("Failed to encode {}={}", name, value))?;
    }

    let frame = CanFrame::new(message.id(), data);
    let decoded = decoder.decode_frame(&frame)?;
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "frame": hex::encode_upper(&frame.data),
                "message": decoded,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Txt => {
            writeln!(out, "{}", report::format_frame(&frame))?;
            write!(out, "{}", report::format_message(&decoded))?;
        }
    }
    Ok(())
}

fn apply_assignment(
    message: &MessageDefinition,
    data: &mut [u8],
    name: &str,
    value: &Assignment,
) -> can_signal::Result<()> {
    match value {
        Assignment::Raw(raw) => message.encode_signal(data, name, *raw),
        Assignment::Physical(physical) => message.encode_physical(data, name, *physical),
        Assignment::Label(label) => message.encode_label(data, name, label),
    }
}

fn describe(decoder: &Decoder, selector: Option<&str>, out: &mut dyn Write) -> Result<()> {
    match selector {
        Some(_) => writeln!(out, "{}", select_message(decoder, selector)?)?,
        None => {
            for message in decoder.database().messages() {
                writeln!(out, "{}", message)?;
            }
        }
    }
    Ok(())
}

/// Pick the message by name or ID, or the only message of the table
fn select_message<'a>(decoder: &'a Decoder, selector: Option<&str>) -> Result<&'a MessageDefinition> {
    let db = decoder.database();
    match selector {
        Some(selector) => {
            let by_id = match parse_integer(selector) {
                Ok(SignalValue::Unsigned(id)) => u32::try_from(id).ok(),
                _ => None,
            }
            .and_then(|id| db.message_by_id(id));
            by_id
                .or_else(|| db.message_by_name(selector))
                .ok_or_else(|| anyhow!("Message not found: {}", selector))
        }
        None => match db.messages() {
            [only] => Ok(only),
            [] => bail!("Signal table has no messages"),
            _ => bail!("Signal table has several messages, choose one with --message"),
        },
    }
}

/// Decode every payload against `message`, in parallel
fn decode_frames(
    decoder: &Decoder,
    message: &MessageDefinition,
    payloads: &[String],
) -> Result<Vec<DecodedMessage>> {
    payloads
        .par_iter()
        .map(|payload| -> Result<DecodedMessage> {
            let frame = CanFrame::new(message.id(), parse_payload(payload)?);
            decoder
                .decode_frame(&frame)
                .with_context(|| format!("Failed to decode frame {}", payload))
        })
        .collect()
}

/// Parse a hex payload, allowing spaces and an optional 0x prefix
fn parse_payload(payload: &str) -> Result<Vec<u8>> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    hex::decode(cleaned).with_context(|| format!("Invalid hex payload: {}", payload))
}

/// Parse a decimal or 0x-prefixed integer with an optional minus sign
///
/// Non-negative values come back as `Unsigned`, so the full u64 range parses.
fn parse_integer(text: &str) -> std::result::Result<SignalValue, String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|e| e.to_string())?;

    let value = if negative {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    SignalValue::from_i128(value).ok_or_else(|| format!("{} is out of range", text))
}

/// Parse `NAME=VALUE` for --set
fn parse_assignment(text: &str) -> std::result::Result<(String, Assignment), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", text))?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(format!("expected NAME=VALUE, got `{}`", text));
    }

    let starts_numeric = value.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+');
    let assignment = if !starts_numeric {
        Assignment::Label(value.to_string())
    } else if value.contains('.') || (value.contains(['e', 'E']) && !value.contains(['x', 'X'])) {
        let physical = value
            .parse::<f64>()
            .map_err(|e| format!("invalid value `{}`: {}", value, e))?;
        Assignment::Physical(physical)
    } else {
        let raw = parse_integer(value).map_err(|e| format!("invalid value `{}`: {}", value, e))?;
        Assignment::Raw(raw)
    };
    Ok((name.to_string(), assignment))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
