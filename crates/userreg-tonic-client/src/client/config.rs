use crate::client::streaming::DriverConfig;
use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use core::time::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tonic::{codec::CompressionEncoding, transport::Endpoint};
use userreg_tonic_core::types::{DEFAULT_SERVER_ADDR, Record, default_records};

/// Runtime configuration for the `userreg-client` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honoured), with defaults that reproduce the stock
/// demonstration: six records, three seconds apart, over a bidirectional
/// stream to a local server.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "userreg-client",
    version,
    about = "Drives unary and streaming user registration calls over gRPC"
)]
pub struct CliArgs {
    /// Endpoint of the user-registration service.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Pause between two consecutive outbound records, in milliseconds.
    ///
    /// Applies to the client-streaming and bidirectional calls.
    ///
    /// Environment variable: `SEND_INTERVAL_MS`
    #[arg(long, env = "SEND_INTERVAL_MS", default_value_t = 3000)]
    pub send_interval_ms: u64,

    /// Upper bound on a whole bidirectional call, in seconds.
    ///
    /// Without it the client waits for the service to end its output
    /// indefinitely.
    ///
    /// Environment variable: `DEADLINE_SECS`
    #[arg(long, env = "DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Timeout for establishing the connection, in seconds.
    ///
    /// Environment variable: `CONNECT_TIMEOUT_SECS`
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Capacity of the outbound channel between the send loop and the
    /// transport.
    ///
    /// Environment variable: `OUTBOUND_BUFFER_SIZE`
    #[arg(long, env = "OUTBOUND_BUFFER_SIZE", default_value_t = 16)]
    pub outbound_buffer_size: usize,

    /// JSON file holding an array of `{ "id", "name", "email" }` records.
    ///
    /// Falls back to the built-in six records.
    ///
    /// Environment variable: `RECORDS_FILE`
    #[arg(long, env = "RECORDS_FILE")]
    pub records_file: Option<PathBuf>,

    /// Compression applied to requests and accepted on responses.
    ///
    /// Environment variable: `COMPRESSION`
    #[arg(long, env = "COMPRESSION", value_enum, default_value_t = Compression::None)]
    pub compression: Compression,

    /// Call shape to exercise.
    #[command(subcommand)]
    pub call: Option<Call>,
}

/// The four gRPC call shapes of the registration service.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Call {
    /// Register the first record with a single request/response.
    Unary,
    /// Register the first record and print every progress update.
    ServerStream,
    /// Stream every record, then print the aggregate reply.
    ClientStream,
    /// Stream every record while printing replies as they arrive.
    #[default]
    Bidi,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    pub connect_timeout: Duration,
    pub compression: Option<CompressionEncoding>,
    pub driver: DriverConfig,
    pub records: Vec<Record>,
    pub call: Call,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        Endpoint::from_shared(args.server_addr.clone())
            .with_context(|| format!("SERVER_ADDR ({}) is not a valid URI", args.server_addr))?;

        if args.outbound_buffer_size == 0 {
            bail!("OUTBOUND_BUFFER_SIZE must be greater than 0");
        }

        if args.connect_timeout_secs == 0 {
            bail!("CONNECT_TIMEOUT_SECS must be greater than 0");
        }

        let records = match &args.records_file {
            Some(path) => load_records(path)?,
            None => default_records(),
        };

        let call = args.call.unwrap_or_default();
        if matches!(call, Call::Unary | Call::ServerStream) && records.is_empty() {
            bail!("{call:?} requires at least one record");
        }

        Ok(Self {
            server_addr: args.server_addr,
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            compression: args.compression.into(),
            driver: DriverConfig {
                send_interval: Duration::from_millis(args.send_interval_ms),
                deadline: args.deadline_secs.map(Duration::from_secs),
                outbound_buffer_size: args.outbound_buffer_size,
            },
            records,
            call,
        })
    }
}

#[derive(Deserialize)]
struct RecordEntry {
    id: String,
    name: String,
    email: String,
}

fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read records file {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("invalid records file {}", path.display()))
}

fn parse_records(raw: &str) -> anyhow::Result<Vec<Record>> {
    let entries: Vec<RecordEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .map(|entry| Record::new(entry.id, entry.name, entry.email))
        .collect())
}
