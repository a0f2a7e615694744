//! DuckDB database client implementation.
//!
//! Provides the `DuckDbClient` struct that implements the `DatabaseClient` trait
//! for a single DuckDB file, and the `DuckDbConnector` that opens it.

use crate::db::{Connector, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::core::LogicalTypeId;
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{AccessMode, Config, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Message fragments DuckDB uses when the link to the database itself is gone.
///
/// Everything else DuckDB reports for a statement (parser, binder, catalog,
/// conversion, constraint, invalid input) is a statement-class failure.
const CONNECTION_FAILURE_MARKERS: &[&str] = &[
    IO_ERROR_MARKER,
    "Connection Error",
    "FATAL Error",
    "database has been invalidated",
    "connection was closed",
];

/// Prefix of DuckDB I/O failures. These are raised both for a broken database
/// file and for a statement that reads a missing external file, so the
/// executor checks the handle before treating one as a connection failure.
const IO_ERROR_MARKER: &str = "IO Error";

/// Size of the header DuckDB puts in front of a BIGNUM magnitude.
const BIGNUM_HEADER_BYTES: usize = 3;

/// Opens DuckDB files for the connection manager.
#[derive(Debug, Clone, Copy)]
pub struct DuckDbConnector {
    read_only: bool,
}

impl DuckDbConnector {
    /// Creates a connector that opens files read-only or read-write.
    pub fn new(read_only: bool) -> Self {
        Self { read_only }
    }

    /// Creates a read-only connector.
    pub fn read_only() -> Self {
        Self::new(true)
    }
}

impl Default for DuckDbConnector {
    fn default() -> Self {
        Self::read_only()
    }
}

#[async_trait]
impl Connector for DuckDbConnector {
    async fn open(&self, path: &Path) -> Result<Box<dyn DatabaseClient>> {
        let client = DuckDbClient::open(path, self.read_only).await?;
        Ok(Box::new(client))
    }
}

/// DuckDB database client.
///
/// DuckDB connections are `Send` but not `Sync`, so the connection lives behind
/// a mutex and every call runs on the blocking pool. `None` means closed.
#[derive(Debug)]
pub struct DuckDbClient {
    path: PathBuf,
    read_only: bool,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl DuckDbClient {
    /// Opens the DuckDB file at `path`.
    pub async fn open(path: &Path, read_only: bool) -> Result<Self> {
        let owned = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || open_connection(&owned, read_only))
            .await
            .map_err(|e| ConsoleError::open_failed(format!("open worker join error: {e}")))??;

        debug!(path = %path.display(), read_only, "Opened DuckDB file");

        Ok(Self {
            path: path.to_path_buf(),
            read_only,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }
}

#[async_trait]
impl DatabaseClient for DuckDbClient {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let guard = lock_connection(&conn)?;
            let conn = guard
                .as_ref()
                .ok_or_else(|| ConsoleError::connection("the connection was closed"))?;
            run_query(conn, &sql)
        })
        .await
        .map_err(|e| ConsoleError::unexpected(format!("query worker failed: {e}")))?
    }

    async fn close(&self) -> Result<()> {
        let taken = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(conn) = taken {
            conn.close()
                .map_err(|(_, e)| ConsoleError::internal(format!("Failed to close DuckDB: {e}")))?;
            debug!(path = %self.path.display(), "Closed DuckDB file");
        }
        Ok(())
    }
}

fn open_connection(path: &Path, read_only: bool) -> Result<Connection> {
    let access_mode = if read_only {
        AccessMode::ReadOnly
    } else {
        AccessMode::ReadWrite
    };

    let config = Config::default()
        .access_mode(access_mode)
        .and_then(|config| config.enable_autoload_extension(false))
        .map_err(|e| ConsoleError::open_failed(e.to_string()))?;

    Connection::open_with_flags(path, config).map_err(|e| ConsoleError::open_failed(e.to_string()))
}

/// Locks the connection slot. A poisoned lock means a previous call panicked
/// mid-query, so the handle is treated as broken rather than reused.
fn lock_connection(
    conn: &Mutex<Option<Connection>>,
) -> Result<MutexGuard<'_, Option<Connection>>> {
    conn.lock().map_err(|_| {
        warn!("DuckDB connection lock poisoned by an earlier failure");
        ConsoleError::connection("the connection was closed after an internal failure")
    })
}

/// Runs one statement and materializes every row.
fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql).map_err(classify_error)?;
    let mut result_rows = stmt.query([]).map_err(classify_error)?;

    let mut rows: Vec<Row> = Vec::new();
    let mut width = 0;
    let mut logical_types: Vec<LogicalTypeId> = Vec::new();

    while let Some(row) = result_rows.next().map_err(classify_error)? {
        if rows.is_empty() {
            let stmt = row.as_ref();
            width = stmt.column_count();
            logical_types = (0..width)
                .map(|idx| stmt.column_logical_type(idx).id())
                .collect();
        }

        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value: DuckValue = row.get(idx).map_err(classify_error)?;
            values.push(convert_cell(value, logical_types.get(idx).copied()));
        }
        rows.push(values);
    }

    // Release the borrow on stmt before reading its column descriptors.
    drop(result_rows);

    let columns: Vec<String> = (0..stmt.column_count())
        .map(|i| {
            stmt.column_name(i)
                .map(|name| name.to_string())
                .unwrap_or_else(|_| format!("col{}", i))
        })
        .collect();

    Ok(QueryResult::with_data(columns, rows))
}

/// Sorts a DuckDB error into connection-class, statement-class or unexpected.
fn classify_error(err: duckdb::Error) -> ConsoleError {
    match &err {
        duckdb::Error::DuckDBFailure(_, message) => {
            let message = message.clone().unwrap_or_else(|| err.to_string());
            if is_connection_failure(&message) {
                ConsoleError::connection(message)
            } else {
                ConsoleError::query(message)
            }
        }
        _ => ConsoleError::unexpected(err.to_string()),
    }
}

/// Returns true if a DuckDB error message means the database link is unusable.
pub fn is_connection_failure(message: &str) -> bool {
    CONNECTION_FAILURE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Returns true for DuckDB I/O failures, which may come from the statement
/// rather than the database link.
pub fn is_io_failure(message: &str) -> bool {
    message.contains(IO_ERROR_MARKER)
}

/// Converts a top-level cell, using the column's logical type for values
/// DuckDB hands over as raw bytes.
fn convert_cell(value: DuckValue, logical_type: Option<LogicalTypeId>) -> Value {
    match (value, logical_type) {
        (DuckValue::Blob(bytes), Some(LogicalTypeId::Bignum)) => decode_bignum(&bytes)
            .map(Value::Text)
            .unwrap_or_else(|| blob_placeholder(&bytes)),
        (DuckValue::Blob(bytes), Some(LogicalTypeId::Bit)) => decode_bit_string(&bytes)
            .map(Value::Text)
            .unwrap_or_else(|| blob_placeholder(&bytes)),
        (value, _) => convert_value(value),
    }
}

/// Narrows a DuckDB value to the console's value domain.
fn convert_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i.into()),
        DuckValue::SmallInt(i) => Value::Int(i.into()),
        DuckValue::Int(i) => Value::Int(i.into()),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        DuckValue::UTinyInt(i) => Value::Int(i.into()),
        DuckValue::USmallInt(i) => Value::Int(i.into()),
        DuckValue::UInt(i) => Value::Int(i.into()),
        DuckValue::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        DuckValue::UHugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        DuckValue::Float(f) => Value::Float(f.into()),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Text(text))
        }
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        DuckValue::Blob(bytes) | DuckValue::Geometry(bytes) => blob_placeholder(&bytes),
        DuckValue::Date32(days) => Value::Text(format_date(days)),
        DuckValue::Time64(unit, t) => Value::Text(format_time(to_micros(unit, t))),
        DuckValue::Timestamp(unit, ts) => Value::Text(format_timestamp(to_micros(unit, ts))),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => Value::Text(format!("{months} months {days} days {nanos} ns")),
        nested @ (DuckValue::List(_)
        | DuckValue::Array(_)
        | DuckValue::Struct(_)
        | DuckValue::Map(_)) => Value::Json(to_json(nested).to_string()),
        DuckValue::Union(inner) => convert_value(*inner),
        other => Value::Text(format!("{other:?}")),
    }
}

fn blob_placeholder(bytes: &[u8]) -> Value {
    Value::Text(format!("<blob {} bytes>", bytes.len()))
}

/// Decodes DuckDB's BIGNUM storage: a 3-byte header whose top bit is set for
/// non-negative numbers, then the big-endian magnitude. Negative numbers
/// store every byte inverted.
fn decode_bignum(bytes: &[u8]) -> Option<String> {
    if bytes.len() <= BIGNUM_HEADER_BYTES {
        return None;
    }
    let negative = (bytes[0] & 0x80) == 0;
    let magnitude: Vec<u8> = bytes[BIGNUM_HEADER_BYTES..]
        .iter()
        .map(|b| if negative { !b } else { *b })
        .collect();

    let digits = magnitude_to_decimal(&magnitude);
    if negative && digits != "0" {
        Some(format!("-{digits}"))
    } else {
        Some(digits)
    }
}

/// Converts a big-endian unsigned magnitude to decimal digits.
fn magnitude_to_decimal(magnitude: &[u8]) -> String {
    const LIMB_BASE: u64 = 1_000_000_000;

    // Little-endian limbs of nine decimal digits each.
    let mut limbs: Vec<u64> = Vec::new();
    for &byte in magnitude {
        let mut carry = u64::from(byte);
        for limb in limbs.iter_mut() {
            let value = *limb * 256 + carry;
            *limb = value % LIMB_BASE;
            carry = value / LIMB_BASE;
        }
        while carry > 0 {
            limbs.push(carry % LIMB_BASE);
            carry /= LIMB_BASE;
        }
    }

    let Some((most_significant, rest)) = limbs.split_last() else {
        return "0".to_string();
    };
    let mut text = most_significant.to_string();
    for limb in rest.iter().rev() {
        text.push_str(&format!("{limb:09}"));
    }
    text
}

/// Decodes DuckDB's BIT storage: a padding count byte, then the bits with the
/// first `padding` bits of the first data byte unused.
fn decode_bit_string(bytes: &[u8]) -> Option<String> {
    let (&padding, data) = bytes.split_first()?;
    if padding >= 8 || data.is_empty() {
        return None;
    }

    let bits = data
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .skip(usize::from(padding))
        .map(|bit| if bit == 1 { '1' } else { '0' })
        .collect();
    Some(bits)
}

/// Converts a (possibly nested) DuckDB value to JSON.
fn to_json(value: DuckValue) -> serde_json::Value {
    match value {
        DuckValue::List(items) | DuckValue::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(to_json).collect())
        }
        DuckValue::Union(inner) => to_json(*inner),
        DuckValue::Struct(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), to_json(field.clone())))
                .collect(),
        ),
        DuckValue::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(key, entry)| {
                    (
                        convert_value(key.clone()).to_display_string(),
                        to_json(entry.clone()),
                    )
                })
                .collect(),
        ),
        scalar => match convert_value(scalar) {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Json(s) => serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s)),
        },
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn format_date(days: i32) -> String {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|date| date.to_string())
        .unwrap_or_else(|| days.to_string())
}

fn format_time(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = micros.rem_euclid(1_000_000) * 1_000;
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos as u32))
        .map(|time| time.to_string())
        .unwrap_or_else(|| micros.to_string())
}

fn format_timestamp(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc().to_string())
        .unwrap_or_else(|| micros.to_string())
}
