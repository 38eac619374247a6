#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Wire types shared between the esmhook hooks and whoever supervises them.
//!
//! A supervising process (a watch-mode runner, for example) receives one
//! [`SupervisorMessage::Dependency`] for every module URL the loader touches,
//! so it can track the dependency graph without the hooks knowing who listens.
//!
//! ## Wire format
//! Messages use length-prefixed JSON:
//! - 4-byte little-endian u32 length prefix
//! - JSON payload bytes

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Schema version of the CLI's `--json` reports.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Maximum frame size accepted by [`read_frame`].
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A message sent from the hooks to a supervising process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorMessage {
    /// A module URL was loaded.
    Dependency {
        /// The module URL, exactly as handed to the loader.
        path: String,
    },
}

impl SupervisorMessage {
    #[must_use]
    pub fn dependency(path: impl Into<String>) -> Self {
        Self::Dependency { path: path.into() }
    }
}

/// Error details in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g. `ERR_MODULE_NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Output of `esmhook resolve --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReport {
    pub schema_version: u32,
    pub ok: bool,
    pub specifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ResolveReport {
    #[must_use]
    pub fn resolved(
        specifier: impl Into<String>,
        parent: Option<String>,
        url: impl Into<String>,
        format: Option<String>,
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: true,
            specifier: specifier.into(),
            parent,
            url: Some(url.into()),
            format,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(specifier: impl Into<String>, parent: Option<String>, error: ErrorInfo) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: false,
            specifier: specifier.into(),
            parent,
            url: None,
            format: None,
            error: Some(error),
        }
    }
}

/// Output of `esmhook load --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub schema_version: u32,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl LoadReport {
    #[must_use]
    pub fn loaded(url: impl Into<String>, format: impl Into<String>, source: Option<String>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: true,
            url: Some(url.into()),
            format: Some(format.into()),
            source,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(url: Option<String>, error: ErrorInfo) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            ok: false,
            url,
            format: None,
            source: None,
            error: Some(error),
        }
    }
}

/// Encode a message as a length-prefixed JSON frame.
///
/// # Errors
/// Returns an error if serialization fails or the payload exceeds `u32::MAX`.
pub fn encode_frame<T: Serialize>(frame: &T) -> io::Result<Vec<u8>> {
    let json =
        serde_json::to_vec(frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let len = u32::try_from(json.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;

    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&json);

    Ok(buf)
}

/// Decode a JSON payload (without the length prefix).
///
/// # Errors
/// Returns an error if the payload is not valid JSON for `T`.
pub fn decode_frame<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> io::Result<T> {
    serde_json::from_slice(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one frame and flush.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> io::Result<()> {
    let buf = encode_frame(frame)?;
    writer.write_all(&buf)?;
    writer.flush()
}

/// Read one frame.
///
/// # Errors
/// Returns an error on EOF, oversized frames, or invalid JSON.
pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes"),
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    decode_frame(&buf)
}
