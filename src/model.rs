//! Data models for the QR service
//!
//! This module defines the persisted QR record, the validated generation
//! request, and the JSON payloads returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::render::{Color, RenderStyle};

/// Represents a registered QR code stored in the database
///
/// Only generations made by an authenticated owner are persisted. The
/// invariant `scans == scan_history.len()` holds after every write.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrRecord {
    /// Unique record identifier, used by the delete endpoint
    pub id: String,

    /// Owner that registered the code
    pub owner_id: Option<String>,

    /// Display label, "Untitled" when the request left it blank
    pub title: String,

    /// What the code ultimately points at: a link, raw text, or an upload URL
    pub target_url: String,

    /// Redirect key, unique across all records
    pub short_id: String,

    /// PNG data URI of the redirect URL, used as a dashboard thumbnail
    pub qr_image: String,

    #[serde(default)]
    pub scans: u64,

    /// Timestamps of every scan, oldest first
    #[serde(default)]
    pub scan_history: Vec<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How the generation request supplies its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Link,
    File,
}

impl Mode {
    /// Parses the `mode` form field. Blank or absent means text.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim).unwrap_or_default() {
            "" | "text" => Ok(Mode::Text),
            "link" => Ok(Mode::Link),
            "file" => Ok(Mode::File),
            other => Err(AppError::validation(format!("Unknown mode: {other}"))),
        }
    }
}

/// A file attached to a multipart generation request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw, unvalidated fields of a generation request
///
/// Filled from a multipart form, a url-encoded form, or a JSON body.
#[derive(Deserialize, Debug, Default)]
pub struct GenerateFields {
    pub mode: Option<String>,
    pub content: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
    pub color: Option<String>,
    pub bgcolor: Option<String>,
    #[serde(skip)]
    pub file: Option<UploadedFile>,
}

/// Accepts either a string or a number, so JSON clients may send `"size": 400`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_SIZE: u32 = 400;
pub const MIN_SIZE: u32 = 64;
pub const MAX_SIZE: u32 = 2048;
pub const DEFAULT_MARGIN: u32 = 4;

/// A generation request whose fields have all been checked
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub mode: Mode,
    pub content: Option<String>,
    pub file: Option<UploadedFile>,
    pub title: String,
    pub style: RenderStyle,
}

impl GenerateRequest {
    /// Validates every recognised field before any business logic runs.
    ///
    /// Presence of `content` or `file` is checked later by the payload
    /// resolver, since which one is required depends on the mode.
    pub fn validate(fields: GenerateFields) -> Result<Self, AppError> {
        let mode = Mode::parse(fields.mode.as_deref())?;

        let title = fields
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        let size = match fields.size.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_SIZE,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|s| (MIN_SIZE..=MAX_SIZE).contains(s))
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "Size must be an integer between {MIN_SIZE} and {MAX_SIZE}"
                    ))
                })?,
        };

        let foreground = parse_color_field(fields.color.as_deref(), Color::BLACK, "color")?;
        let background = parse_color_field(fields.bgcolor.as_deref(), Color::WHITE, "bgcolor")?;

        Ok(Self {
            mode,
            content: fields.content,
            file: fields.file,
            title,
            style: RenderStyle {
                size,
                margin: DEFAULT_MARGIN,
                foreground,
                background,
            },
        })
    }
}

fn parse_color_field(raw: Option<&str>, default: Color, field: &str) -> Result<Color, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => Color::parse_hex(value)
            .ok_or_else(|| AppError::validation(format!("Invalid {field}: {value}"))),
    }
}

/// Response body of `POST /generate`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub png_data_url: String,
    pub pdf_data_url: String,

    /// Present only when the code was registered for an owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

/// Response body of `GET /api/dashboard-stats`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(rename = "totalQRs")]
    pub total_qrs: usize,
    pub total_scans: u64,
    pub graph_data: [u64; 7],
    pub qr_list: Vec<QrRecord>,
}
