//! HTTP request handlers for the QR API
//!
//! This module wires the HTTP surface to the core components:
//! - Generating QR images (optionally registered under a short link)
//! - Redirecting short links while counting scans
//! - Dashboard statistics for an owner
//! - Deleting an owner's QR codes

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::analytics::summarize;
use crate::auth::Owner;
use crate::error::AppError;
use crate::model::{DashboardStats, GenerateFields, GenerateRequest, GenerateResponse, UploadedFile};
use crate::render::data_url;
use crate::state::AppState;

impl<S> FromRequest<S> for GenerateFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Reads the generation fields from a multipart form, a JSON body, or a
    /// url-encoded form, depending on the content type.
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation(rejection.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(fields) = Json::<GenerateFields>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation(rejection.body_text()))?;
            Ok(fields)
        } else {
            let Form(fields) = Form::<GenerateFields>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation(rejection.body_text()))?;
            Ok(fields)
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<GenerateFields, AppError> {
    let mut fields = GenerateFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::validation(err.body_text()))?;
            // Browsers send an empty part when no file was chosen
            if !file_name.is_empty() || !bytes.is_empty() {
                fields.file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| AppError::validation(err.body_text()))?;
        match name.as_str() {
            "mode" => fields.mode = Some(value),
            "content" => fields.content = Some(value),
            "title" => fields.title = Some(value),
            "size" => fields.size = Some(value),
            "color" => fields.color = Some(value),
            "bgcolor" => fields.bgcolor = Some(value),
            _ => {}
        }
    }

    Ok(fields)
}

/// Generates a QR code
///
/// This handler:
/// 1. Validates the form fields
/// 2. Resolves the target (trimmed text, or the URL of the stored upload)
/// 3. Registers a short link when the caller is authenticated
/// 4. Renders the final payload as PNG and wraps it in a PDF
///
/// # Response
///
/// - **200 OK** - `{ "pngDataUrl": ..., "pdfDataUrl": ..., "shortId"?: ... }`
/// - **400 Bad Request** - Missing content/file or an invalid field
/// - **500 Internal Server Error** - Rendering or storage failure
pub async fn generate_qr(
    State(state): State<AppState>,
    headers: HeaderMap,
    fields: GenerateFields,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = GenerateRequest::validate(fields)?;
    let owner = state.auth.identify_headers(&headers);

    let target_url = state
        .resolver
        .resolve(request.mode, request.content.as_deref(), request.file.as_ref())
        .await?;

    let registration = state
        .registry
        .register(&target_url, owner.as_ref(), &request.title)?;

    let png = state
        .renderer
        .render_image(&registration.payload, &request.style)?;
    let pdf = state.renderer.wrap_in_document(&png)?;

    if registration.record.is_none() {
        tracing::debug!(mode = ?request.mode, "generated anonymous QR code");
    }

    Ok(Json(GenerateResponse {
        png_data_url: data_url("image/png", &png),
        pdf_data_url: data_url("application/pdf", &pdf),
        short_id: registration.record.map(|record| record.short_id),
    }))
}

/// Percent-encodes every byte outside visible ASCII so the target can be used
/// as a `Location` header. Existing escapes are left alone.
fn encode_location(target: &str) -> String {
    let mut encoded = String::with_capacity(target.len());
    for byte in target.bytes() {
        if (0x21..=0x7e).contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Redirects a short link to its target and counts the scan
///
/// # Response
///
/// - **302 Found** - Redirects to the record's target
/// - **404 Not Found** - Plain-text body, short id unknown
pub async fn redirect_url(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.registry.resolve(&short_id) {
        Ok(target) => (
            StatusCode::FOUND,
            [(header::LOCATION, encode_location(&target))],
        )
            .into_response(),
        Err(AppError::NotFound(message)) => (StatusCode::NOT_FOUND, message).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Summary statistics for the authenticated owner
///
/// # Response
///
/// ```json
/// {
///   "totalQRs": 2,
///   "totalScans": 5,
///   "graphData": [0, 0, 1, 0, 2, 0, 2],
///   "qrList": [...]
/// }
/// ```
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Json<DashboardStats>, AppError> {
    let records = state.registry.list(&owner)?;
    Ok(Json(summarize(records, Utc::now())))
}

/// Deletes one of the authenticated owner's QR codes
///
/// # Response
///
/// - **200 OK** - `{ "success": true }`
/// - **404 Not Found** - Record missing or owned by someone else
pub async fn delete_qr(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Json<Value>, AppError> {
    state.registry.delete(&id, &owner)?;
    Ok(Json(json!({ "success": true })))
}
