//! QR image and PDF rendering
//!
//! The rest of the service only depends on the [`Renderer`] contract: a
//! payload plus style goes in, PNG bytes come out; PNG bytes go in, a
//! single-page PDF comes out. Both calls return the complete byte buffer.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use qrcode::QrCode;

/// A4 page size in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const DOCUMENT_MARGIN: i64 = 50;
const DOCUMENT_IMAGE_WIDTH: i64 = 400;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("qr encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("document error: {0}")]
    Document(#[from] lopdf::Error),
}

/// An RGBA color parsed from a CSS-style hex string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.strip_prefix('#').unwrap_or(raw);
        if !hex.is_ascii() {
            return None;
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut rgba = [255; 4];
                for (i, c) in hex.chars().enumerate() {
                    let digit = c.to_digit(16)? as u8;
                    rgba[i] = digit * 17;
                }
                Some(Color(rgba))
            }
            6 | 8 => {
                let mut rgba = [255; 4];
                for (i, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
                    *slot = channel(&hex[i * 2..i * 2 + 2])?;
                }
                Some(Color(rgba))
            }
            _ => None,
        }
    }
}

/// Visual options for a rendered code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    /// Output width and height in pixels
    pub size: u32,
    /// Quiet zone width in modules
    pub margin: u32,
    pub foreground: Color,
    pub background: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            size: 300,
            margin: 4,
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

pub trait Renderer: Send + Sync {
    /// Encodes `payload` as a QR code and returns PNG bytes.
    fn render_image(&self, payload: &str, style: &RenderStyle) -> Result<Vec<u8>, RenderError>;

    /// Places a PNG image on a single A4 page and returns PDF bytes.
    fn wrap_in_document(&self, png: &[u8]) -> Result<Vec<u8>, RenderError>;
}

/// Default renderer backed by `qrcode`, `image` and `lopdf`
#[derive(Debug, Clone, Copy, Default)]
pub struct QrRenderer;

impl Renderer for QrRenderer {
    fn render_image(&self, payload: &str, style: &RenderStyle) -> Result<Vec<u8>, RenderError> {
        let code = QrCode::new(payload.as_bytes())?;
        let modules = code.width() as u32;
        let colors = code.to_colors();

        let margin = style.margin;
        let total = modules + 2 * margin;
        // At least one pixel per module, otherwise the code is unreadable
        let dim = style.size.max(total);

        let dark = Rgba(style.foreground.0);
        let light = Rgba(style.background.0);

        let image = RgbaImage::from_fn(dim, dim, |x, y| {
            let mx = x * total / dim;
            let my = y * total / dim;
            if mx < margin || my < margin || mx >= margin + modules || my >= margin + modules {
                return light;
            }
            let idx = ((my - margin) * modules + (mx - margin)) as usize;
            match colors[idx] {
                qrcode::Color::Dark => dark,
                qrcode::Color::Light => light,
            }
        });

        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn wrap_in_document(&self, png: &[u8]) -> Result<Vec<u8>, RenderError> {
        let rgb = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgb8();
        let (width, height) = rgb.dimensions();

        let draw_width = DOCUMENT_IMAGE_WIDTH;
        let draw_height = DOCUMENT_IMAGE_WIDTH * i64::from(height) / i64::from(width.max(1));
        // PDF origin is bottom-left
        let draw_y = PAGE_HEIGHT - DOCUMENT_MARGIN - draw_height;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            rgb.into_raw(),
        );
        // Sets /Filter /FlateDecode; raw RGB of a 2048px code is ~12 MB
        image_stream.compress()?;
        let image_id = doc.add_object(image_stream);

        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        });

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(draw_width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(draw_height),
                        Object::Integer(DOCUMENT_MARGIN),
                        Object::Integer(draw_y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode()?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
        Ok(bytes)
    }
}

/// Formats bytes as a base64 `data:` URI.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
