use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde_json::Value;

use crate::error::DecodeError;

/// An image decoded from a job's output, owned by the caller.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// The encoded container bytes exactly as the worker produced them.
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// File extension matching the container format, e.g. `"png"`.
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Decode the `output` envelope of a completed job.
///
/// The envelope must be an object whose `message` field holds the base64
/// image. A `data:<mime>;base64,` prefix is tolerated.
pub fn decode(envelope: &Value) -> Result<DecodedImage, DecodeError> {
    let message = envelope
        .as_object()
        .and_then(|o| o.get("message"))
        .and_then(|m| m.as_str())
        .ok_or_else(|| DecodeError::MissingField(truncate(&envelope.to_string(), 200)))?;

    let payload = strip_data_uri(message);
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DecodeError::BadEncoding(format!("invalid base64: {}", e)))?;

    let format = image::guess_format(&bytes)
        .map_err(|e| DecodeError::BadEncoding(format!("unrecognised image container: {}", e)))?;
    let image = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| DecodeError::BadEncoding(e.to_string()))?;

    Ok(DecodedImage {
        image,
        format,
        bytes,
    })
}

fn strip_data_uri(message: &str) -> &str {
    match message.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => message,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
