//! Sanity check for downloaded image payloads.
//!
//! A truncated download or an HTML error page served with a 200 must
//! never reach the completion store, so every payload is sniffed
//! (header only, no full decode) before it is handed back.

use std::io::Cursor;

use image::ImageReader;

use crate::error::GenerationError;

/// Verify `bytes` look like a supported image and return its dimensions.
pub fn sniff_image(bytes: &[u8]) -> Result<(u32, u32), GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::Transient(
            "Downloaded image payload is empty".to_string(),
        ));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GenerationError::Transient(format!("Unreadable image payload: {e}")))?;

    if reader.format().is_none() {
        return Err(GenerationError::Transient(format!(
            "Downloaded payload ({} bytes) is not a recognised image",
            bytes.len()
        )));
    }

    reader
        .into_dimensions()
        .map_err(|e| GenerationError::Transient(format!("Corrupt image payload: {e}")))
}
