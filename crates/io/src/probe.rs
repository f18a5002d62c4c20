use std::io::Cursor;

use image::ImageFormat;

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn is_jpeg(&self) -> bool {
        self.format == ImageFormat::Jpeg
    }
}

/// Format and pixel dimensions from the image header. Does not decode
/// pixel data.
pub fn probe_image(bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ProbeError(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| ProbeError("unrecognized format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ProbeError(e.to_string()))?;
    Ok(ImageInfo { format, width, height })
}
