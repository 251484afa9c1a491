use eframe::egui::ColorImage;

use crate::error::Result;

/// Downloads and decodes the preview image advertised in a metadata record.
///
/// Blocking; only call from a worker thread, and not from inside an async
/// runtime.
pub fn fetch_thumbnail(url: &str) -> Result<ColorImage> {
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    decode_thumbnail(&bytes)
}

pub fn decode_thumbnail(bytes: &[u8]) -> Result<ColorImage> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, img.as_flat_samples().as_slice()))
}
