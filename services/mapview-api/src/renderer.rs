//! The rendering seam.
//!
//! The actual rasterization engine lives outside this service (its drawing
//! pipeline is GUI-bound); the service only depends on the [`MapRenderer`]
//! trait. A placeholder implementation is provided so the binary and tests
//! produce valid PNG bytes without a real backend.

use async_trait::async_trait;

use mapview_common::{BoundingBox, CrsCode, MapsError, MapsResult};

/// One normalized render request. Every pixel-producing protocol branch
/// funnels into this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTask {
    /// Target extent, x/y axis order, in `crs`
    pub bbox: BoundingBox,
    pub crs: CrsCode,
    pub width: u32,
    pub height: u32,
    /// Degrees, [0, 360); the renderer rotates natively
    pub rotation: f64,
    /// Restrict rendering to these layer ids, when present
    pub layers: Option<Vec<String>>,
    pub transparent: bool,
}

/// Rendering backend contract: produce PNG bytes for a task, or fail.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render(&self, task: &RenderTask) -> MapsResult<Vec<u8>>;
}

/// Stand-in renderer: a grayscale checkerboard PNG of the requested size.
///
/// Useful as the injected backend in tests and when running the service
/// without a host application attached.
pub struct PlaceholderRenderer;

#[async_trait]
impl MapRenderer for PlaceholderRenderer {
    async fn render(&self, task: &RenderTask) -> MapsResult<Vec<u8>> {
        if task.width == 0 || task.height == 0 {
            return Err(MapsError::RenderFailure(
                "zero-sized render target".to_string(),
            ));
        }
        Ok(checkerboard_png(task.width, task.height))
    }
}

/// Generate a grayscale checkerboard PNG.
pub fn checkerboard_png(width: u32, height: u32) -> Vec<u8> {
    let mut raw = Vec::with_capacity((height * (width + 1)) as usize);
    for y in 0..height {
        raw.push(0); // filter type none
        for x in 0..width {
            let cell = ((x / 16) + (y / 16)) % 2;
            raw.push(if cell == 0 { 200 } else { 150 });
        }
    }

    let mut data = Vec::new();

    // PNG signature
    data.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);

    // IHDR
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(0); // color type (grayscale)
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut data, b"IHDR", &ihdr);

    // IDAT
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    use std::io::Write;
    encoder.write_all(&raw).expect("in-memory write");
    let compressed = encoder.finish().expect("in-memory finish");
    write_chunk(&mut data, b"IDAT", &compressed);

    write_chunk(&mut data, b"IEND", &[]);

    data
}

/// Write a PNG chunk with CRC.
fn write_chunk(out: &mut Vec<u8>, name: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    let mut crc_data = Vec::with_capacity(4 + data.len());
    crc_data.extend_from_slice(name);
    crc_data.extend_from_slice(data);
    let crc = crc32fast::hash(&crc_data);
    out.extend_from_slice(&crc.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_png_signature() {
        let png = checkerboard_png(64, 64);
        assert_eq!(&png[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(png.len() > 50);
    }

    #[tokio::test]
    async fn test_placeholder_renderer() {
        let task = RenderTask {
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            crs: CrsCode::Epsg3857,
            width: 256,
            height: 256,
            rotation: 0.0,
            layers: None,
            transparent: false,
        };
        let bytes = PlaceholderRenderer.render(&task).await.unwrap();
        assert_eq!(&bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}
