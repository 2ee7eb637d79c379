//! Decoding of artifact payloads into pixels for both renderers.

use image::RgbaImage;
use thiserror::Error;
use tiny_skia::Pixmap;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("could not decode '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("'{key}' decoded to an empty {width}x{height} image")]
    Empty { key: String, width: u32, height: u32 },
}

/// A decoded artifact in straight (non-premultiplied) RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRaster {
    rgba: RgbaImage,
}

impl DecodedRaster {
    /// Decodes PNG or JPEG bytes; the format is sniffed from the payload.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, RasterError> {
        let decoded = image::load_from_memory(bytes).map_err(|source| RasterError::Decode {
            key: key.to_string(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(RasterError::Empty {
                key: key.to_string(),
                width,
                height,
            });
        }
        Ok(Self { rgba })
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Packed 8-bit RGB with transparency composited onto white, as PDF image
    /// XObjects expect.
    pub fn rgb_on_white(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width() * self.height() * 3) as usize);
        for px in self.rgba.pixels() {
            let [r, g, b, a] = px.0;
            for channel in [r, g, b] {
                out.push(over_white(channel, a));
            }
        }
        out
    }

    /// Premultiplied tiny-skia pixmap for raster composition.
    pub fn to_pixmap(&self) -> Option<Pixmap> {
        let mut pixmap = Pixmap::new(self.width(), self.height())?;
        let src = self.rgba.as_raw();
        let dst = pixmap.data_mut();
        for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
            let a = src_px[3];
            dst_px[0] = premul_u8(src_px[0], a);
            dst_px[1] = premul_u8(src_px[1], a);
            dst_px[2] = premul_u8(src_px[2], a);
            dst_px[3] = a;
        }
        Some(pixmap)
    }
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    premul_u8(channel, alpha) + (255 - alpha)
}
