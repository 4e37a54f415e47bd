//! Decoded texture pixels ready for GPU upload.

use image::{DynamicImage, ImageFormat};

use crate::AssetError;

/// Pixel layout of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit sRGB colour with alpha (PNG, JPEG).
    Rgba8,
    /// 32-bit float linear radiance with alpha (Radiance HDR).
    Rgba32Float,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba32Float => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl TextureData {
    /// Decode PNG, JPEG, or HDR bytes. HDR keeps full float precision.
    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let format = image::guess_format(bytes)?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        let texture = if format == ImageFormat::Hdr || is_float(&decoded) {
            let rgba = decoded.to_rgba32f();
            let (width, height) = rgba.dimensions();
            let bytes = rgba
                .into_raw()
                .into_iter()
                .flat_map(f32::to_le_bytes)
                .collect();
            Self {
                name: name.into(),
                width,
                height,
                format: PixelFormat::Rgba32Float,
                bytes,
            }
        } else {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                name: name.into(),
                width,
                height,
                format: PixelFormat::Rgba8,
                bytes: rgba.into_raw(),
            }
        };
        tracing::debug!(
            name,
            width = texture.width,
            height = texture.height,
            format = ?texture.format,
            "decoded texture"
        );
        Ok(texture)
    }

    /// Two-tone checkerboard used as the floor when no texture is configured.
    pub fn checker(size: u32, cells: u32, a: [u8; 3], b: [u8; 3]) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let mut bytes = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let c = if ((x / cell) + (y / cell)) % 2 == 0 { a } else { b };
                bytes.extend_from_slice(&[c[0], c[1], c[2], 255]);
            }
        }
        Self {
            name: "builtin_checker".into(),
            width: size,
            height: size,
            format: PixelFormat::Rgba8,
            bytes,
        }
    }

    /// Average RGB over all pixels, linear for float textures and
    /// normalized `[0, 1]` for 8-bit ones.
    pub fn mean_rgb(&self) -> [f32; 3] {
        let pixels = (self.width as usize) * (self.height as usize);
        if pixels == 0 {
            return [0.0; 3];
        }
        let mut sum = [0.0_f64; 3];
        match self.format {
            PixelFormat::Rgba8 => {
                for px in self.bytes.chunks_exact(4) {
                    for c in 0..3 {
                        sum[c] += px[c] as f64 / 255.0;
                    }
                }
            }
            PixelFormat::Rgba32Float => {
                for px in self.bytes.chunks_exact(16) {
                    for c in 0..3 {
                        let b = [px[c * 4], px[c * 4 + 1], px[c * 4 + 2], px[c * 4 + 3]];
                        sum[c] += f32::from_le_bytes(b) as f64;
                    }
                }
            }
        }
        [
            (sum[0] / pixels as f64) as f32,
            (sum[1] / pixels as f64) as f32,
            (sum[2] / pixels as f64) as f32,
        ]
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * self.format.bytes_per_pixel() as u32
    }
}

fn is_float(image: &DynamicImage) -> bool {
    matches!(
        image,
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
    )
}
