//! # Image Sources
//!
//! An image item gets its picture from its bound value or its literal `data`.
//! Bound values may carry raw bytes; strings may be a data URI, a file path or
//! raw base64. Whatever the source, the result is a [`LoadedImage`] the
//! canvas can embed: JPEGs keep their original bytes, PNGs are decoded to RGB
//! plus an optional alpha plane.

use std::io::Cursor;
use std::path::Path;

use crate::error::QuireError;

/// A decoded image ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded as-is with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    Decoded {
        /// width * height * 3 bytes
        rgb: Vec<u8>,
        /// width * height bytes. None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Load an image from a source string.
///
/// - `data:image/...;base64,...`
/// - a path to an existing file (or one spelled `/`, `./`, `../`)
/// - raw base64-encoded image data
pub fn load_image(src: &str) -> Result<LoadedImage, QuireError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(QuireError::Image("no image source".to_string()));
    }
    let raw_bytes = read_source_bytes(src)?;
    decode_image_bytes(&raw_bytes)
}

fn read_source_bytes(src: &str) -> Result<Vec<u8>, QuireError> {
    if src.starts_with("data:") {
        let (_, payload) = src
            .split_once(',')
            .ok_or_else(|| QuireError::Image("data URI without a payload".to_string()))?;
        return base64_decode(payload);
    }

    // Base64 text can contain '/', so only explicit prefixes or files that
    // actually exist count as paths.
    let looks_like_path = src.starts_with('/') || src.starts_with("./") || src.starts_with("../");
    if looks_like_path || Path::new(src).is_file() {
        return std::fs::read(src)
            .map_err(|e| QuireError::Image(format!("cannot read image file '{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, QuireError> {
    use base64::Engine;
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| QuireError::Image(format!("invalid base64 image data: {}", e)))
}

/// Detect the format from magic bytes and decode.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, QuireError> {
    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(QuireError::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

/// JPEG: read dimensions only; pixels stay compressed.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, QuireError> {
    let (width, height) = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|e| QuireError::Image(format!("unreadable JPEG: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Component count from the first SOF segment: 1 is gray, anything else RGB.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        let segment_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + segment_len;
    }
    JpegColorSpace::DeviceRGB
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, QuireError> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)
        .map_err(|e| QuireError::Image(format!("unreadable PNG: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = pixel_count(width, height);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: if opaque { None } else { Some(alpha) },
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 1, 1, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0xFF]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_image("data:image/png;base64").is_err());
        assert!(load_image("").is_err());
        assert!(decode_image_bytes(&[0, 1, 2, 3, 4]).is_err());
        assert!(load_image("not base64 at all!").is_err());
    }

    #[test]
    fn opaque_png_has_no_alpha_plane() {
        let loaded = decode_image_bytes(&png_bytes([255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn translucent_png_keeps_alpha() {
        let loaded = decode_image_bytes(&png_bytes([255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[128u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        assert!(matches!(
            loaded.pixel_data,
            ImagePixelData::Jpeg {
                color_space: JpegColorSpace::DeviceRGB,
                ..
            }
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn pixel_counts_past_u32_do_not_wrap() {
        assert_eq!(pixel_count(65_536, 65_536), 1 << 32);
        assert_eq!(pixel_count(3, 2), 6);
    }

    #[test]
    fn data_uri_base64_and_file_sources() {
        use base64::Engine;
        let png = png_bytes([0, 255, 0, 255]);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);

        assert!(load_image(&format!("data:image/png;base64,{}", b64)).is_ok());
        assert!(load_image(&b64).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        std::fs::write(&path, &png).unwrap();
        assert!(load_image(path.to_str().unwrap()).is_ok());

        assert!(decode_image_bytes(&png).is_ok());
    }
}
