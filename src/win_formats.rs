//! Decoders for the raw Win32 clipboard formats (`CF_DIB`, `CF_UNICODETEXT`).
//!
//! Kept platform independent so they can be exercised on any host.
#![cfg_attr(not(windows), allow(dead_code))]

use thiserror::Error;

use crate::types::RawImage;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const BITMAPINFOHEADER_SIZE: usize = 40;
const MAX_DIMENSION: u32 = 10_000;
const BGRA_MASKS: (u32, u32, u32) = (0x00FF_0000, 0x0000_FF00, 0x0000_00FF);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DibError {
    #[error("DIB shorter than its header")]
    Truncated,
    #[error("invalid DIB header size: {0}")]
    HeaderSize(usize),
    #[error("invalid DIB dimensions: {width}x{height}")]
    Dimensions { width: i32, height: i32 },
    #[error("unsupported DIB: bit_count={bit_count}, compression={compression}")]
    Unsupported { bit_count: u16, compression: u32 },
    #[error("unsupported DIB colour masks: red={red:#010x}, green={green:#010x}, blue={blue:#010x}")]
    Masks { red: u32, green: u32, blue: u32 },
    #[error("DIB pixel data truncated: expected {expected} bytes, got {actual}")]
    PixelData { expected: usize, actual: usize },
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, DibError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(DibError::Truncated)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, DibError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DibError::Truncated)
}

/// Decodes a packed DIB (BITMAPINFO followed by pixels) into top-down RGBA.
///
/// Supports uncompressed 24/32-bit and `BI_BITFIELDS` 32-bit with the usual
/// BGRA masks; any other mask layout is rejected. A 32-bit bitmap whose
/// alpha channel is entirely zero is treated as opaque, which is what most
/// screenshot tools put on the clipboard.
pub fn decode_dib(data: &[u8]) -> Result<RawImage, DibError> {
    let header_size = read_u32(data, 0)? as usize;
    if header_size < BITMAPINFOHEADER_SIZE {
        return Err(DibError::HeaderSize(header_size));
    }

    let width = read_u32(data, 4)? as i32;
    let height = read_u32(data, 8)? as i32;
    let bit_count = read_u16(data, 14)?;
    let compression = read_u32(data, 16)?;
    let colors_used = read_u32(data, 32)? as usize;

    if width <= 0
        || height == 0
        || width.unsigned_abs() > MAX_DIMENSION
        || height.unsigned_abs() > MAX_DIMENSION
    {
        return Err(DibError::Dimensions { width, height });
    }

    match (bit_count, compression) {
        (24, BI_RGB) | (32, BI_RGB) | (32, BI_BITFIELDS) => {}
        _ => {
            return Err(DibError::Unsupported {
                bit_count,
                compression,
            })
        }
    }

    // Masks sit at offset 40 either way: right after a plain BITMAPINFOHEADER,
    // or inside a V4/V5 header.
    if compression == BI_BITFIELDS {
        let masks = (read_u32(data, 40)?, read_u32(data, 44)?, read_u32(data, 48)?);
        if masks != BGRA_MASKS {
            return Err(DibError::Masks {
                red: masks.0,
                green: masks.1,
                blue: masks.2,
            });
        }
    }

    let trailing_masks = if compression == BI_BITFIELDS && header_size == BITMAPINFOHEADER_SIZE {
        12
    } else {
        0
    };
    let pixel_offset = header_size
        .saturating_add(trailing_masks)
        .saturating_add(colors_used.saturating_mul(4));

    let width_px = width as usize;
    let height_px = height.unsigned_abs() as usize;
    let bytes_per_pixel = bit_count as usize / 8;
    let row_size = (width_px * bytes_per_pixel + 3) / 4 * 4;
    let expected = pixel_offset.saturating_add(row_size * height_px);
    if data.len() < expected {
        return Err(DibError::PixelData {
            expected,
            actual: data.len(),
        });
    }

    let pixels = &data[pixel_offset..expected];
    let bottom_up = height > 0;
    let mut rgba = Vec::with_capacity(width_px * height_px * 4);

    for y in 0..height_px {
        let src_row = if bottom_up { height_px - 1 - y } else { y };
        let start = src_row * row_size;
        let row = &pixels[start..start + width_px * bytes_per_pixel];

        for px in row.chunks_exact(bytes_per_pixel) {
            let alpha = if bytes_per_pixel == 4 { px[3] } else { 255 };
            rgba.extend_from_slice(&[px[2], px[1], px[0], alpha]);
        }
    }

    if bytes_per_pixel == 4 && rgba.chunks_exact(4).all(|px| px[3] == 0) {
        for px in rgba.chunks_exact_mut(4) {
            px[3] = 255;
        }
    }

    Ok(RawImage {
        width: width as u32,
        height: height_px as u32,
        rgba,
    })
}

/// Decodes NUL-terminated UTF-16LE text as stored under `CF_UNICODETEXT`.
pub fn decode_unicode_text(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
