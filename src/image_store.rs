use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::{ExtendedColorType, ImageFormat};

use crate::error::{Error, Result};
use crate::types::{RawImage, SavedImage};

/// Writes captured clipboard images into the engine's input directory.
pub struct ImageStore {
    input_dir: PathBuf,
    engine_input_root: Option<PathBuf>,
}

impl ImageStore {
    pub fn new(input_dir: impl Into<PathBuf>, engine_input_root: Option<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            engine_input_root,
        }
    }

    /// Saves `image` as `clipboard_<unix_timestamp>.png`, creating the
    /// directory if needed.
    pub fn save(&self, image: &RawImage) -> Result<SavedImage> {
        if image.width == 0 || image.height == 0 || image.rgba.len() != image.expected_len() {
            return Err(Error::InvalidImage {
                width: image.width,
                height: image.height,
                len: image.rgba.len(),
            });
        }

        fs::create_dir_all(&self.input_dir)?;

        let created_at = Utc::now().timestamp();
        let path = self.free_path(created_at);

        log::debug!(
            "Encoding {}x{} clipboard image to {}",
            image.width,
            image.height,
            path.display()
        );

        image::save_buffer_with_format(
            &path,
            &image.rgba,
            image.width,
            image.height,
            ExtendedColorType::Rgba8,
            ImageFormat::Png,
        )?;

        log::info!("Image saved to: {}", path.display());

        let engine_path = engine_relative_path(&path, self.engine_input_root.as_deref());
        Ok(SavedImage {
            path,
            engine_path,
            created_at,
        })
    }

    // Two images inside the same second would otherwise share a name.
    fn free_path(&self, timestamp: i64) -> PathBuf {
        let base = format!("clipboard_{}", timestamp);
        let mut candidate = self.input_dir.join(format!("{}.png", base));
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self.input_dir.join(format!("{}_{}.png", base, suffix));
            suffix += 1;
        }
        candidate
    }
}

/// Path of `path` as the engine sees it, relative to its input directory and
/// always with forward slashes.
///
/// Falls back to `<parent dir>/<file name>` when `path` is not under `root`.
pub fn engine_relative_path(path: &Path, root: Option<&Path>) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");

    if let Some(root) = root {
        let root = root.to_string_lossy().replace('\\', "/");
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(rest) = normalized.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
                return rest.to_string();
            }
        }
    }

    let mut segments = normalized.rsplit('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(file), Some(dir)) => format!("{}/{}", dir, file),
        (Some(file), None) => file.to_string(),
        _ => normalized,
    }
}
