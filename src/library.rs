//! Mask catalog: scans a directory for mask images and keeps a thumbnail per
//! entry.
//!
//! This is a convenience layer for browsing, not part of the compositing
//! contract — entries hold paths, and the compositor decodes the full image
//! itself when one is selected.

use image::{RgbaImage, imageops};
use std::path::{Path, PathBuf};

use crate::io::{self, OverlayError};

/// Longest edge of a generated thumbnail, in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 64;

/// One scanned mask file.
pub struct MaskEntry {
    /// File stem, used for display and ordering.
    pub name: String,
    pub path: PathBuf,
    pub thumbnail: RgbaImage,
}

pub struct MaskLibrary {
    entries: Vec<MaskEntry>,
    thumbnail_size: u32,
}

impl Default for MaskLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskLibrary {
    pub fn new() -> Self {
        Self::with_thumbnail_size(DEFAULT_THUMBNAIL_SIZE)
    }

    pub fn with_thumbnail_size(size: u32) -> Self {
        Self {
            entries: Vec::new(),
            thumbnail_size: size.max(1),
        }
    }

    /// Scan `directory` for mask images and append them to the catalog.
    ///
    /// Entries are (re)sorted by file stem, case-sensitively. Files that fail
    /// to decode are logged and skipped; only an unreadable directory is an
    /// error. Returns the number of entries added.
    pub fn scan_directory(&mut self, directory: &Path) -> Result<usize, OverlayError> {
        let mut added = 0;
        for entry in std::fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !is_image_file(&path) {
                continue;
            }
            match self.add_mask(&path) {
                Ok(()) => added += 1,
                Err(e) => {
                    crate::log_warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }

        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
        crate::log_info!("Found {} masks in {}", added, directory.display());
        Ok(added)
    }

    /// Decode one file and append it as a catalog entry.
    pub fn add_mask(&mut self, path: &Path) -> Result<(), OverlayError> {
        let image = io::load_image(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.entries.push(MaskEntry {
            name,
            path: path.to_path_buf(),
            thumbnail: make_thumbnail(&image, self.thumbnail_size),
        });
        Ok(())
    }

    pub fn entries(&self) -> &[MaskEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&MaskEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn thumbnail_size(&self) -> u32 {
        self.thumbnail_size
    }
}

/// Extension filter for catalog scans (case-insensitive).
fn is_image_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str(),
        "bmp" | "png" | "jpg" | "jpeg"
    )
}

/// Nearest-neighbor rescale so the longest edge equals `bound`, preserving
/// aspect ratio. Inputs smaller than the bound scale up too.
fn make_thumbnail(image: &RgbaImage, bound: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let scale = (bound as f32 / w as f32).min(bound as f32 / h as f32);
    let tw = ((w as f32 * scale) as u32).max(1);
    let th = ((h as f32 * scale) as u32).max(1);
    imageops::resize(image, tw, th, imageops::FilterType::Nearest)
}
