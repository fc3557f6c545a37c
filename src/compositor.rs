//! Owns the source, mask and result buffers and runs the offset-aware
//! composite loop.
//!
//! The buffers belong exclusively to the [`Compositor`]; callers only ever
//! see `&RgbaImage` views. One instance per logical flow — `&mut self`
//! enforces exclusive access, there is no internal locking.

use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;

use crate::blend::{self, BlendMode, KeyColor};
use crate::io::{self, OverlayError};

pub struct Compositor {
    source: Option<RgbaImage>,
    mask: Option<RgbaImage>,
    result: Option<RgbaImage>,
    /// Signed translation applied when sampling the mask:
    /// `mask coord = output coord + offset`.
    offset: (i32, i32),
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            source: None,
            mask: None,
            result: None,
            offset: (0, 0),
        }
    }

    /// Decode a source image from disk.
    ///
    /// On failure the previous state is left untouched; on success any old
    /// result is invalidated.
    pub fn load_source(&mut self, path: &Path) -> Result<(), OverlayError> {
        let image = io::load_image(path)?;
        crate::log_info!(
            "Loaded source image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.set_source(image);
        Ok(())
    }

    /// Decode a mask image from disk. Same failure semantics as
    /// [`load_source`](Self::load_source); a successful load also resets the
    /// offset to (0, 0).
    pub fn load_mask(&mut self, path: &Path) -> Result<(), OverlayError> {
        let image = io::load_image(path)?;
        crate::log_info!(
            "Loaded mask {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.set_mask(image);
        Ok(())
    }

    /// Install an already-decoded source buffer.
    pub fn set_source(&mut self, image: RgbaImage) {
        self.source = Some(image);
        self.result = None;
    }

    /// Install an already-decoded mask buffer and reset the offset.
    pub fn set_mask(&mut self, image: RgbaImage) {
        self.mask = Some(image);
        self.result = None;
        self.offset = (0, 0);
    }

    /// Store a signed mask offset. Values outside the mask bounds are legal;
    /// uncovered output pixels simply pass through.
    pub fn set_offset(&mut self, dx: i32, dy: i32) {
        self.offset = (dx, dy);
    }

    pub fn reset_offset(&mut self) {
        self.offset = (0, 0);
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    /// Composite the mask onto the source and keep the result.
    ///
    /// Fails before any pixel work unless both images are loaded. The result
    /// always has the source's dimensions; output pixels whose offset mask
    /// coordinate falls outside the mask copy the source verbatim. Rows are
    /// processed in parallel — pixels are independent, so the outcome does
    /// not depend on scheduling.
    pub fn apply(
        &mut self,
        mode: BlendMode,
        key: KeyColor,
        use_alpha: bool,
    ) -> Result<&RgbaImage, OverlayError> {
        let source = self
            .source
            .as_ref()
            .ok_or(OverlayError::MissingInput("source image"))?;
        let mask = self
            .mask
            .as_ref()
            .ok_or(OverlayError::MissingInput("mask image"))?;

        let (width, height) = source.dimensions();
        let (mask_w, mask_h) = mask.dimensions();
        let (dx, dy) = self.offset;

        let mut out = RgbaImage::new(width, height);
        if width == 0 || height == 0 {
            return Ok(self.result.insert(out));
        }
        let row_bytes = width as usize * 4;

        out.par_chunks_exact_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                let my = y as i32 + dy;
                let mask_row = my >= 0 && (my as u32) < mask_h;
                for x in 0..width as usize {
                    let source_pixel = *source.get_pixel(x as u32, y as u32);
                    let mx = x as i32 + dx;
                    let pixel = if mask_row && mx >= 0 && (mx as u32) < mask_w {
                        let mask_pixel = *mask.get_pixel(mx as u32, my as u32);
                        blend::composite(source_pixel, mask_pixel, mode, key, use_alpha)
                    } else {
                        source_pixel
                    };
                    row[x * 4..x * 4 + 4].copy_from_slice(&pixel.0);
                }
            });

        crate::log_info!("Applied mask in {} mode", mode.name());
        Ok(self.result.insert(out))
    }

    /// Encode the held result to disk.
    pub fn save_result(&self, path: &Path) -> Result<(), OverlayError> {
        let result = self
            .result
            .as_ref()
            .ok_or(OverlayError::MissingInput("composited result"))?;
        io::save_image(result, path)?;
        crate::log_info!("Saved result to {}", path.display());
        Ok(())
    }

    pub fn source(&self) -> Option<&RgbaImage> {
        self.source.as_ref()
    }

    pub fn mask(&self) -> Option<&RgbaImage> {
        self.mask.as_ref()
    }

    pub fn result(&self) -> Option<&RgbaImage> {
        self.result.as_ref()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Source dimensions, or (0, 0) when nothing is loaded.
    pub fn source_size(&self) -> (u32, u32) {
        self.source.as_ref().map_or((0, 0), |i| i.dimensions())
    }

    /// Mask dimensions, or (0, 0) when nothing is loaded.
    pub fn mask_size(&self) -> (u32, u32) {
        self.mask.as_ref().map_or((0, 0), |i| i.dimensions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn apply_without_inputs_is_a_caller_error() {
        let mut comp = Compositor::new();
        let err = comp.apply(BlendMode::Replace, KeyColor::default(), true).unwrap_err();
        assert!(matches!(err, OverlayError::MissingInput(_)));

        comp.set_source(solid(2, 2, [0, 0, 0, 255]));
        let err = comp.apply(BlendMode::Replace, KeyColor::default(), true).unwrap_err();
        assert!(matches!(err, OverlayError::MissingInput(_)));
    }

    #[test]
    fn result_always_has_source_dimensions() {
        let mut comp = Compositor::new();
        comp.set_source(solid(7, 3, [50, 50, 50, 255]));
        comp.set_mask(solid(100, 100, [20, 20, 20, 255]));
        let result = comp.apply(BlendMode::Add, KeyColor::default(), false).unwrap();
        assert_eq!(result.dimensions(), (7, 3));

        comp.set_mask(solid(1, 1, [20, 20, 20, 255]));
        let result = comp.apply(BlendMode::Add, KeyColor::default(), false).unwrap();
        assert_eq!(result.dimensions(), (7, 3));
    }

    #[test]
    fn all_magenta_mask_passes_source_through_for_every_mode() {
        let mut comp = Compositor::new();
        comp.set_source(solid(2, 2, [255, 255, 255, 255]));
        comp.set_mask(solid(2, 2, [255, 0, 255, 255]));
        for &mode in BlendMode::all() {
            let result = comp.apply(mode, KeyColor::default(), true).unwrap();
            for pixel in result.pixels() {
                assert_eq!(pixel, &Rgba([255, 255, 255, 255]), "mode {:?}", mode);
            }
        }
    }

    #[test]
    fn multiply_single_pixel() {
        let mut comp = Compositor::new();
        comp.set_source(solid(1, 1, [10, 10, 10, 255]));
        comp.set_mask(solid(1, 1, [200, 200, 200, 255]));
        let result = comp.apply(BlendMode::Multiply, KeyColor::default(), false).unwrap();
        assert_eq!(result.get_pixel(0, 0), &Rgba([7, 7, 7, 255]));
    }

    #[test]
    fn out_of_bounds_offset_passes_source_through_exactly() {
        let mut comp = Compositor::new();
        comp.set_source(solid(4, 4, [30, 60, 90, 120]));
        comp.set_mask(solid(2, 2, [200, 200, 200, 255]));
        // Push the 2x2 mask entirely off the grid
        comp.set_offset(10, 10);
        let result = comp.apply(BlendMode::Replace, KeyColor::default(), false).unwrap();
        for pixel in result.pixels() {
            assert_eq!(pixel, &Rgba([30, 60, 90, 120]));
        }
    }

    #[test]
    fn negative_offset_shifts_mask_coverage() {
        let mut comp = Compositor::new();
        comp.set_source(solid(2, 1, [0, 0, 0, 255]));
        comp.set_mask(solid(1, 1, [255, 255, 255, 255]));
        // mask coord = output + (-1, 0): only output x=1 lands on mask x=0
        comp.set_offset(-1, 0);
        let result = comp.apply(BlendMode::Replace, KeyColor::default(), false).unwrap();
        assert_eq!(result.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn loading_a_mask_resets_the_offset() {
        let mut comp = Compositor::new();
        comp.set_offset(5, 5);
        comp.set_mask(solid(1, 1, [0, 0, 0, 255]));
        assert_eq!(comp.offset(), (0, 0));
    }

    #[test]
    fn failed_load_preserves_previous_state() {
        let mut comp = Compositor::new();
        comp.set_source(solid(2, 2, [1, 2, 3, 255]));
        comp.set_mask(solid(2, 2, [4, 5, 6, 255]));
        comp.set_offset(3, 4);
        comp.apply(BlendMode::Replace, KeyColor::default(), false).unwrap();

        assert!(comp.load_source(Path::new("/nope/missing.png")).is_err());
        assert!(comp.load_mask(Path::new("/nope/missing.png")).is_err());

        assert!(comp.has_source() && comp.has_mask() && comp.has_result());
        assert_eq!(comp.source_size(), (2, 2));
        assert_eq!(comp.offset(), (3, 4));
    }

    #[test]
    fn new_inputs_invalidate_the_result() {
        let mut comp = Compositor::new();
        comp.set_source(solid(2, 2, [0, 0, 0, 255]));
        comp.set_mask(solid(2, 2, [9, 9, 9, 255]));
        comp.apply(BlendMode::Replace, KeyColor::default(), false).unwrap();
        assert!(comp.has_result());

        comp.set_source(solid(2, 2, [1, 1, 1, 255]));
        assert!(!comp.has_result());

        comp.apply(BlendMode::Replace, KeyColor::default(), false).unwrap();
        comp.set_mask(solid(2, 2, [8, 8, 8, 255]));
        assert!(!comp.has_result());
    }

    #[test]
    fn mask_alpha_interpolates_toward_source() {
        let mut comp = Compositor::new();
        comp.set_source(solid(1, 1, [0, 0, 0, 255]));
        comp.set_mask(solid(1, 1, [200, 200, 200, 128]));
        let result = comp.apply(BlendMode::Replace, KeyColor::default(), true).unwrap();
        let channel = result.get_pixel(0, 0)[0] as i32;
        assert!((channel - 100).abs() <= 1, "got {}", channel);
    }

    #[test]
    fn save_without_result_is_a_caller_error() {
        let comp = Compositor::new();
        let err = comp.save_result(Path::new("/tmp/unused.png")).unwrap_err();
        assert!(matches!(err, OverlayError::MissingInput(_)));
    }
}
