//! Procedural sample masks.
//!
//! Renders a small starter set of overlay masks (vignette, circle cut-out,
//! frame, grid, measuring scale, star, heart, diagonal stripes). Regions
//! meant to let the source show through are filled with the magenta key
//! color, so any of these can be applied with the default [`KeyColor`].

use image::{Rgba, RgbaImage};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use crate::blend::KeyColor;
use crate::io::{self, OverlayError};

/// Magenta key as a pixel value, used for "transparent" fill.
const KEY_PIXEL: Rgba<u8> = Rgba([KeyColor::MAGENTA.r, KeyColor::MAGENTA.g, KeyColor::MAGENTA.b, 255]);

/// Oval vignette: transparent middle, darkening toward the edges.
pub fn vignette(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, KEY_PIXEL);

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius_x = width as f32 * 0.4;
    let radius_y = height as f32 * 0.4;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = (x as f32 - center_x) / radius_x;
        let dy = (y as f32 - center_y) / radius_y;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist > 1.0 {
            let alpha = ((dist - 1.0) * 2.0).min(1.0);
            let darkness = (alpha * 200.0) as u8;
            *pixel = Rgba([darkness, darkness, darkness, 255]);
        }
    }

    img
}

/// Solid black with a transparent circular hole in the middle.
pub fn circle(size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]));

    let center = size as f32 / 2.0;
    let radius = size as f32 * 0.35;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if (dx * dx + dy * dy).sqrt() < radius {
            *pixel = KEY_PIXEL;
        }
    }

    img
}

/// Border frame with a vertical shade gradient; interior is transparent.
pub fn frame(width: u32, height: u32, border: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, KEY_PIXEL);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x < border || x + border >= width || y < border || y + border >= height {
            let shade = (50 + y % 50) as u8;
            *pixel = Rgba([shade, shade, shade + 20, 255]);
        }
    }

    img
}

/// Grid lines every `cell_size` pixels; cells are transparent.
pub fn grid(size: u32, cell_size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, KEY_PIXEL);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x % cell_size == 0 || y % cell_size == 0 {
            *pixel = Rgba([100, 100, 100, 200]);
        }
    }

    img
}

/// Measuring scale along the bottom edge: major ticks every 50 px, minor
/// every 10 px, plus a baseline.
pub fn scale(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, KEY_PIXEL);

    let scale_y = height.saturating_sub(30);
    let tick_height = 20u32;
    let black = Rgba([0, 0, 0, 255]);

    for x in 0..width {
        let line_height = if x % 50 == 0 {
            tick_height
        } else if x % 10 == 0 {
            tick_height / 2
        } else {
            0
        };

        for y in scale_y..(scale_y + line_height).min(height) {
            img.put_pixel(x, y, black);
        }
    }

    // Baseline
    if scale_y < height {
        for x in 0..width {
            img.put_pixel(x, scale_y, black);
        }
    }

    img
}

/// Five-pointed star cut-out on a brown background.
pub fn star(size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([80, 60, 40, 255]));

    let center = size as f32 / 2.0;
    let points = 5.0;
    let outer_radius = size as f32 * 0.4;
    let inner_radius = size as f32 * 0.18;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        let angle = dy.atan2(dx);
        let dist = (dx * dx + dy * dy).sqrt();

        // Star radius at this angle: rises to the outer radius halfway
        // through each point sector, then falls back
        let point_angle = (angle + PI) / (2.0 * PI) * points * 2.0;
        let fraction = point_angle - point_angle.floor();
        let radius = if fraction < 0.5 {
            inner_radius + (outer_radius - inner_radius) * (fraction * 2.0)
        } else {
            outer_radius - (outer_radius - inner_radius) * ((fraction - 0.5) * 2.0)
        };

        if dist < radius {
            *pixel = KEY_PIXEL;
        }
    }

    img
}

/// Heart cut-out on a red background, from the classic implicit curve.
pub fn heart(size: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([200, 50, 80, 255]));

    let scale = size as f32 / 20.0;
    let center_x = size as f32 / 2.0;
    let center_y = size as f32 / 2.0 + size as f32 * 0.1;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let px = (x as f32 - center_x) / scale;
        let py = -(y as f32 - center_y) / scale;

        // (x² + y² − 6)³ − x²·y³ < 0 inside the heart
        let eq = (px * px + py * py - 6.0).powi(3) - px * px * py * py * py;
        if eq < 0.0 {
            *pixel = KEY_PIXEL;
        }
    }

    img
}

/// Diagonal stripe pattern; the gaps between stripes are transparent.
pub fn diagonal(size: u32, stripe_width: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, KEY_PIXEL);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if (x + y) % (stripe_width * 2) < stripe_width {
            *pixel = Rgba([50, 50, 150, 180]);
        }
    }

    img
}

/// Render the full sample set as PNGs into `directory` (created if needed).
/// Returns the written paths in generation order.
pub fn write_samples(directory: &Path) -> Result<Vec<PathBuf>, OverlayError> {
    std::fs::create_dir_all(directory)?;

    let samples: [(&str, RgbaImage); 8] = [
        ("vignette", vignette(800, 600)),
        ("circle", circle(500)),
        ("frame", frame(800, 600, 40)),
        ("grid", grid(500, 50)),
        ("scale", scale(800, 100)),
        ("star", star(400)),
        ("heart", heart(400)),
        ("diagonal", diagonal(500, 20)),
    ];

    let mut written = Vec::with_capacity(samples.len());
    for (name, image) in samples {
        let path = directory.join(format!("{}.png", name));
        io::save_image(&image, &path)?;
        crate::log_info!("Generated sample mask {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend;

    #[test]
    fn vignette_is_transparent_in_the_middle_and_dark_at_corners() {
        let img = vignette(80, 60);
        assert!(blend::is_transparent(*img.get_pixel(40, 30), KeyColor::MAGENTA));

        let corner = img.get_pixel(0, 0);
        assert!(!blend::is_transparent(*corner, KeyColor::MAGENTA));
        assert_eq!(corner[0], corner[1]);
        assert_eq!(corner[3], 255);
    }

    #[test]
    fn circle_cuts_a_key_hole_in_black() {
        let img = circle(100);
        assert!(blend::is_transparent(*img.get_pixel(50, 50), KeyColor::MAGENTA));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn frame_border_is_opaque_and_interior_transparent() {
        let img = frame(100, 80, 10);
        assert!(!blend::is_transparent(*img.get_pixel(0, 0), KeyColor::MAGENTA));
        assert!(blend::is_transparent(*img.get_pixel(50, 40), KeyColor::MAGENTA));
    }

    #[test]
    fn grid_lines_are_semi_opaque() {
        let img = grid(100, 10);
        assert_eq!(img.get_pixel(0, 5), &Rgba([100, 100, 100, 200]));
        assert!(blend::is_transparent(*img.get_pixel(5, 5), KeyColor::MAGENTA));
    }

    #[test]
    fn diagonal_alternates_stripes_and_gaps() {
        let img = diagonal(100, 10);
        // (x + y) % 20 < 10 is a stripe
        assert_eq!(img.get_pixel(0, 0), &Rgba([50, 50, 150, 180]));
        assert!(blend::is_transparent(*img.get_pixel(15, 0), KeyColor::MAGENTA));
    }

    #[test]
    fn star_and_heart_are_transparent_at_center() {
        assert!(blend::is_transparent(*star(100).get_pixel(50, 50), KeyColor::MAGENTA));
        assert!(blend::is_transparent(*heart(100).get_pixel(50, 50), KeyColor::MAGENTA));
    }
}
