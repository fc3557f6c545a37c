//! Per-pixel blend engine.
//!
//! Pure functions only: given a source pixel, a mask pixel, a blend mode and a
//! key color, [`composite`] returns the merged pixel. No state, no I/O — the
//! caller (normally [`crate::compositor::Compositor`]) drives the pixel loop.

use image::Rgba;

/// Per-channel tolerance for the chroma-key comparison.
///
/// A mask pixel whose R, G and B are each within this distance of the key
/// color contributes nothing to the output.
pub const KEY_TOLERANCE: i32 = 10;

/// RGB color treated as "transparent" when found in a mask image.
///
/// Alpha plays no part in the comparison; a mask pixel with alpha 0 is
/// transparent regardless of its RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl KeyColor {
    /// Magenta, the conventional key for mask images.
    pub const MAGENTA: KeyColor = KeyColor { r: 255, g: 0, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for KeyColor {
    fn default() -> Self {
        Self::MAGENTA
    }
}

/// How a mask pixel is merged with the source pixel underneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    Add,
    Multiply,
    Screen,
    Overlay,
    Difference,
    SoftLight,
    HardLight,
}

impl BlendMode {
    /// Every mode, in menu order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Replace,
            BlendMode::Add,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Difference,
            BlendMode::SoftLight,
            BlendMode::HardLight,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Replace => "Replace",
            BlendMode::Add => "Add",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Difference => "Difference",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::HardLight => "Hard Light",
        }
    }

    /// Parse a mode from its CLI spelling (case-insensitive).
    pub fn parse(s: &str) -> Option<BlendMode> {
        match s.to_lowercase().as_str() {
            "replace" => Some(BlendMode::Replace),
            "add" => Some(BlendMode::Add),
            "multiply" => Some(BlendMode::Multiply),
            "screen" => Some(BlendMode::Screen),
            "overlay" => Some(BlendMode::Overlay),
            "difference" => Some(BlendMode::Difference),
            "softlight" | "soft-light" => Some(BlendMode::SoftLight),
            "hardlight" | "hard-light" => Some(BlendMode::HardLight),
            _ => None,
        }
    }
}

/// Returns `true` when `pixel` should be skipped by the compositor.
///
/// A pixel is transparent if its alpha is 0, or if every RGB channel lies
/// within [`KEY_TOLERANCE`] of the key color.
pub fn is_transparent(pixel: Rgba<u8>, key: KeyColor) -> bool {
    if pixel[3] == 0 {
        return true;
    }

    let dr = (pixel[0] as i32 - key.r as i32).abs();
    let dg = (pixel[1] as i32 - key.g as i32).abs();
    let db = (pixel[2] as i32 - key.b as i32).abs();

    dr <= KEY_TOLERANCE && dg <= KEY_TOLERANCE && db <= KEY_TOLERANCE
}

/// Merge one mask pixel onto one source pixel.
///
/// Key-transparent mask pixels return the source unchanged. Otherwise the
/// selected mode produces a fully opaque blended pixel; when `use_alpha` is
/// set and the mask pixel is not fully opaque, the blended pixel is
/// interpolated back toward the source by the mask's alpha.
pub fn composite(
    source: Rgba<u8>,
    mask: Rgba<u8>,
    mode: BlendMode,
    key: KeyColor,
    use_alpha: bool,
) -> Rgba<u8> {
    if is_transparent(mask, key) {
        return source;
    }

    let (sr, sg, sb) = (source[0] as i32, source[1] as i32, source[2] as i32);
    let (mr, mg, mb) = (mask[0] as i32, mask[1] as i32, mask[2] as i32);

    let (r, g, b) = match mode {
        BlendMode::Replace => (mr, mg, mb),
        BlendMode::Add => (sr + mr, sg + mg, sb + mb),
        BlendMode::Multiply => ((sr * mr) / 255, (sg * mg) / 255, (sb * mb) / 255),
        BlendMode::Screen => (
            screen_channel(sr, mr),
            screen_channel(sg, mg),
            screen_channel(sb, mb),
        ),
        BlendMode::Overlay => (
            overlay_channel(sr, mr),
            overlay_channel(sg, mg),
            overlay_channel(sb, mb),
        ),
        BlendMode::Difference => ((sr - mr).abs(), (sg - mg).abs(), (sb - mb).abs()),
        BlendMode::SoftLight => (
            soft_light_channel(sr, mr),
            soft_light_channel(sg, mg),
            soft_light_channel(sb, mb),
        ),
        // Hard Light is Overlay with the branch taken on the mask channel;
        // both branch bodies are symmetric in base/top, so swapping the
        // arguments is exactly that.
        BlendMode::HardLight => (
            overlay_channel(mr, sr),
            overlay_channel(mg, sg),
            overlay_channel(mb, sb),
        ),
    };

    let blended = Rgba([clamp_u8(r), clamp_u8(g), clamp_u8(b), 255]);

    if use_alpha && mask[3] < 255 {
        apply_alpha(source, blended, mask[3])
    } else {
        blended
    }
}

/// Linear interpolation between `source` and `blended` by the mask alpha.
/// Channels truncate toward zero; output alpha is forced opaque.
fn apply_alpha(source: Rgba<u8>, blended: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let a = alpha as f32 / 255.0;
    let lerp = |s: u8, b: u8| clamp_u8((s as f32 * (1.0 - a) + b as f32 * a) as i32);
    Rgba([
        lerp(source[0], blended[0]),
        lerp(source[1], blended[1]),
        lerp(source[2], blended[2]),
        255,
    ])
}

fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn screen_channel(base: i32, top: i32) -> i32 {
    255 - ((255 - base) * (255 - top)) / 255
}

fn overlay_channel(base: i32, top: i32) -> i32 {
    if base < 128 {
        (2 * base * top) / 255
    } else {
        255 - (2 * (255 - base) * (255 - top)) / 255
    }
}

/// W3C Soft Light formula, computed in f32 and truncated back to 0–255.
fn soft_light_channel(base: i32, top: i32) -> i32 {
    let b = base as f32 / 255.0;
    let t = top as f32 / 255.0;

    let result = if t < 0.5 {
        b - (1.0 - 2.0 * t) * b * (1.0 - b)
    } else {
        let d = if b <= 0.25 {
            ((16.0 * b - 12.0) * b + 4.0) * b
        } else {
            b.sqrt()
        };
        b + (2.0 * t - 1.0) * (d - b)
    };

    (result * 255.0) as i32
}
