//! Pixel operations on straight-alpha RGBA8 images.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

/// Copy `src` onto `dst` at (`x`, `y`), replacing every channel. Clipped to `dst`.
pub fn paste(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for_each_overlap(dst, src, x, y, |d, s| *d = *s);
}

/// Paste `src` using its own alpha as the mask: every channel, alpha
/// included, is interpolated from `dst` toward `src` by the source alpha.
pub fn paste_masked(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for_each_overlap(dst, src, x, y, |d, s| {
        let a = u16::from(s[3]);
        if a == 0 {
            return;
        }
        let inv = 255 - a;
        for c in 0..4 {
            let v = mul_div255(u16::from(s[c]), a) + mul_div255(u16::from(d[c]), inv);
            d[c] = v.min(255) as u8;
        }
    });
}

/// Porter-Duff "over" of two same-sized images; result in `dst`.
pub fn alpha_composite(dst: &mut RgbaImage, src: &RgbaImage) {
    debug_assert_eq!(dst.dimensions(), src.dimensions());
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        let sa = s[3] as f32 / 255.0;
        if sa <= 0.0 {
            continue;
        }
        let da = d[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for c in 0..3 {
            let v = (s[c] as f32 * sa + d[c] as f32 * da * (1.0 - sa)) / out_a;
            d[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        d[3] = (out_a * 255.0).round() as u8;
    }
}

/// "Overlay" blend of `layer` onto `base` at `opacity`.
///
/// The effective layer weight is `min(base alpha, layer alpha) * opacity`;
/// the base alpha is kept unchanged.
pub fn overlay_blend(base: &RgbaImage, layer: &RgbaImage, opacity: f32) -> RgbaImage {
    debug_assert_eq!(base.dimensions(), layer.dimensions());
    let opacity = opacity.clamp(0.0, 1.0);
    let mut out = base.clone();

    for (o, l) in out.pixels_mut().zip(layer.pixels()) {
        let base_a = o[3] as f32 / 255.0;
        let layer_a = l[3] as f32 / 255.0;
        let comp_a = base_a.min(layer_a) * opacity;
        let new_a = base_a + (1.0 - base_a) * comp_a;
        let ratio = if new_a > 0.0 { comp_a / new_a } else { 0.0 };

        for c in 0..3 {
            let b = o[c] as f32 / 255.0;
            let t = l[c] as f32 / 255.0;
            let blended = if b < 0.5 {
                2.0 * b * t
            } else {
                1.0 - 2.0 * (1.0 - b) * (1.0 - t)
            };
            let v = blended * ratio + b * (1.0 - ratio);
            o[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// Make pixels outside quarter circles of `radius` at each corner transparent;
/// everything else becomes fully opaque.
pub fn round_corners(img: &mut RgbaImage, radius: u32) {
    let (w, h) = img.dimensions();
    let radius = radius.min(w / 2).min(h / 2);
    let r = radius as f32;

    for (x, y, px) in img.enumerate_pixels_mut() {
        let cx = if x < radius {
            Some(r)
        } else if x >= w - radius {
            Some(w as f32 - r)
        } else {
            None
        };
        let cy = if y < radius {
            Some(r)
        } else if y >= h - radius {
            Some(h as f32 - r)
        } else {
            None
        };

        px[3] = match (cx, cy) {
            (Some(cx), Some(cy)) => {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    255
                } else {
                    0
                }
            }
            _ => 255,
        };
    }
}

/// Black radial shade, transparent in the middle and darkening toward the edges.
pub fn vignette(width: u32, height: u32) -> RgbaImage {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_d = (cx * cx + cy * cy).sqrt().max(1.0);
    const INNER: f32 = 0.45;
    const MAX_ALPHA: f32 = 210.0;

    RgbaImage::from_fn(width, height, |x, y| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let d = (dx * dx + dy * dy).sqrt() / max_d;
        let t = ((d - INNER) / (1.0 - INNER)).clamp(0.0, 1.0);
        Rgba([0, 0, 0, (t * t * MAX_ALPHA).round() as u8])
    })
}

/// Resize to exactly `width` x `height` unless it already matches.
pub fn fit(img: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img;
    }
    imageops::resize(&img, width, height, RESIZE_FILTER)
}

fn for_each_overlap(
    dst: &mut RgbaImage,
    src: &RgbaImage,
    x: i64,
    y: i64,
    mut op: impl FnMut(&mut Rgba<u8>, &Rgba<u8>),
) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);

    for dy in y0..y1 {
        for dx in x0..x1 {
            let s = src.get_pixel((dx - x) as u32, (dy - y) as u32);
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            op(d, s);
        }
    }
}
