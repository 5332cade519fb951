use std::path::Path;

use fontdue::{Font, FontSettings};
use image::RgbaImage;

use crate::error::{Error, Result};

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_file(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, font_size)
            .map_err(|e| Error::InvalidParams(format!("font {}: {e}", path.display())))
    }

    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::InvalidParams(e.to_string()))?;
        Ok(Self { font, font_size })
    }

    /// Composite text onto `img`, centred on (`cx`, `cy`).
    pub fn draw_centered(&self, img: &mut RgbaImage, text: &str, cx: f32, cy: f32, color: [u8; 4]) {
        let x = (cx - self.measure_width(text) as f32 / 2.0).round() as i32;
        let y = (cy - self.font_size / 2.0).round() as i32;
        self.composite(img, text, x, y, color);
    }

    /// Composite text with its top-left corner at (`x`, `y`).
    pub fn composite(&self, img: &mut RgbaImage, text: &str, x: i32, y: i32, color: [u8; 4]) {
        let (width, height) = img.dimensions();
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }

                    let px = cursor_x + metrics.xmin + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let dst = img.get_pixel_mut(px as u32, py as u32);
                    let a = coverage as f32 / 255.0 * (color[3] as f32 / 255.0);
                    let da = dst[3] as f32 / 255.0;
                    let out_a = a + da * (1.0 - a);
                    if out_a <= 0.0 {
                        continue;
                    }
                    for c in 0..3 {
                        let v = (color[c] as f32 * a + dst[c] as f32 * da * (1.0 - a)) / out_a;
                        dst[c] = v.round().clamp(0.0, 255.0) as u8;
                    }
                    dst[3] = (out_a * 255.0).round() as u8;
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}

/// Cut `text` to `max_chars` characters, marking the cut with "...".
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_untouched() {
        assert_eq!(truncate("Demo Beat", 20), "Demo Beat");
    }

    #[test]
    fn long_text_cut_with_ellipsis() {
        assert_eq!(truncate("abcdefghijklmnopqrstuvwxyz", 20), "abcdefghijklmnopqrst...");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        assert_eq!(truncate("ёжик в тумане", 4), "ёжик...");
    }

    #[test]
    fn garbage_font_bytes_rejected() {
        assert!(TextOverlay::from_bytes(b"not a font", 24.0).is_err());
    }
}
