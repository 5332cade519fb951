use image::imageops;
use image::RgbaImage;

use super::compositing::{self, RESIZE_FILTER};
use super::text::{truncate, TextOverlay};
use crate::error::{Error, Result};

const TITLE_MAX_CHARS: usize = 20;
const TRACK_COLOR: [u8; 4] = [255, 255, 255, 255];
const AUTHOR_COLOR: [u8; 4] = [255, 255, 255, 153];

#[derive(Clone, Debug)]
pub struct ProceduralSettings {
    pub width: u32,
    pub height: u32,
    pub avatar_size: u32,
    /// Top edge of the avatar; it is always centred horizontally.
    pub avatar_y: u32,
    pub corner_radius: u32,
    pub blur_radius: f32,
}

impl ProceduralSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("avatar size", self.avatar_size),
        ] {
            if value == 0 {
                return Err(Error::InvalidParams(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// Track name and author drawn as two centred lines.
pub struct TitleBlock {
    pub track: String,
    pub author: String,
    pub track_font: TextOverlay,
    pub author_font: TextOverlay,
}

impl TitleBlock {
    /// Draw both lines; `top` is the vertical centre of the track line.
    pub fn draw(&self, img: &mut RgbaImage, top: f32) {
        let cx = img.width() as f32 / 2.0;
        self.track_font
            .draw_centered(img, &truncate(&self.track, TITLE_MAX_CHARS), cx, top, TRACK_COLOR);
        self.author_font.draw_centered(
            img,
            &truncate(&self.author, TITLE_MAX_CHARS),
            cx,
            top + 39.0,
            AUTHOR_COLOR,
        );
    }

    /// The title alone on a transparent canvas, for templates that composite
    /// it themselves.
    pub fn card(&self, width: u32, height: u32) -> RgbaImage {
        let mut card = RgbaImage::new(width, height);
        self.draw(&mut card, height as f32 / 2.0);
        card
    }
}

/// Pulses a blurred copy of the cover behind a static shade and avatar.
pub struct ProceduralCompositor {
    width: u32,
    height: u32,
    background: RgbaImage,
    shade: RgbaImage,
    avatar: RgbaImage,
    avatar_pos: (i64, i64),
    title: Option<TitleBlock>,
}

impl ProceduralCompositor {
    pub fn new(
        cover: &RgbaImage,
        shade: Option<RgbaImage>,
        settings: &ProceduralSettings,
        title: Option<TitleBlock>,
    ) -> Result<Self> {
        settings.validate()?;
        let ProceduralSettings {
            width,
            height,
            avatar_size,
            avatar_y,
            corner_radius,
            blur_radius,
        } = *settings;

        log::info!("Preparing background (blur radius {:.1})...", blur_radius);
        let mut background = imageops::resize(cover, height, height, RESIZE_FILTER);
        opaque(&mut background);
        if blur_radius > 0.0 {
            background = imageops::fast_blur(&background, blur_radius);
        }

        let shade = match shade {
            Some(img) => compositing::fit(img, width, height),
            None => compositing::vignette(width, height),
        };

        let mut avatar = imageops::resize(cover, avatar_size, avatar_size, RESIZE_FILTER);
        compositing::round_corners(&mut avatar, corner_radius);
        let avatar_x = (width as i64 - avatar_size as i64) / 2;

        Ok(Self {
            width,
            height,
            background,
            shade,
            avatar,
            avatar_pos: (avatar_x, avatar_y as i64),
            title,
        })
    }

    /// Background side length for a given intensity: `height * (1 + intensity)`.
    pub fn background_size(&self, intensity: f32) -> u32 {
        ((self.height as f32 * (1.0 + intensity.max(0.0))) as u32).max(1)
    }

    pub fn compose(&self, intensity: f32) -> RgbaImage {
        let mut frame = RgbaImage::new(self.width, self.height);

        let size = self.background_size(intensity);
        let zoomed = imageops::resize(&self.background, size, size, RESIZE_FILTER);
        let x = (self.width as i64 - size as i64) / 2;
        let y = (self.height as i64 - size as i64) / 2;
        compositing::paste(&mut frame, &zoomed, x, y);

        compositing::alpha_composite(&mut frame, &self.shade);

        let (ax, ay) = self.avatar_pos;
        compositing::paste_masked(&mut frame, &self.avatar, ax, ay);

        if let Some(title) = &self.title {
            let top = ay as f32 + self.avatar.height() as f32 + 61.0;
            title.draw(&mut frame, top);
        }

        frame
    }
}

fn opaque(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        px[3] = 255;
    }
}
