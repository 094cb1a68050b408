//! Pixel containers and the per-pixel compositing helpers shared by the
//! stepping and merge controllers.

use anyhow::{Result, ensure};
use image::{GrayImage, ImageBuffer, Luma, Rgb, Rgb32FImage, RgbImage, Rgba, Rgba32FImage, RgbaImage};
use rand::Rng;

use crate::mask::OCCUPANCY_THRESHOLD;

/// Render-space RGBA with channels in `[0, 1]`. Alpha is occupancy, not transparency.
pub type RenderFrame = Rgba32FImage;

pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel depth. The largest value present marks pixels without geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    depth: DepthImage,
}

impl DepthMap {
    pub fn new(depth: DepthImage) -> Self {
        Self { depth }
    }

    pub fn from_raw(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        ensure!(
            values.len() == (width as usize) * (height as usize),
            "depth buffer has {} values, expected {width}x{height}",
            values.len()
        );
        let depth = ImageBuffer::from_raw(width, height, values)
            .ok_or_else(|| anyhow::anyhow!("invalid depth buffer {width}x{height}"))?;
        Ok(Self { depth })
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.depth.dimensions()
    }

    pub fn image(&self) -> &DepthImage {
        &self.depth
    }

    /// `max(depth)`; derived per render, never a fixed constant.
    pub fn sentinel(&self) -> f32 {
        self.depth
            .as_raw()
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// True when every pixel carries the same depth, so the sentinel cannot
    /// tell background from geometry.
    pub fn is_degenerate(&self) -> bool {
        let raw = self.depth.as_raw();
        match raw.first() {
            Some(first) => raw.iter().all(|v| v == first),
            None => true,
        }
    }

    /// 255 where the pixel sits at the sentinel depth, 0 elsewhere.
    pub fn background_mask(&self) -> GrayImage {
        let sentinel = self.sentinel();
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.depth.get_pixel(x, y)[0] == sentinel { 255 } else { 0 }])
        })
    }

    /// `(max - d) / max(max - d)`: nearer surfaces get larger values and the
    /// background is 0. A constant map comes back all zero.
    pub fn normalized_inverse(&self) -> DepthImage {
        let sentinel = self.sentinel();
        let mut inverted = self.depth.clone();
        for p in inverted.pixels_mut() {
            p[0] = sentinel - p[0];
        }
        let peak = inverted.as_raw().iter().copied().fold(0.0f32, f32::max);
        if peak > 0.0 {
            for p in inverted.pixels_mut() {
                p[0] /= peak;
            }
        }
        inverted
    }

    /// Three-channel copy for EXR persistence.
    pub fn to_rgb32f(&self) -> Rgb32FImage {
        Rgb32FImage::from_fn(self.width(), self.height(), |x, y| {
            let d = self.depth.get_pixel(x, y)[0];
            Rgb([d, d, d])
        })
    }
}

/// Average color of previously painted, visible pixels, normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundColor(pub [f32; 3]);

impl Default for BackgroundColor {
    fn default() -> Self {
        BackgroundColor([1.0, 1.0, 1.0])
    }
}

impl BackgroundColor {
    /// Mean RGB of the pixels where `occupied` is non-zero; white when none are.
    pub fn from_occupied_pixels(image: &RgbaImage, occupied: &GrayImage) -> Self {
        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        for (p, m) in image.pixels().zip(occupied.pixels()) {
            if m[0] == 0 {
                continue;
            }
            for c in 0..3 {
                sum[c] += p[c] as f64 / 255.0;
            }
            count += 1;
        }
        if count == 0 {
            return BackgroundColor::default();
        }
        BackgroundColor(sum.map(|s| (s / count as f64) as f32))
    }

    pub fn average(self, other: BackgroundColor) -> Self {
        let [a, b] = [self.0, other.0];
        BackgroundColor([0, 1, 2].map(|c| 0.5 * (a[c] + b[c])))
    }

    pub fn to_rgb8(self) -> Rgb<u8> {
        Rgb(self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8))
    }
}

pub fn is_all_black(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0)
}

/// Uniform random RGBA, used in place of an all-black oracle result.
pub fn noise_frame(width: u32, height: u32, rng: &mut impl Rng) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    for p in out.pixels_mut() {
        *p = Rgba([rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255), rng.gen_range(0..255)]);
    }
    out
}

/// Copy of `image` whose alpha is 255 on geometry and 0 on sentinel pixels.
pub fn with_depth_occupancy(image: &RgbaImage, depth: &DepthMap) -> RgbaImage {
    let background = depth.background_mask();
    let mut out = image.clone();
    for (p, b) in out.pixels_mut().zip(background.pixels()) {
        p[3] = if b[0] == 0 { 255 } else { 0 };
    }
    out
}

/// Forces occupancy to 1 on every sentinel-depth pixel, whatever the renderer reported.
pub fn force_background_occupancy(frame: &mut RenderFrame, depth: &DepthMap) -> Result<()> {
    ensure!(
        frame.dimensions() == depth.dimensions(),
        "render {:?} and depth {:?} differ in size",
        frame.dimensions(),
        depth.dimensions()
    );
    let background = depth.background_mask();
    for (p, b) in frame.pixels_mut().zip(background.pixels()) {
        if b[0] != 0 {
            p[3] = 1.0;
        }
    }
    Ok(())
}

/// Binary occupancy: 255 where alpha is at least [`OCCUPANCY_THRESHOLD`], 0 elsewhere.
pub fn occupancy_mask(frame: &RenderFrame) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        Luma([if frame.get_pixel(x, y)[3] >= OCCUPANCY_THRESHOLD { 255 } else { 0 }])
    })
}

pub fn render_rgb8(frame: &RenderFrame) -> RgbImage {
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let p = frame.get_pixel(x, y);
        Rgb([to_u8(p[0]), to_u8(p[1]), to_u8(p[2])])
    })
}

pub fn render_rgba8(frame: &RenderFrame) -> RgbaImage {
    RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        Rgba(frame.get_pixel(x, y).0.map(to_u8))
    })
}

/// `render * a + fallback * (1 - a)` with `a` the render's occupancy.
pub fn composite_over_fallback(render: &RenderFrame, fallback: &RgbImage) -> Result<RgbImage> {
    ensure!(
        render.dimensions() == fallback.dimensions(),
        "render {:?} and fallback {:?} differ in size",
        render.dimensions(),
        fallback.dimensions()
    );
    Ok(RgbImage::from_fn(render.width(), render.height(), |x, y| {
        let r = render.get_pixel(x, y);
        let f = fallback.get_pixel(x, y);
        let a = r[3].clamp(0.0, 1.0);
        let mut out = [0u8; 3];
        for c in 0..3 {
            let v = r[c].clamp(0.0, 1.0) * 255.0 * a + f[c] as f32 * (1.0 - a);
            out[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    }))
}

/// Picks `foreground` where `select` is non-zero and `background` elsewhere.
pub fn select_composite(foreground: &RgbImage, background: &RgbImage, select: &GrayImage) -> Result<RgbImage> {
    ensure!(
        foreground.dimensions() == background.dimensions()
            && foreground.dimensions() == select.dimensions(),
        "composite inputs differ in size"
    );
    Ok(RgbImage::from_fn(foreground.width(), foreground.height(), |x, y| {
        if select.get_pixel(x, y)[0] != 0 {
            *foreground.get_pixel(x, y)
        } else {
            *background.get_pixel(x, y)
        }
    }))
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}
