//! Tagged single-channel masks.
//!
//! A mask always states its convention: `Known` masks are 255 where the pixel
//! is settled and must be kept, `ToRegenerate` masks are 255 where the oracle
//! should paint. The only way between the two is [`Mask::invert`].

pub mod morph;
pub mod policy;

use anyhow::{Result, ensure};
use image::{GrayImage, Luma};

use crate::error::PipelineError;
use crate::frame::RenderFrame;

pub use policy::{MaskStrategy, mask_strategy_table};

/// Occupancy at or above this is treated as covered by a source render.
pub const OCCUPANCY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskDomain {
    Known,
    ToRegenerate,
}

impl MaskDomain {
    pub fn flipped(self) -> Self {
        match self {
            MaskDomain::Known => MaskDomain::ToRegenerate,
            MaskDomain::ToRegenerate => MaskDomain::Known,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    domain: MaskDomain,
    pixels: GrayImage,
}

impl Mask {
    pub fn new(domain: MaskDomain, pixels: GrayImage) -> Self {
        Self { domain, pixels }
    }

    pub fn filled(domain: MaskDomain, width: u32, height: u32, value: u8) -> Self {
        Self::new(domain, GrayImage::from_pixel(width, height, Luma([value])))
    }

    /// Binary known-region mask: 255 where the render's occupancy is at least 0.5.
    pub fn known_from_occupancy(frame: &RenderFrame) -> Self {
        Self::new(MaskDomain::Known, crate::frame::occupancy_mask(frame))
    }

    pub fn domain(&self) -> MaskDomain {
        self.domain
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> GrayImage {
        self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// `255 - v` per pixel and the opposite convention.
    pub fn invert(&self) -> Self {
        let mut pixels = self.pixels.clone();
        for p in pixels.pixels_mut() {
            p[0] = 255 - p[0];
        }
        Self {
            domain: self.domain.flipped(),
            pixels,
        }
    }

    /// Same convention, refined pixels.
    pub fn map_pixels(&self, f: impl FnOnce(&GrayImage) -> GrayImage) -> Result<Self> {
        let pixels = f(&self.pixels);
        ensure!(
            pixels.dimensions() == self.pixels.dimensions(),
            "mask refinement changed shape {:?} -> {:?}",
            self.pixels.dimensions(),
            pixels.dimensions()
        );
        Ok(Self {
            domain: self.domain,
            pixels,
        })
    }

    pub fn expect_domain(&self, expected: MaskDomain) -> Result<&Self> {
        if self.domain != expected {
            return Err(PipelineError::MaskDomain {
                expected,
                found: self.domain,
            }
            .into());
        }
        Ok(self)
    }

    pub fn is_binary(&self) -> bool {
        self.pixels.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }
}

/// Elementwise maximum of two equally sized grayscale buffers.
pub fn max_gray(a: &GrayImage, b: &GrayImage) -> Result<GrayImage> {
    ensure!(a.dimensions() == b.dimensions(), "mask sizes differ");
    Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].max(b.get_pixel(x, y)[0])])
    }))
}

/// 255 where exactly one of the two renders is covered (`occupancy >= 0.5`).
pub fn seam_mask(a: &RenderFrame, b: &RenderFrame) -> Result<GrayImage> {
    ensure!(a.dimensions() == b.dimensions(), "render sizes differ");
    Ok(GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let ca = a.get_pixel(x, y)[3] >= OCCUPANCY_THRESHOLD;
        let cb = b.get_pixel(x, y)[3] >= OCCUPANCY_THRESHOLD;
        Luma([if ca ^ cb { 255 } else { 0 }])
    }))
}
