//! Seam to the depth-conditioned inpainting model.
//!
//! Mask convention at this boundary: non-zero pixels are regenerated. Requests
//! can only be built from a [`MaskDomain::ToRegenerate`] mask.

use anyhow::{Result, ensure};
use image::{RgbImage, RgbaImage};

use crate::context::{ComputeContext, Latents};
use crate::frame::DepthImage;
use crate::mask::{Mask, MaskDomain};

#[derive(Debug, Clone)]
pub struct InpaintRequest<'a> {
    pub prompt: String,
    pub negative_prompt: Option<&'a str>,
    pub image: &'a RgbImage,
    mask: &'a Mask,
    /// Normalized inverse depth, nearer = larger.
    pub depth: &'a DepthImage,
    pub strength: f32,
    pub num_inference_steps: u32,
    pub latents: Option<&'a Latents>,
    pub inpainting_strength: f32,
    pub mask_blend_kernel: Option<u32>,
    pub latent_blend_kernel: Option<u32>,
    /// Progress label, e.g. `Inpainting 80 deg. view`.
    pub desc: String,
}

impl<'a> InpaintRequest<'a> {
    pub fn new(
        prompt: String,
        image: &'a RgbImage,
        mask: &'a Mask,
        depth: &'a DepthImage,
    ) -> Result<Self> {
        mask.expect_domain(MaskDomain::ToRegenerate)?;
        ensure!(
            image.dimensions() == mask.dimensions() && image.dimensions() == depth.dimensions(),
            "inpaint inputs differ in size: image {:?}, mask {:?}, depth {:?}",
            image.dimensions(),
            mask.dimensions(),
            depth.dimensions()
        );
        Ok(Self {
            prompt,
            negative_prompt: None,
            image,
            mask,
            depth,
            strength: 1.0,
            num_inference_steps: 50,
            latents: None,
            inpainting_strength: 1.0,
            mask_blend_kernel: None,
            latent_blend_kernel: None,
            desc: String::new(),
        })
    }

    pub fn mask(&self) -> &Mask {
        self.mask
    }
}

pub trait InpaintOracle {
    /// Blocking, possibly slow. Errors are returned to the sweep driver as-is.
    fn inpaint(&mut self, ctx: &ComputeContext, request: &InpaintRequest<'_>) -> Result<RgbaImage>;
}

impl<T: InpaintOracle + ?Sized> InpaintOracle for &mut T {
    fn inpaint(&mut self, ctx: &ComputeContext, request: &InpaintRequest<'_>) -> Result<RgbaImage> {
        (**self).inpaint(ctx, request)
    }
}
