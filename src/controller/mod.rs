//! View stepping and bidirectional merge controllers.
//!
//! [`ViewPipeline`] owns the render adapter, the oracle and the view store for
//! one run. Every operation takes the [`ComputeContext`] explicitly and the
//! `&mut self` receiver keeps steps of a run strictly sequential.

mod merge;
mod stepping;

use anyhow::{Result, ensure};
use image::{GrayImage, RgbImage, RgbaImage};

use crate::adapter::RenderAdapter;
use crate::angle::CameraAngle;
use crate::camera::OrbitPose;
use crate::config::PipelineConfig;
use crate::context::{ComputeContext, Latents};
use crate::frame::{self, BackgroundColor, DepthMap};
use crate::mask::{Mask, MaskStrategy};
use crate::oracle::{InpaintOracle, InpaintRequest};
use crate::prompt::view_dep_prompt;
use crate::store::manifest::{OUT_ALPHA_IMAGE, OUT_IMAGE};
use crate::store::{TransformsManifest, ViewStore};

pub use merge::{MergeSource, priority_merge};
pub use stepping::{SweepOutcome, SweepSummary};

/// In-flight state of one sweep, handed from step to step.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRunState {
    pub current: CameraAngle,
    pub next: CameraAngle,
    /// Absolute degrees travelled so far in this sweep.
    pub cumulative: u32,
    pub manifest: TransformsManifest,
    pub background: BackgroundColor,
}

impl ViewRunState {
    pub fn start(manifest: TransformsManifest, background: BackgroundColor) -> Self {
        Self {
            current: CameraAngle::ZERO,
            next: CameraAngle::ZERO,
            cumulative: 0,
            manifest,
            background,
        }
    }
}

pub struct ViewPipeline<R, O> {
    config: PipelineConfig,
    strategy: MaskStrategy,
    renderer: R,
    oracle: O,
    store: ViewStore,
    latents: Option<Latents>,
}

/// Oracle knobs that differ between the first view and later views.
struct OracleCall<'a> {
    angle: CameraAngle,
    image: &'a RgbImage,
    mask: &'a Mask,
    depth: &'a DepthMap,
    inpainting_strength: f32,
    blend_kernels: bool,
    desc: String,
}

impl<R: RenderAdapter, O: InpaintOracle> ViewPipeline<R, O> {
    pub fn new(config: PipelineConfig, renderer: R, oracle: O, store: ViewStore) -> Result<Self> {
        config.validate()?;
        let strategy = config.mask_strategy()?;
        Ok(Self {
            config,
            strategy,
            renderer,
            oracle,
            store,
            latents: None,
        })
    }

    pub fn with_latents(mut self, latents: Latents) -> Self {
        self.latents = Some(latents);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn into_parts(self) -> (R, O, ViewStore) {
        (self.renderer, self.oracle, self.store)
    }

    pub fn empty_manifest(&self) -> TransformsManifest {
        let size = self.config.inpaint.image_size;
        TransformsManifest::new(self.config.inpaint.camera_angle_x, size, size)
    }

    fn pose(&self, angle: CameraAngle) -> OrbitPose {
        OrbitPose::at_angle(angle, self.config.inpaint.camera_dist)
    }

    fn mask_file_name(&self) -> String {
        format!("mask_{}.png", self.strategy.name())
    }

    fn refine(&self, known: &Mask) -> Result<Mask> {
        let kernel = self.config.inpaint.mask_kernel_size;
        let strategy = self.strategy;
        known.map_pixels(|raw| strategy.apply(raw, kernel))
    }

    fn call_oracle(&mut self, ctx: &ComputeContext, call: OracleCall<'_>) -> Result<RgbaImage> {
        let inpaint = &self.config.inpaint;
        let depth_input = call.depth.normalized_inverse();
        let prompt = view_dep_prompt(&self.config.mesh.prompt, call.angle, self.config.color());

        let mut request = InpaintRequest::new(prompt, call.image, call.mask, &depth_input)?;
        request.negative_prompt = inpaint.negative_prompt.as_deref();
        request.strength = 1.0;
        request.num_inference_steps = inpaint.num_inference_steps;
        request.latents = self.latents.as_ref();
        request.inpainting_strength = call.inpainting_strength;
        if call.blend_kernels {
            request.mask_blend_kernel = inpaint.mask_blend_kernel;
            request.latent_blend_kernel = inpaint.latent_blend_kernel;
        }
        request.desc = call.desc;

        let regenerate_px = call.mask.pixels().pixels().filter(|p| p[0] != 0).count();
        log::debug!(
            "[oracle] {} on {}: prompt={:?}, regenerate {regenerate_px} px, strength={}",
            request.desc,
            ctx.device,
            request.prompt,
            request.inpainting_strength
        );

        let output = self.oracle.inpaint(ctx, &request)?;
        ensure!(
            output.dimensions() == call.depth.dimensions(),
            "oracle returned {:?} for a {:?} view",
            output.dimensions(),
            call.depth.dimensions()
        );
        Ok(output)
    }

    /// Persists `out.png`/`out_alpha.png` and records the manifest entry.
    ///
    /// An all-black result is replaced by seeded noise; otherwise alpha is
    /// rebuilt from the depth sentinel (geometry = 255, background = 0).
    fn finish_view(
        &mut self,
        ctx: &ComputeContext,
        angle: CameraAngle,
        output: RgbaImage,
        depth: &DepthMap,
        manifest: &mut TransformsManifest,
    ) -> Result<RgbaImage> {
        let (out_path, alpha_path, finished) = if frame::is_all_black(&output) {
            log::warn!(
                "[view {angle}] oracle returned an all-black image, substituting random noise"
            );
            let (w, h) = output.dimensions();
            let noise = frame::noise_frame(w, h, &mut ctx.view_rng(angle));
            let out_path = self.store.save_image(angle, OUT_IMAGE, noise.clone())?;
            let alpha_path = self.store.save_image(angle, OUT_ALPHA_IMAGE, noise.clone())?;
            (out_path, alpha_path, noise)
        } else {
            let with_alpha = frame::with_depth_occupancy(&output, depth);
            let out_path = self.store.save_image(angle, OUT_IMAGE, output)?;
            let alpha_path = self.store.save_image(angle, OUT_ALPHA_IMAGE, with_alpha.clone())?;
            (out_path, alpha_path, with_alpha)
        };

        let record = self.store.record_mut(angle);
        record.out_path = Some(out_path);
        record.out_alpha_path = Some(alpha_path);
        manifest.record(angle, &self.pose(angle))?;
        Ok(finished)
    }
}

/// 255 on pixels with geometry, i.e. the complement of the sentinel mask.
fn geometry_mask(depth: &DepthMap) -> GrayImage {
    let mut mask = depth.background_mask();
    for p in mask.pixels_mut() {
        p[0] = 255 - p[0];
    }
    mask
}
