use anyhow::{Context, Result};

use super::{OracleCall, ViewPipeline, ViewRunState, geometry_mask};
use crate::adapter::RenderAdapter;
use crate::angle::{CameraAngle, synthesis_angle};
use crate::context::ComputeContext;
use crate::frame::{self, BackgroundColor};
use crate::mask::{Mask, MaskDomain};
use crate::oracle::InpaintOracle;
use crate::store::TransformsManifest;

/// Result of one directional sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub run: ViewRunState,
    /// `(±cumulative) mod 360`, the last angle painted by the sweep.
    pub boundary: CameraAngle,
    pub steps: u32,
}

/// Forward and backward sweeps folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub view_1: CameraAngle,
    pub view_2: CameraAngle,
    pub view_synth: CameraAngle,
    pub manifest: TransformsManifest,
    pub background: BackgroundColor,
}

impl<R: RenderAdapter, O: InpaintOracle> ViewPipeline<R, O> {
    /// Paints the front view from scratch and derives the background color
    /// every later step fills unseen regions with.
    pub fn paint_first_view(&mut self, ctx: &ComputeContext) -> Result<ViewRunState> {
        let angle = CameraAngle::ZERO;
        log::info!("[view {angle}] painting first view on {}", ctx.device);

        let input = self.renderer.render(ctx, angle).context("coarse render failed")?;
        let depth = self.renderer.render_depth(ctx, angle).context("depth render failed")?;
        self.store.save_depth(angle, &depth)?;
        self.store.save_image(angle, "input_image.png", input.clone())?;
        if depth.is_degenerate() {
            log::warn!("[view {angle}] depth map is constant; background cannot be separated");
        }

        let (w, h) = depth.dimensions();
        let regenerate_all = Mask::filled(MaskDomain::ToRegenerate, w, h, 255);
        let output = self.call_oracle(
            ctx,
            OracleCall {
                angle,
                image: &input,
                mask: &regenerate_all,
                depth: &depth,
                inpainting_strength: 0.0,
                blend_kernels: false,
                desc: "Painting front view".to_string(),
            },
        )?;

        let background = if frame::is_all_black(&output) {
            BackgroundColor::default()
        } else {
            BackgroundColor::from_occupied_pixels(&output, &geometry_mask(&depth))
        };

        let mut manifest = self.empty_manifest();
        self.finish_view(ctx, angle, output, &depth, &mut manifest)?;
        self.store.record_mut(angle).background = Some(background);
        self.store.flush()?;
        log::info!("[view {angle}] accumulated background color {:?}", background.0);

        Ok(ViewRunState::start(manifest, background))
    }

    /// Paints `run.next + increment` from what is already painted at `run.next`.
    pub fn step(&mut self, ctx: &ComputeContext, mut run: ViewRunState, increment: i32) -> Result<ViewRunState> {
        let from = run.next;
        let to = from.offset(increment);
        log::info!(
            "[view {to}] stepping {from} -> {to} (travelled {} deg.)",
            run.cumulative
        );

        let mut render = self
            .renderer
            .render_occlusion_aware(ctx, from, to, run.background, false)
            .with_context(|| format!("occlusion-aware render {from} -> {to} failed"))?;
        run.cumulative += increment.unsigned_abs();

        let depth = self
            .renderer
            .render_depth(ctx, to)
            .with_context(|| format!("depth render at {to} failed"))?;
        self.store.save_depth(to, &depth)?;
        if depth.is_degenerate() {
            log::warn!("[view {to}] depth map is constant; background cannot be separated");
        }

        let rgb_path = self.store.save_image(to, "rgb.png", frame::render_rgb8(&render))?;
        frame::force_background_occupancy(&mut render, &depth)?;

        let known = Mask::known_from_occupancy(&render);
        let refined = self.refine(&known)?;
        let mask_path = self
            .store
            .save_image(to, &self.mask_file_name(), refined.pixels().clone())?;

        let coarse = self
            .renderer
            .render(ctx, to)
            .with_context(|| format!("coarse render at {to} failed"))?;
        self.store.save_image(to, "mask_coarse.png", coarse.clone())?;

        let composite = frame::composite_over_fallback(&render, &coarse)?;
        self.store.save_image(to, "mask_together.png", composite.clone())?;
        self.store.save_image(to, "preproc.png", composite.clone())?;
        let known_px = refined.pixels().pixels().filter(|p| p[0] != 0).count();
        log::debug!(
            "[view {to}] composite ready: {known_px}/{} known px ({})",
            refined.pixels().len(),
            self.strategy.name()
        );

        let regenerate = refined.invert();
        let inpainting_strength = self.config.inpaint.inpainting_strength;
        let output = self.call_oracle(
            ctx,
            OracleCall {
                angle: to,
                image: &composite,
                mask: &regenerate,
                depth: &depth,
                inpainting_strength,
                blend_kernels: true,
                desc: format!("Inpainting {to} deg. view"),
            },
        )
        .with_context(|| format!("inpainting {to} deg. view failed"))?;

        self.finish_view(ctx, to, output, &depth, &mut run.manifest)?;

        let record = self.store.record_mut(to);
        record.rgb_path = Some(rgb_path);
        record.mask_path = Some(mask_path);
        record.background = Some(run.background);

        run.current = from;
        run.next = to;
        Ok(run)
    }

    /// Steps from angle 0 with a fixed `increment` until the cumulative
    /// budget `inc_limit` is reached. At least one step always runs, and every
    /// queued image is on disk before the sweep returns.
    pub fn sweep(
        &mut self,
        ctx: &ComputeContext,
        background: BackgroundColor,
        increment: i32,
    ) -> Result<SweepOutcome> {
        let limit = self.config.inpaint.inc_limit;
        let mut run = ViewRunState::start(self.empty_manifest(), background);
        let mut steps = 0;
        loop {
            run = self.step(ctx, run, increment)?;
            steps += 1;
            if run.cumulative >= limit {
                break;
            }
        }
        self.store
            .flush()
            .with_context(|| format!("sweep of {increment} deg. steps could not persist its views"))?;
        let travelled = run.cumulative as i64;
        let boundary = CameraAngle::new(if increment > 0 { travelled } else { -travelled });
        log::info!("[sweep] {steps} steps of {increment} deg. ended at {boundary}");
        Ok(SweepOutcome {
            run,
            boundary,
            steps,
        })
    }

    /// Runs the forward and backward sweeps from `initial` and writes `transforms.json`.
    ///
    /// Each sweep starts from its own copy of the background and an empty
    /// manifest; the manifests are folded into `initial.manifest` afterwards.
    pub fn paint_sweeps(&mut self, ctx: &ComputeContext, initial: ViewRunState) -> Result<SweepSummary> {
        let inc = self.config.inpaint.angle_inc;
        let forward = self.sweep(ctx, initial.background, inc)?;
        let backward = self.sweep(ctx, initial.background, -inc)?;

        let mut manifest = initial.manifest;
        manifest.merge_from(&forward.run.manifest);
        manifest.merge_from(&backward.run.manifest);
        self.store.write_manifest(&manifest)?;

        let (view_1, view_2) = (forward.boundary, backward.boundary);
        let view_synth = self
            .config
            .view_synth()
            .unwrap_or_else(|| synthesis_angle(view_1, view_2));
        Ok(SweepSummary {
            view_1,
            view_2,
            view_synth,
            manifest,
            background: initial.background,
        })
    }

    /// First view, both sweeps, then `train_transforms.json` for the NGP stage.
    pub fn paint_facade(&mut self, ctx: &ComputeContext) -> Result<SweepSummary> {
        let initial = self.paint_first_view(ctx)?;
        let summary = self.paint_sweeps(ctx, initial)?;
        self.write_train_transforms(summary.view_1, summary.view_2, summary.view_synth, &summary.manifest)?;
        Ok(summary)
    }
}
