use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use image::{Rgba, RgbImage};

use super::{OracleCall, ViewPipeline};
use crate::adapter::RenderAdapter;
use crate::angle::CameraAngle;
use crate::context::ComputeContext;
use crate::frame::{self, BackgroundColor, RenderFrame};
use crate::mask::{self, Mask, MaskDomain, OCCUPANCY_THRESHOLD};
use crate::oracle::InpaintOracle;
use crate::store::TransformsManifest;

/// A painted sweep boundary and the background its sweep accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeSource {
    pub view: CameraAngle,
    pub background: BackgroundColor,
}

/// Overlays two occlusion-aware renders on a white canvas.
///
/// `first` is applied where its occupancy is at least 0.5, then `second`
/// where its own occupancy is, so `second` wins on overlap. The merged
/// occupancy is the elementwise max of both.
pub fn priority_merge(first: &RenderFrame, second: &RenderFrame) -> Result<RenderFrame> {
    ensure!(
        first.dimensions() == second.dimensions(),
        "renders differ in size: {:?} vs {:?}",
        first.dimensions(),
        second.dimensions()
    );
    Ok(RenderFrame::from_fn(first.width(), first.height(), |x, y| {
        let a = first.get_pixel(x, y);
        let b = second.get_pixel(x, y);
        let mut out = Rgba([1.0f32; 4]);
        if a[3] >= OCCUPANCY_THRESHOLD {
            out = *a;
        }
        if b[3] >= OCCUPANCY_THRESHOLD {
            out = *b;
        }
        out[3] = a[3].max(b[3]);
        out
    }))
}

/// RGB of `merged`, with pixels of zero occupancy replaced by `fill`.
fn fill_unoccupied(merged: &RenderFrame, fill: BackgroundColor) -> RgbImage {
    let rgba = frame::render_rgba8(merged);
    let fill = fill.to_rgb8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        if p[3] != 0 {
            image::Rgb([p[0], p[1], p[2]])
        } else {
            fill
        }
    })
}

impl<R: RenderAdapter, O: InpaintOracle> ViewPipeline<R, O> {
    /// Paints `view_synth` from the two sweep boundaries and the externally
    /// rendered placeholder at `dataset/<view_synth>/out_train.png`.
    pub fn merge(
        &mut self,
        ctx: &ComputeContext,
        sources: [MergeSource; 2],
        view_synth: CameraAngle,
        mut manifest: TransformsManifest,
    ) -> Result<TransformsManifest> {
        let [first, second] = sources;
        log::info!(
            "[merge] synthesizing {view_synth} from {} and {}",
            first.view,
            second.view
        );

        let second_render = self.source_render(ctx, second, view_synth)?;
        let first_render = self.source_render(ctx, first, view_synth)?;

        let merged = priority_merge(&first_render, &second_render)?;
        let seam = mask::seam_mask(&first_render, &second_render)?;
        let fill = first.background.average(second.background);
        let merged_rgb = fill_unoccupied(&merged, fill);

        let mut placeholder = self.store.load_placeholder(view_synth)?;
        let depth = self
            .renderer
            .render_depth(ctx, view_synth)
            .with_context(|| format!("depth render at {view_synth} failed"))?;
        self.store.save_depth(view_synth, &depth)?;
        if depth.is_degenerate() {
            log::warn!("[merge] depth map at {view_synth} is constant; background cannot be separated");
        }
        ensure!(
            placeholder.dimensions() == depth.dimensions(),
            "placeholder {:?} and depth {:?} differ in size",
            placeholder.dimensions(),
            depth.dimensions()
        );
        let background = depth.background_mask();
        let fill_px = fill.to_rgb8();
        for (p, b) in placeholder.pixels_mut().zip(background.pixels()) {
            if b[0] != 0 {
                *p = fill_px;
            }
        }

        let occupancy = mask::max_gray(
            Mask::known_from_occupancy(&first_render).pixels(),
            Mask::known_from_occupancy(&second_render).pixels(),
        )?;
        let known = Mask::new(MaskDomain::Known, mask::max_gray(&occupancy, &background)?);
        let refined = self.refine(&known)?;
        let mask_path = self
            .store
            .save_image(view_synth, &self.mask_file_name(), refined.pixels().clone())?;

        let blend = mask::max_gray(&seam, &background)?;
        let composite = frame::select_composite(&merged_rgb, &placeholder, &blend)?;
        self.store.save_image(view_synth, "input.png", composite.clone())?;
        log::debug!(
            "[merge] composite ready: {} seam px, {} blend px",
            seam.pixels().filter(|p| p[0] != 0).count(),
            blend.pixels().filter(|p| p[0] != 0).count()
        );

        let regenerate = refined.invert();
        let inpainting_strength = self.config.inpaint.inpainting_strength;
        let output = self
            .call_oracle(
                ctx,
                OracleCall {
                    angle: view_synth,
                    image: &composite,
                    mask: &regenerate,
                    depth: &depth,
                    inpainting_strength,
                    blend_kernels: true,
                    desc: format!("Inpainting {view_synth} deg. view"),
                },
            )
            .with_context(|| format!("inpainting {view_synth} deg. view failed"))?;

        self.finish_view(ctx, view_synth, output, &depth, &mut manifest)?;
        let record = self.store.record_mut(view_synth);
        record.mask_path = Some(mask_path);
        record.background = Some(fill);

        self.store.write_manifest(&manifest)?;
        Ok(manifest)
    }

    fn source_render(
        &mut self,
        ctx: &ComputeContext,
        source: MergeSource,
        view_synth: CameraAngle,
    ) -> Result<RenderFrame> {
        let render = self
            .renderer
            .render_occlusion_aware(ctx, source.view, view_synth, source.background, true)
            .with_context(|| format!("occlusion-aware render {} -> {view_synth} failed", source.view))?;
        self.store.save_image(
            view_synth,
            &format!("rgb_{}.png", source.view),
            frame::render_rgb8(&render),
        )?;
        Ok(render)
    }

    /// Writes `dataset/train_transforms.json` with the two boundaries and the synthesis view.
    pub fn write_train_transforms(
        &self,
        view_1: CameraAngle,
        view_2: CameraAngle,
        view_synth: CameraAngle,
        manifest: &TransformsManifest,
    ) -> Result<PathBuf> {
        let mut train = manifest.empty_like();
        for angle in [view_1, view_2, view_synth] {
            train.record(angle, &self.pose(angle))?;
        }
        self.store.write_train_manifest(&train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(pixels: &[[f32; 4]]) -> RenderFrame {
        let mut f = RenderFrame::new(pixels.len() as u32, 1);
        for (x, p) in pixels.iter().enumerate() {
            f.put_pixel(x as u32, 0, Rgba(*p));
        }
        f
    }

    #[test]
    fn uncovered_pixels_stay_white_with_max_occupancy() {
        let a = frame_of(&[[0.2, 0.2, 0.2, 0.3]]);
        let b = frame_of(&[[0.4, 0.4, 0.4, 0.1]]);
        let m = priority_merge(&a, &b).unwrap();
        assert_eq!(m.get_pixel(0, 0).0, [1.0, 1.0, 1.0, 0.3]);
    }

    #[test]
    fn fill_replaces_only_zero_occupancy() {
        let merged = frame_of(&[[1.0, 1.0, 1.0, 0.0], [1.0, 1.0, 1.0, 0.3], [0.0, 1.0, 0.0, 1.0]]);
        let rgb = fill_unoccupied(&merged, BackgroundColor([0.0, 0.0, 1.0]));
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(2, 0).0, [0, 255, 0]);
    }
}
