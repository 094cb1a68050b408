//! Seam to the geometry/render backend. The differentiable renderer lives
//! outside this crate; controllers only see this trait.

use anyhow::Result;
use image::RgbImage;

use crate::angle::CameraAngle;
use crate::context::ComputeContext;
use crate::frame::{BackgroundColor, DepthMap, RenderFrame};

pub trait RenderAdapter {
    /// Plain textured render of the mesh at `angle`, used as the coarse fallback.
    fn render(&mut self, ctx: &ComputeContext, angle: CameraAngle) -> Result<RgbImage>;

    /// Per-pixel depth at `angle`. Background pixels carry the map's maximum value.
    fn render_depth(&mut self, ctx: &ComputeContext, angle: CameraAngle) -> Result<DepthMap>;

    /// Re-projects what is painted at `from` toward `to`.
    ///
    /// Channels are in `[0, 1]`; alpha is occupancy (1 = already textured and
    /// visible from `to`). Regions without render information are filled with
    /// `background`. `use_train` selects the trained-texture variant.
    fn render_occlusion_aware(
        &mut self,
        ctx: &ComputeContext,
        from: CameraAngle,
        to: CameraAngle,
        background: BackgroundColor,
        use_train: bool,
    ) -> Result<RenderFrame>;
}

impl<T: RenderAdapter + ?Sized> RenderAdapter for &mut T {
    fn render(&mut self, ctx: &ComputeContext, angle: CameraAngle) -> Result<RgbImage> {
        (**self).render(ctx, angle)
    }

    fn render_depth(&mut self, ctx: &ComputeContext, angle: CameraAngle) -> Result<DepthMap> {
        (**self).render_depth(ctx, angle)
    }

    fn render_occlusion_aware(
        &mut self,
        ctx: &ComputeContext,
        from: CameraAngle,
        to: CameraAngle,
        background: BackgroundColor,
        use_train: bool,
    ) -> Result<RenderFrame> {
        (**self).render_occlusion_aware(ctx, from, to, background, use_train)
    }
}
