#![allow(dead_code)]

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
use repaint_views::adapter::RenderAdapter;
use repaint_views::config::{InpaintConfig, MeshConfig};
use repaint_views::frame::{BackgroundColor, DepthImage, DepthMap, RenderFrame};
use repaint_views::mask::MaskDomain;
use repaint_views::oracle::{InpaintOracle, InpaintRequest};
use repaint_views::{CameraAngle, ComputeContext, PipelineConfig};

pub const SIZE: u32 = 8;
pub const GEOMETRY_DEPTH: f32 = 1.0;
pub const BACKGROUND_DEPTH: f32 = 5.0;
pub const PAINTED: [f32; 4] = [0.2, 0.4, 0.6, 1.0];

pub fn config(save_dir: &Path, mask_blend: &str) -> PipelineConfig {
    PipelineConfig {
        inpaint: InpaintConfig {
            mask_blend: mask_blend.to_string(),
            mask_kernel_size: 3,
            image_size: SIZE,
            mask_blend_kernel: Some(3),
            latent_blend_kernel: Some(1),
            negative_prompt: Some("blurry".to_string()),
            ..InpaintConfig::default()
        },
        mesh: MeshConfig {
            prompt: "wooden chair".to_string(),
            color: None,
            mesh_path: PathBuf::from("chair.obj"),
            save_dir: save_dir.to_path_buf(),
            trans_mat: None,
        },
    }
}

/// Geometry occupies the central square `[SIZE/4, 3*SIZE/4)`.
pub fn is_geometry(x: u32, y: u32) -> bool {
    let (lo, hi) = (SIZE / 4, 3 * SIZE / 4);
    (lo..hi).contains(&x) && (lo..hi).contains(&y)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Render(u16),
    Depth(u16),
    Occlusion {
        from: u16,
        to: u16,
        background: [f32; 3],
        use_train: bool,
    },
}

/// Object columns an occlusion-aware render from `from` reports as painted.
#[derive(Debug, Clone)]
pub struct SourceCoverage {
    pub from: u16,
    pub columns: Range<u32>,
    pub color: [f32; 4],
}

/// Renders a square object. Occlusion-aware renders mark the left half of
/// the object as painted unless `coverage` lists the source angle, and
/// report `background_alpha` on background pixels.
pub struct MockRenderer {
    pub background_alpha: f32,
    pub flat_depth: bool,
    pub coverage: Vec<SourceCoverage>,
    pub calls: Vec<Call>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self {
            background_alpha: 0.0,
            flat_depth: false,
            coverage: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl MockRenderer {
    pub fn occlusion_calls(&self) -> Vec<(u16, u16, bool)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Occlusion {
                    from, to, use_train, ..
                } => Some((*from, *to, *use_train)),
                _ => None,
            })
            .collect()
    }
}

impl RenderAdapter for MockRenderer {
    fn render(&mut self, _ctx: &ComputeContext, angle: CameraAngle) -> Result<RgbImage> {
        self.calls.push(Call::Render(angle.degrees()));
        Ok(RgbImage::from_pixel(SIZE, SIZE, Rgb([128, 128, 128])))
    }

    fn render_depth(&mut self, _ctx: &ComputeContext, angle: CameraAngle) -> Result<DepthMap> {
        self.calls.push(Call::Depth(angle.degrees()));
        let flat = self.flat_depth;
        Ok(DepthMap::new(DepthImage::from_fn(SIZE, SIZE, |x, y| {
            if flat {
                image::Luma([BACKGROUND_DEPTH])
            } else if is_geometry(x, y) {
                image::Luma([GEOMETRY_DEPTH + x as f32 * 0.01])
            } else {
                image::Luma([BACKGROUND_DEPTH])
            }
        })))
    }

    fn render_occlusion_aware(
        &mut self,
        _ctx: &ComputeContext,
        from: CameraAngle,
        to: CameraAngle,
        background: BackgroundColor,
        use_train: bool,
    ) -> Result<RenderFrame> {
        self.calls.push(Call::Occlusion {
            from: from.degrees(),
            to: to.degrees(),
            background: background.0,
            use_train,
        });
        let bg = background.0;
        let bg_alpha = self.background_alpha;
        let (columns, color) = self
            .coverage
            .iter()
            .find(|c| c.from == from.degrees())
            .map(|c| (c.columns.clone(), c.color))
            .unwrap_or((0..SIZE / 2, PAINTED));
        Ok(RenderFrame::from_fn(SIZE, SIZE, |x, y| {
            if !is_geometry(x, y) {
                Rgba([bg[0], bg[1], bg[2], bg_alpha])
            } else if columns.contains(&x) {
                Rgba(color)
            } else {
                Rgba([0.0, 0.0, 0.0, 0.0])
            }
        }))
    }
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub desc: String,
    pub domain: MaskDomain,
    pub mask: GrayImage,
    pub image: RgbImage,
    pub depth: DepthImage,
    pub inpainting_strength: f32,
    pub num_inference_steps: u32,
    pub mask_blend_kernel: Option<u32>,
    pub latent_blend_kernel: Option<u32>,
    pub has_latents: bool,
}

impl SeenRequest {
    pub fn regenerate_px(&self) -> usize {
        self.mask.pixels().filter(|p| p[0] != 0).count()
    }
}

/// Paints every regenerate pixel with `color` and keeps the rest of the input.
/// With `black` set it returns an all-zero image instead.
pub struct PaintOracle {
    pub color: [u8; 3],
    pub black: bool,
    pub requests: Vec<SeenRequest>,
}

impl PaintOracle {
    pub fn new(color: [u8; 3]) -> Self {
        Self {
            color,
            black: false,
            requests: Vec::new(),
        }
    }

    pub fn black() -> Self {
        Self {
            black: true,
            ..Self::new([0, 0, 0])
        }
    }
}

impl InpaintOracle for PaintOracle {
    fn inpaint(&mut self, _ctx: &ComputeContext, request: &InpaintRequest<'_>) -> Result<RgbaImage> {
        let mask = request.mask();
        self.requests.push(SeenRequest {
            prompt: request.prompt.clone(),
            negative_prompt: request.negative_prompt.map(str::to_string),
            desc: request.desc.clone(),
            domain: mask.domain(),
            mask: mask.pixels().clone(),
            image: request.image.clone(),
            depth: request.depth.clone(),
            inpainting_strength: request.inpainting_strength,
            num_inference_steps: request.num_inference_steps,
            mask_blend_kernel: request.mask_blend_kernel,
            latent_blend_kernel: request.latent_blend_kernel,
            has_latents: request.latents.is_some(),
        });
        let (w, h) = request.image.dimensions();
        if self.black {
            return Ok(RgbaImage::new(w, h));
        }
        let [r, g, b] = self.color;
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            if mask.pixels().get_pixel(x, y)[0] != 0 {
                Rgba([r, g, b, 255])
            } else {
                let p = request.image.get_pixel(x, y);
                Rgba([p[0], p[1], p[2], 255])
            }
        }))
    }
}

pub struct FailingOracle;

impl InpaintOracle for FailingOracle {
    fn inpaint(&mut self, _ctx: &ComputeContext, _request: &InpaintRequest<'_>) -> Result<RgbaImage> {
        Err(anyhow!("model crashed"))
    }
}

pub fn read_rgba(path: &Path) -> RgbaImage {
    image::open(path).unwrap().to_rgba8()
}

pub fn read_gray(path: &Path) -> GrayImage {
    image::open(path).unwrap().to_luma8()
}
