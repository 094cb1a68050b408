use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::angle::CameraAngle;
use crate::error::PipelineError;
use crate::mask::MaskStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub inpaint: InpaintConfig,
    pub mesh: MeshConfig,
}

/// Oracle, sweep and mask-policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InpaintConfig {
    pub num_inference_steps: u32,
    pub negative_prompt: Option<String>,
    /// Mask post-processing strategy name, see [`MaskStrategy`].
    pub mask_blend: String,
    pub mask_kernel_size: u32,
    pub mask_blend_kernel: Option<u32>,
    pub latent_blend_kernel: Option<u32>,
    pub inpainting_strength: f32,
    pub angle_inc: i32,
    /// Cumulative degrees each sweep travels before stopping.
    pub inc_limit: u32,
    pub swap_face: bool,
    pub image_size: u32,
    pub camera_dist: f32,
    pub camera_angle_x: f32,
    pub view_synth: Option<u16>,
    pub seed: u64,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            num_inference_steps: 50,
            negative_prompt: None,
            mask_blend: MaskStrategy::Dilate.name().to_string(),
            mask_kernel_size: 5,
            mask_blend_kernel: None,
            latent_blend_kernel: None,
            inpainting_strength: 1.0,
            angle_inc: 40,
            inc_limit: 120,
            swap_face: false,
            image_size: 512,
            camera_dist: 2.0,
            camera_angle_x: 0.6911,
            view_synth: None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub prompt: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "obj")]
    pub mesh_path: PathBuf,
    pub save_dir: PathBuf,
    #[serde(default)]
    pub trans_mat: Option<[[f32; 3]; 3]>,
}

impl PipelineConfig {
    pub fn mask_strategy(&self) -> Result<MaskStrategy> {
        Ok(self.inpaint.mask_blend.parse::<MaskStrategy>()?)
    }

    pub fn view_synth(&self) -> Option<CameraAngle> {
        self.inpaint.view_synth.map(CameraAngle::from)
    }

    pub fn color(&self) -> Option<&str> {
        self.mesh.color.as_deref()
    }

    pub fn validate(&self) -> Result<()> {
        let inpaint = &self.inpaint;
        if self.mesh.prompt.trim().is_empty() {
            return Err(PipelineError::config("mesh.prompt must not be empty").into());
        }
        if inpaint.angle_inc == 0 {
            return Err(PipelineError::config("inpaint.angle_inc must not be 0").into());
        }
        if inpaint.inc_limit == 0 {
            return Err(PipelineError::config("inpaint.inc_limit must be > 0").into());
        }
        if inpaint.mask_kernel_size == 0 {
            return Err(PipelineError::config("inpaint.mask_kernel_size must be > 0").into());
        }
        if inpaint.image_size == 0 {
            return Err(PipelineError::config("inpaint.image_size must be > 0").into());
        }
        if !(inpaint.camera_dist.is_finite() && inpaint.camera_dist > 0.0) {
            return Err(PipelineError::config(format!(
                "inpaint.camera_dist must be > 0, got {}",
                inpaint.camera_dist
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&inpaint.inpainting_strength) {
            return Err(PipelineError::config(format!(
                "inpaint.inpainting_strength must be in [0, 1], got {}",
                inpaint.inpainting_strength
            ))
            .into());
        }
        self.mask_strategy()?;
        Ok(())
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config json at {}", path.display()))?;
    let config = parse_config(&text)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_json::from_str(text)
        .map_err(|e| PipelineError::config(format!("failed to parse config json: {e}")))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "inpaint": {},
        "mesh": { "prompt": "teapot", "obj": "teapot.obj", "save_dir": "out" }
    }"#;

    #[test]
    fn defaults_follow_pipeline_conventions() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.inpaint.angle_inc, 40);
        assert_eq!(cfg.inpaint.inc_limit, 120);
        assert_eq!(cfg.inpaint.mask_kernel_size, 5);
        assert_eq!(cfg.inpaint.mask_blend_kernel, None);
        assert_eq!(cfg.mask_strategy().unwrap(), MaskStrategy::Dilate);
        assert_eq!(cfg.color(), None);
        assert_eq!(cfg.view_synth(), None);
    }

    #[test]
    fn zero_increment_is_a_config_error() {
        let text = MINIMAL.replace(r#""inpaint": {}"#, r#""inpaint": {"angle_inc": 0}"#);
        let err = parse_config(&text).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Config(_))
        ));
    }

    #[test]
    fn unknown_mask_strategy_is_rejected() {
        let text = MINIMAL.replace(r#""inpaint": {}"#, r#""inpaint": {"mask_blend": "smudge"}"#);
        let err = parse_config(&text).unwrap_err();
        assert!(format!("{err:#}").contains("smudge"));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = parse_config("{").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Config(_))
        ));
    }
}
