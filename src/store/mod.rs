//! Per-view state and on-disk layout.
//!
//! ```text
//! <save_dir>/transforms.json
//! <save_dir>/dataset/train_transforms.json
//! <save_dir>/dataset/<angle>/{rgb.png, depth.exr, mask_<strategy>.png, mask_coarse.png,
//!                             mask_together.png, preproc.png, out.png, out_alpha.png}
//! ```

pub mod manifest;
pub mod writer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};

use crate::angle::CameraAngle;
use crate::error::PipelineError;
use crate::frame::{BackgroundColor, DepthMap};

pub use manifest::{ManifestFrame, TransformsManifest};
pub use writer::ImageWriter;

pub const TRANSFORMS_FILE: &str = "transforms.json";
pub const TRAIN_TRANSFORMS_FILE: &str = "train_transforms.json";
pub const PLACEHOLDER_IMAGE: &str = "out_train.png";
pub const DEPTH_FILE: &str = "depth.exr";

/// What has been persisted for one visited angle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRecord {
    pub depth_path: Option<PathBuf>,
    pub rgb_path: Option<PathBuf>,
    pub mask_path: Option<PathBuf>,
    pub out_path: Option<PathBuf>,
    pub out_alpha_path: Option<PathBuf>,
    pub background: Option<BackgroundColor>,
}

pub struct ViewStore {
    save_dir: PathBuf,
    dataset_dir: PathBuf,
    writer: ImageWriter,
    records: BTreeMap<CameraAngle, ViewRecord>,
}

impl ViewStore {
    pub fn open(save_dir: impl Into<PathBuf>) -> Result<Self> {
        let save_dir = save_dir.into();
        let dataset_dir = save_dir.join("dataset");
        std::fs::create_dir_all(&dataset_dir)
            .with_context(|| format!("failed to create {}", dataset_dir.display()))?;
        Ok(Self {
            save_dir,
            dataset_dir,
            writer: ImageWriter::spawn()?,
            records: BTreeMap::new(),
        })
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    /// `<save_dir>/dataset/<angle>`, created on first use.
    pub fn view_dir(&self, angle: CameraAngle) -> Result<PathBuf> {
        let dir = self.dataset_dir.join(angle.to_string());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(dir)
    }

    pub fn record(&self, angle: CameraAngle) -> Option<&ViewRecord> {
        self.records.get(&angle)
    }

    pub fn record_mut(&mut self, angle: CameraAngle) -> &mut ViewRecord {
        self.records.entry(angle).or_default()
    }

    pub fn visited(&self) -> Vec<CameraAngle> {
        self.records.keys().copied().collect()
    }

    /// Queues `image` for `<view_dir>/<file_name>` and returns the target path.
    pub fn save_image(
        &self,
        angle: CameraAngle,
        file_name: &str,
        image: impl Into<DynamicImage>,
    ) -> Result<PathBuf> {
        let path = self.view_dir(angle)?.join(file_name);
        self.writer.write(path.clone(), image.into())?;
        Ok(path)
    }

    pub fn save_depth(&mut self, angle: CameraAngle, depth: &DepthMap) -> Result<PathBuf> {
        let path = self.save_image(angle, DEPTH_FILE, DynamicImage::ImageRgb32F(depth.to_rgb32f()))?;
        self.record_mut(angle).depth_path = Some(path.clone());
        Ok(path)
    }

    pub fn placeholder_path(&self, angle: CameraAngle) -> PathBuf {
        self.dataset_dir.join(angle.to_string()).join(PLACEHOLDER_IMAGE)
    }

    /// The externally rendered `out_train.png` for `angle`.
    pub fn load_placeholder(&self, angle: CameraAngle) -> Result<RgbImage> {
        let path = self.placeholder_path(angle);
        if !path.is_file() {
            return Err(PipelineError::MissingPlaceholder { path }.into());
        }
        let image = image::open(&path)
            .with_context(|| format!("failed to decode placeholder {}", path.display()))?;
        Ok(image.to_rgb8())
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    /// Flushes pending images, then writes `<save_dir>/transforms.json`.
    pub fn write_manifest(&self, manifest: &TransformsManifest) -> Result<PathBuf> {
        self.flush()?;
        let path = self.save_dir.join(TRANSFORMS_FILE);
        manifest.write_json(&path)?;
        log::info!("[store] wrote {} ({} frames)", path.display(), manifest.len());
        Ok(path)
    }

    pub fn write_train_manifest(&self, manifest: &TransformsManifest) -> Result<PathBuf> {
        self.flush()?;
        let path = self.dataset_dir.join(TRAIN_TRANSFORMS_FILE);
        manifest.write_json(&path)?;
        log::info!("[store] wrote {} ({} frames)", path.display(), manifest.len());
        Ok(path)
    }
}
