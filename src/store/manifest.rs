use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::angle::CameraAngle;
use crate::camera::{OrbitPose, RowMajorMat4};

pub const OUT_IMAGE: &str = "out.png";
pub const OUT_ALPHA_IMAGE: &str = "out_alpha.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFrame {
    pub angle: CameraAngle,
    /// Relative to the save directory, e.g. `./dataset/40/`.
    pub file_dir: String,
    pub transform_matrix: RowMajorMat4,
}

impl ManifestFrame {
    pub fn image_path(&self) -> String {
        format!("{}{OUT_IMAGE}", self.file_dir)
    }

    pub fn alpha_path(&self) -> String {
        format!("{}{OUT_ALPHA_IMAGE}", self.file_dir)
    }
}

pub fn relative_view_dir(angle: CameraAngle) -> String {
    format!("./dataset/{angle}/")
}

/// One frame per visited angle; recording an angle again replaces its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ManifestFile", into = "ManifestFile")]
pub struct TransformsManifest {
    pub camera_angle_x: f32,
    pub w: u32,
    pub h: u32,
    frames: BTreeMap<CameraAngle, ManifestFrame>,
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    camera_angle_x: f32,
    w: u32,
    h: u32,
    frames: Vec<ManifestFrame>,
}

impl From<ManifestFile> for TransformsManifest {
    fn from(file: ManifestFile) -> Self {
        Self {
            camera_angle_x: file.camera_angle_x,
            w: file.w,
            h: file.h,
            frames: file.frames.into_iter().map(|f| (f.angle, f)).collect(),
        }
    }
}

impl From<TransformsManifest> for ManifestFile {
    fn from(m: TransformsManifest) -> Self {
        Self {
            camera_angle_x: m.camera_angle_x,
            w: m.w,
            h: m.h,
            frames: m.frames.into_values().collect(),
        }
    }
}

impl TransformsManifest {
    pub fn new(camera_angle_x: f32, w: u32, h: u32) -> Self {
        Self {
            camera_angle_x,
            w,
            h,
            frames: BTreeMap::new(),
        }
    }

    /// Same header, no frames.
    pub fn empty_like(&self) -> Self {
        Self::new(self.camera_angle_x, self.w, self.h)
    }

    pub fn record(&mut self, angle: CameraAngle, pose: &OrbitPose) -> Result<&ManifestFrame> {
        let frame = ManifestFrame {
            angle,
            file_dir: relative_view_dir(angle),
            transform_matrix: pose
                .transform_matrix()
                .with_context(|| format!("failed to build pose for {angle} deg. view"))?,
        };
        self.frames.insert(angle, frame);
        Ok(&self.frames[&angle])
    }

    /// Folds `other`'s frames in; `other` wins on shared angles.
    pub fn merge_from(&mut self, other: &TransformsManifest) {
        for (angle, frame) in &other.frames {
            self.frames.insert(*angle, frame.clone());
        }
    }

    pub fn get(&self, angle: CameraAngle) -> Option<&ManifestFrame> {
        self.frames.get(&angle)
    }

    pub fn angles(&self) -> Vec<CameraAngle> {
        self.frames.keys().copied().collect()
    }

    pub fn frames(&self) -> impl Iterator<Item = &ManifestFrame> {
        self.frames.values()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("failed to serialize transforms")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write transforms at {}", path.display()))
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transforms at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid transforms json in {}", path.display()))
    }
}
