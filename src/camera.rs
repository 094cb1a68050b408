//! Orbit camera poses for manifest entries.
//!
//! Matrices are `[f32; 16]` column-major internally; the manifest stores
//! row-major `[[f32; 4]; 4]` the way NGP-style `transforms.json` files do.

use anyhow::{Result, anyhow, bail};

use crate::angle::CameraAngle;

const EPSILON: f32 = 1e-6;
const WORLD_UP: [f32; 3] = [0.0, 1.0, 0.0];

pub type RowMajorMat4 = [[f32; 4]; 4];

/// Orbit placement: elevation above the equator, azimuth around +Y, distance to origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    pub elevation_deg: f32,
    pub azimuth: CameraAngle,
    pub distance: f32,
}

impl OrbitPose {
    pub fn at_angle(azimuth: CameraAngle, distance: f32) -> Self {
        Self {
            elevation_deg: 0.0,
            azimuth,
            distance,
        }
    }

    /// Azimuth 0 sits on +Z looking back at the origin; positive azimuth swings toward +X.
    pub fn position(&self) -> [f32; 3] {
        let elev = self.elevation_deg.to_radians();
        let azim = self.azimuth.radians();
        [
            self.distance * elev.cos() * azim.sin(),
            self.distance * elev.sin(),
            self.distance * elev.cos() * azim.cos(),
        ]
    }

    /// Camera-to-world in OpenGL convention (camera looks down -Z, +Y up).
    pub fn camera_to_world(&self) -> Result<[f32; 16]> {
        if !(self.distance > EPSILON) {
            bail!("camera distance must be > 0, got {}", self.distance);
        }
        let position = self.position();
        let (right, true_up, forward) = look_at_basis(position, [0.0; 3], WORLD_UP)?;
        Ok([
            right[0],
            right[1],
            right[2],
            0.0,
            true_up[0],
            true_up[1],
            true_up[2],
            0.0,
            -forward[0],
            -forward[1],
            -forward[2],
            0.0,
            position[0],
            position[1],
            position[2],
            1.0,
        ])
    }

    pub fn transform_matrix(&self) -> Result<RowMajorMat4> {
        Ok(mat4_col_major_to_rows(self.camera_to_world()?))
    }
}

pub fn mat4_col_major_to_rows(m: [f32; 16]) -> RowMajorMat4 {
    let mut rows = [[0.0f32; 4]; 4];
    for (col, chunk) in m.chunks_exact(4).enumerate() {
        for (row, v) in chunk.iter().enumerate() {
            rows[row][col] = *v;
        }
    }
    rows
}

/// Orthonormal `(right, up, forward)` for a camera at `eye` looking at `target`.
fn look_at_basis(eye: [f32; 3], target: [f32; 3], up: [f32; 3]) -> Result<([f32; 3], [f32; 3], [f32; 3])> {
    let forward = unit(std::array::from_fn(|i| target[i] - eye[i]))
        .ok_or_else(|| anyhow!("camera sits on its target"))?;
    let right = unit(cross(forward, up))
        .ok_or_else(|| anyhow!("view direction is parallel to the up vector"))?;
    Ok((right, cross(right, forward), forward))
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn unit(v: [f32; 3]) -> Option<[f32; 3]> {
    let len = dot(v, v).sqrt();
    (len > EPSILON).then(|| v.map(|c| c / len))
}
