//! Explicit compute context threaded through every adapter, oracle and
//! controller call. There is no process-wide device state.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::angle::CameraAngle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeContext {
    pub device: Device,
    pub seed: u64,
}

impl ComputeContext {
    pub fn new(device: Device, seed: u64) -> Self {
        Self { device, seed }
    }

    /// Per-view RNG. Same seed and angle always yield the same stream.
    pub fn view_rng(&self, angle: CameraAngle) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ ((angle.degrees() as u64) << 32))
    }
}

impl Default for ComputeContext {
    fn default() -> Self {
        Self::new(Device::Cpu, 0)
    }
}

/// Initial diffusion noise, forwarded untouched to every oracle call.
#[derive(Debug, Clone, PartialEq)]
pub struct Latents {
    pub shape: [usize; 4],
    pub values: Vec<f32>,
}

impl Latents {
    /// Standard-normal latents (Box-Muller over a seeded uniform stream).
    pub fn from_seed(seed: u64, shape: [usize; 4]) -> Self {
        let len = shape.iter().product::<usize>();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = Vec::with_capacity(len);
        while values.len() < len {
            let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
            let u2: f32 = rng.r#gen();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = std::f32::consts::TAU * u2;
            values.push(r * theta.cos());
            if values.len() < len {
                values.push(r * theta.sin());
            }
        }
        Self { shape, values }
    }
}
