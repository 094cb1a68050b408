//! Named mask post-processing strategies, selected by the `mask_blend` config key.

use std::collections::BTreeMap;
use std::str::FromStr;

use image::GrayImage;

use super::morph::{self, KernelShape};
use crate::error::PipelineError;

pub type MaskOp = fn(&GrayImage, u32) -> GrayImage;

const BINARY_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaskStrategy {
    Identity,
    Dilate,
    Erode,
    Open,
    Close,
}

impl MaskStrategy {
    pub const ALL: [MaskStrategy; 5] = [
        MaskStrategy::Identity,
        MaskStrategy::Dilate,
        MaskStrategy::Erode,
        MaskStrategy::Open,
        MaskStrategy::Close,
    ];

    /// Config key, also used in the `mask_<name>.png` file name.
    pub fn name(self) -> &'static str {
        match self {
            MaskStrategy::Identity => "none",
            MaskStrategy::Dilate => "dilate",
            MaskStrategy::Erode => "erode",
            MaskStrategy::Open => "open",
            MaskStrategy::Close => "close",
        }
    }

    pub fn op(self) -> MaskOp {
        match self {
            MaskStrategy::Identity => identity,
            MaskStrategy::Dilate => dilate,
            MaskStrategy::Erode => erode,
            MaskStrategy::Open => open,
            MaskStrategy::Close => close,
        }
    }

    pub fn apply(self, raw: &GrayImage, kernel_size: u32) -> GrayImage {
        (self.op())(raw, kernel_size)
    }
}

impl FromStr for MaskStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Ok(match key.as_str() {
            "none" | "identity" | "off" => MaskStrategy::Identity,
            "dilate" | "dilation" => MaskStrategy::Dilate,
            "erode" | "erosion" => MaskStrategy::Erode,
            "open" | "opening" => MaskStrategy::Open,
            "close" | "closing" => MaskStrategy::Close,
            other => {
                return Err(PipelineError::config(format!(
                    "unknown mask_blend strategy '{other}' (supported: {})",
                    MaskStrategy::ALL.map(MaskStrategy::name).join(", ")
                )));
            }
        })
    }
}

/// Strategy name -> refinement function.
pub fn mask_strategy_table() -> BTreeMap<&'static str, MaskOp> {
    MaskStrategy::ALL
        .into_iter()
        .map(|s| (s.name(), s.op()))
        .collect()
}

fn identity(raw: &GrayImage, _kernel_size: u32) -> GrayImage {
    raw.clone()
}

fn with_kernel(raw: &GrayImage, kernel_size: u32, f: fn(&GrayImage, &[(i32, i32)]) -> GrayImage) -> GrayImage {
    let kernel = morph::structuring_element(KernelShape::Rectangle, kernel_size);
    f(&morph::binarize(raw, BINARY_THRESHOLD), &kernel)
}

fn dilate(raw: &GrayImage, kernel_size: u32) -> GrayImage {
    with_kernel(raw, kernel_size, morph::dilate)
}

fn erode(raw: &GrayImage, kernel_size: u32) -> GrayImage {
    with_kernel(raw, kernel_size, morph::erode)
}

fn open(raw: &GrayImage, kernel_size: u32) -> GrayImage {
    with_kernel(raw, kernel_size, morph::open)
}

fn close(raw: &GrayImage, kernel_size: u32) -> GrayImage {
    with_kernel(raw, kernel_size, morph::close)
}
