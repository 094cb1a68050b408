//! Grayscale morphology on `image::GrayImage` with flat structuring elements.

use image::{GrayImage, Luma};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    Rectangle,
    Ellipse,
}

/// Offsets covered by a `size x size` structuring element centred on the origin.
pub fn structuring_element(shape: KernelShape, size: u32) -> Vec<(i32, i32)> {
    let size = size.max(1) as i32;
    let c = size / 2;
    let mut offsets = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let (dx, dy) = (x - c, y - c);
            let keep = match shape {
                KernelShape::Rectangle => true,
                KernelShape::Ellipse => {
                    let r = size as f32 / 2.0;
                    (dx * dx + dy * dy) as f32 <= r * r
                }
            };
            if keep {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn extremum(src: &GrayImage, kernel: &[(i32, i32)], take_max: bool) -> GrayImage {
    let (w, h) = (src.width() as i32, src.height() as i32);
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        let mut acc = if take_max { 0u8 } else { 255u8 };
        for &(kx, ky) in kernel {
            let (px, py) = (x as i32 + kx, y as i32 + ky);
            if px < 0 || py < 0 || px >= w || py >= h {
                continue;
            }
            let v = src.get_pixel(px as u32, py as u32)[0];
            acc = if take_max { acc.max(v) } else { acc.min(v) };
        }
        Luma([acc])
    })
}

pub fn dilate(src: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    extremum(src, kernel, true)
}

pub fn erode(src: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    extremum(src, kernel, false)
}

/// Erode then dilate: removes specks smaller than the kernel.
pub fn open(src: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    dilate(&erode(src, kernel), kernel)
}

/// Dilate then erode: fills pinholes smaller than the kernel.
pub fn close(src: &GrayImage, kernel: &[(i32, i32)]) -> GrayImage {
    erode(&dilate(src, kernel), kernel)
}

/// Snaps to {0, 255} at `threshold` (inclusive).
pub fn binarize(src: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        p[0] = if p[0] >= threshold { 255 } else { 0 };
    }
    out
}
