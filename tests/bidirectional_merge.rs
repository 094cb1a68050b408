mod common;

use std::path::Path;

use common::{MockRenderer, PaintOracle, SIZE, SourceCoverage, is_geometry};
use image::{Rgb, RgbImage, Rgba};
use repaint_views::controller::priority_merge;
use repaint_views::frame::{BackgroundColor, RenderFrame};
use repaint_views::mask::MaskDomain;
use repaint_views::store::TransformsManifest;
use repaint_views::{CameraAngle, ComputeContext, MergeSource, PipelineError, ViewPipeline, ViewStore};

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const EMPTY: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

fn columns(w: u32, covered: impl Fn(u32) -> bool, color: [f32; 4]) -> RenderFrame {
    RenderFrame::from_fn(w, 2, |x, _| if covered(x) { Rgba(color) } else { Rgba(EMPTY) })
}

#[test]
fn disjoint_sources_merge_into_their_union() {
    let first = columns(6, |x| x < 3, RED);
    let second = columns(6, |x| x >= 3, BLUE);
    let merged = priority_merge(&first, &second).unwrap();
    for (x, _, p) in merged.enumerate_pixels() {
        let expected = if x < 3 { RED } else { BLUE };
        assert_eq!(p.0, expected, "column {x}");
    }
}

#[test]
fn second_source_wins_on_full_overlap() {
    let first = columns(4, |_| true, RED);
    let second = columns(4, |_| true, BLUE);
    let merged = priority_merge(&first, &second).unwrap();
    assert!(merged.pixels().all(|p| p.0 == BLUE));
}

#[test]
fn merge_rejects_mismatched_renders() {
    let first = columns(4, |_| true, RED);
    let second = columns(5, |_| true, BLUE);
    assert!(priority_merge(&first, &second).is_err());
}

fn write_placeholder(dir: &Path, angle: u16, color: [u8; 3]) {
    let view = dir.join("dataset").join(angle.to_string());
    std::fs::create_dir_all(&view).unwrap();
    RgbImage::from_pixel(SIZE, SIZE, Rgb(color))
        .save(view.join("out_train.png"))
        .unwrap();
}

fn sources() -> [MergeSource; 2] {
    [
        MergeSource {
            view: CameraAngle::new(120),
            background: BackgroundColor([1.0, 0.0, 0.0]),
        },
        MergeSource {
            view: CameraAngle::new(240),
            background: BackgroundColor([0.0, 0.0, 1.0]),
        },
    ]
}

fn merge_pipeline(dir: &Path) -> ViewPipeline<MockRenderer, PaintOracle> {
    let store = ViewStore::open(dir).unwrap();
    ViewPipeline::new(
        common::config(dir, "none"),
        MockRenderer::default(),
        PaintOracle::new([255, 255, 0]),
        store,
    )
    .unwrap()
}

#[test]
fn merge_paints_the_synthesis_view_between_both_sweeps() {
    let dir = tempfile::tempdir().unwrap();
    write_placeholder(dir.path(), 180, [0, 255, 0]);
    let ctx = ComputeContext::default();
    let mut p = merge_pipeline(dir.path());
    let manifest = p.empty_manifest();

    let manifest = p.merge(&ctx, sources(), CameraAngle::new(180), manifest).unwrap();

    assert_eq!(
        p.renderer().occlusion_calls(),
        vec![(240, 180, true), (120, 180, true)]
    );
    let request = &p.oracle().requests[0];
    assert_eq!(request.domain, MaskDomain::ToRegenerate);
    assert_eq!(request.desc, "Inpainting 180 deg. view");
    assert_eq!(request.prompt, "A photo of a wooden chair, back view");
    // Both sources cover the left half of the object; the right half is new.
    assert_eq!(request.regenerate_px(), 8);

    for y in 0..SIZE {
        for x in 0..SIZE {
            let p = request.image.get_pixel(x, y).0;
            if is_geometry(x, y) {
                assert_eq!(p, [0, 255, 0], "placeholder at ({x},{y})");
            } else {
                assert_eq!(p, [127, 0, 127], "averaged background at ({x},{y})");
            }
        }
    }

    assert_eq!(manifest.angles(), vec![CameraAngle::new(180)]);
    let on_disk = TransformsManifest::read_json(&dir.path().join("transforms.json")).unwrap();
    assert_eq!(on_disk, manifest);

    let record = p.store().record(CameraAngle::new(180)).unwrap();
    assert_eq!(record.background, Some(BackgroundColor([0.5, 0.0, 0.5])));
    for name in ["rgb_120.png", "rgb_240.png", "input.png", "mask_none.png", "depth.exr", "out_alpha.png"] {
        assert!(dir.path().join("dataset/180").join(name).is_file(), "missing {name}");
    }
}

#[test]
fn merge_keeps_earlier_manifest_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_placeholder(dir.path(), 180, [10, 10, 10]);
    let ctx = ComputeContext::default();
    let mut p = merge_pipeline(dir.path());
    let mut manifest = p.empty_manifest();
    manifest
        .record(
            CameraAngle::new(120),
            &repaint_views::camera::OrbitPose::at_angle(CameraAngle::new(120), 2.0),
        )
        .unwrap();

    let manifest = p.merge(&ctx, sources(), CameraAngle::new(180), manifest).unwrap();
    assert_eq!(manifest.angles(), vec![CameraAngle::new(120), CameraAngle::new(180)]);
}

#[test]
fn missing_placeholder_stops_the_merge() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ComputeContext::default();
    let mut p = merge_pipeline(dir.path());
    let manifest = p.empty_manifest();
    let err = p.merge(&ctx, sources(), CameraAngle::new(180), manifest).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingPlaceholder { .. })
    ));
    assert!(p.oracle().requests.is_empty());
}

#[test]
fn seam_pixels_come_from_the_merged_sources_and_the_rest_from_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    write_placeholder(dir.path(), 180, [0, 255, 0]);
    let ctx = ComputeContext::default();
    let renderer = MockRenderer {
        coverage: vec![
            SourceCoverage {
                from: 120,
                columns: 2..4,
                color: RED,
            },
            SourceCoverage {
                from: 240,
                columns: 3..5,
                color: BLUE,
            },
        ],
        ..MockRenderer::default()
    };
    let store = ViewStore::open(dir.path()).unwrap();
    let mut p = ViewPipeline::new(
        common::config(dir.path(), "none"),
        renderer,
        PaintOracle::new([255, 255, 0]),
        store,
    )
    .unwrap();
    let manifest = p.empty_manifest();
    p.merge(&ctx, sources(), CameraAngle::new(180), manifest).unwrap();

    let request = &p.oracle().requests[0];
    for y in 0..SIZE {
        for x in 0..SIZE {
            let px = request.image.get_pixel(x, y).0;
            let expected = match x {
                _ if !is_geometry(x, y) => [127, 0, 127],
                // Covered by only one source: the seam takes the merged render.
                2 => [255, 0, 0],
                4 => [0, 0, 255],
                // Covered by both or by neither: the placeholder stays.
                _ => [0, 255, 0],
            };
            assert_eq!(px, expected, "({x},{y})");
        }
    }
    // Only the column neither source painted is regenerated.
    assert_eq!(request.regenerate_px(), 4);
    for y in 2..6 {
        assert_eq!(request.mask.get_pixel(5, y)[0], 255);
    }
}
