use std::fs;
use std::path::Path;

use repaint_views::config::load_config_from_path;
use repaint_views::mesh::load_mesh;
use repaint_views::{CameraAngle, PipelineError};

const QUAD_OBJ: &str = "mtllib quad.mtl
usemtl painted
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

const QUAD_MTL: &str = "newmtl painted
Kd 1 1 1
map_Kd albedo.png
";

const TRI_PLY: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 2 0
3 0 1 2
";

fn write_config(dir: &Path, mesh_file: &str, inpaint: &str, extra_mesh: &str) -> std::path::PathBuf {
    let text = format!(
        r#"{{
            "inpaint": {inpaint},
            "mesh": {{
                "prompt": "ceramic vase",
                "color": "blue",
                "obj": "{}",
                "save_dir": "{}"{extra_mesh}
            }}
        }}"#,
        dir.join(mesh_file).display(),
        dir.join("out").display()
    );
    let path = dir.join("config.json");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "vase.obj",
        r#"{"angle_inc": 30, "mask_blend": "close", "view_synth": 190, "negative_prompt": "lowres"}"#,
        "",
    );
    let cfg = load_config_from_path(&path).unwrap();
    assert_eq!(cfg.inpaint.angle_inc, 30);
    assert_eq!(cfg.inpaint.inc_limit, 120);
    assert_eq!(cfg.color(), Some("blue"));
    assert_eq!(cfg.view_synth(), Some(CameraAngle::new(190)));
    assert_eq!(cfg.mask_strategy().unwrap().name(), "close");
    assert_eq!(cfg.inpaint.negative_prompt.as_deref(), Some("lowres"));
}

#[test]
fn missing_config_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config_from_path(dir.path().join("nope.json")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.json"));
}

#[test]
fn obj_mesh_loads_with_texture_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
    fs::write(dir.path().join("quad.mtl"), QUAD_MTL).unwrap();
    let cfg = load_config_from_path(write_config(dir.path(), "quad.obj", "{}", "")).unwrap();

    let mesh = load_mesh(&cfg).unwrap();
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.uvs.len(), 4);
    assert_eq!(mesh.faces.len(), 2);
    assert_eq!(mesh.texture_path, Some(dir.path().join("albedo.png")));
}

#[test]
fn ply_mesh_honours_swap_face_and_trans_mat() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tri.ply"), TRI_PLY).unwrap();
    let cfg = load_config_from_path(write_config(
        dir.path(),
        "tri.ply",
        r#"{"swap_face": true}"#,
        r#", "trans_mat": [[1, 0, 0], [0, 0, 1], [0, 1, 0]]"#,
    ))
    .unwrap();

    let mesh = load_mesh(&cfg).unwrap();
    assert_eq!(mesh.faces, vec![[0, 2, 1]]);
    assert_eq!(mesh.positions[2], [0.0, 0.0, 2.0]);
}

#[test]
fn unsupported_mesh_extension_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("vase.glb"), b"glTF").unwrap();
    let cfg = load_config_from_path(write_config(dir.path(), "vase.glb", "{}", "")).unwrap();

    let err = load_mesh(&cfg).unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::UnsupportedMeshFormat { extension }) => assert_eq!(extension, "glb"),
        other => panic!("unexpected error: {other:?}"),
    }
}
