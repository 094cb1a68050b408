//! Mesh loading for the render adapter. Only `.obj` and ASCII `.ply` are accepted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Ply,
}

impl MeshFormat {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "ply" => Ok(MeshFormat::Ply),
            _ => Err(PipelineError::UnsupportedMeshFormat { extension }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub texture_path: Option<PathBuf>,
}

impl Mesh {
    /// Reverses the winding of every face.
    pub fn swap_faces(&mut self) {
        for f in &mut self.faces {
            f.swap(1, 2);
        }
    }

    /// Applies a row-major 3x3 transform to every position.
    pub fn transform(&mut self, m: &[[f32; 3]; 3]) {
        for p in &mut self.positions {
            let v = *p;
            for (r, row) in m.iter().enumerate() {
                p[r] = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
            }
        }
    }
}

/// Loads `mesh.obj` from the config, then applies `swap_face` and `trans_mat`.
pub fn load_mesh(config: &PipelineConfig) -> Result<Mesh> {
    let path = &config.mesh.mesh_path;
    let mut mesh = match MeshFormat::from_path(path)? {
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::Ply => load_ply(path)?,
    };
    if config.inpaint.swap_face {
        mesh.swap_faces();
    }
    if let Some(m) = config.mesh.trans_mat.as_ref() {
        mesh.transform(m);
    }
    log::info!(
        "[mesh] loaded {} ({} vertices, {} faces)",
        path.display(),
        mesh.positions.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

fn load_obj(path: &Path) -> Result<Mesh> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to load obj at {}", path.display()))?;

    let mut mesh = Mesh::default();
    for model in &models {
        let base = mesh.positions.len() as u32;
        let m = &model.mesh;
        mesh.positions
            .extend(m.positions.chunks_exact(3).map(|c| [c[0], c[1], c[2]]));
        mesh.uvs
            .extend(m.texcoords.chunks_exact(2).map(|c| [c[0], c[1]]));
        mesh.faces.extend(
            m.indices
                .chunks_exact(3)
                .map(|c| [base + c[0], base + c[1], base + c[2]]),
        );
    }

    // Texture is optional; a missing .mtl only loses the atlas path.
    if let Ok(materials) = materials {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        mesh.texture_path = materials
            .iter()
            .find_map(|m| m.diffuse_texture.as_ref())
            .map(|t| dir.join(t));
    }
    Ok(mesh)
}

fn load_ply(path: &Path) -> Result<Mesh> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ply at {}", path.display()))?;
    parse_ascii_ply(&text).with_context(|| format!("invalid ply at {}", path.display()))
}

fn parse_ascii_ply(text: &str) -> Result<Mesh> {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some("ply") {
        bail!("missing 'ply' magic");
    }

    let mut vertex_count = 0usize;
    let mut face_count = 0usize;
    let mut vertex_props: Vec<String> = Vec::new();
    let mut current_element = "";
    let mut ascii = false;
    for line in lines.by_ref() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", fmt, ..] => ascii = *fmt == "ascii",
            ["element", "vertex", n] => {
                vertex_count = n.parse()?;
                current_element = "vertex";
            }
            ["element", "face", n] => {
                face_count = n.parse()?;
                current_element = "face";
            }
            ["element", ..] => current_element = "other",
            ["property", .., name] if current_element == "vertex" => {
                vertex_props.push((*name).to_string());
            }
            ["end_header"] => break,
            _ => {}
        }
    }
    if !ascii {
        bail!("only ascii ply is supported");
    }

    let axis = |name: &str| {
        vertex_props
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| anyhow!("vertex element has no '{name}' property"))
    };
    let (ix, iy, iz) = (axis("x")?, axis("y")?, axis("z")?);

    let mut mesh = Mesh::default();
    for _ in 0..vertex_count {
        let line = lines.next().ok_or_else(|| anyhow!("truncated vertex list"))?;
        let values: Vec<f32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()?;
        let get = |i: usize| {
            values
                .get(i)
                .copied()
                .ok_or_else(|| anyhow!("vertex line has too few values: {line}"))
        };
        mesh.positions.push([get(ix)?, get(iy)?, get(iz)?]);
    }
    for _ in 0..face_count {
        let line = lines.next().ok_or_else(|| anyhow!("truncated face list"))?;
        let values: Vec<u32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()?;
        let Some((&n, indices)) = values.split_first() else {
            bail!("empty face line");
        };
        if n < 3 || indices.len() < n as usize {
            bail!("face line has {} indices, declared {n}", indices.len());
        }
        for k in 1..(n as usize - 1) {
            mesh.faces.push([indices[0], indices[k], indices[k + 1]]);
        }
    }
    if let Some(bad) = mesh
        .faces
        .iter()
        .flatten()
        .find(|&&i| i as usize >= mesh.positions.len())
    {
        bail!("face index {bad} out of range ({} vertices)", mesh.positions.len());
    }
    Ok(mesh)
}
