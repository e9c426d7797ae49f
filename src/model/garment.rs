use std::sync::Arc;

use crate::foundation::core::{Bitmap, Point, Rgb8};
use crate::foundation::error::{DecalError, DecalResult};
use crate::sink::texture::{TextureSink, TextureUpdate};

/// Alpha cutoff of the garment material; texels at or below it are discarded.
pub const ALPHA_TEST: u8 = 128;

/// Material state of one mesh after a texture bind.
#[derive(Clone, Debug)]
pub struct MaterialBinding {
    /// Bound texture, shared by every mesh of the model.
    pub texture: Arc<Bitmap>,
    /// Base color multiplied with the texture.
    pub tint: Rgb8,
    /// Revision of the update that produced this binding.
    pub revision: u64,
}

/// One UV-mapped surface of the garment.
#[derive(Clone, Debug)]
pub struct MeshSurface {
    /// Mesh name, as found in the model file.
    pub name: String,
    uvs: Vec<Point>,
    uvs_flipped: bool,
    material: Option<MaterialBinding>,
}

impl MeshSurface {
    /// A mesh with per-vertex UVs in `[0, 1]` texture space.
    pub fn new(name: impl Into<String>, uvs: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            uvs,
            uvs_flipped: false,
            material: None,
        }
    }

    /// Per-vertex UVs.
    pub fn uvs(&self) -> &[Point] {
        &self.uvs
    }

    /// The current material, `None` until the first bind.
    pub fn material(&self) -> Option<&MaterialBinding> {
        self.material.as_ref()
    }

    fn flip_uvs(&mut self) -> bool {
        if self.uvs_flipped {
            return false;
        }
        for uv in &mut self.uvs {
            uv.y = 1.0 - uv.y;
        }
        self.uvs_flipped = true;
        true
    }
}

/// The garment: a set of mesh surfaces that all display the same texture.
///
/// Bound textures use bottom-up V: `v = 1` samples the first bitmap row. Model files store UVs
/// top-down, so [`GarmentModel::flip_uvs_vertically`] runs once after loading.
#[derive(Clone, Debug, Default)]
pub struct GarmentModel {
    meshes: Vec<MeshSurface>,
    binds: u64,
}

impl GarmentModel {
    /// Build a model from its meshes.
    pub fn new(meshes: Vec<MeshSurface>) -> Self {
        Self { meshes, binds: 0 }
    }

    /// Meshes in load order.
    pub fn meshes(&self) -> &[MeshSurface] {
        &self.meshes
    }

    /// Mesh by name.
    pub fn mesh(&self, name: &str) -> Option<&MeshSurface> {
        self.meshes.iter().find(|m| m.name == name)
    }

    /// Number of texture binds received.
    pub fn bind_count(&self) -> u64 {
        self.binds
    }

    /// Replace every V coordinate with `1 - V`. Meshes already flipped are left alone.
    ///
    /// Returns the number of meshes flipped by this call.
    pub fn flip_uvs_vertically(&mut self) -> usize {
        let mut flipped = 0;
        for mesh in &mut self.meshes {
            if mesh.flip_uvs() {
                flipped += 1;
            }
        }
        flipped
    }

    /// Nearest texel of the bound texture at `uv` on mesh `mesh`, premultiplied.
    ///
    /// UVs outside `[0, 1]` clamp to the edge. Returns `None` when no texture is bound.
    pub fn sample_texel(&self, mesh: usize, uv: Point) -> DecalResult<Option<[u8; 4]>> {
        let surface = self.meshes.get(mesh).ok_or_else(|| {
            DecalError::invalid_input(format!(
                "mesh index {mesh} out of range (model has {})",
                self.meshes.len()
            ))
        })?;
        let Some(material) = surface.material.as_ref() else {
            return Ok(None);
        };
        let tex = &material.texture;
        let col = texel_index(uv.x, tex.width);
        let row = texel_index(1.0 - uv.y, tex.height);
        Ok(tex.pixel(col, row))
    }

    /// Texel under vertex `vertex` of mesh `mesh`, or `None` if either is missing or nothing is
    /// bound.
    pub fn sample_vertex(&self, mesh: usize, vertex: usize) -> DecalResult<Option<[u8; 4]>> {
        let Some(uv) = self.meshes.get(mesh).and_then(|m| m.uvs.get(vertex)).copied() else {
            return Ok(None);
        };
        self.sample_texel(mesh, uv)
    }

    /// Return `true` if the texel at `uv` survives the material's alpha test.
    pub fn is_opaque_at(&self, mesh: usize, uv: Point) -> DecalResult<bool> {
        Ok(self
            .sample_texel(mesh, uv)?
            .is_some_and(|px| px[3] > ALPHA_TEST))
    }
}

fn texel_index(t: f64, extent: u32) -> u32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let max = extent.saturating_sub(1);
    ((t * f64::from(extent)).floor() as u32).min(max)
}

impl TextureSink for GarmentModel {
    fn bind(&mut self, update: TextureUpdate) -> DecalResult<()> {
        for mesh in &mut self.meshes {
            mesh.material = Some(MaterialBinding {
                texture: Arc::clone(&update.texture),
                tint: update.fill,
                revision: update.revision,
            });
        }
        self.binds += 1;
        tracing::debug!(
            meshes = self.meshes.len(),
            revision = update.revision,
            "bound garment texture"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/garment.rs"]
mod tests;
