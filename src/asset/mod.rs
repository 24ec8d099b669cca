// src/asset/mod.rs
//! The baked animation asset: immutable output of a bake, read by playback.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bake::{BakeOutput, VatBounds};

pub mod loader;
pub mod material;

pub use loader::{BakedAnimationAssetPlugin, BakedAnimationLoadError, BakedAnimationLoader};
pub use material::{bind_material, MaterialBinder, MaterialParams, ParamValue};

// ---------- Entries ----------

/// One baked clip inside an asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationEntry {
    pub name: String,
    /// First texture row of the clip.
    pub start_row: u32,
    /// Seconds.
    pub length: f32,
    pub bake_frame_count: u32,
    pub is_loop: bool,
}

/// Where the asset's collaborators live (asset paths or names).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetRefs {
    pub mesh: String,
    pub material: String,
    pub position_texture: String,
    pub normal_texture: String,
}

// ---------- Asset ----------

#[derive(Asset, TypePath, Clone, Debug, Serialize, Deserialize)]
pub struct BakedAnimationAsset {
    mesh: String,
    material: String,
    position_texture: String,
    normal_texture: String,
    texture_size: UVec2,
    bounds_min: Vec3,
    bounds_max: Vec3,
    vertex_count: u32,
    /// Clip slots the playback shader can address at once.
    shader_clip_slots: u32,
    entries: Vec<AnimationEntry>,
    #[serde(skip)]
    name_to_index: HashMap<String, usize>,
}

impl BakedAnimationAsset {
    pub fn new(
        refs: AssetRefs,
        texture_size: UVec2,
        bounds: VatBounds,
        vertex_count: u32,
        shader_clip_slots: u32,
        entries: Vec<AnimationEntry>,
    ) -> Self {
        let mut asset = Self {
            mesh: refs.mesh,
            material: refs.material,
            position_texture: refs.position_texture,
            normal_texture: refs.normal_texture,
            texture_size,
            bounds_min: bounds.min,
            bounds_max: bounds.max,
            vertex_count,
            shader_clip_slots,
            entries,
            name_to_index: HashMap::new(),
        };
        asset.rebuild_index();
        asset
    }

    pub fn from_bake(output: &BakeOutput, refs: AssetRefs, shader_clip_slots: u32) -> Self {
        Self::new(
            refs,
            UVec2::new(output.position.width(), output.position.height()),
            output.bounds,
            output.position.width(),
            shader_clip_slots,
            output.entries.clone(),
        )
    }

    /// Parse a `.vat.ron` record.
    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, ron::error::SpannedError> {
        let mut asset: Self = ron::de::from_bytes(bytes)?;
        asset.rebuild_index();
        Ok(asset)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// First entry wins when two baked clips share a name. Later duplicates can
    /// sit past the shader slot limit, earlier ones are the ones the material binds.
    fn rebuild_index(&mut self) {
        self.name_to_index.clear();
        for (i, e) in self.entries.iter().enumerate() {
            if self.name_to_index.contains_key(&e.name) {
                debug!("Baked entry '{}' appears more than once; index {} is unreachable by name", e.name, i);
                continue;
            }
            self.name_to_index.insert(e.name.clone(), i);
        }
    }

    pub fn mesh(&self) -> &str { &self.mesh }
    pub fn material(&self) -> &str { &self.material }
    pub fn position_texture(&self) -> &str { &self.position_texture }
    pub fn normal_texture(&self) -> &str { &self.normal_texture }
    pub fn texture_size(&self) -> UVec2 { self.texture_size }
    pub fn vertex_count(&self) -> u32 { self.vertex_count }
    pub fn bounds(&self) -> VatBounds { VatBounds::new(self.bounds_min, self.bounds_max) }
    pub fn shader_clip_slots(&self) -> u32 { self.shader_clip_slots }
    pub fn entries(&self) -> &[AnimationEntry] { &self.entries }

    pub fn entry(&self, index: usize) -> Option<&AnimationEntry> {
        self.entries.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Entries the shader can actually play: `min(shader slots, entry count)`.
    pub fn available_count(&self) -> usize {
        (self.shader_clip_slots as usize).min(self.entries.len())
    }

    /// Per-instance clip selection is only needed with more than one entry.
    pub fn is_multi_clip(&self) -> bool { self.entries.len() > 1 }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(name: &str, start_row: u32, length: f32, frames: u32, is_loop: bool) -> AnimationEntry {
        AnimationEntry { name: name.into(), start_row, length, bake_frame_count: frames, is_loop }
    }

    /// Four vertices; "Idle" (loop, 2s), "Attack" (one-shot, 1s), "Run" (loop, 0.5s).
    pub fn soldier_asset(shader_clip_slots: u32) -> BakedAnimationAsset {
        BakedAnimationAsset::new(
            AssetRefs {
                mesh: "models/soldier.glb#Mesh0".into(),
                material: "materials/vat_soldier".into(),
                position_texture: "vat/soldier_Positions.png".into(),
                normal_texture: "vat/soldier_Normals.png".into(),
            },
            UVec2::new(4, 30),
            VatBounds::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
            4,
            shader_clip_slots,
            vec![
                entry("Idle", 0, 2.0, 10, true),
                entry("Attack", 10, 1.0, 12, false),
                entry("Run", 22, 0.5, 8, true),
            ],
        )
    }
}
