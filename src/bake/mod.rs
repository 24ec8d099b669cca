// src/bake/mod.rs
//! Baking engine: sample the selected clips, compute one shared bounding
//! volume, then encode every vertex of every frame into two RGBA8 rasters
//! (positions, normals) addressed by the selection's texture layout.

use bevy::prelude::*;

use crate::asset::AnimationEntry;
use crate::clip::{BakeSelection, ClipDescriptor};
use crate::layout::TextureLayout;
use crate::rig::{AnimatedSource, MeshSampler, SampledFrame};

pub mod bounds;
pub mod encode;
pub mod export;
pub mod settings;

pub use bounds::VatBounds;
pub use encode::{encode_normal, encode_position, Texel, VatTexture};
pub use export::{create_baked_asset, CreatedAsset, ExportError};
pub use settings::BakeSettings;

/// Everything one bake produces.
#[derive(Clone, Debug, PartialEq)]
pub struct BakeOutput {
    pub position: VatTexture,
    pub normal: VatTexture,
    pub bounds: VatBounds,
    pub entries: Vec<AnimationEntry>,
}

/// Check that `source` + `selection` can be baked, without allocating anything.
pub fn validate<S: AnimatedSource>(source: &S, selection: &BakeSelection) -> Result<(), BakeError> {
    if selection.selected_count() == 0 {
        return Err(BakeError::NoStatesSelected);
    }
    if source.state_graph().is_none() {
        return Err(BakeError::MissingAnimator(source.name().to_string()));
    }
    let mesh_vertices = source.vertex_count();
    if mesh_vertices == 0 {
        return Err(BakeError::MissingSkinnedMesh(source.name().to_string()));
    }
    if selection.vertex_count() != mesh_vertices {
        return Err(BakeError::VertexCountMismatch {
            selection: selection.vertex_count(),
            mesh: mesh_vertices,
        });
    }
    if selection.layout().is_empty() {
        return Err(BakeError::EmptyLayout);
    }
    Ok(())
}

/// Bake every selected clip of `source`. Deterministic: identical inputs give
/// byte-identical textures and entry tables.
pub fn bake<S: AnimatedSource>(source: &S, selection: &BakeSelection) -> Result<BakeOutput, BakeError> {
    validate(source, selection)?;
    let layout = selection.layout();
    let clips: Vec<&ClipDescriptor> = selection.selected_clips().collect();

    info!(
        "Baking '{}': {} clips into {}x{} (~{} KiB per texture)",
        source.name(),
        clips.len(),
        layout.width(),
        layout.height(),
        layout.estimated_bytes() / 1024
    );

    let mut sampler = source.instantiate_sampler()?;
    let mut frame = SampledFrame::default();

    let bounds = compute_bounds(&mut sampler, &clips, layout.vertex_count(), &mut frame)?;

    let mut position = VatTexture::new(layout.width(), layout.height());
    let mut normal = VatTexture::new(layout.width(), layout.height());
    let mut entries = Vec::with_capacity(clips.len());

    for (slot, clip) in clips.iter().enumerate() {
        let Some(start_row) = layout.start_row(slot) else {
            warn!("Clip '{}' has no layout slot {}; skipped", clip.name, slot);
            continue;
        };
        encode_clip(&mut sampler, clip, start_row, layout, &bounds, &mut frame, &mut position, &mut normal)?;

        entries.push(AnimationEntry {
            name: clip.name.clone(),
            start_row,
            length: clip.duration,
            bake_frame_count: clip.bake_frames(),
            is_loop: clip.looping,
        });
    }
    drop(sampler);

    info!("Baked '{}': {} entries, bounds {:?}..{:?}", source.name(), entries.len(), bounds.min, bounds.max);
    Ok(BakeOutput { position, normal, bounds, entries })
}

/// First pass: one AABB across all vertices of all frames of all clips.
fn compute_bounds<M: MeshSampler>(
    sampler: &mut M,
    clips: &[&ClipDescriptor],
    vertex_count: usize,
    frame: &mut SampledFrame,
) -> Result<VatBounds, BakeError> {
    let mut bounds = VatBounds::EMPTY;
    for clip in clips {
        for f in 0..clip.bake_frames() {
            if !sampler.sample(clip.clip, clip.frame_time(f), frame) {
                return Err(BakeError::MissingClip(clip.name.clone()));
            }
            let n = vertex_count.min(frame.positions.len());
            bounds.include_all(&frame.positions[..n]);
        }
    }
    if bounds.is_empty() {
        // No vertex was produced; collapse to the origin so encoding stays defined.
        bounds = VatBounds::new(Vec3::ZERO, Vec3::ZERO);
    }
    Ok(bounds)
}

/// Second pass for one clip.
#[allow(clippy::too_many_arguments)]
fn encode_clip<M: MeshSampler>(
    sampler: &mut M,
    clip: &ClipDescriptor,
    start_row: u32,
    layout: &TextureLayout,
    bounds: &VatBounds,
    frame: &mut SampledFrame,
    position: &mut VatTexture,
    normal: &mut VatTexture,
) -> Result<(), BakeError> {
    for f in 0..clip.bake_frames() {
        if !sampler.sample(clip.clip, clip.frame_time(f), frame) {
            return Err(BakeError::MissingClip(clip.name.clone()));
        }

        for v in 0..layout.vertex_count() {
            let index = layout.pixel_index(start_row, f, v);
            if index >= position.len() {
                warn!(
                    "Pixel index {} is out of range for texture size {} ('{}' frame {} vertex {})",
                    index,
                    position.len(),
                    clip.name,
                    f,
                    v
                );
                continue;
            }
            let Some(p) = frame.positions.get(v) else { continue };
            position.set(index, encode_position(*p, bounds));
            normal.set(index, encode_normal(frame.normals.get(v).copied()));
        }
    }
    Ok(())
}

// ---------- Errors ----------

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BakeError {
    #[error("Bake failed - no states selected")]
    NoStatesSelected,
    #[error("'{0}' has no animator state graph")]
    MissingAnimator(String),
    #[error("'{0}' has no skinned mesh")]
    MissingSkinnedMesh(String),
    #[error("No material assigned for '{0}'")]
    MissingMaterial(String),
    #[error("Selection was laid out for {selection} vertices but the mesh has {mesh}")]
    VertexCountMismatch { selection: usize, mesh: usize },
    #[error("Selected states produce an empty texture layout")]
    EmptyLayout,
    #[error("Clip '{0}' could not be sampled")]
    MissingClip(String),
}
