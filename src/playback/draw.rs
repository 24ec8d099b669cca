// src/playback/draw.rs
//! Draw contract between batches and whatever renders them.

use bevy::prelude::*;

use super::BatchId;

// Per-instance uniform arrays the playback shader indexes by instance id.
pub const BEGIN_ARRAY: &str = "vat_begin_array";
pub const OFFSET_ARRAY: &str = "vat_offset_array";
pub const SPEED_ARRAY: &str = "vat_speed_array";
pub const CLIP_INDEX_ARRAY: &str = "vat_clip_index_array";

/// Uploaded per-instance uniforms of one batch. Arrays are full-capacity;
/// only the first `count` values of a draw are meaningful.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyBlock {
    pub begin: Vec<f32>,
    pub offset: Vec<f32>,
    pub speed: Vec<f32>,
    /// Empty for single-entry assets.
    pub clip_index: Vec<f32>,
    /// Array uploads so far.
    pub uploads: u32,
}

impl PropertyBlock {
    pub fn array(&self, name: &str) -> Option<&[f32]> {
        match name {
            BEGIN_ARRAY => Some(&self.begin),
            OFFSET_ARRAY => Some(&self.offset),
            SPEED_ARRAY => Some(&self.speed),
            CLIP_INDEX_ARRAY if !self.clip_index.is_empty() => Some(&self.clip_index),
            _ => None,
        }
    }
}

/// One instanced draw call.
#[derive(Clone, Copy, Debug)]
pub struct InstancedDraw<'a> {
    pub batch: BatchId,
    pub mesh: &'a str,
    pub material: &'a str,
    /// Exactly `count` world matrices.
    pub transforms: &'a [Mat4],
    pub block: &'a PropertyBlock,
}

impl InstancedDraw<'_> {
    pub fn count(&self) -> usize { self.transforms.len() }
}

pub trait InstancedDrawSink {
    fn draw_instanced(&mut self, draw: InstancedDraw<'_>);
}

/// Owned copy of a draw, kept for a render backend to consume.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub batch: BatchId,
    pub mesh: String,
    pub material: String,
    pub transforms: Vec<Mat4>,
    pub block: PropertyBlock,
}

/// This frame's draws, in issue order. Cleared at the start of every tick.
#[derive(Resource, Default, Debug)]
pub struct VatDrawQueue {
    pub draws: Vec<RecordedDraw>,
}

impl VatDrawQueue {
    pub fn clear(&mut self) { self.draws.clear(); }

    pub fn instance_total(&self) -> usize {
        self.draws.iter().map(|d| d.transforms.len()).sum()
    }
}

impl InstancedDrawSink for VatDrawQueue {
    fn draw_instanced(&mut self, draw: InstancedDraw<'_>) {
        self.draws.push(RecordedDraw {
            batch: draw.batch,
            mesh: draw.mesh.to_string(),
            material: draw.material.to_string(),
            transforms: draw.transforms.to_vec(),
            block: draw.block.clone(),
        });
    }
}
